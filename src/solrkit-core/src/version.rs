use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Protocol spec version reported by a Solr server (`solr-spec-version`).
///
/// Versions compare component by component; when one version is a prefix of
/// the other, the longer one is greater (`1.4` < `1.4.0`). Solr reports
/// build-stamped versions such as `1.2.2008.03.21.05.21.15`, which therefore
/// sort below `1.3`.
#[derive(Debug, Clone)]
pub struct SpecVersion {
    raw: String,
    components: Vec<u64>,
}

impl SpecVersion {
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn components(&self) -> &[u64] {
        &self.components
    }

    /// True if this version sorts below `major.minor`
    pub fn is_before(&self, major: u64, minor: u64) -> bool {
        self.components.as_slice() < [major, minor].as_slice()
    }
}

impl FromStr for SpecVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let mut components = Vec::new();

        for part in raw.split('.') {
            let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
            if digits.is_empty() {
                break;
            }
            let value = digits
                .parse::<u64>()
                .map_err(|e| Error::Parse(format!("version component {part:?}: {e}")))?;
            components.push(value);
            // "4-dev" style qualifiers end the numeric part
            if digits.len() != part.len() {
                break;
            }
        }

        if components.is_empty() {
            return Err(Error::Parse(format!("not a version string: {s:?}")));
        }

        Ok(Self {
            raw: raw.to_string(),
            components,
        })
    }
}

impl fmt::Display for SpecVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for SpecVersion {
    fn eq(&self, other: &Self) -> bool {
        self.components == other.components
    }
}

impl Eq for SpecVersion {}

impl PartialOrd for SpecVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SpecVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components.cmp(&other.components)
    }
}
