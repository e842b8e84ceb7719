//! XML payloads for the `/update` handler

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::document::{Field, IndexDocument};
use crate::error::{Error, Result};

fn encode_err(e: impl std::fmt::Display) -> Error {
    Error::Encode(e.to_string())
}

struct Payload {
    writer: Writer<Vec<u8>>,
}

impl Payload {
    fn new() -> Result<Self> {
        let mut writer = Writer::new(Vec::new());
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(encode_err)?;
        writer.get_mut().push(b'\n');
        Ok(Self { writer })
    }

    fn start(&mut self, element: BytesStart<'_>) -> Result<()> {
        self.writer
            .write_event(Event::Start(element))
            .map_err(encode_err)
    }

    fn end(&mut self, name: &str) -> Result<()> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(encode_err)
    }

    fn text(&mut self, text: &str) -> Result<()> {
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(encode_err)
    }

    fn empty(&mut self, name: &str) -> Result<()> {
        self.writer
            .write_event(Event::Empty(BytesStart::new(name)))
            .map_err(encode_err)
    }

    /// `<name>text</name>`
    fn text_element(&mut self, name: &str, text: &str) -> Result<()> {
        self.start(BytesStart::new(name))?;
        self.text(text)?;
        self.end(name)
    }

    fn field(&mut self, field: &Field) -> Result<()> {
        let mut element = BytesStart::new("field");
        element.push_attribute(("name", field.name()));
        let boost = field.boost().map(|b| b.to_string());
        if let Some(boost) = &boost {
            element.push_attribute(("boost", boost.as_str()));
        }
        self.start(element)?;
        self.text(&field.value().to_string())?;
        self.end("field")
    }

    fn finish(self) -> Result<String> {
        let mut bytes = self.writer.into_inner();
        bytes.push(b'\n');
        String::from_utf8(bytes).map_err(encode_err)
    }
}

/// Build an `<add>` payload.
///
/// `extra_fields` are appended to every document after its own fields.
pub fn add_payload<D: IndexDocument>(docs: &[D], extra_fields: &[Field]) -> Result<String> {
    if docs.is_empty() {
        return Err(Error::invalid("no documents to add"));
    }

    let mut payload = Payload::new()?;
    payload.start(BytesStart::new("add"))?;

    for doc in docs {
        let mut element = BytesStart::new("doc");
        let boost = doc.index_boost().map(|b| b.to_string());
        if let Some(boost) = &boost {
            element.push_attribute(("boost", boost.as_str()));
        }
        payload.start(element)?;

        for field in doc.index_fields().iter().chain(extra_fields) {
            payload.field(field)?;
        }

        payload.end("doc")?;
    }

    payload.end("add")?;
    payload.finish()
}

pub fn delete_by_id_payload(id: &str) -> Result<String> {
    if id.is_empty() {
        return Err(Error::invalid("document id must not be empty"));
    }

    let mut payload = Payload::new()?;
    payload.start(BytesStart::new("delete"))?;
    payload.text_element("id", id)?;
    payload.end("delete")?;
    payload.finish()
}

pub fn delete_by_query_payload(query: &str) -> Result<String> {
    if query.trim().is_empty() {
        return Err(Error::invalid("delete query must not be blank"));
    }

    let mut payload = Payload::new()?;
    payload.start(BytesStart::new("delete"))?;
    payload.text_element("query", query)?;
    payload.end("delete")?;
    payload.finish()
}

pub fn commit_payload() -> Result<String> {
    let mut payload = Payload::new()?;
    payload.empty("commit")?;
    payload.finish()
}

pub fn optimize_payload() -> Result<String> {
    let mut payload = Payload::new()?;
    payload.empty("optimize")?;
    payload.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    const DECL: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

    fn foo_bar() -> Document {
        Document::from_fields(vec![Field::new("foo", "bar").unwrap()])
    }

    #[test]
    fn test_add_one_document() {
        let xml = add_payload(&[foo_bar()], &[]).unwrap();
        assert_eq!(
            xml,
            format!("{DECL}<add><doc><field name=\"foo\">bar</field></doc></add>\n")
        );
    }

    #[test]
    fn test_add_three_documents() {
        let doc = foo_bar();
        let xml = add_payload(&[&doc, &doc, &doc], &[]).unwrap();
        let one = "<doc><field name=\"foo\">bar</field></doc>";
        assert_eq!(xml, format!("{DECL}<add>{one}{one}{one}</add>\n"));
    }

    #[test]
    fn test_add_complex_document() {
        let doc = Document::from_fields(vec![
            Field::new("dummy1", "foobar").unwrap(),
            Field::new("dummy2", "foobar").unwrap().with_boost(1.6).unwrap(),
            Field::new("dummy3", "foobar").unwrap(),
        ])
        .with_boost(2.5)
        .unwrap();

        let xml = add_payload(&[doc], &[]).unwrap();
        assert_eq!(
            xml,
            format!(
                "{DECL}<add><doc boost=\"2.5\"><field name=\"dummy1\">foobar</field>\
                 <field name=\"dummy2\" boost=\"1.6\">foobar</field>\
                 <field name=\"dummy3\">foobar</field></doc></add>\n"
            )
        );
    }

    #[test]
    fn test_add_escapes_text_and_attributes() {
        let doc = Document::from_fields(vec![Field::new("a\"b", "x < y & z").unwrap()]);
        let xml = add_payload(&[doc], &[]).unwrap();
        assert!(xml.contains("name=\"a&quot;b\""));
        assert!(xml.contains(">x &lt; y &amp; z<"));
    }

    #[test]
    fn test_add_appends_extra_fields() {
        let extra = [Field::new("site", "blog").unwrap()];
        let xml = add_payload(&[foo_bar(), foo_bar()], &extra).unwrap();
        let one = "<doc><field name=\"foo\">bar</field><field name=\"site\">blog</field></doc>";
        assert_eq!(xml, format!("{DECL}<add>{one}{one}</add>\n"));
    }

    #[test]
    fn test_add_numeric_values() {
        let doc = Document::from_fields(vec![
            Field::currency("price", "12,123.50").unwrap(),
            Field::new("id", 4711).unwrap(),
        ]);
        let xml = add_payload(&[doc], &[]).unwrap();
        assert!(xml.contains("<field name=\"price\">12123.5</field>"));
        assert!(xml.contains("<field name=\"id\">4711</field>"));
    }

    #[test]
    fn test_add_requires_documents() {
        let docs: [Document; 0] = [];
        assert!(matches!(add_payload(&docs, &[]), Err(Error::Validation(_))));
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(commit_payload().unwrap(), format!("{DECL}<commit/>\n"));
        assert_eq!(optimize_payload().unwrap(), format!("{DECL}<optimize/>\n"));
    }

    #[test]
    fn test_delete_payloads() {
        assert_eq!(
            delete_by_id_payload("4711").unwrap(),
            format!("{DECL}<delete><id>4711</id></delete>\n")
        );
        assert_eq!(
            delete_by_query_payload("foo:bar").unwrap(),
            format!("{DECL}<delete><query>foo:bar</query></delete>\n")
        );
        assert!(delete_by_id_payload("").is_err());
        assert!(delete_by_query_payload("  ").is_err());
    }
}
