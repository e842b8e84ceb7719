use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use solrkit_core::{
    config::Config, Document, FacetCounts, Field, PrioritySearchField, QueryParams, SearchField,
    SearchQuery, SearchResult, SimpleSearchField, SortOrder,
};
use solrkit_rs::Connection;

mod telemetry;

#[derive(Parser)]
#[command(version, about = "Command line client for a Solr server")]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = "config.json")]
    config: String,

    /// Solr base URL, overrides the configured server
    #[arg(long)]
    url: Option<String>,

    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Check that the server answers
    Ping,
    /// Print the server's spec version
    Version,
    /// Search with raw query text or field:value clauses
    Search {
        /// Raw query text (ignored when --match is given)
        query: Option<String>,
        /// field=value clause, all clauses must match
        #[arg(long = "match")]
        matches: Vec<String>,
        #[arg(long)]
        rows: Option<i64>,
        #[arg(long)]
        start: Option<i64>,
        /// Comma separated list of fields to return
        #[arg(long)]
        fl: Option<String>,
        #[arg(long)]
        fq: Vec<String>,
        #[arg(long)]
        facet_field: Vec<String>,
        /// field:asc or field:desc
        #[arg(long)]
        sort: Option<String>,
    },
    /// Search one keyword across the configured field priorities
    PrioritySearch {
        keyword: String,
        #[arg(long)]
        rows: Option<i64>,
        #[arg(long)]
        sort: Option<String>,
    },
    /// Index one document built from name=value pairs
    Push {
        #[arg(long = "field", required = true)]
        fields: Vec<String>,
        #[arg(long)]
        boost: Option<f64>,
        /// Skip the commit after adding
        #[arg(long, default_value_t = false)]
        no_commit: bool,
    },
    /// Delete by id or by query
    Delete {
        #[arg(long, conflicts_with = "query", required_unless_present = "query")]
        id: Option<String>,
        #[arg(long)]
        query: Option<String>,
        #[arg(long, default_value_t = false)]
        no_commit: bool,
    },
    Commit,
    Optimize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = telemetry::init_telemetry(cli.verbose)?;

    let config = Config::load(&cli.config).unwrap_or_else(|_| {
        tracing::warn!("Failed to load {}, using defaults", cli.config);
        Config::default()
    });

    let connection = match &cli.url {
        Some(url) => Connection::connect(url).await,
        None => Connection::from_config(&config).await,
    }
    .with_context(|| {
        format!(
            "Solr is not reachable at {}",
            cli.url.clone().unwrap_or_else(|| config.server_url())
        )
    })?;

    match cli.cmd {
        Cmd::Ping => {
            if connection.ping().await {
                println!("ok");
            } else {
                bail!("ping failed");
            }
        }
        Cmd::Version => {
            println!("{}", connection.spec_version().await?);
        }
        Cmd::Search {
            query,
            matches,
            rows,
            start,
            fl,
            fq,
            facet_field,
            sort,
        } => {
            let mut search = if matches.is_empty() {
                let text = query.context("either a query or --match is required")?;
                SearchQuery::new(text)?
            } else {
                let mut fields: Vec<Box<dyn SearchField>> = Vec::new();
                for clause in &matches {
                    let (name, value) = split_pair(clause, '=')?;
                    fields.push(Box::new(SimpleSearchField::new(name, value)?));
                }
                SearchQuery::from_fields(fields)?
            };

            let base = search.query_mut();
            base.set_rows(rows)?;
            base.set_start(start)?;
            if let Some(fl) = fl {
                base.set_field_list(fl.split(','))?;
            }
            if !fq.is_empty() {
                base.set_filters(&fq)?;
            }
            if !facet_field.is_empty() {
                base.facets_mut().set_fields(facet_field)?;
            }
            apply_sort(&mut search, sort.as_deref())?;

            run_search(&connection, &search).await?;
        }
        Cmd::PrioritySearch {
            keyword,
            rows,
            sort,
        } => {
            let priorities = config.field_priorities()?;
            let field = PrioritySearchField::new(keyword, priorities)?;
            let mut search = SearchQuery::from_priority_field(&field)?;
            search.query_mut().set_rows(rows)?;
            apply_sort(&mut search, sort.as_deref())?;

            run_search(&connection, &search).await?;
        }
        Cmd::Push {
            fields,
            boost,
            no_commit,
        } => {
            let mut doc = Document::new();
            for pair in &fields {
                let (name, value) = split_pair(pair, '=')?;
                doc.add_field(Field::new(name, value)?);
            }
            if let Some(boost) = boost {
                doc = doc.with_boost(boost)?;
            }

            connection.add(&doc).await?;
            if !no_commit {
                connection.commit().await?;
            }
            println!("Successfully added the document");
        }
        Cmd::Delete {
            id,
            query,
            no_commit,
        } => {
            match (id, query) {
                (Some(id), _) => connection.delete_by_id(&id).await?,
                (None, Some(query)) => connection.delete_by_query(&query).await?,
                (None, None) => bail!("either --id or --query is required"),
            }
            if !no_commit {
                connection.commit().await?;
            }
            println!("deleted");
        }
        Cmd::Commit => {
            connection.commit().await?;
            println!("committed");
        }
        Cmd::Optimize => {
            connection.optimize().await?;
            println!("optimized");
        }
    }

    Ok(())
}

/// Split `name=value` (or `field:order`) at the first separator
fn split_pair(pair: &str, separator: char) -> Result<(&str, &str)> {
    match pair.split_once(separator) {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim(), value)),
        _ => bail!("expected <name>{separator}<value>, got {pair:?}"),
    }
}

fn apply_sort(search: &mut SearchQuery, sort: Option<&str>) -> Result<()> {
    if let Some(sort) = sort {
        let (field, order) = match sort.split_once(':') {
            Some((field, order)) => (field, order.parse::<SortOrder>()?),
            None => (sort, SortOrder::default()),
        };
        search.set_sort_field(field, order)?;
    }
    Ok(())
}

async fn run_search<Q: QueryParams + Sync>(connection: &Connection, query: &Q) -> Result<()> {
    let result = connection.query(query).await?;
    print_result(&result)?;
    Ok(())
}

fn print_result(result: &SearchResult) -> Result<()> {
    println!("found {} documents total.", result.num_found());
    println!("result set contains {} documents.", result.len());
    println!("starting with document no. {}.", result.start());

    for hit in result {
        let mut fields: serde_json::Map<String, serde_json::Value> = hit
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if let Some(score) = hit.score() {
            fields.insert("score".to_string(), serde_json::json!(score));
        }
        println!("{}", serde_json::to_string(&fields)?);
    }

    print_facets(result.facets());
    Ok(())
}

fn print_facets(facets: &FacetCounts) {
    for (field, counts) in facets.fields() {
        println!("facet {field}:");
        for (value, count) in counts.iter() {
            println!("  {value}: {count}");
        }
        if let Some(missing) = counts.missing() {
            println!("  (missing): {missing}");
        }
    }
    for (query, count) in facets.queries().iter() {
        println!("facet query {query}: {count}");
    }
}
