use solrkit_core::update;
use solrkit_core::{Config, Field, IndexDocument, QueryParams, SearchResult, SpecVersion};
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::executor::{HttpExecutor, HttpRequest, HttpResponse, ReqwestExecutor};
use crate::{ClientError, Result};

/// Supplies fields appended to every document sent through [`Connection::add`]
pub trait DefaultFieldsInjector: Send + Sync {
    fn default_fields(&self) -> Vec<Field>;
}

/// Default fields taken from [`Config::default_fields`]
#[derive(Debug, Clone, Default)]
pub struct ConfiguredDefaults {
    fields: Vec<Field>,
}

impl ConfiguredDefaults {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn from_config(config: &Config) -> solrkit_core::Result<Self> {
        Ok(Self::new(config.default_fields()?))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl DefaultFieldsInjector for ConfiguredDefaults {
    fn default_fields(&self) -> Vec<Field> {
        self.fields.clone()
    }
}

/// A live connection to one Solr core.
///
/// Only constructed after a successful ping. The server's spec version is
/// fetched on first use and cached for the lifetime of the connection.
pub struct Connection {
    executor: Arc<dyn HttpExecutor>,
    spec_version: OnceCell<SpecVersion>,
    injector: Option<Arc<dyn DefaultFieldsInjector>>,
}

impl Connection {
    /// Connect to the Solr instance at `url` (e.g. `http://localhost:8080/solr`)
    pub async fn connect(url: &str) -> Result<Self> {
        let executor = ReqwestExecutor::new(url)?;
        Self::with_executor(Arc::new(executor)).await
    }

    /// Connect using the server URL, timeouts and default fields from `config`
    pub async fn from_config(config: &Config) -> Result<Self> {
        let executor = ReqwestExecutor::from_config(config)?;
        let connection = Self::with_executor(Arc::new(executor)).await?;

        let defaults = ConfiguredDefaults::from_config(config)?;
        if defaults.is_empty() {
            Ok(connection)
        } else {
            Ok(connection.with_injector(Arc::new(defaults)))
        }
    }

    pub async fn with_executor(executor: Arc<dyn HttpExecutor>) -> Result<Self> {
        let connection = Self {
            executor,
            spec_version: OnceCell::new(),
            injector: None,
        };

        if !connection.ping().await {
            return Err(ClientError::Connection(
                "server did not answer the ping request".to_string(),
            ));
        }

        tracing::info!("Connected to Solr");
        Ok(connection)
    }

    pub fn with_injector(mut self, injector: Arc<dyn DefaultFieldsInjector>) -> Self {
        self.injector = Some(injector);
        self
    }

    /// Liveness probe; any failure reads as `false`
    pub async fn ping(&self) -> bool {
        match self.executor.execute(HttpRequest::get("/admin/ping")).await {
            Ok(response) if response.is_success() => true,
            Ok(response) => {
                tracing::warn!(status = response.status, "Solr ping failed");
                false
            }
            Err(e) => {
                tracing::warn!("Solr ping failed: {}", e);
                false
            }
        }
    }

    pub async fn add<D: IndexDocument + Sync>(&self, doc: &D) -> Result<()> {
        self.add_all(std::slice::from_ref(doc)).await
    }

    pub async fn add_all<D: IndexDocument + Sync>(&self, docs: &[D]) -> Result<()> {
        let extra = match &self.injector {
            Some(injector) => injector.default_fields(),
            None => Vec::new(),
        };
        let payload = update::add_payload(docs, &extra)?;
        tracing::debug!(documents = docs.len(), "Adding documents");
        self.update(payload).await
    }

    pub async fn delete_by_id(&self, id: &str) -> Result<()> {
        self.update(update::delete_by_id_payload(id)?).await
    }

    pub async fn delete_by_query(&self, query: &str) -> Result<()> {
        self.update(update::delete_by_query_payload(query)?).await
    }

    pub async fn commit(&self) -> Result<()> {
        self.update(update::commit_payload()?).await
    }

    pub async fn optimize(&self) -> Result<()> {
        self.update(update::optimize_payload()?).await
    }

    /// Run a search. Accepts a [`solrkit_core::Query`], a
    /// [`solrkit_core::SearchQuery`] or a plain `&str`.
    pub async fn query<Q: QueryParams + Sync + ?Sized>(&self, query: &Q) -> Result<SearchResult> {
        let version = if query.needs_spec_version() {
            Some(self.spec_version().await?)
        } else {
            None
        };

        let path = format!("/select{}", query.query_string(version)?);
        let response = self.send(HttpRequest::get(path)).await?;
        Ok(SearchResult::parse_response(&response.body)?)
    }

    /// The server's `solr-spec-version`, fetched once
    pub async fn spec_version(&self) -> Result<&SpecVersion> {
        self.spec_version
            .get_or_try_init(|| self.fetch_spec_version())
            .await
    }

    async fn fetch_spec_version(&self) -> Result<SpecVersion> {
        let unavailable = |reason: String| ClientError::VersionUnavailable(reason);

        let response = self
            .send(HttpRequest::get("/admin/system/?wt=json"))
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let info: serde_json::Value = serde_json::from_str(&response.body)
            .map_err(|e| unavailable(format!("invalid system info: {e}")))?;

        let raw = info
            .get("lucene")
            .and_then(|lucene| lucene.get("solr-spec-version"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| unavailable("lucene.solr-spec-version missing".to_string()))?;

        let version = raw
            .parse::<SpecVersion>()
            .map_err(|e| unavailable(e.to_string()))?;
        tracing::info!(version = %version, "Detected Solr spec version");
        Ok(version)
    }

    async fn update(&self, payload: String) -> Result<()> {
        tracing::debug!(bytes = payload.len(), "Posting update");
        self.send(HttpRequest::post("/update", payload)).await?;
        Ok(())
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        tracing::debug!(path = %request.path, "Solr request");
        let response = self.executor.execute(request).await?;

        if !response.is_success() {
            return Err(ClientError::Server {
                status: response.status,
                message: response.body,
            });
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::Method;
    use solrkit_core::{Document, FacetOptions, FacetSort, Query};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    const DECL: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
    const ONE_DOC: &str = r#"{"responseHeader":{"status":0,"QTime":0},"response":{"numFound":1,"start":0,"docs":[{"id":42,"title":"PHP 5"}]}}"#;

    /// Replays queued responses (200 with an empty body once exhausted)
    #[derive(Default)]
    struct RecordingExecutor {
        responses: Mutex<VecDeque<Result<HttpResponse>>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl RecordingExecutor {
        fn replying(responses: Vec<Result<HttpResponse>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl HttpExecutor for RecordingExecutor {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(HttpResponse::new(200, "")))
        }
    }

    fn ok(body: &str) -> Result<HttpResponse> {
        Ok(HttpResponse::new(200, body))
    }

    fn system_info(version: &str) -> Result<HttpResponse> {
        ok(&format!(
            r#"{{"lucene":{{"solr-spec-version":"{version}","lucene-spec-version":"2.9.1"}}}}"#
        ))
    }

    async fn connected(responses: Vec<Result<HttpResponse>>) -> (Connection, Arc<RecordingExecutor>) {
        let mut all = vec![ok("")];
        all.extend(responses);
        let executor = RecordingExecutor::replying(all);
        let connection = Connection::with_executor(executor.clone()).await.unwrap();
        (connection, executor)
    }

    fn foo_bar() -> Document {
        Document::from_fields(vec![Field::new("foo", "bar").unwrap()])
    }

    #[tokio::test]
    async fn test_connect_pings() {
        let (_, executor) = connected(vec![]).await;
        assert_eq!(executor.requests(), vec![HttpRequest::get("/admin/ping")]);
    }

    #[tokio::test]
    async fn test_connect_fails_on_error_status() {
        let executor = RecordingExecutor::replying(vec![Ok(HttpResponse::new(500, ""))]);
        let result = Connection::with_executor(executor).await;
        assert!(matches!(result, Err(ClientError::Connection(_))));
    }

    #[tokio::test]
    async fn test_connect_fails_on_transport_error() {
        let executor =
            RecordingExecutor::replying(vec![Err(ClientError::Transport("refused".to_string()))]);
        assert!(Connection::with_executor(executor).await.is_err());
    }

    #[tokio::test]
    async fn test_ping() {
        let (connection, _) = connected(vec![
            ok(""),
            Ok(HttpResponse::new(404, "")),
            Err(ClientError::Transport("timeout".to_string())),
        ])
        .await;
        assert!(connection.ping().await);
        assert!(!connection.ping().await);
        assert!(!connection.ping().await);
    }

    #[tokio::test]
    async fn test_add_one_document() {
        let (connection, executor) = connected(vec![]).await;
        connection.add(&foo_bar()).await.unwrap();

        let requests = executor.requests();
        assert_eq!(
            requests[1],
            HttpRequest::post(
                "/update",
                format!("{DECL}<add><doc><field name=\"foo\">bar</field></doc></add>\n")
            )
        );
    }

    #[tokio::test]
    async fn test_add_three_documents() {
        let (connection, executor) = connected(vec![]).await;
        let docs = vec![foo_bar(), foo_bar(), foo_bar()];
        connection.add_all(&docs).await.unwrap();

        let one = "<doc><field name=\"foo\">bar</field></doc>";
        assert_eq!(
            executor.requests()[1].body.as_deref(),
            Some(format!("{DECL}<add>{one}{one}{one}</add>\n").as_str())
        );
    }

    #[tokio::test]
    async fn test_add_with_default_fields() {
        let (connection, executor) = connected(vec![]).await;
        let connection = connection.with_injector(Arc::new(ConfiguredDefaults::new(vec![
            Field::new("site", "blog").unwrap(),
        ])));
        connection.add(&foo_bar()).await.unwrap();

        assert_eq!(
            executor.requests()[1].body.as_deref(),
            Some(
                format!(
                    "{DECL}<add><doc><field name=\"foo\">bar</field><field name=\"site\">blog</field></doc></add>\n"
                )
                .as_str()
            )
        );
    }

    #[tokio::test]
    async fn test_simple_commands() {
        let (connection, executor) = connected(vec![]).await;
        connection.commit().await.unwrap();
        connection.optimize().await.unwrap();
        connection.delete_by_id("4711").await.unwrap();
        connection.delete_by_query("foo:bar").await.unwrap();

        let bodies: Vec<String> = executor.requests()[1..]
            .iter()
            .map(|r| {
                assert_eq!(r.method, Method::Post);
                assert_eq!(r.path, "/update");
                r.body.clone().unwrap()
            })
            .collect();
        assert_eq!(
            bodies,
            vec![
                format!("{DECL}<commit/>\n"),
                format!("{DECL}<optimize/>\n"),
                format!("{DECL}<delete><id>4711</id></delete>\n"),
                format!("{DECL}<delete><query>foo:bar</query></delete>\n"),
            ]
        );
    }

    #[tokio::test]
    async fn test_update_error_carries_status() {
        let (connection, _) = connected(vec![Ok(HttpResponse::new(400, "bad"))]).await;
        let err = connection.commit().await.unwrap_err();
        assert_eq!(err.status(), Some(400));
    }

    #[tokio::test]
    async fn test_validation_happens_before_sending() {
        let (connection, executor) = connected(vec![]).await;
        let err = connection.delete_by_id("").await.unwrap_err();
        assert!(matches!(err, ClientError::Core(solrkit_core::Error::Validation(_))));
        assert_eq!(executor.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_query_string() {
        let (connection, executor) = connected(vec![ok(ONE_DOC)]).await;
        let result = connection.query("php").await.unwrap();

        assert_eq!(
            executor.requests()[1],
            HttpRequest::get("/select?qt=standard&wt=json&q=php")
        );
        assert_eq!(result, SearchResult::parse_response(ONE_DOC).unwrap());
        assert_eq!(result[0]["title"], "PHP 5");
    }

    #[tokio::test]
    async fn test_query_object() {
        let (connection, executor) = connected(vec![ok(ONE_DOC)]).await;
        let mut query = Query::new("php").unwrap();
        query.set_rows(Some(5)).unwrap();
        connection.query(&query).await.unwrap();

        assert_eq!(executor.requests()[1].path, "/select?qt=standard&wt=json&q=php&rows=5");
    }

    #[tokio::test]
    async fn test_query_error_status() {
        let (connection, _) = connected(vec![Ok(HttpResponse::new(500, "oops"))]).await;
        let err = connection.query("php").await.unwrap_err();
        assert!(matches!(err, ClientError::Server { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_query_parse_error() {
        let (connection, _) = connected(vec![ok("<html/>")]).await;
        let err = connection.query("php").await.unwrap_err();
        assert!(matches!(err, ClientError::Core(solrkit_core::Error::Parse(_))));
    }

    #[tokio::test]
    async fn test_spec_version_is_cached() {
        let (connection, executor) = connected(vec![system_info("1.4.0.2009.10.01")]).await;
        assert_eq!(connection.spec_version().await.unwrap().as_str(), "1.4.0.2009.10.01");
        assert_eq!(connection.spec_version().await.unwrap().components()[..2], [1, 4]);

        let requests = executor.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1], HttpRequest::get("/admin/system/?wt=json"));
    }

    #[tokio::test]
    async fn test_spec_version_unavailable() {
        let (connection, _) = connected(vec![
            Ok(HttpResponse::new(404, "")),
            ok(r#"{"lucene":{}}"#),
        ])
        .await;
        assert!(matches!(
            connection.spec_version().await,
            Err(ClientError::VersionUnavailable(_))
        ));
        assert!(matches!(
            connection.spec_version().await,
            Err(ClientError::VersionUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_version_sensitive_query_fetches_version() {
        let (connection, executor) =
            connected(vec![system_info("1.2.0"), ok(ONE_DOC), ok(ONE_DOC)]).await;

        let mut query = Query::new("php").unwrap();
        query.facets_mut().set_fields(["author"]).unwrap();
        query.facets_mut().set_sort(Some(FacetSort::Count));
        connection.query(&query).await.unwrap();
        connection.query(&query).await.unwrap();

        let requests = executor.requests();
        assert_eq!(requests.len(), 4);
        assert_eq!(requests[1].path, "/admin/system/?wt=json");
        let expected = "/select?qt=standard&wt=json&q=php&facet=true&facet.field=author&facet.sort=true";
        assert_eq!(requests[2].path, expected);
        assert_eq!(requests[3].path, expected);
    }

    #[tokio::test]
    async fn test_plain_query_skips_version_lookup() {
        let (connection, executor) = connected(vec![ok(ONE_DOC)]).await;
        let mut query = Query::new("php").unwrap();
        query.facets_mut().set_fields(["author"]).unwrap();
        connection.query(&query).await.unwrap();

        let requests = executor.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests[1].path,
            "/select?qt=standard&wt=json&q=php&facet=true&facet.field=author"
        );
    }

    #[tokio::test]
    async fn test_prefix_on_old_server_is_rejected() {
        let (connection, _) = connected(vec![system_info("1.1.0")]).await;
        let mut query = Query::new("php").unwrap();
        query.facets_mut().set_fields(["author"]).unwrap();
        query.facets_mut().set_prefix(Some("ab")).unwrap();

        let err = connection.query(&query).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Core(solrkit_core::Error::UnsupportedParameter { .. })
        ));
    }

    #[tokio::test]
    async fn test_hits_can_be_reindexed() {
        let (connection, executor) = connected(vec![ok(ONE_DOC)]).await;
        let result = connection.query("php").await.unwrap();
        connection.add_all(result.hits()).await.unwrap();

        assert_eq!(
            executor.requests()[2].body.as_deref(),
            Some(
                format!(
                    "{DECL}<add><doc><field name=\"id\">42</field><field name=\"title\">PHP 5</field></doc></add>\n"
                )
                .as_str()
            )
        );
    }
}
