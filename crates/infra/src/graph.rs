use std::sync::Arc;
use std::time::Duration;

use knotlist_domain::mode::BackendMode;
use knotlist_domain::ports::BoxFuture;
use knotlist_domain::ports::graph::{GraphError, GraphQuery, GraphResult, Params, Row};
use surrealdb::engine::local::{Db, Mem};
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use surrealdb::{Connection, Surreal};
use tokio::net::TcpStream;
use tokio::time::timeout;
use url::Url;

use crate::config::AppConfig;

#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub endpoint: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl GraphConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            endpoint: config.surreal_endpoint.clone(),
            namespace: config.surreal_ns.clone(),
            database: config.surreal_db.clone(),
            username: config.surreal_user.clone(),
            password: config.surreal_pass.clone(),
        }
    }
}

/// Resolves the one backend for this process. With `Embedded` no remote
/// connection is ever attempted; with `Remote` no in-process engine is
/// started.
pub async fn connect(
    mode: BackendMode,
    config: &GraphConfig,
) -> anyhow::Result<Arc<dyn GraphQuery>> {
    match mode {
        BackendMode::Embedded => Ok(Arc::new(EmbeddedGraph::start(config).await?)),
        BackendMode::Remote => Ok(Arc::new(RemoteGraph::connect(config).await?)),
    }
}

/// In-process memory engine.
pub struct EmbeddedGraph {
    client: Surreal<Db>,
}

impl EmbeddedGraph {
    pub async fn start(config: &GraphConfig) -> anyhow::Result<Self> {
        let client = Surreal::new::<Mem>(()).await?;
        client
            .use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;
        Ok(Self { client })
    }
}

impl GraphQuery for EmbeddedGraph {
    fn backend(&self) -> &'static str {
        "embedded"
    }

    fn run(&self, statement: &str, params: Params) -> BoxFuture<'_, GraphResult<Vec<Row>>> {
        let statement = statement.to_string();
        Box::pin(async move { run_statement(&self.client, statement, params).await })
    }

    fn health_check(&self) -> BoxFuture<'_, GraphResult<()>> {
        Box::pin(async move { self.client.health().await.map_err(map_surreal_error) })
    }
}

/// WebSocket session against a graph server.
pub struct RemoteGraph {
    client: Surreal<Client>,
    endpoint: String,
}

impl RemoteGraph {
    pub async fn connect(config: &GraphConfig) -> anyhow::Result<Self> {
        let client = Surreal::<Client>::init();
        client.connect::<Ws>(config.endpoint.as_str()).await?;
        client
            .signin(Root {
                username: &config.username,
                password: &config.password,
            })
            .await?;
        client
            .use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

impl GraphQuery for RemoteGraph {
    fn backend(&self) -> &'static str {
        "remote"
    }

    fn run(&self, statement: &str, params: Params) -> BoxFuture<'_, GraphResult<Vec<Row>>> {
        let statement = statement.to_string();
        Box::pin(async move { run_statement(&self.client, statement, params).await })
    }

    fn health_check(&self) -> BoxFuture<'_, GraphResult<()>> {
        Box::pin(async move {
            let address = parse_socket_address(&self.endpoint)?;
            let connect = timeout(Duration::from_secs(2), TcpStream::connect(address))
                .await
                .map_err(|_| {
                    GraphError::Unavailable("graph endpoint connect timed out".to_string())
                })?;
            connect.map_err(|err| {
                GraphError::Unavailable(format!("graph endpoint connect failed: {err}"))
            })?;

            tracing::debug!(endpoint = %self.endpoint, "graph health check succeeded");
            Ok(())
        })
    }
}

async fn run_statement<C: Connection>(
    client: &Surreal<C>,
    statement: String,
    params: Params,
) -> GraphResult<Vec<Row>> {
    let mut query = client.query(statement);
    for (name, value) in params {
        query = query.bind((name, value));
    }
    let mut response = query.await.map_err(map_surreal_error)?;
    let rows: Vec<serde_json::Value> = response.take(0).map_err(map_surreal_error)?;
    rows.into_iter().map(Row::from_value).collect()
}

fn map_surreal_error(err: surrealdb::Error) -> GraphError {
    let message = err.to_string();
    let lowered = message.to_lowercase();
    if lowered.contains("connection")
        || lowered.contains("unavailable")
        || lowered.contains("timed out")
    {
        GraphError::Unavailable(message)
    } else {
        GraphError::Query(message)
    }
}

fn parse_socket_address(endpoint: &str) -> GraphResult<String> {
    let normalized = if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("ws://{endpoint}")
    };
    let parsed = Url::parse(&normalized).map_err(|err| {
        GraphError::Unavailable(format!("invalid graph endpoint '{endpoint}': {err}"))
    })?;

    let scheme = parsed.scheme();
    let host = parsed.host_str().ok_or_else(|| {
        GraphError::Unavailable(format!("missing graph host in endpoint '{endpoint}'"))
    })?;
    let port = parsed.port_or_known_default().unwrap_or(match scheme {
        "wss" | "https" => 443,
        "http" | "ws" => 8000,
        _ => 8000,
    });
    Ok(format!("{host}:{port}"))
}
