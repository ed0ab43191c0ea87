use std::sync::Arc;

use knotlist_domain::mode::BackendMode;
use knotlist_domain::ports::graph::GraphQuery;
use knotlist_domain::todo::TodoService;
use knotlist_infra::auth::TokenIssuer;
use knotlist_infra::config::AppConfig;
use knotlist_infra::graph::{self, GraphConfig};
use knotlist_infra::repositories::GraphTodoRepository;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub graph: Arc<dyn GraphQuery>,
    pub todos: TodoService,
    pub issuer: TokenIssuer,
}

impl AppState {
    /// Resolves the backend mode, connects the one backend, and constructs
    /// the issuer eagerly so a missing signing secret fails at startup.
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let mode = BackendMode::parse(&config.graph_backend)
            .ok_or_else(|| anyhow::anyhow!("unknown graph_backend '{}'", config.graph_backend))?;
        let graph = graph::connect(mode, &GraphConfig::from_app_config(&config)).await?;
        let todos = TodoService::new(Arc::new(GraphTodoRepository::new(graph.clone())));
        let issuer = TokenIssuer::new(&config.jwt_secret)?;
        Ok(Self {
            config,
            graph,
            todos,
            issuer,
        })
    }
}
