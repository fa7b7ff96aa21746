//! ShopSearch Search Service
//!
//! Staged product search over Elasticsearch:
//! - Concept resolution of query tokens (brand, category, color, size)
//! - Strict and category-relaxed structured queries with facets
//! - Language-model re-ranking when structured matching finds nothing

mod concept;
mod handlers;
mod mapper;
mod model;
mod query;
mod rerank;
mod stage;

#[cfg(test)]
mod testing;

use axum::{
    routing::{get, post},
    Router,
};
use shopsearch_common::{
    config::{AppConfig, ObservabilityConfig},
    ChatClient, ElasticClient, VERSION,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use concept::ElasticConceptIndex;
use rerank::OpenAiRanker;
use stage::{ElasticDocumentIndex, SearchPipeline};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<SearchPipeline>,
    pub service: Arc<str>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config.observability);

    info!(
        service = %config.observability.service_name,
        version = VERSION,
        "Starting ShopSearch Search Service"
    );

    let search = Arc::new(config.search.clone());

    let elastic = ElasticClient::new(&config.elasticsearch)?;
    let chat = ChatClient::new(config.openai.clone())?;
    info!(
        elasticsearch = %config.elasticsearch.url,
        model = %chat.model(),
        "Clients initialized"
    );

    let pipeline = SearchPipeline::new(
        search.clone(),
        Arc::new(ElasticConceptIndex::new(elastic.clone(), search.clone())),
        Arc::new(ElasticDocumentIndex::new(elastic, search.clone())),
        Arc::new(OpenAiRanker::new(chat, search.request.max_ranked_ids)),
    );

    let state = AppState {
        pipeline: Arc::new(pipeline),
        service: Arc::from(config.observability.service_name.as_str()),
    };

    let app = create_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Create the main application router
fn create_router(state: AppState, config: &AppConfig) -> Router {
    let api_routes = Router::new().route("/products", post(handlers::search_products));

    // Dropping a timed-out request future cancels its in-flight index or ranker call
    let layers = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TimeoutLayer::new(config.request_timeout()));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/v1", api_routes)
        .layer(layers)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
