pub mod request_id;

pub use request_id::{request_id_middleware, RequestId, X_REQUEST_ID};

use axum::{
    extract::{DefaultBodyLimit, Request},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::controllers::{
    conversion::ConversionController,
    health::{self, HealthState},
};
use crate::domain::conversion::ConversionService;
use crate::infrastructure::config::Config;
use crate::infrastructure::db::DbPool;
use crate::infrastructure::storage::StorageLayout;

/// Room for multipart boundaries and the non-file fields on top of the
/// document itself
const MULTIPART_OVERHEAD_BYTES: u64 = 1024 * 1024;

/// Build the application router with all routes and layers configured
pub fn build_router(
    config: &Config,
    storage: &StorageLayout,
    pool: Arc<DbPool>,
    conversion_service: Arc<ConversionService>,
) -> Router {
    let conversion_controller = Arc::new(ConversionController::new(
        conversion_service.clone(),
        config.max_upload_bytes,
    ));
    let body_limit = usize::try_from(config.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES))
        .unwrap_or(usize::MAX);

    let conversion_routes = Router::new()
        .route("/convert", post(ConversionController::convert))
        .route("/status/:task_id", get(ConversionController::status))
        .with_state(conversion_controller)
        .layer(DefaultBodyLimit::max(body_limit));

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::health_ready))
        .with_state(HealthState {
            pool,
            conversion_service,
        });

    let app = Router::new()
        .merge(health_routes)
        .merge(conversion_routes)
        .nest_service("/audio", ServeDir::new(storage.audio_dir()))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                let request_id = request
                    .headers()
                    .get(X_REQUEST_ID)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or_default();
                tracing::debug_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id
                )
            }),
        )
        .layer(middleware::from_fn(request_id_middleware));

    if config.is_development() {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

/// Bind to the configured address and serve until `shutdown` is cancelled
pub async fn start_http_server(
    config: Arc<Config>,
    app: Router,
    shutdown: CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;

    tracing::info!("Server listening on {}", listener.local_addr()?);

    serve(listener, app, shutdown).await?;

    Ok(())
}

/// Serve `app` on an already bound listener, finishing in-flight requests
/// once `shutdown` is cancelled
pub async fn serve(listener: TcpListener, app: Router, shutdown: CancellationToken) -> std::io::Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}
