pub mod config;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod services;

use axum::middleware::from_fn;
use axum::{
    routing::{get, post, put},
    Router,
};
use backoffice_core::middleware::request_id_middleware;
use backoffice_core::store::{MemoryStore, PgStore, RecordStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn RecordStore>,
}

pub struct Application {
    port: u16,
    router: Router,
}

impl Application {
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        let store: Arc<dyn RecordStore> = match &config.database.url {
            Some(url) => {
                let pg = PgStore::connect(
                    url,
                    config.database.max_connections,
                    config.database.min_connections,
                )
                .await?;
                pg.init_schema().await?;
                Arc::new(pg)
            }
            None => {
                tracing::warn!(
                    "PAYABLES_DATABASE_URL not set - running against the in-memory store"
                );
                Arc::new(MemoryStore::new())
            }
        };

        let state = AppState {
            config: config.clone(),
            store,
        };

        let router = Router::new()
            .route("/health", get(handlers::health_check))
            .route("/metrics", get(handlers::metrics_handler))
            .route("/payments", post(handlers::create_payment))
            .route("/payments/:id/series", put(handlers::transition_payment))
            .route("/payments/promote-due", post(handlers::promote_due))
            .layer(from_fn(request_id_middleware))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or("-");

                    tracing::info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                        version = ?request.version(),
                    )
                }),
            )
            .with_state(state);

        Ok(Self {
            port: config.server.port,
            router,
        })
    }

    pub async fn run_until_stopped(self) -> anyhow::Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        tracing::info!("Listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, self.router).await?;

        Ok(())
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}
