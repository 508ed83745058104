use anyhow::Context;
use axum::body::Body;
use axum::http::{header, Method};
use axum::response::Response;
use axum::{extract::FromRef, http::StatusCode, routing::get, Router};
use prometheus::{Encoder, TextEncoder};
use routes::{category_router, questions_router, quizzes_router};
use sqlx::SqlitePool;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::error::ApiError;
use super::routes;
use crate::config::Settings;

#[derive(FromRef, Clone)]
pub struct AppState {
    pool: SqlitePool,
}

impl AppState {
    pub fn new(pool: SqlitePool) -> Self {
        AppState { pool }
    }
}

/// Full API router. `cors` installs the allow-all CORS layer browsers need to reach
/// the API from the quiz frontend's origin.
pub fn router(state: AppState, cors: bool) -> Router {
    let app = Router::new()
        .route("/metrics", get(metrics))
        .merge(category_router(state.clone()))
        .merge(questions_router(state.clone()))
        .merge(quizzes_router(state))
        .method_not_allowed_fallback(|| async { ApiError::MethodNotAllowed })
        .fallback(|| async {
            tracing::debug!("Fallback");
            ApiError::NotFound
        })
        .layer(TraceLayer::new_for_http());

    if cors {
        app.layer(cors_layer())
    } else {
        app
    }
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_methods([
            Method::GET,
            Method::PUT,
            Method::POST,
            Method::DELETE,
            Method::OPTIONS,
        ])
}

pub async fn run_server(pool: SqlitePool, settings: &Settings) -> anyhow::Result<()> {
    let app = router(AppState::new(pool), settings.cors);
    let listener = TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", settings.bind_addr))?;

    tracing::info!("Serving on {}", settings.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn metrics() -> Result<Response, ApiError> {
    let encoder = TextEncoder::new();
    let metrics = prometheus::gather();
    let mut buf = vec![];
    encoder.encode(&metrics, &mut buf).context("Failed to encode metrics")?;
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, encoder.format_type())
        .body(Body::from(buf))
        .context("Failed to build metrics response")
        .map_err(ApiError::from)
}
