use axum::{
    routing::{get, post},
    Router,
    extract::{rejection::JsonRejection, Json, State},
    response::{Html, IntoResponse, Response},
};
use tower_http::cors::{CorsLayer, Any};
use std::time::Instant;
use tracing::{error, info};

use crate::error::{AppError, Result};
use crate::api::models::{GenerateRequest, HealthResponse};
use crate::api::response;
use crate::render::RenderedPdf;
use crate::usage::UsageRecord;
use crate::AppState;

const INDEX_HTML: &str = include_str!("../../assets/index.html");

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/api/generate", post(generate_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state)
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn generate_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<GenerateRequest>, JsonRejection>,
) -> Response {
    let start_time = Instant::now();

    let (record, result) = match payload {
        Ok(Json(request)) => {
            let record = UsageRecord::new(
                request.mode().as_str(),
                if request.is_text() { "text" } else { "url" },
                request.content.as_deref().unwrap_or_default(),
            );
            (record, process_generate_request(&state, request).await)
        }
        Err(rejection) => (
            UsageRecord::new("-", "-", ""),
            Err(AppError::InvalidRequest(rejection.body_text())),
        ),
    };

    let elapsed = start_time.elapsed();

    match result {
        Ok(pdf) => {
            info!(
                "Generated {} byte PDF ({}x{} px) in {:?}",
                pdf.bytes.len(),
                pdf.fit.width_px,
                pdf.fit.height_px,
                elapsed
            );
            record.finish(200, elapsed, pdf.bytes.len(), None).emit();
            response::pdf(pdf.bytes)
        }
        Err(err) => {
            let status = err.status();
            if status.is_server_error() {
                error!("PDF generation failed: {}", err);
            }
            record.finish(status.as_u16(), elapsed, 0, Some(err.to_string())).emit();
            err.into_response()
        }
    }
}

async fn process_generate_request(state: &AppState, request: GenerateRequest) -> Result<RenderedPdf> {
    let job = request.into_job()?;
    info!("Rendering {} {} PDF", job.mode.as_str(), job.source.kind());
    state.renderer.render(&job).await
}
