use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use std::sync::Arc;
use warmtecheck_core::{Config, Error, RunReport};

use crate::trigger;

#[derive(Clone)]
pub struct HttpState {
    pub config: Arc<Config>,
}

fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        e if e.is_upstream() => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn healthz() -> &'static str {
    "ok"
}

/// An empty body runs the configured location set; a JSON array body
/// overrides it for this request only.
async fn post_run(
    State(state): State<HttpState>,
    body: Bytes,
) -> Result<Json<RunReport>, (StatusCode, String)> {
    let to_response = |err: Error| (status_for(&err), err.to_string());

    let override_locations = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        Some(trigger::parse_locations(&body).map_err(to_response)?)
    };
    let locations = override_locations.as_deref().unwrap_or(&state.config.locations);

    tracing::info!(locations = locations.len(), "HTTP triggered WarmteCheck");
    let report = trigger::execute(&state.config, locations, false).await.map_err(|err| {
        tracing::error!(error = %err, "WarmteCheck failed");
        to_response(err)
    })?;

    Ok(Json(report))
}

pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/run", post(post_run))
        .with_state(state)
}
