use axum::{
    Router,
    extract::{Query, State},
    response::{IntoResponse, Json, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::models::ErrorPayload;
use crate::session::Session;
use crate::web::{AppError, AppState};

/// Start and end of the route a browser is working on
#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RouteEndpoints {
    pub start: Option<String>,
    pub end: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/calculate", get(get_calculate).post(post_calculate))
        .route("/route_info", get(route_info))
        .route("/health", get(health))
}

async fn post_calculate(
    mut session: Session,
    Json(payload): Json<RouteEndpoints>,
) -> Result<impl IntoResponse, AppError> {
    session.data.start = payload.start;
    session.data.end = payload.end;
    let cookie = session.save().await?;

    let endpoints = RouteEndpoints {
        start: session.data.start,
        end: session.data.end,
    };
    Ok((cookie, Json(endpoints)))
}

async fn get_calculate(session: Session) -> Json<RouteEndpoints> {
    Json(RouteEndpoints {
        start: session.data.start,
        end: session.data.end,
    })
}

/// Full route report; every failure becomes a flat `{"error": ...}` payload
async fn route_info(
    State(state): State<AppState>,
    Query(params): Query<RouteEndpoints>,
) -> Response {
    let start = params.start.unwrap_or_default();
    let end = params.end.unwrap_or_default();

    match state.pipeline.route_info(&start, &end).await {
        Ok(report) => {
            info!("Served route report for '{}' -> '{}'", start, end);
            Json(report).into_response()
        }
        Err(e) => {
            warn!(kind = ?e.kind(), "Route report failed: {}", e);
            Json(ErrorPayload::new(e.to_string())).into_response()
        }
    }
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": crate::VERSION,
    }))
}
