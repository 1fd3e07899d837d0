use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use shared::response::{ProblemBody, ProblemDetail};
use crate::legacy::{LegacyError, LegacyQuery, LegacyResponse};
use super::client_ip::ClientIp;
use super::routes::AppState;

/// `GET /discover?action=...`, the deprecated single-endpoint API
pub async fn discover(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Query(query): Query<LegacyQuery>,
) -> Response {
    match state.legacy.handle(ip, &query).await {
        Ok(LegacyResponse::Devices(devices)) => Json(devices).into_response(),
        Ok(LegacyResponse::Done) => Json(json!({})).into_response(),
        Err(e) => {
            tracing::warn!(%ip, action = ?query.action, "Legacy request failed: {}", e);
            e.into_response()
        }
    }
}

impl IntoResponse for LegacyError {
    fn into_response(self) -> Response {
        let (status, detail, errors) = match &self {
            LegacyError::MissingParameter { name, value } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "invalid action".to_string(),
                vec![ProblemDetail {
                    message: "required query parameter is missing".to_string(),
                    location: Some(format!("query.{}", name)),
                    value: Some(json!(value)),
                }],
            ),
            LegacyError::InvalidAction(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "invalid action".to_string(),
                vec![ProblemDetail {
                    message: self.to_string(),
                    location: Some("query.action".to_string()),
                    value: None,
                }],
            ),
            LegacyError::NotFound(message) => (StatusCode::NOT_FOUND, message.to_string(), Vec::new()),
            LegacyError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, message.to_string(), Vec::new())
            }
        };

        let body = ProblemBody {
            title: status.canonical_reason().unwrap_or("Error").to_string(),
            status: status.as_u16(),
            detail: Some(detail),
            errors,
        };
        (status, Json(body)).into_response()
    }
}
