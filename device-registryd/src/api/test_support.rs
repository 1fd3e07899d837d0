use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use crate::config::ApiConfig;
use crate::store::{DeviceDb, DeviceStore};
use super::routes::{router, AppState};

pub const IP_HEADER: &str = "x-real-ip";

/// Router over a fresh in-memory store, trusting [`IP_HEADER`]
pub fn app() -> Router {
    let store = DeviceStore::spawn(DeviceDb::open(":memory:").unwrap());
    let config = ApiConfig {
        real_ip_header: Some(IP_HEADER.to_string()),
        ..ApiConfig::default()
    };
    router(AppState::new(store, &config))
}

/// Send one request as `caller` and decode the JSON body (`Null` if empty).
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    caller: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .header(IP_HEADER, caller);

    let body = match body {
        Some(json) => {
            request = request.header(CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}
