use std::sync::Arc;
use axum::{
    extract::{Path, State},
    routing::{delete, get, put},
    Json, Router,
};
use shared::protocol::{DEVICE_ADD_PATH, DEVICE_LIST_PATH, LEGACY_DISCOVER_PATH};
use shared::response::ApiResult;
use shared::types::{Device, DeviceDesc, Interface};
use crate::config::ApiConfig;
use crate::legacy::LegacyAdapter;
use crate::store::{self, AddressPolicy, DeviceStore};
use super::client_ip::ClientIp;
use super::legacy::discover;

#[derive(Clone)]
pub struct AppState {
    pub store: DeviceStore,
    pub legacy: LegacyAdapter,
    /// Trusted proxy header carrying the caller's IP
    pub real_ip_header: Option<Arc<str>>,
}

impl AppState {
    pub fn new(store: DeviceStore, config: &ApiConfig) -> Self {
        Self {
            legacy: LegacyAdapter::new(store.clone()),
            store,
            real_ip_header: config.real_ip_header.as_deref().map(Arc::from),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(DEVICE_LIST_PATH, get(list_devices))
        .route(DEVICE_ADD_PATH, put(add_device))
        .route("/device/:serial", delete(remove_device))
        .route("/device/:serial/online", put(set_online))
        .route("/device/:serial/offline", put(set_offline))
        .route("/device/:serial/add", put(add_interface))
        .route("/device/:serial/:mac", delete(remove_interface))
        .route(LEGACY_DISCOVER_PATH, get(discover))
        .with_state(state)
}

/// Failures stay HTTP 200 on this API; the envelope carries the outcome.
fn envelope(result: store::Result<()>, message: &str) -> Json<ApiResult> {
    Json(match result {
        Ok(()) => ApiResult::success(),
        Err(_) => ApiResult::failure(message),
    })
}

async fn list_devices(State(state): State<AppState>, ClientIp(ip): ClientIp) -> Json<Vec<Device>> {
    Json(state.store.list(ip).await)
}

async fn add_device(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(desc): Json<DeviceDesc>,
) -> Json<ApiResult> {
    if desc.serial.trim().is_empty() || desc.name.trim().is_empty() {
        tracing::warn!(%ip, "Rejecting device without serial or name");
        return Json(ApiResult::failure("Failed to add device: serial and name are required"));
    }
    envelope(state.store.add(ip, desc).await, "Failed to add device")
}

async fn remove_device(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Path(serial): Path<String>,
) -> Json<ApiResult> {
    envelope(state.store.remove(ip, serial).await, "Failed to remove device")
}

async fn set_online(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Path(serial): Path<String>,
) -> Json<ApiResult> {
    envelope(
        state.store.update_status(ip, serial, true).await,
        "Failed to set device online",
    )
}

async fn set_offline(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Path(serial): Path<String>,
) -> Json<ApiResult> {
    envelope(
        state.store.update_status(ip, serial, false).await,
        "Failed to set device offline",
    )
}

async fn add_interface(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Path(serial): Path<String>,
    Json(iface): Json<Interface>,
) -> Json<ApiResult> {
    envelope(
        state
            .store
            .add_address(ip, serial, iface, AddressPolicy::Strict)
            .await,
        "Failed to add interface",
    )
}

async fn remove_interface(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Path((serial, mac)): Path<(String, String)>,
) -> Json<ApiResult> {
    envelope(
        state
            .store
            .remove_address(ip, serial, mac, AddressPolicy::Strict)
            .await,
        "Failed to remove interface",
    )
}
