/// Current API paths
pub const DEVICE_LIST_PATH: &str = "/device/list";
pub const DEVICE_ADD_PATH: &str = "/device/add";

/// Deprecated single-endpoint API path
pub const LEGACY_DISCOVER_PATH: &str = "/discover";

/// Legacy `action` query values
pub const ACTION_LIST: &str = "list";
pub const ACTION_ADD_DEVICE: &str = "add_device";
pub const ACTION_REMOVE_DEVICE: &str = "remove_device";
pub const ACTION_ADD_ADDRESS: &str = "add_address";
pub const ACTION_REMOVE_ADDRESS: &str = "remove_address";

pub fn device_path(serial: &str) -> String {
    format!("/device/{}", serial)
}

pub fn device_status_path(serial: &str, online: bool) -> String {
    format!("/device/{}/{}", serial, if online { "online" } else { "offline" })
}

pub fn interface_add_path(serial: &str) -> String {
    format!("/device/{}/add", serial)
}

pub fn interface_path(serial: &str, mac: &str) -> String {
    format!("/device/{}/{}", serial, mac)
}
