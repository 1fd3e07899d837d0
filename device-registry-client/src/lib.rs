//! Request builder and response parser for agents talking to the device
//! registry. Transport agnostic: callers send [`Request`]s with whatever
//! HTTP client they have and hand the status and body back for parsing.

use serde::Serialize;
use thiserror::Error;
use shared::protocol::{
    device_path, device_status_path, interface_add_path, interface_path, DEVICE_ADD_PATH,
    DEVICE_LIST_PATH,
};
use shared::response::{ApiResult, ProblemBody};
use shared::types::{Device, DeviceDesc, Interface};

#[derive(Debug, Error)]
pub enum ClientError {
    /// The registry answered with `code != 0`
    #[error("registry rejected request: {0}")]
    Rejected(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

/// One HTTP call against the registry's current API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub path: String,
    /// JSON body, if any
    pub body: Option<String>,
}

#[derive(Serialize)]
struct AddDeviceBody<'a> {
    #[serde(flatten)]
    desc: &'a DeviceDesc,
    #[serde(rename = "ifaces", skip_serializing_if = "Option::is_none")]
    interfaces: Option<&'a [Interface]>,
}

pub fn list_devices() -> Request {
    Request {
        method: Method::Get,
        path: DEVICE_LIST_PATH.to_string(),
        body: None,
    }
}

/// Register or refresh a device. The device is always announced online;
/// pass `interfaces` to send the interface list along.
pub fn add_device(desc: &DeviceDesc, interfaces: Option<&[Interface]>) -> Result<Request, ClientError> {
    let desc = DeviceDesc {
        online: true,
        ..desc.clone()
    };
    let body = serde_json::to_string(&AddDeviceBody {
        desc: &desc,
        interfaces,
    })?;

    Ok(Request {
        method: Method::Put,
        path: DEVICE_ADD_PATH.to_string(),
        body: Some(body),
    })
}

pub fn remove_device(serial: &str) -> Request {
    Request {
        method: Method::Delete,
        path: device_path(serial),
        body: None,
    }
}

pub fn update_status(serial: &str, online: bool) -> Request {
    Request {
        method: Method::Put,
        path: device_status_path(serial, online),
        body: None,
    }
}

pub fn add_interface(serial: &str, iface: &Interface) -> Result<Request, ClientError> {
    Ok(Request {
        method: Method::Put,
        path: interface_add_path(serial),
        body: Some(serde_json::to_string(iface)?),
    })
}

pub fn remove_interface(serial: &str, mac: &str) -> Request {
    Request {
        method: Method::Delete,
        path: interface_path(serial, mac),
        body: None,
    }
}

/// Parse the answer to any mutating request.
pub fn parse_result(status: u16, body: &str) -> Result<(), ClientError> {
    if status != 200 {
        return Err(http_error(status, body));
    }

    let result: ApiResult = serde_json::from_str(body)?;
    if result.is_success() {
        Ok(())
    } else {
        Err(ClientError::Rejected(result.error.unwrap_or_default()))
    }
}

pub fn parse_list(status: u16, body: &str) -> Result<Vec<Device>, ClientError> {
    if status != 200 {
        return Err(http_error(status, body));
    }
    Ok(serde_json::from_str(body)?)
}

/// Collect `location: message` pairs from a problem body, falling back to
/// its detail or the raw body.
fn http_error(status: u16, body: &str) -> ClientError {
    let message = match serde_json::from_str::<ProblemBody>(body) {
        Ok(problem) if !problem.errors.is_empty() => problem
            .errors
            .iter()
            .map(|e| match &e.location {
                Some(location) => format!("{}: {}", location, e.message),
                None => e.message.clone(),
            })
            .collect::<Vec<_>>()
            .join(", "),
        Ok(problem) => problem.detail.unwrap_or(problem.title),
        Err(_) => body.to_string(),
    };
    ClientError::Http { status, message }
}
