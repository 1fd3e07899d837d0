use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Icon names, indexed by their stored code. Index 0 is the fallback.
const ICON_NAMES: [&str; 4] = ["unknown", "living", "kitchen", "bed"];

/// Interface type names, indexed by their stored code. Index 0 is the fallback.
const INTERFACE_TYPE_NAMES: [&str; 3] = ["unknown", "ethernet", "wifi"];

/// Icon used by front-ends to distinguish devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum Icon {
    #[default]
    Unknown,
    Living,
    Kitchen,
    Bed,
}

impl Icon {
    const ALL: [Icon; 4] = [Icon::Unknown, Icon::Living, Icon::Kitchen, Icon::Bed];

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Out of range codes decode to [`Icon::Unknown`].
    pub fn from_code(code: i64) -> Self {
        usize::try_from(code)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .unwrap_or_default()
    }

    pub fn as_str(self) -> &'static str {
        ICON_NAMES[self as usize]
    }

    /// Unrecognized names decode to [`Icon::Unknown`].
    pub fn from_name(name: &str) -> Self {
        ICON_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| Self::ALL[i])
            .unwrap_or_default()
    }

    pub fn is_unknown(&self) -> bool {
        *self == Icon::Unknown
    }
}

impl From<String> for Icon {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<Icon> for &'static str {
    fn from(icon: Icon) -> Self {
        icon.as_str()
    }
}

/// Kind of network interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum InterfaceType {
    #[default]
    Unknown,
    Ethernet,
    Wifi,
}

impl InterfaceType {
    const ALL: [InterfaceType; 3] = [
        InterfaceType::Unknown,
        InterfaceType::Ethernet,
        InterfaceType::Wifi,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: i64) -> Self {
        usize::try_from(code)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .unwrap_or_default()
    }

    pub fn as_str(self) -> &'static str {
        INTERFACE_TYPE_NAMES[self as usize]
    }

    /// Also accepts the older `eth` spelling.
    pub fn from_name(name: &str) -> Self {
        if name == "eth" {
            return InterfaceType::Ethernet;
        }
        INTERFACE_TYPE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| Self::ALL[i])
            .unwrap_or_default()
    }
}

impl From<String> for InterfaceType {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<InterfaceType> for &'static str {
    fn from(kind: InterfaceType) -> Self {
        kind.as_str()
    }
}

pub const DEFAULT_INTERFACE_NAME: &str = "Unknown";

fn default_interface_name() -> String {
    DEFAULT_INTERFACE_NAME.to_string()
}

fn is_zero(port: &u16) -> bool {
    *port == 0
}

/// A network interface of a device, identified within it by its MAC address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    #[serde(rename = "type", default)]
    pub kind: InterfaceType,

    #[serde(default = "default_interface_name")]
    pub name: String,

    /// Colon separated MAC address, e.g. "01:23:45:67:89:ab"
    #[serde(rename = "mac")]
    pub mac_address: String,

    #[serde(rename = "ipv4", default, skip_serializing_if = "Option::is_none")]
    pub ipv4_address: Option<String>,

    #[serde(rename = "ipv6", default, skip_serializing_if = "Option::is_none")]
    pub ipv6_address: Option<String>,
}

impl Interface {
    pub fn new(mac_address: impl Into<String>) -> Self {
        Self {
            kind: InterfaceType::Unknown,
            name: default_interface_name(),
            mac_address: mac_address.into(),
            ipv4_address: None,
            ipv6_address: None,
        }
    }

    /// Label to store; an empty name falls back to "Unknown".
    pub fn effective_name(&self) -> &str {
        if self.name.trim().is_empty() {
            DEFAULT_INTERFACE_NAME
        } else {
            &self.name
        }
    }
}

/// The caller-supplied, mutable part of a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDesc {
    /// Stable device identifier, opaque to the registry
    pub serial: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default, skip_serializing_if = "Icon::is_unknown")]
    pub icon: Icon,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub location: String,

    pub http_port: u16,

    /// 0 when HTTPS is not offered
    #[serde(default, skip_serializing_if = "is_zero")]
    pub https_port: u16,

    #[serde(default)]
    pub online: bool,
}

impl DeviceDesc {
    /// A description carrying only the identity, name and HTTP port.
    pub fn new(serial: impl Into<String>, name: impl Into<String>, http_port: u16) -> Self {
        Self {
            serial: serial.into(),
            name: name.into(),
            description: String::new(),
            icon: Icon::Unknown,
            location: String::new(),
            http_port,
            https_port: 0,
            online: false,
        }
    }
}

/// A registered device as listed by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    #[serde(flatten)]
    pub desc: DeviceDesc,

    /// Refreshed by every mutation touching the device or its interfaces
    #[serde(with = "chrono::serde::ts_seconds")]
    pub last_update: DateTime<Utc>,

    #[serde(rename = "ifaces", default)]
    pub interfaces: Vec<Interface>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icon_table() {
        assert_eq!(Icon::from_name("kitchen"), Icon::Kitchen);
        assert_eq!(Icon::from_name("garage"), Icon::Unknown);
        assert_eq!(Icon::from_code(3), Icon::Bed);
        assert_eq!(Icon::from_code(42), Icon::Unknown);
        assert_eq!(Icon::from_code(-1), Icon::Unknown);
        for icon in Icon::ALL {
            assert_eq!(Icon::from_code(icon.code().into()), icon);
            assert_eq!(Icon::from_name(icon.as_str()), icon);
        }
    }

    #[test]
    fn test_interface_type_table() {
        assert_eq!(InterfaceType::from_name("wifi"), InterfaceType::Wifi);
        assert_eq!(InterfaceType::from_name("eth"), InterfaceType::Ethernet);
        assert_eq!(InterfaceType::Ethernet.as_str(), "ethernet");
        assert_eq!(InterfaceType::from_name("token-ring"), InterfaceType::Unknown);
        assert_eq!(InterfaceType::from_code(7), InterfaceType::Unknown);
    }

    #[test]
    fn test_interface_defaults_from_json() {
        let iface: Interface =
            serde_json::from_str(r#"{"mac":"00:11:22:33:44:55","type":"bogus"}"#).unwrap();
        assert_eq!(iface.name, "Unknown");
        assert_eq!(iface.kind, InterfaceType::Unknown);
        assert_eq!(iface.ipv4_address, None);

        let mut blank = Interface::new("00:11:22:33:44:55");
        blank.name = String::new();
        assert_eq!(blank.effective_name(), "Unknown");
    }

    #[test]
    fn test_device_json_shape() {
        let mut desc = DeviceDesc::new("01:23:45:67:89:ab", "Living room", 8080);
        desc.icon = Icon::Living;
        let device = Device {
            desc,
            last_update: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            interfaces: vec![Interface::new("01:23:45:67:89:ab")],
        };

        let json = serde_json::to_value(&device).unwrap();
        assert_eq!(json["serial"], "01:23:45:67:89:ab");
        assert_eq!(json["icon"], "living");
        assert_eq!(json["last_update"], 1_700_000_000);
        assert_eq!(json["ifaces"][0]["type"], "unknown");
        assert!(json.get("description").is_none());
        assert!(json.get("https_port").is_none());
        assert!(json["ifaces"][0].get("ipv4").is_none());

        let back: Device = serde_json::from_value(json).unwrap();
        assert_eq!(back, device);
    }

    #[test]
    fn test_desc_ignores_interface_list() {
        let desc: DeviceDesc = serde_json::from_str(
            r#"{"serial":"s","name":"n","http_port":80,"icon":"attic","ifaces":[]}"#,
        )
        .unwrap();
        assert_eq!(desc.icon, Icon::Unknown);
        assert!(!desc.online);
    }
}
