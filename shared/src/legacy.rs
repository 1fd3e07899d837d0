//! Wire shapes of the deprecated `/discover` API.
//!
//! Legacy clients only know a flat `address` + `hw_address` pair per
//! interface. These types are a pure projection of [`Device`]; nothing is
//! stored in this shape.

use serde::{Deserialize, Serialize};
use crate::protocol::{
    ACTION_ADD_ADDRESS, ACTION_ADD_DEVICE, ACTION_LIST, ACTION_REMOVE_ADDRESS,
    ACTION_REMOVE_DEVICE,
};
use crate::types::{Device, Interface};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyInterface {
    /// IPv4 address, empty when unset
    pub address: String,
    pub hw_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyDevice {
    pub name: String,
    pub serial: String,
    pub port: u16,
    pub list: Vec<LegacyInterface>,
}

impl From<&Interface> for LegacyInterface {
    fn from(iface: &Interface) -> Self {
        Self {
            address: iface.ipv4_address.clone().unwrap_or_default(),
            hw_address: iface.mac_address.clone(),
        }
    }
}

/// Drops IPv6, interface name and type, icon, description and location.
impl From<&Device> for LegacyDevice {
    fn from(device: &Device) -> Self {
        Self {
            name: device.desc.name.clone(),
            serial: device.desc.serial.clone(),
            port: device.desc.http_port,
            list: device.interfaces.iter().map(LegacyInterface::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyAction {
    List,
    AddDevice,
    RemoveDevice,
    AddAddress,
    RemoveAddress,
}

impl LegacyAction {
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            ACTION_LIST => Some(Self::List),
            ACTION_ADD_DEVICE => Some(Self::AddDevice),
            ACTION_REMOVE_DEVICE => Some(Self::RemoveDevice),
            ACTION_ADD_ADDRESS => Some(Self::AddAddress),
            ACTION_REMOVE_ADDRESS => Some(Self::RemoveAddress),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DeviceDesc, InterfaceType};
    use chrono::Utc;

    #[test]
    fn test_projection_drops_rich_fields() {
        let mut iface = Interface::new("00:11:22:33:44:55");
        iface.kind = InterfaceType::Wifi;
        iface.name = "wlan0".to_string();
        iface.ipv4_address = Some("192.168.1.10".to_string());
        iface.ipv6_address = Some("fe80::1".to_string());

        let device = Device {
            desc: DeviceDesc::new("01:23:45:67:89:ab", "Kitchen", 8080),
            last_update: Utc::now(),
            interfaces: vec![iface, Interface::new("66:77:88:99:aa:bb")],
        };

        let legacy = LegacyDevice::from(&device);
        assert_eq!(legacy.port, 8080);
        assert_eq!(legacy.list[0].address, "192.168.1.10");
        assert_eq!(legacy.list[0].hw_address, "00:11:22:33:44:55");
        assert_eq!(legacy.list[1].address, "");

        let json = serde_json::to_string(&legacy.list[0]).unwrap();
        assert!(!json.contains("fe80"));
    }

    #[test]
    fn test_action_parse() {
        assert_eq!(LegacyAction::parse("remove_address"), Some(LegacyAction::RemoveAddress));
        assert_eq!(LegacyAction::parse("reboot"), None);
    }
}
