//! Deprecated `/discover` API on top of [`DeviceStore`].
//!
//! One action per call, one interface per action, and only the fields old
//! clients understand. All persistence goes through the store.

use std::net::IpAddr;
use serde::Deserialize;
use thiserror::Error;
use shared::legacy::{LegacyAction, LegacyDevice};
use shared::types::{DeviceDesc, Interface};
use crate::store::{AddressPolicy, DeviceStore, StoreError};

/// Query parameters of `GET /discover`
#[derive(Debug, Default, Deserialize)]
pub struct LegacyQuery {
    pub action: Option<String>,
    pub serial: Option<String>,
    pub name: Option<String>,
    pub port: Option<String>,
    pub hw_address: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Error)]
pub enum LegacyError {
    #[error("required query parameter {name:?} is missing")]
    MissingParameter { name: &'static str, value: String },

    #[error("Action '{0}' not supported")]
    InvalidAction(String),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    Internal(&'static str),
}

#[derive(Debug, PartialEq)]
pub enum LegacyResponse {
    Devices(Vec<LegacyDevice>),
    Done,
}

fn required<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, LegacyError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(LegacyError::MissingParameter {
            name,
            value: value.clone().unwrap_or_default(),
        }),
    }
}

/// A zero or unparseable port counts as missing.
fn required_port(value: &Option<String>) -> Result<u16, LegacyError> {
    required(value, "port")?
        .parse::<u16>()
        .ok()
        .filter(|port| *port != 0)
        .ok_or_else(|| LegacyError::MissingParameter {
            name: "port",
            value: value.clone().unwrap_or_default(),
        })
}

#[derive(Clone)]
pub struct LegacyAdapter {
    store: DeviceStore,
}

impl LegacyAdapter {
    pub fn new(store: DeviceStore) -> Self {
        Self { store }
    }

    /// Dispatch one `/discover` call for the caller at `ip`
    pub async fn handle(&self, ip: IpAddr, query: &LegacyQuery) -> Result<LegacyResponse, LegacyError> {
        let action = required(&query.action, "action")?;
        let action = LegacyAction::parse(action)
            .ok_or_else(|| LegacyError::InvalidAction(action.to_string()))?;

        match action {
            LegacyAction::List => return Ok(LegacyResponse::Devices(self.list(ip).await)),
            LegacyAction::AddDevice => {
                let serial = required(&query.serial, "serial")?;
                let name = required(&query.name, "name")?;
                let port = required_port(&query.port)?;
                self.add_device(ip, serial, name, port).await?;
            }
            LegacyAction::RemoveDevice => {
                let serial = required(&query.serial, "serial")?;
                self.remove_device(ip, serial).await?;
            }
            LegacyAction::AddAddress => {
                let serial = required(&query.serial, "serial")?;
                let hw_address = required(&query.hw_address, "hw_address")?;
                let address = required(&query.address, "address")?;
                self.add_address(ip, serial, hw_address, address).await?;
            }
            LegacyAction::RemoveAddress => {
                let serial = required(&query.serial, "serial")?;
                let hw_address = required(&query.hw_address, "hw_address")?;
                self.remove_address(ip, serial, hw_address).await?;
            }
        }

        Ok(LegacyResponse::Done)
    }

    pub async fn list(&self, ip: IpAddr) -> Vec<LegacyDevice> {
        self.store
            .list(ip)
            .await
            .iter()
            .map(LegacyDevice::from)
            .collect()
    }

    /// Upserts a device built from the three legacy fields only, so icon,
    /// description, location and HTTPS port fall back to defaults.
    pub async fn add_device(&self, ip: IpAddr, serial: &str, name: &str, port: u16) -> Result<(), LegacyError> {
        self.store
            .add(ip, DeviceDesc::new(serial, name, port))
            .await
            .map_err(|_| LegacyError::Internal("failed to add device"))
    }

    pub async fn remove_device(&self, ip: IpAddr, serial: &str) -> Result<(), LegacyError> {
        self.store
            .remove(ip, serial.to_string())
            .await
            .map_err(|e| match e {
                StoreError::NotFound => LegacyError::NotFound("device not found"),
                _ => LegacyError::Internal("failed to remove device"),
            })
    }

    pub async fn add_address(
        &self,
        ip: IpAddr,
        serial: &str,
        hw_address: &str,
        address: &str,
    ) -> Result<(), LegacyError> {
        let iface = Interface {
            ipv4_address: Some(address.to_string()),
            ..Interface::new(hw_address)
        };
        self.store
            .add_address(ip, serial.to_string(), iface, AddressPolicy::Lenient)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => LegacyError::NotFound("device not found"),
                _ => LegacyError::Internal("failed to add address"),
            })
    }

    pub async fn remove_address(&self, ip: IpAddr, serial: &str, hw_address: &str) -> Result<(), LegacyError> {
        self.store
            .remove_address(
                ip,
                serial.to_string(),
                hw_address.to_string(),
                AddressPolicy::Lenient,
            )
            .await
            .map_err(|e| match e {
                StoreError::NotFound => LegacyError::NotFound("address not found"),
                _ => LegacyError::Internal("failed to remove address"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::types::Icon;
    use crate::store::DeviceDb;

    const SERIAL: &str = "01:23:45:67:89:ab";

    fn adapter() -> (DeviceStore, LegacyAdapter) {
        let store = DeviceStore::spawn(DeviceDb::open(":memory:").unwrap());
        (store.clone(), LegacyAdapter::new(store))
    }

    fn ip() -> IpAddr {
        "192.168.0.2".parse().unwrap()
    }

    fn query(pairs: &[(&str, &str)]) -> LegacyQuery {
        let mut query = LegacyQuery::default();
        for (key, value) in pairs {
            let value = Some(value.to_string());
            match *key {
                "action" => query.action = value,
                "serial" => query.serial = value,
                "name" => query.name = value,
                "port" => query.port = value,
                "hw_address" => query.hw_address = value,
                "address" => query.address = value,
                other => panic!("unexpected key {other}"),
            }
        }
        query
    }

    #[tokio::test]
    async fn test_device_management() {
        let (_, legacy) = adapter();

        let add = query(&[("action", "add_device"), ("serial", SERIAL), ("name", "test"), ("port", "1234")]);
        assert_eq!(legacy.handle(ip(), &add).await.unwrap(), LegacyResponse::Done);

        let list = legacy.list(ip()).await;
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].name, "test");
        assert_eq!(list[0].port, 1234);

        let update = query(&[("action", "add_device"), ("serial", SERIAL), ("name", "new_test"), ("port", "8080")]);
        legacy.handle(ip(), &update).await.unwrap();
        let list = legacy.list(ip()).await;
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].name, "new_test");
        assert_eq!(list[0].port, 8080);

        let remove = query(&[("action", "remove_device"), ("serial", SERIAL)]);
        legacy.handle(ip(), &remove).await.unwrap();
        assert!(legacy.list(ip()).await.is_empty());
        assert!(matches!(
            legacy.handle(ip(), &remove).await,
            Err(LegacyError::NotFound("device not found"))
        ));
    }

    #[tokio::test]
    async fn test_interface_management() {
        let (_, legacy) = adapter();
        legacy.add_device(ip(), SERIAL, "test", 1234).await.unwrap();

        let add = query(&[
            ("action", "add_address"),
            ("serial", SERIAL),
            ("hw_address", "cd:ef:98:76:54:32"),
            ("address", "192.168.0.20"),
        ]);
        legacy.handle(ip(), &add).await.unwrap();

        let list = legacy.list(ip()).await;
        assert_eq!(list[0].list.len(), 1);
        assert_eq!(list[0].list[0].hw_address, "cd:ef:98:76:54:32");
        assert_eq!(list[0].list[0].address, "192.168.0.20");

        legacy
            .add_address(ip(), SERIAL, "cd:ef:98:76:54:32", "192.168.0.10")
            .await
            .unwrap();
        assert_eq!(legacy.list(ip()).await[0].list[0].address, "192.168.0.10");

        let remove = query(&[("action", "remove_address"), ("serial", SERIAL), ("hw_address", "cd:ef:98:76:54:32")]);
        legacy.handle(ip(), &remove).await.unwrap();
        assert!(legacy.list(ip()).await[0].list.is_empty());
        assert!(matches!(
            legacy.handle(ip(), &remove).await,
            Err(LegacyError::NotFound("address not found"))
        ));
    }

    #[tokio::test]
    async fn test_missing_parameters_are_named() {
        let (_, legacy) = adapter();

        let cases: [(&[(&str, &str)], &str); 6] = [
            (&[], "action"),
            (&[("action", "add_device"), ("name", "x"), ("port", "80")], "serial"),
            (&[("action", "add_device"), ("serial", SERIAL), ("port", "80")], "name"),
            (&[("action", "add_device"), ("serial", SERIAL), ("name", "x"), ("port", "0")], "port"),
            (&[("action", "add_address"), ("serial", SERIAL), ("hw_address", "00:11:22:33:44:55")], "address"),
            (&[("action", "remove_address"), ("serial", SERIAL)], "hw_address"),
        ];

        for (pairs, expected) in cases {
            match legacy.handle(ip(), &query(pairs)).await {
                Err(LegacyError::MissingParameter { name, .. }) => assert_eq!(name, expected),
                other => panic!("expected missing {expected}, got {other:?}"),
            }
        }

        assert!(matches!(
            legacy.handle(ip(), &query(&[("action", "reboot")])).await,
            Err(LegacyError::InvalidAction(action)) if action == "reboot"
        ));
    }

    #[tokio::test]
    async fn test_list_projects_current_devices() {
        let (store, legacy) = adapter();

        store.add(ip(), DeviceDesc::new(SERIAL, "Kitchen", 8080)).await.unwrap();
        let iface = Interface {
            ipv4_address: Some("192.168.1.10".to_string()),
            ipv6_address: Some("fe80::1".to_string()),
            ..Interface::new("00:11:22:33:44:55")
        };
        store
            .add_address(ip(), SERIAL.to_string(), iface, AddressPolicy::Strict)
            .await
            .unwrap();

        let list = legacy.list(ip()).await;
        assert_eq!(list[0].list[0].hw_address, "00:11:22:33:44:55");
        assert_eq!(list[0].list[0].address, "192.168.1.10");
    }

    #[tokio::test]
    async fn test_add_device_resets_enrichment() {
        let (store, legacy) = adapter();

        let mut desc = DeviceDesc::new(SERIAL, "Kitchen", 8080);
        desc.icon = Icon::Kitchen;
        desc.location = "Counter".to_string();
        desc.https_port = 8443;
        store.add(ip(), desc).await.unwrap();

        legacy.add_device(ip(), SERIAL, "Kitchen", 8080).await.unwrap();

        let devices = store.list(ip()).await;
        assert_eq!(devices[0].desc, DeviceDesc::new(SERIAL, "Kitchen", 8080));
    }

    #[tokio::test]
    async fn test_legacy_mac_is_lenient() {
        let (store, legacy) = adapter();
        legacy.add_device(ip(), SERIAL, "test", 80).await.unwrap();

        legacy.add_address(ip(), SERIAL, "bogus", "192.168.0.20").await.unwrap();
        let devices = store.list(ip()).await;
        assert_eq!(devices[0].interfaces[0].mac_address, "00:00:00:00:00:00");
    }
}
