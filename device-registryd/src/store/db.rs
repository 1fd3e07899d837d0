use std::net::IpAddr;
use std::path::Path;
use anyhow::Context;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use shared::address::{
    integer_to_mac, ipv4_from_sql, ipv4_to_sql, ipv6_from_sql, ipv6_to_sql, mac_to_integer,
    mac_to_integer_lenient, scope_to_sql,
};
use shared::types::{Device, DeviceDesc, Icon, Interface, InterfaceType};
use super::error::{Result, StoreError};
use super::schema;

/// How strictly interface addresses are parsed before they are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressPolicy {
    /// Malformed addresses are rejected.
    Strict,
    /// Deprecated API: a malformed MAC becomes 0 and a malformed IP is dropped.
    Lenient,
}

/// Devices and their interfaces, each device scoped by the IP that registered it.
pub struct DeviceDb {
    conn: Connection,
}

impl DeviceDb {
    /// Open or create the SQLite database with WAL mode and foreign keys enabled
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        // Interface rows only go away with their device when foreign keys are on
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .context("Failed to configure database")?;

        schema::initialize(&conn).context("Failed to initialize database schema")?;

        Ok(Self { conn })
    }

    /// All devices registered from `ip`, each with its interfaces.
    ///
    /// Rows that fail to decode are logged and skipped, as are the
    /// interfaces of a device whose interface query fails.
    pub fn list(&self, ip: IpAddr) -> Result<Vec<Device>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, serial, name, description, icon, location,
                    http_port, https_port, online, last_update
             FROM device WHERE ip = ?1 ORDER BY id",
        )?;

        let rows = stmt.query_map(params![scope_to_sql(ip)], Self::row_to_device)?;

        let mut devices = Vec::new();
        for row in rows {
            let (id, mut device) = match row {
                Ok(row) => row,
                Err(e) => {
                    tracing::error!(%ip, "Failed to read device row: {}", e);
                    continue;
                }
            };
            device.interfaces = self.interfaces(id).unwrap_or_else(|e| {
                tracing::error!(%ip, serial = %device.desc.serial, "Failed to list interfaces: {}", e);
                Vec::new()
            });
            devices.push(device);
        }

        Ok(devices)
    }

    fn interfaces(&self, device_id: i64) -> Result<Vec<Interface>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT type, name, mac, ipv4, ipv6
             FROM device_iface WHERE device_id = ?1 ORDER BY id",
        )?;

        let interfaces = stmt
            .query_map(params![device_id], Self::row_to_interface)?
            .filter_map(|row| {
                row.map_err(|e| tracing::error!(device_id, "Failed to read interface row: {}", e))
                    .ok()
            })
            .collect();

        Ok(interfaces)
    }

    /// Insert the device, or overwrite every mutable field of the existing
    /// `(ip, serial)` row. Interfaces are left untouched.
    pub fn add(&self, ip: IpAddr, desc: &DeviceDesc) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO device (
                ip, serial, name, description, icon, location,
                http_port, https_port, online, last_update
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(serial, ip) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                icon = excluded.icon,
                location = excluded.location,
                http_port = excluded.http_port,
                https_port = excluded.https_port,
                online = excluded.online,
                last_update = excluded.last_update
            "#,
            params![
                scope_to_sql(ip),
                &desc.serial,
                &desc.name,
                &desc.description,
                desc.icon.code(),
                &desc.location,
                desc.http_port,
                desc.https_port,
                desc.online,
                now(),
            ],
        )?;
        Ok(())
    }

    /// Delete the device; its interfaces go with it.
    pub fn remove(&self, ip: IpAddr, serial: &str) -> Result<()> {
        let count = self.conn.execute(
            "DELETE FROM device WHERE ip = ?1 AND serial = ?2",
            params![scope_to_sql(ip), serial],
        )?;

        if count != 1 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Set the online flag and refresh `last_update`.
    ///
    /// Succeeds even when no device matched, unlike [`DeviceDb::remove`].
    pub fn update_status(&self, ip: IpAddr, serial: &str, online: bool) -> Result<()> {
        let count = set_status(&self.conn, &scope_to_sql(ip), serial, online)?;
        if count == 0 {
            tracing::debug!(%ip, serial, "Status update matched no device");
        }
        Ok(())
    }

    /// Insert or update the interface keyed by `(device, mac)` and mark the
    /// device online. Fails with [`StoreError::NotFound`] if the device
    /// is not registered from `ip`.
    pub fn add_address(
        &self,
        ip: IpAddr,
        serial: &str,
        iface: &Interface,
        policy: AddressPolicy,
    ) -> Result<()> {
        let (mac, ipv4, ipv6) = match policy {
            AddressPolicy::Strict => (
                mac_to_integer(&iface.mac_address)?,
                ipv4_to_sql(iface.ipv4_address.as_deref())?,
                ipv6_to_sql(iface.ipv6_address.as_deref())?,
            ),
            AddressPolicy::Lenient => (
                mac_to_integer_lenient(&iface.mac_address),
                ipv4_to_sql(iface.ipv4_address.as_deref()).unwrap_or_else(|e| {
                    tracing::warn!(serial, "Dropping address: {}", e);
                    None
                }),
                ipv6_to_sql(iface.ipv6_address.as_deref()).unwrap_or_else(|e| {
                    tracing::warn!(serial, "Dropping address: {}", e);
                    None
                }),
            ),
        };
        let scope = scope_to_sql(ip);

        let tx = self.conn.unchecked_transaction()?;
        let count = tx.execute(
            r#"
            INSERT INTO device_iface (device_id, mac, type, name, ipv4, ipv6)
            SELECT id, ?1, ?2, ?3, ?4, ?5
            FROM device WHERE ip = ?6 AND serial = ?7
            ON CONFLICT(device_id, mac) DO UPDATE SET
                type = excluded.type,
                name = excluded.name,
                ipv4 = excluded.ipv4,
                ipv6 = excluded.ipv6
            "#,
            params![
                mac as i64,
                iface.kind.code(),
                iface.effective_name(),
                ipv4,
                ipv6.map(|octets| octets.to_vec()),
                &scope,
                serial,
            ],
        )?;

        if count == 0 {
            return Err(StoreError::NotFound);
        }

        set_status(&tx, &scope, serial, true)?;
        tx.commit()?;
        Ok(())
    }

    /// Delete one interface of the device and mark the device online.
    pub fn remove_address(
        &self,
        ip: IpAddr,
        serial: &str,
        mac: &str,
        policy: AddressPolicy,
    ) -> Result<()> {
        let mac = match policy {
            AddressPolicy::Strict => mac_to_integer(mac)?,
            AddressPolicy::Lenient => mac_to_integer_lenient(mac),
        };
        let scope = scope_to_sql(ip);

        let tx = self.conn.unchecked_transaction()?;
        let count = tx.execute(
            "DELETE FROM device_iface
             WHERE device_id IN (SELECT id FROM device WHERE ip = ?1 AND serial = ?2)
               AND mac = ?3",
            params![&scope, serial, mac as i64],
        )?;

        if count != 1 {
            return Err(StoreError::NotFound);
        }

        set_status(&tx, &scope, serial, true)?;
        tx.commit()?;
        Ok(())
    }

    fn row_to_device(row: &rusqlite::Row) -> Result<(i64, Device), rusqlite::Error> {
        let last_update: i64 = row.get(9)?;
        let last_update = DateTime::<Utc>::from_timestamp(last_update, 0)
            .ok_or(rusqlite::Error::IntegralValueOutOfRange(9, last_update))?;

        let desc = DeviceDesc {
            serial: row.get(1)?,
            name: row.get(2)?,
            description: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            icon: Icon::from_code(row.get(4)?),
            location: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
            http_port: row.get(6)?,
            https_port: row.get(7)?,
            online: row.get(8)?,
        };

        Ok((
            row.get(0)?,
            Device {
                desc,
                last_update,
                interfaces: Vec::new(),
            },
        ))
    }

    fn row_to_interface(row: &rusqlite::Row) -> Result<Interface, rusqlite::Error> {
        let mac: i64 = row.get(2)?;
        let ipv4: Option<u32> = row.get(3)?;
        let ipv6: Option<Vec<u8>> = row.get(4)?;

        Ok(Interface {
            kind: InterfaceType::from_code(row.get(0)?),
            name: row.get(1)?,
            mac_address: integer_to_mac(mac as u64),
            ipv4_address: ipv4_from_sql(ipv4),
            ipv6_address: ipv6_from_sql(ipv6.as_deref()),
        })
    }
}

fn set_status(conn: &Connection, scope: &[u8], serial: &str, online: bool) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE device SET online = ?1, last_update = ?2 WHERE ip = ?3 AND serial = ?4",
        params![online, now(), scope, serial],
    )
}

fn now() -> i64 {
    Utc::now().timestamp()
}
