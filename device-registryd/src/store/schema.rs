use rusqlite::{params, Connection, OptionalExtension};
use super::error::Result;

/// Bump when the device tables change shape. A mismatch recreates them.
pub const DEVICE_SCHEMA_VERSION: u32 = 1;

const DEVICE_TABLES: &str = r#"
    DROP TABLE IF EXISTS device_iface;
    DROP TABLE IF EXISTS device;

    CREATE TABLE device (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        ip          BLOB    NOT NULL,
        serial      TEXT    NOT NULL,
        name        TEXT    NOT NULL,
        description TEXT,
        icon        INTEGER NOT NULL DEFAULT 0,
        location    TEXT,
        http_port   INTEGER NOT NULL,
        https_port  INTEGER NOT NULL DEFAULT 0,
        online      INTEGER NOT NULL DEFAULT 0,
        last_update INTEGER NOT NULL,
        UNIQUE (serial, ip)
    );

    CREATE INDEX idx_device_ip ON device(ip);

    CREATE TABLE device_iface (
        id        INTEGER PRIMARY KEY AUTOINCREMENT,
        device_id INTEGER NOT NULL REFERENCES device(id) ON DELETE CASCADE,
        ipv4      INTEGER,
        ipv6      BLOB,
        mac       INTEGER NOT NULL,
        name      TEXT    NOT NULL DEFAULT 'Unknown',
        type      INTEGER NOT NULL DEFAULT 0,
        UNIQUE (device_id, mac)
    );
"#;

/// Create the version table and (re)create the device tables when their
/// recorded version differs from [`DEVICE_SCHEMA_VERSION`].
pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS version (
            name    TEXT PRIMARY KEY,
            version INTEGER NOT NULL
        );",
    )?;

    let current = table_version(conn, "device")?;
    if current == Some(DEVICE_SCHEMA_VERSION) {
        return Ok(());
    }

    tracing::info!(
        "Recreating device tables: version {} -> {}",
        current.unwrap_or(0),
        DEVICE_SCHEMA_VERSION
    );

    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(DEVICE_TABLES)?;
    set_table_version(&tx, "device", DEVICE_SCHEMA_VERSION)?;
    tx.commit()?;

    Ok(())
}

pub fn table_version(conn: &Connection, name: &str) -> Result<Option<u32>> {
    let version = conn
        .query_row(
            "SELECT version FROM version WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(version)
}

fn set_table_version(conn: &Connection, name: &str, version: u32) -> Result<()> {
    conn.execute(
        "INSERT INTO version (name, version) VALUES (?1, ?2)
         ON CONFLICT(name) DO UPDATE SET version = excluded.version",
        params![name, version],
    )?;
    Ok(())
}
