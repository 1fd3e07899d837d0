use std::net::IpAddr;
use std::thread;
use tokio::sync::{mpsc, oneshot};
use shared::types::{Device, DeviceDesc, Interface};
use super::db::{AddressPolicy, DeviceDb};
use super::error::{Result, StoreError};

/// Commands sent to the store thread
enum StoreCommand {
    List(IpAddr, oneshot::Sender<Result<Vec<Device>>>),
    Add(IpAddr, DeviceDesc, oneshot::Sender<Result<()>>),
    Remove(IpAddr, String, oneshot::Sender<Result<()>>),
    UpdateStatus {
        ip: IpAddr,
        serial: String,
        online: bool,
        reply: oneshot::Sender<Result<()>>,
    },
    AddAddress {
        ip: IpAddr,
        serial: String,
        iface: Interface,
        policy: AddressPolicy,
        reply: oneshot::Sender<Result<()>>,
    },
    RemoveAddress {
        ip: IpAddr,
        serial: String,
        mac: String,
        policy: AddressPolicy,
        reply: oneshot::Sender<Result<()>>,
    },
    Shutdown,
}

/// Run `op` unless the requester has already gone away (request aborted),
/// so an abandoned HTTP call never reaches the database.
fn execute<T>(reply: oneshot::Sender<Result<T>>, op: impl FnOnce() -> Result<T>) {
    if reply.is_closed() {
        tracing::debug!("Skipping store command, requester went away");
        return;
    }
    let _ = reply.send(op());
}

/// Handle to the device store thread. Cheap to clone; every call carries
/// the caller's IP explicitly.
#[derive(Clone)]
pub struct DeviceStore {
    tx: mpsc::Sender<StoreCommand>,
}

impl DeviceStore {
    /// Spawn the store thread owning `db`
    pub fn spawn(db: DeviceDb) -> Self {
        let (tx, mut rx) = mpsc::channel::<StoreCommand>(256);

        thread::spawn(move || {
            while let Some(cmd) = rx.blocking_recv() {
                match cmd {
                    StoreCommand::List(ip, reply) => execute(reply, || db.list(ip)),
                    StoreCommand::Add(ip, desc, reply) => execute(reply, || db.add(ip, &desc)),
                    StoreCommand::Remove(ip, serial, reply) => {
                        execute(reply, || db.remove(ip, &serial))
                    }
                    StoreCommand::UpdateStatus { ip, serial, online, reply } => {
                        execute(reply, || db.update_status(ip, &serial, online))
                    }
                    StoreCommand::AddAddress { ip, serial, iface, policy, reply } => {
                        execute(reply, || db.add_address(ip, &serial, &iface, policy))
                    }
                    StoreCommand::RemoveAddress { ip, serial, mac, policy, reply } => {
                        execute(reply, || db.remove_address(ip, &serial, &mac, policy))
                    }
                    StoreCommand::Shutdown => {
                        tracing::info!("Device store thread shutting down");
                        break;
                    }
                }
            }
        });

        Self { tx }
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<Result<T>>) -> StoreCommand,
    ) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(command(reply))
            .await
            .map_err(|_| StoreError::Closed)?;
        rx.await.map_err(|_| StoreError::Closed)?
    }

    /// Devices registered from `ip`. Never fails: callers poll this and
    /// read an empty list as "nothing yet", so errors are logged instead.
    pub async fn list(&self, ip: IpAddr) -> Vec<Device> {
        match self.request(|reply| StoreCommand::List(ip, reply)).await {
            Ok(devices) => devices,
            Err(e) => {
                tracing::error!(%ip, "Failed to list devices: {}", e);
                Vec::new()
            }
        }
    }

    /// Insert or update the device identified by `(ip, desc.serial)`
    pub async fn add(&self, ip: IpAddr, desc: DeviceDesc) -> Result<()> {
        let serial = desc.serial.clone();
        let result = self.request(|reply| StoreCommand::Add(ip, desc, reply)).await;
        log_failure("add device", ip, &serial, &result);
        result
    }

    /// Remove the device and all of its interfaces
    pub async fn remove(&self, ip: IpAddr, serial: String) -> Result<()> {
        let result = self
            .request(|reply| StoreCommand::Remove(ip, serial.clone(), reply))
            .await;
        log_failure("remove device", ip, &serial, &result);
        result
    }

    pub async fn update_status(&self, ip: IpAddr, serial: String, online: bool) -> Result<()> {
        let result = self
            .request(|reply| StoreCommand::UpdateStatus {
                ip,
                serial: serial.clone(),
                online,
                reply,
            })
            .await;
        log_failure("update device status", ip, &serial, &result);
        result
    }

    /// Insert or update an interface; marks the device online
    pub async fn add_address(
        &self,
        ip: IpAddr,
        serial: String,
        iface: Interface,
        policy: AddressPolicy,
    ) -> Result<()> {
        let result = self
            .request(|reply| StoreCommand::AddAddress {
                ip,
                serial: serial.clone(),
                iface,
                policy,
                reply,
            })
            .await;
        log_failure("add interface", ip, &serial, &result);
        result
    }

    /// Remove one interface; marks the device online
    pub async fn remove_address(
        &self,
        ip: IpAddr,
        serial: String,
        mac: String,
        policy: AddressPolicy,
    ) -> Result<()> {
        let result = self
            .request(|reply| StoreCommand::RemoveAddress {
                ip,
                serial: serial.clone(),
                mac,
                policy,
                reply,
            })
            .await;
        log_failure("remove interface", ip, &serial, &result);
        result
    }

    /// Stop the store thread
    pub async fn shutdown(&self) -> Result<()> {
        self.tx
            .send(StoreCommand::Shutdown)
            .await
            .map_err(|_| StoreError::Closed)
    }
}

fn log_failure(operation: &str, ip: IpAddr, serial: &str, result: &Result<()>) {
    match result {
        Ok(()) => {}
        Err(StoreError::NotFound) => {
            tracing::warn!(%ip, serial, "Failed to {}: not found", operation);
        }
        Err(e) => {
            tracing::error!(%ip, serial, "Failed to {}: {}", operation, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> DeviceStore {
        DeviceStore::spawn(DeviceDb::open(":memory:").unwrap())
    }

    #[tokio::test]
    async fn test_round_trip_through_thread() {
        let store = store();
        let ip: IpAddr = "10.0.0.5".parse().unwrap();

        store
            .add(ip, DeviceDesc::new("serial-1", "Kitchen", 8080))
            .await
            .unwrap();
        store
            .add_address(
                ip,
                "serial-1".to_string(),
                Interface::new("00:11:22:33:44:55"),
                AddressPolicy::Strict,
            )
            .await
            .unwrap();

        let devices = store.list(ip).await;
        assert_eq!(devices.len(), 1);
        assert!(devices[0].desc.online);

        store.remove(ip, "serial-1".to_string()).await.unwrap();
        assert!(matches!(
            store.remove(ip, "serial-1".to_string()).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_list_after_shutdown_is_empty() {
        let store = store();
        let ip: IpAddr = "10.0.0.5".parse().unwrap();
        store
            .add(ip, DeviceDesc::new("serial-1", "Kitchen", 8080))
            .await
            .unwrap();

        store.shutdown().await.unwrap();

        assert!(store.list(ip).await.is_empty());
        assert!(matches!(
            store.add(ip, DeviceDesc::new("serial-2", "Bed", 80)).await,
            Err(StoreError::Closed)
        ));
    }
}
