pub mod db;
pub mod error;
pub mod handle;
pub mod schema;

pub use db::{AddressPolicy, DeviceDb};
pub use error::{Result, StoreError};
pub use handle::DeviceStore;
