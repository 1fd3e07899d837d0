use shared::address::AddressError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no matching device or interface")]
    NotFound,

    #[error(transparent)]
    InvalidAddress(#[from] AddressError),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("device store is not running")]
    Closed,
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
