pub mod address;
pub mod legacy;
pub mod protocol;
pub mod response;
pub mod types;
