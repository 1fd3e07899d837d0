pub mod client_ip;
pub mod legacy;
pub mod routes;

#[cfg(test)]
pub(crate) mod test_support;
