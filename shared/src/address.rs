use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use thiserror::Error;

/// Errors produced while parsing textual addresses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("invalid MAC address: {0:?}")]
    InvalidMac(String),
    #[error("invalid IPv4 address: {0:?}")]
    InvalidIpv4(String),
    #[error("invalid IPv6 address: {0:?}")]
    InvalidIpv6(String),
}

const MAC_MASK: u64 = 0xffff_ffff_ffff;

/// Parse a colon separated MAC address (`xx:xx:xx:xx:xx:xx`) into a 48-bit
/// integer, first octet in the most significant byte.
///
/// Octets may be one or two hex digits in either case.
pub fn mac_to_integer(text: &str) -> Result<u64, AddressError> {
    let invalid = || AddressError::InvalidMac(text.to_string());

    let mut value = 0u64;
    let mut octets = 0;
    for part in text.trim().split(':') {
        if octets == 6
            || part.is_empty()
            || part.len() > 2
            || !part.bytes().all(|b| b.is_ascii_hexdigit())
        {
            return Err(invalid());
        }
        let octet = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        value = (value << 8) | u64::from(octet);
        octets += 1;
    }

    if octets != 6 {
        return Err(invalid());
    }
    Ok(value)
}

/// Legacy clients sent whatever they had; an unparseable MAC maps to 0.
pub fn mac_to_integer_lenient(text: &str) -> u64 {
    mac_to_integer(text).unwrap_or(0)
}

/// Format the low 48 bits of `value` as six lower-hex, zero padded octets.
pub fn integer_to_mac(value: u64) -> String {
    let b = (value & MAC_MASK).to_be_bytes();
    format!(
        "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
        b[2], b[3], b[4], b[5], b[6], b[7]
    )
}

/// Lowercase and zero pad a MAC address.
pub fn normalize_mac(text: &str) -> Result<String, AddressError> {
    mac_to_integer(text).map(integer_to_mac)
}

/// Encode an optional IPv4 address for the `ipv4` column.
/// Empty input is "not set" and encodes to `None`, never to `0.0.0.0`.
pub fn ipv4_to_sql(text: Option<&str>) -> Result<Option<u32>, AddressError> {
    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    text.parse::<Ipv4Addr>()
        .map(|addr| Some(u32::from(addr)))
        .map_err(|_| AddressError::InvalidIpv4(text.to_string()))
}

pub fn ipv4_from_sql(value: Option<u32>) -> Option<String> {
    value.map(|v| Ipv4Addr::from(v).to_string())
}

/// Encode an optional IPv6 address for the `ipv6` column. A trailing
/// `/prefix` is accepted and dropped.
pub fn ipv6_to_sql(text: Option<&str>) -> Result<Option<[u8; 16]>, AddressError> {
    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    let addr = text.split_once('/').map_or(text, |(addr, _)| addr);
    addr.parse::<Ipv6Addr>()
        .map(|addr| Some(addr.octets()))
        .map_err(|_| AddressError::InvalidIpv6(text.to_string()))
}

/// Anything that is not exactly 16 bytes decodes to "not set".
pub fn ipv6_from_sql(value: Option<&[u8]>) -> Option<String> {
    let octets: [u8; 16] = value?.try_into().ok()?;
    Some(Ipv6Addr::from(octets).to_string())
}

/// Storage key for the caller's IP. IPv4-mapped IPv6 addresses collapse to
/// their IPv4 form so one host always lands in one scope.
pub fn scope_to_sql(ip: IpAddr) -> Vec<u8> {
    match ip.to_canonical() {
        IpAddr::V4(v4) => v4.octets().to_vec(),
        IpAddr::V6(v6) => v6.octets().to_vec(),
    }
}
