use std::net::{IpAddr, SocketAddr};
use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap, StatusCode},
};
use super::routes::AppState;

/// The caller's IP, the scope every device operation runs in.
///
/// Taken from the configured trusted proxy header when present, otherwise
/// from the transport peer address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

#[async_trait]
impl FromRequestParts<AppState> for ClientIp {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(ip) = state
            .real_ip_header
            .as_deref()
            .and_then(|header| header_ip(&parts.headers, header))
        {
            return Ok(Self(ip.to_canonical()));
        }

        parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| Self(addr.ip().to_canonical()))
            .ok_or_else(|| {
                tracing::error!("Request without peer address or proxy header");
                (StatusCode::INTERNAL_SERVER_ERROR, "unable to determine client address")
            })
    }
}

/// First comma separated entry of `name` that parses as an IP
/// ("client, proxy1, proxy2" style headers).
fn header_ip(headers: &HeaderMap, name: &str) -> Option<IpAddr> {
    headers
        .get(name)?
        .to_str()
        .ok()?
        .split(',')
        .find_map(|part| part.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_header_ip_takes_first_address() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("10.0.0.5, 172.16.0.1"));
        assert_eq!(
            header_ip(&headers, "X-Forwarded-For"),
            Some("10.0.0.5".parse().unwrap())
        );
    }

    #[test]
    fn test_header_ip_skips_garbage() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("unknown, fd00::1"));
        assert_eq!(header_ip(&headers, "x-real-ip"), Some("fd00::1".parse().unwrap()));
        assert_eq!(header_ip(&headers, "x-other"), None);
    }
}
