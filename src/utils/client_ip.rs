//! Client address extraction from proxy headers and socket info.

use axum::extract::ConnectInfo;
use axum::http::{Extensions, HeaderMap};
use std::net::SocketAddr;

/// Address reported when no socket or proxy information is available.
pub const UNKNOWN_IP: &str = "unknown";

/// Resolves the client IP for rate limiting and audit attribution.
///
/// When `behind_proxy` is set, forwarding headers take precedence:
/// `X-Forwarded-For` (first hop) then `X-Real-IP`. Otherwise, and as the
/// final fallback, the peer address recorded by the listener is used.
///
/// Returns [`UNKNOWN_IP`] when nothing is available; callers still get a
/// usable (if shared) rate-limit key.
pub fn client_ip(headers: &HeaderMap, extensions: &Extensions, behind_proxy: bool) -> String {
    if behind_proxy {
        if let Some(forwarded) = header_str(headers, "x-forwarded-for") {
            if let Some(first) = forwarded.split(',').next() {
                let first = first.trim();
                if !first.is_empty() {
                    return first.to_string();
                }
            }
        }

        if let Some(real_ip) = header_str(headers, "x-real-ip") {
            let real_ip = real_ip.trim();
            if !real_ip.is_empty() {
                return real_ip.to_string();
            }
        }
    }

    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_IP.to_string())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn socket_extensions(addr: &str) -> Extensions {
        let mut extensions = Extensions::new();
        let addr: SocketAddr = addr.parse().unwrap();
        extensions.insert(ConnectInfo(addr));
        extensions
    }

    #[test]
    fn test_forwarded_for_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1, 10.0.0.2"),
        );

        let ip = client_ip(&headers, &socket_extensions("127.0.0.1:80"), true);
        assert_eq!(ip, "203.0.113.7");
    }

    #[test]
    fn test_real_ip_used_when_forwarded_for_absent() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.4"));

        let ip = client_ip(&headers, &Extensions::new(), true);
        assert_eq!(ip, "198.51.100.4");
    }

    #[test]
    fn test_socket_address_without_proxy_headers() {
        let headers = HeaderMap::new();

        let ip = client_ip(&headers, &socket_extensions("192.168.1.20:52114"), true);
        assert_eq!(ip, "192.168.1.20");
    }

    #[test]
    fn test_proxy_headers_ignored_when_not_behind_proxy() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7"));

        let ip = client_ip(&headers, &socket_extensions("192.168.1.20:52114"), false);
        assert_eq!(ip, "192.168.1.20");
    }

    #[test]
    fn test_unknown_when_nothing_is_available() {
        let ip = client_ip(&HeaderMap::new(), &Extensions::new(), true);
        assert_eq!(ip, UNKNOWN_IP);
    }

    #[test]
    fn test_empty_forwarded_for_falls_through() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static(""));
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.4"));

        let ip = client_ip(&headers, &Extensions::new(), true);
        assert_eq!(ip, "198.51.100.4");
    }
}
