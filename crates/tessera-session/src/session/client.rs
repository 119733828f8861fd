//! Client network origin and fingerprint observed on a request.

use axum::{
    extract::ConnectInfo,
    http::{header, HeaderMap, Request},
};
use std::net::SocketAddr;

/// What the continuity check binds a session to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    pub fn new(ip: Option<&str>, user_agent: Option<&str>) -> Self {
        Self {
            ip: ip.map(String::from),
            user_agent: user_agent.map(String::from),
        }
    }

    /// Read the client IP and user-agent from a request.
    ///
    /// The IP comes from the connection unless `trust_proxy` is set, in which
    /// case `X-Forwarded-For` (first hop) and then `X-Real-IP` take precedence.
    pub fn from_request<B>(req: &Request<B>, trust_proxy: bool) -> Self {
        let headers = req.headers();

        let proxied = if trust_proxy {
            forwarded_ip(headers)
        } else {
            None
        };

        let ip = proxied.or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        });

        let user_agent = headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        Self { ip, user_agent }
    }
}

fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|s| s.trim().to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request() -> axum::http::request::Builder {
        Request::builder().uri("/")
    }

    #[test]
    fn test_reads_connection_ip_and_user_agent() {
        let mut req = request()
            .header("User-Agent", "curl/8.0")
            .header("X-Forwarded-For", "203.0.113.9")
            .body(Body::empty())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 1], 4000))));

        let client = ClientInfo::from_request(&req, false);
        assert_eq!(client.ip.as_deref(), Some("10.0.0.1"));
        assert_eq!(client.user_agent.as_deref(), Some("curl/8.0"));
    }

    #[test]
    fn test_trusts_proxy_headers_when_enabled() {
        let mut req = request()
            .header("X-Forwarded-For", "203.0.113.9, 10.0.0.2")
            .body(Body::empty())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 1], 4000))));
        assert_eq!(
            ClientInfo::from_request(&req, true).ip.as_deref(),
            Some("203.0.113.9")
        );

        let req = request()
            .header("X-Real-IP", "198.51.100.4")
            .body(Body::empty())
            .unwrap();
        assert_eq!(
            ClientInfo::from_request(&req, true).ip.as_deref(),
            Some("198.51.100.4")
        );
    }

    #[test]
    fn test_missing_everything() {
        let req = request().body(Body::empty()).unwrap();
        assert_eq!(ClientInfo::from_request(&req, true), ClientInfo::default());
    }
}
