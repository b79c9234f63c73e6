//! Bridge endpoint derivation
//!
//! The bridge lives at `/ws/bridge` on the same host as the console page, with
//! the WebSocket scheme mirroring the page scheme (`http` -> `ws`,
//! `https` -> `wss`).

use toolbridge_protocol::BRIDGE_PATH;
use toolbridge_utils::{BridgeError, Result};
use url::Url;

/// Derive the bridge WebSocket URL from a page origin
///
/// Any path, query or fragment on the origin is discarded. `ws`/`wss`
/// origins are accepted as-is.
pub fn bridge_endpoint(origin: &str) -> Result<Url> {
    let parsed = Url::parse(origin.trim())
        .map_err(|e| BridgeError::invalid_endpoint(origin, e.to_string()))?;

    let scheme = match parsed.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(BridgeError::invalid_endpoint(
                origin,
                format!("unsupported scheme '{}'", other),
            ))
        }
    };

    let host = parsed
        .host_str()
        .ok_or_else(|| BridgeError::invalid_endpoint(origin, "missing host"))?;

    // port() is None when the origin uses its scheme's default port, which is
    // also the default for the mirrored ws scheme
    let authority = match parsed.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };

    Url::parse(&format!("{}://{}{}", scheme, authority, BRIDGE_PATH))
        .map_err(|e| BridgeError::invalid_endpoint(origin, e.to_string()))
}

/// Whether the endpoint requires TLS
pub fn is_secure(endpoint: &Url) -> bool {
    endpoint.scheme() == "wss"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_origin() {
        let url = bridge_endpoint("http://127.0.0.1:8000").unwrap();
        assert_eq!(url.as_str(), "ws://127.0.0.1:8000/ws/bridge");
        assert!(!is_secure(&url));
    }

    #[test]
    fn test_https_origin() {
        let url = bridge_endpoint("https://console.example.com").unwrap();
        assert_eq!(url.as_str(), "wss://console.example.com/ws/bridge");
        assert!(is_secure(&url));
    }

    #[test]
    fn test_path_and_query_discarded() {
        let url = bridge_endpoint("http://localhost:5173/projects/3?tab=scripts#top").unwrap();
        assert_eq!(url.as_str(), "ws://localhost:5173/ws/bridge");
    }

    #[test]
    fn test_default_port_dropped() {
        let url = bridge_endpoint("https://example.com:443").unwrap();
        assert_eq!(url.as_str(), "wss://example.com/ws/bridge");
    }

    #[test]
    fn test_ws_schemes_passthrough() {
        assert_eq!(
            bridge_endpoint("ws://host:9000").unwrap().as_str(),
            "ws://host:9000/ws/bridge"
        );
        assert_eq!(
            bridge_endpoint("wss://host").unwrap().as_str(),
            "wss://host/ws/bridge"
        );
    }

    #[test]
    fn test_ipv6_host() {
        let url = bridge_endpoint("http://[::1]:8000").unwrap();
        assert_eq!(url.as_str(), "ws://[::1]:8000/ws/bridge");
    }

    #[test]
    fn test_unsupported_scheme() {
        let err = bridge_endpoint("ftp://host").unwrap_err();
        assert!(matches!(err, BridgeError::InvalidEndpoint { .. }));
        assert!(err.to_string().contains("unsupported scheme 'ftp'"));
    }

    #[test]
    fn test_unparseable_origin() {
        assert!(bridge_endpoint("not a url").is_err());
        assert!(bridge_endpoint("").is_err());
    }
}
