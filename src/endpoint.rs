//! Endpoint Module
//!
//! Parses the target WebSocket URI once per run and resolves the port from the
//! scheme default when the URI does not carry one.

use std::fmt;
use thiserror::Error;
use tokio_tungstenite::tungstenite::http::uri::{InvalidUri, Uri};

const DEFAULT_HOST: &str = "127.0.0.1";

/// Endpoint error types
#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("Only WS(S) is supported.")]
    UnsupportedScheme(String),

    #[error("Invalid endpoint URI '{uri}': {source}")]
    Invalid {
        uri: String,
        #[source]
        source: InvalidUri,
    },
}

/// Supported WebSocket schemes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Ws,
    Wss,
}

impl Scheme {
    /// Port used when the URI has none
    pub fn default_port(self) -> u16 {
        match self {
            Scheme::Ws => 80,
            Scheme::Wss => 443,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Ws => "ws",
            Scheme::Wss => "wss",
        }
    }
}

/// Immutable connection target for a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    scheme: Scheme,
    host: String,
    port: u16,
    path: String,
}

impl Endpoint {
    /// Parse a `ws://` or `wss://` URI.
    ///
    /// The scheme is matched case-insensitively and defaults to `ws` when absent.
    pub fn parse(input: &str) -> Result<Self, EndpointError> {
        let input = input.trim();
        let normalized = if input.contains("://") {
            input.to_string()
        } else {
            format!("ws://{}", input)
        };

        let uri: Uri = normalized.parse().map_err(|source| EndpointError::Invalid {
            uri: input.to_string(),
            source,
        })?;

        let scheme = match uri.scheme_str() {
            Some(s) if s.eq_ignore_ascii_case("ws") => Scheme::Ws,
            Some(s) if s.eq_ignore_ascii_case("wss") => Scheme::Wss,
            Some(other) => return Err(EndpointError::UnsupportedScheme(other.to_string())),
            None => Scheme::Ws,
        };

        let host = match uri.host() {
            Some(h) if !h.is_empty() => h.to_string(),
            _ => DEFAULT_HOST.to_string(),
        };

        let port = uri.port_u16().unwrap_or_else(|| scheme.default_port());

        let path = uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .filter(|pq| !pq.is_empty())
            .unwrap_or("/")
            .to_string();

        Ok(Self { scheme, host, port, path })
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn is_secure(&self) -> bool {
        self.scheme == Scheme::Wss
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Host name presented to TLS, without IPv6 brackets
    pub fn tls_domain(&self) -> &str {
        self.host.trim_start_matches('[').trim_end_matches(']')
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Path plus query, always starting with `/`
    pub fn path(&self) -> &str {
        &self.path
    }

    /// `host:port` address for the TCP connect
    pub fn authority(&self) -> String {
        let domain = self.tls_domain();
        if domain.contains(':') {
            format!("[{}]:{}", domain, self.port)
        } else {
            format!("{}:{}", domain, self.port)
        }
    }

    /// Normalized URL used as the handshake request target.
    ///
    /// The scheme default port is left out so the `Host` header carries the bare host.
    pub fn url(&self) -> String {
        if self.port == self.scheme.default_port() {
            let domain = self.tls_domain();
            let host = if domain.contains(':') {
                format!("[{}]", domain)
            } else {
                domain.to_string()
            };
            format!("{}://{}{}", self.scheme.as_str(), host, self.path)
        } else {
            format!("{}://{}{}", self.scheme.as_str(), self.authority(), self.path)
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_url() {
        let endpoint = Endpoint::parse("ws://127.0.0.1:8080/websocket").unwrap();
        assert_eq!(endpoint.scheme(), Scheme::Ws);
        assert_eq!(endpoint.host(), "127.0.0.1");
        assert_eq!(endpoint.port(), 8080);
        assert_eq!(endpoint.path(), "/websocket");
        assert!(!endpoint.is_secure());
    }

    #[test]
    fn test_scheme_default_ports() {
        assert_eq!(Endpoint::parse("ws://example.com/").unwrap().port(), 80);
        assert_eq!(Endpoint::parse("wss://example.com/").unwrap().port(), 443);
    }

    #[test]
    fn test_scheme_case_insensitive() {
        let endpoint = Endpoint::parse("WSS://example.com/chat").unwrap();
        assert!(endpoint.is_secure());
        assert_eq!(endpoint.url(), "wss://example.com/chat");
    }

    #[test]
    fn test_missing_scheme_is_ws() {
        let endpoint = Endpoint::parse("localhost:9000/ws").unwrap();
        assert_eq!(endpoint.scheme(), Scheme::Ws);
        assert_eq!(endpoint.port(), 9000);
    }

    #[test]
    fn test_missing_path_is_root() {
        assert_eq!(Endpoint::parse("ws://example.com").unwrap().path(), "/");
    }

    #[test]
    fn test_query_is_kept() {
        let endpoint = Endpoint::parse("ws://example.com/feed?token=abc").unwrap();
        assert_eq!(endpoint.path(), "/feed?token=abc");
    }

    #[test]
    fn test_unsupported_scheme() {
        let err = Endpoint::parse("ftp://host/path").unwrap_err();
        assert!(matches!(err, EndpointError::UnsupportedScheme(ref s) if s == "ftp"));
        assert_eq!(err.to_string(), "Only WS(S) is supported.");
    }

    #[test]
    fn test_url_omits_only_default_port() {
        let endpoint = Endpoint::parse("ws://example.com/x").unwrap();
        assert_eq!(endpoint.url(), "ws://example.com/x");
        assert_eq!(endpoint.authority(), "example.com:80");

        let endpoint = Endpoint::parse("wss://example.com:80/x").unwrap();
        assert_eq!(endpoint.url(), "wss://example.com:80/x");
    }

    #[test]
    fn test_ipv6_tls_domain() {
        let endpoint = Endpoint::parse("wss://[::1]:8443/").unwrap();
        assert_eq!(endpoint.authority(), "[::1]:8443");
        assert_eq!(endpoint.tls_domain(), "::1");
    }
}
