//! Load Driver Module
//!
//! Opens WebSocket connections one at a time against a single endpoint and
//! waits for each opening handshake before starting the next attempt.
//! Supports both TLS and non-TLS endpoints using tokio-tungstenite.

use crate::config::{ClosePolicy, Config, SummaryFormat};
use crate::endpoint::{Endpoint, EndpointError};
use crate::tracker::{RunSummary, RunTracker};

use futures_util::StreamExt;
use std::fmt;
use std::future::Future;
use std::io::{self, Write};
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_native_tls::TlsConnector;
use tokio_tungstenite::{
    client_async,
    tungstenite::Error as WsError,
    MaybeTlsStream, WebSocketStream,
};

/// Upper bound on waiting for the peer's close frame
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// An established WebSocket connection, plain or TLS
pub type WsConnection = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Errors that stop the driver before any attempt is made
#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),
}

/// Where an attempt was when it failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptPhase {
    Connecting,
    Securing,
    Handshaking,
}

impl fmt::Display for AttemptPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptPhase::Connecting => f.write_str("connecting"),
            AttemptPhase::Securing => f.write_str("negotiating TLS"),
            AttemptPhase::Handshaking => f.write_str("handshaking"),
        }
    }
}

/// Underlying cause of a failed attempt
#[derive(Debug, Error)]
pub enum AttemptFailure {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    #[error("timed out")]
    Timeout,
}

/// A single failed connection attempt; the run continues past it
#[derive(Debug, Error)]
#[error("Connection attempt {attempt} failed while {phase}: {source}")]
pub struct AttemptError {
    pub attempt: usize,
    pub phase: AttemptPhase,
    #[source]
    pub source: AttemptFailure,
}

/// Await `fut`, giving up at `deadline` when one is set
async fn within<F, T, E>(deadline: Option<Instant>, fut: F) -> Result<T, AttemptFailure>
where
    F: Future<Output = Result<T, E>>,
    AttemptFailure: From<E>,
{
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, fut)
            .await
            .map_err(|_| AttemptFailure::Timeout)?
            .map_err(AttemptFailure::from),
        None => fut.await.map_err(AttemptFailure::from),
    }
}

/// Build a TLS connector that accepts any certificate and host name.
///
/// Only suitable for benchmarking against test servers.
pub fn insecure_tls_connector() -> Result<TlsConnector, native_tls::Error> {
    let connector = native_tls::TlsConnector::builder()
        .danger_accept_invalid_certs(true)
        .danger_accept_invalid_hostnames(true)
        .build()?;
    Ok(TlsConnector::from(connector))
}

/// Send a close frame and wait briefly for the peer to answer it
async fn close_connection(ws: &mut WsConnection) {
    if let Err(e) = ws.close(None).await {
        log::debug!("Close frame not sent: {}", e);
        return;
    }
    let drain = async {
        while let Some(msg) = ws.next().await {
            if msg.is_err() {
                break;
            }
        }
    };
    if tokio::time::timeout(CLOSE_TIMEOUT, drain).await.is_err() {
        log::debug!("Peer did not answer close within {:?}", CLOSE_TIMEOUT);
    }
}

/// Sequential WebSocket handshake load driver
pub struct LoadDriver {
    endpoint: Endpoint,
    total: usize,
    close_policy: ClosePolicy,
    handshake_timeout: Option<Duration>,
    summary_format: SummaryFormat,
    tls: Option<TlsConnector>,
}

impl LoadDriver {
    /// Parse the endpoint and prepare the TLS context for `wss` targets.
    ///
    /// An unsupported scheme fails here, before any connection is attempted.
    pub fn new(config: &Config) -> Result<Self, DriverError> {
        let endpoint = Endpoint::parse(&config.url)?;
        let tls = if endpoint.is_secure() {
            log::warn!("TLS certificate verification is disabled for {}", endpoint);
            Some(insecure_tls_connector()?)
        } else {
            None
        };

        Ok(Self {
            endpoint,
            total: config.total,
            close_policy: config.close_policy,
            handshake_timeout: config.handshake_timeout(),
            summary_format: config.summary_format,
            tls,
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Run every attempt and print results to stdout
    pub async fn run(&mut self) -> io::Result<RunSummary> {
        self.run_with_output(&mut io::stdout()).await
    }

    /// Run every attempt, writing `Connection#<n>` lines and the summary to `out`.
    ///
    /// Attempts never overlap: each one is awaited to completion before the next.
    pub async fn run_with_output<W: Write>(&mut self, out: &mut W) -> io::Result<RunSummary> {
        log::info!(
            "Opening {} connections to {} (close policy: {})",
            self.total,
            self.endpoint,
            self.close_policy
        );

        let mut tracker = RunTracker::new(self.total);
        let mut retained: Vec<WsConnection> = Vec::new();

        tracker.start();
        for attempt in 1..=self.total {
            match self.attempt(attempt).await {
                Ok(mut ws) => {
                    let count = tracker.record_success();
                    writeln!(out, "Connection#{}", count)?;
                    match self.close_policy {
                        ClosePolicy::PerIteration => close_connection(&mut ws).await,
                        ClosePolicy::AtEnd => retained.push(ws),
                    }
                }
                Err(e) => {
                    tracker.record_failure();
                    log::error!("{}", e);
                }
            }
        }
        let summary = tracker.finish();

        if !retained.is_empty() {
            log::info!("Closing {} retained connections", retained.len());
            for ws in retained.iter_mut() {
                close_connection(ws).await;
            }
        }

        match self.summary_format {
            SummaryFormat::Text => summary.write_text(out)?,
            SummaryFormat::Json => summary.write_json(out)?,
        }
        out.flush()?;

        Ok(summary)
    }

    /// Connect, negotiate TLS when the endpoint is secure, then perform the
    /// opening handshake. Everything acquired here is dropped on failure.
    pub async fn attempt(&self, attempt: usize) -> Result<WsConnection, AttemptError> {
        let deadline = self.handshake_timeout.map(|t| Instant::now() + t);
        let fail = |phase: AttemptPhase| move |source: AttemptFailure| AttemptError {
            attempt,
            phase,
            source,
        };

        log::debug!("Attempt {}: connecting to {}", attempt, self.endpoint.authority());
        let tcp = within(deadline, TcpStream::connect(self.endpoint.authority()))
            .await
            .map_err(fail(AttemptPhase::Connecting))?;

        let stream = match &self.tls {
            Some(tls) => {
                log::debug!("Attempt {}: negotiating TLS", attempt);
                let tls_stream = within(deadline, tls.connect(self.endpoint.tls_domain(), tcp))
                    .await
                    .map_err(fail(AttemptPhase::Securing))?;
                MaybeTlsStream::NativeTls(tls_stream)
            }
            None => MaybeTlsStream::Plain(tcp),
        };

        log::debug!("Attempt {}: handshaking", attempt);
        // Plain version 13 upgrade: no Sec-WebSocket-Extensions offer, so
        // permessage-deflate is never negotiated.
        let (ws, response) = within(deadline, client_async(self.endpoint.url(), stream))
            .await
            .map_err(fail(AttemptPhase::Handshaking))?;
        log::debug!("Attempt {}: upgraded ({})", attempt, response.status());

        Ok(ws)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(url: &str) -> Config {
        Config {
            url: url.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_plain_endpoint_has_no_tls() {
        let driver = LoadDriver::new(&config_for("ws://127.0.0.1:8080/websocket")).unwrap();
        assert!(driver.tls.is_none());
        assert_eq!(driver.total, 6000);
    }

    #[test]
    fn test_secure_endpoint_builds_tls() {
        let driver = LoadDriver::new(&config_for("wss://example.com/chat")).unwrap();
        assert!(driver.tls.is_some());
        assert_eq!(driver.endpoint().port(), 443);
    }

    #[test]
    fn test_unsupported_scheme_is_fatal() {
        let err = LoadDriver::new(&config_for("ftp://host/path")).err().unwrap();
        assert!(matches!(err, DriverError::Endpoint(EndpointError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_attempt_error_names_phase() {
        let err = AttemptError {
            attempt: 7,
            phase: AttemptPhase::Handshaking,
            source: AttemptFailure::Timeout,
        };
        assert_eq!(
            err.to_string(),
            "Connection attempt 7 failed while handshaking: timed out"
        );
    }
}
