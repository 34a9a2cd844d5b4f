use std::time::Duration;

use reqwest::{blocking, Client, Response, StatusCode, Url};
use serde::Deserialize;
use tracing::{trace, warn};

use crate::{
    check::{Probe, Snapshot},
    error::{Result, TransportError},
};

/// Request timeout used unless a client or timeout is given.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

/// Issues health requests against other services.
#[derive(Debug, Clone)]
pub struct RemoteChecker {
    client: Client,
    timeout: Option<Duration>,
}

impl RemoteChecker {
    /// Checker with its own client and [`DEFAULT_TIMEOUT`] per request.
    pub fn new() -> Result<Self> {
        let client = Client::builder().build().map_err(TransportError::from)?;
        Ok(Self {
            client,
            timeout: Some(DEFAULT_TIMEOUT),
        })
    }

    /// Use `client` as is, including its own timeout settings.
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            timeout: None,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// True only if `url` answers with exactly 200.
    pub async fn probe_endpoint(&self, url: &str) -> Result<bool> {
        let response = self.get(url).await?;
        Ok(response.status() == StatusCode::OK)
    }

    /// Read the aggregate health from another service's status endpoint.
    pub async fn fetch_health(&self, url: &str) -> Result<bool> {
        let response = self.get(url).await?;
        if response.status() != StatusCode::OK {
            return Ok(false);
        }
        let body = response.bytes().await.map_err(TransportError::from)?;
        decode_health(&body)
    }

    async fn get(&self, url: &str) -> Result<Response, TransportError> {
        let mut request = self.client.get(parse_url(url)?);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().await?;
        trace!("GET {} -> {}", url, response.status());
        Ok(response)
    }
}

/// One-off [`RemoteChecker::probe_endpoint`] with a default checker.
///
/// Every call sets up a new client and connection pool. Keep a
/// [`RemoteChecker`] around when checking repeatedly.
pub async fn probe_endpoint(url: &str) -> Result<bool> {
    RemoteChecker::new()?.probe_endpoint(url).await
}

/// One-off [`RemoteChecker::fetch_health`] with a default checker.
///
/// Same per-call client cost as [`probe_endpoint`].
pub async fn fetch_remote_health(url: &str) -> Result<bool> {
    RemoteChecker::new()?.fetch_health(url).await
}

fn parse_url(url: &str) -> Result<Url, TransportError> {
    Url::parse(url).map_err(|err| TransportError::InvalidUrl {
        url: url.to_owned(),
        reason: err.to_string(),
    })
}

fn decode_health(body: &[u8]) -> Result<bool> {
    let snapshot: Snapshot = serde_json::from_slice(body).map_err(TransportError::from)?;
    Ok(snapshot.healthy)
}

/// What a remote dependency exposes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteKind {
    /// Any endpoint; healthy on 200.
    #[default]
    Endpoint,
    /// Another service's status snapshot; healthy when its aggregate is.
    Service,
}

/// Probe backed by a remote health request.
///
/// Uses a blocking client, which drives its requests on a thread of its
/// own, so a cycle never waits on the async runtime it was started from.
/// Create and call it outside async context (`spawn_blocking` or a plain
/// thread). Transport failures count as unhealthy.
#[derive(Debug)]
pub struct RemoteProbe {
    client: blocking::Client,
    url: String,
    kind: RemoteKind,
}

impl RemoteProbe {
    /// Probe with a client of its own, timing out after `timeout`.
    pub fn new(url: impl Into<String>, kind: RemoteKind, timeout: Duration) -> Result<Self> {
        let client = blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(TransportError::from)?;
        Ok(Self::with_client(client, url, kind))
    }

    /// Probe sharing `client`, e.g. with other probes of the same check.
    pub fn with_client(client: blocking::Client, url: impl Into<String>, kind: RemoteKind) -> Self {
        Self {
            client,
            url: url.into(),
            kind,
        }
    }

    fn check(&self) -> Result<bool> {
        let response = self
            .client
            .get(parse_url(&self.url)?)
            .send()
            .map_err(TransportError::from)?;
        trace!("GET {} -> {}", self.url, response.status());
        if response.status() != StatusCode::OK {
            return Ok(false);
        }
        match self.kind {
            RemoteKind::Endpoint => Ok(true),
            RemoteKind::Service => decode_health(&response.bytes().map_err(TransportError::from)?),
        }
    }
}

impl Probe for RemoteProbe {
    fn probe(&self) -> bool {
        self.check().unwrap_or_else(|err| {
            warn!("Health request to {} failed: {}", self.url, err);
            false
        })
    }
}
