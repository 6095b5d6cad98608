//! Reachability probes.

use crate::error::{ConnectError, ConnectResult};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

/// Header carrying the license key on collector requests.
pub const LICENSE_KEY_HEADER: &str = "X-License-Key";

/// A single "is the endpoint there?" check.
///
/// Implementations perform one attempt and return promptly; retries and
/// timeouts are applied by the caller.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn probe(&self) -> ConnectResult<()>;
}

/// What the agent presents to the collector.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub user_agent: String,
    pub license_key: Option<String>,
}

impl Credentials {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            license_key: None,
        }
    }

    pub fn with_license_key(mut self, license_key: impl Into<String>) -> Self {
        self.license_key = Some(license_key.into());
        self
    }
}

/// Probes the collector with an HTTP `HEAD` request.
///
/// Any HTTP response, whatever its status, proves the endpoint is reachable.
/// Only transport failures count as errors.
pub struct HttpProbe {
    client: Client,
    endpoint: String,
    license_key: Option<String>,
}

impl HttpProbe {
    pub fn new(endpoint: impl Into<String>, credentials: &Credentials) -> ConnectResult<Self> {
        let mut builder = Client::builder();
        if !credentials.user_agent.is_empty() {
            builder = builder.user_agent(credentials.user_agent.clone());
        }
        let client = builder
            .build()
            .map_err(|e| ConnectError::Probe(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            license_key: credentials.license_key.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ReachabilityProbe for HttpProbe {
    async fn probe(&self) -> ConnectResult<()> {
        let mut request = self.client.head(&self.endpoint);
        if let Some(key) = &self.license_key {
            request = request.header(LICENSE_KEY_HEADER, key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ConnectError::Probe(e.to_string()))?;

        debug!(
            endpoint = %self.endpoint,
            status = response.status().as_u16(),
            "Collector endpoint answered"
        );
        Ok(())
    }
}
