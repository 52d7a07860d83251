use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::QueueError;

/// Characters escaped in the MBean part of a Jolokia read path.
const MBEAN: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Default ActiveMQ broker name.
pub const DEFAULT_BROKER_NAME: &str = "localhost";

/// Source of current queue depths.
#[async_trait]
pub trait QueueDepthSource: Send + Sync {
    /// Number of messages currently waiting in `queue`.
    async fn queue_size(&self, queue: &str) -> Result<u64, QueueError>;
}

/// Queries ActiveMQ through its Jolokia REST endpoint.
#[derive(Clone)]
pub struct JolokiaClient {
    client: Client,
    base_url: String,
    broker_name: String,
    username: String,
    password: String,
}

impl fmt::Debug for JolokiaClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JolokiaClient")
            .field("base_url", &self.base_url)
            .field("broker_name", &self.broker_name)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct ReadReply {
    status: u16,
    #[serde(default)]
    value: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Escape a path element the way Jolokia expects (`!` and `/`).
fn escape_path_element(value: &str) -> String {
    value.replace('!', "!!").replace('/', "!/")
}

impl JolokiaClient {
    /// Create a client for the broker console at `host`
    /// (e.g. `http://localhost:8161`). Without a `timeout` requests may wait
    /// indefinitely.
    pub fn new(
        host: &str,
        username: impl Into<String>,
        password: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, QueueError> {
        let base_url = host.trim().trim_end_matches('/').to_owned();
        let parsed = Url::parse(&base_url).map_err(|e| QueueError::InvalidUrl {
            url: base_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(QueueError::InvalidUrl {
                url: base_url,
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| QueueError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            broker_name: DEFAULT_BROKER_NAME.to_owned(),
            username: username.into(),
            password: password.into(),
        })
    }

    /// Override the broker name used in the MBean path.
    #[must_use]
    pub fn with_broker_name(mut self, broker_name: impl Into<String>) -> Self {
        self.broker_name = broker_name.into();
        self
    }

    /// URL reading the `QueueSize` attribute of `queue`.
    pub fn queue_size_url(&self, queue: &str) -> String {
        let mbean = format!(
            "org.apache.activemq:type=Broker,brokerName={},destinationType=Queue,destinationName={}",
            escape_path_element(&self.broker_name),
            escape_path_element(queue)
        );
        format!(
            "{}/api/jolokia/read/{}/QueueSize",
            self.base_url,
            utf8_percent_encode(&mbean, MBEAN)
        )
    }
}

#[async_trait]
impl QueueDepthSource for JolokiaClient {
    #[instrument(skip(self))]
    async fn queue_size(&self, queue: &str) -> Result<u64, QueueError> {
        let url = self.queue_size_url(queue);
        let response = self
            .client
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        let http_status = response.status();
        if !http_status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(QueueError::Remote {
                queue: queue.to_owned(),
                status: http_status.as_u16(),
                message,
            });
        }

        let reply: ReadReply = response.json().await?;
        if reply.status != 200 {
            return Err(QueueError::Remote {
                queue: queue.to_owned(),
                status: reply.status,
                message: reply.error.unwrap_or_default(),
            });
        }

        let size = reply
            .value
            .as_ref()
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| QueueError::InvalidReply {
                queue: queue.to_owned(),
                reason: format!("value is {:?}", reply.value),
            })?;

        debug!(size, "queue size");
        Ok(size)
    }
}
