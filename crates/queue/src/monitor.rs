use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::QueueError;
use crate::jolokia::{DEFAULT_BROKER_NAME, JolokiaClient, QueueDepthSource};

/// Default depth above which a queue is considered too large.
pub const DEFAULT_MAX_QUEUE_SIZE: u64 = 100;

/// Signal that downstream work is piling up.
#[async_trait]
pub trait Backpressure: Send + Sync {
    /// `true` when callers should hold off sending more work.
    async fn queue_size_too_large(&self) -> bool;
}

/// Connection and threshold settings for a [`QueueMonitor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMonitorConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub queue_names: Vec<String>,
    pub max_queue_size: u64,
    pub broker_name: String,
    /// Per-request timeout for depth queries.
    pub timeout: Option<Duration>,
}

impl QueueMonitorConfig {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: password.into(),
            queue_names: Vec::new(),
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            broker_name: DEFAULT_BROKER_NAME.to_owned(),
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_queue(mut self, name: impl Into<String>) -> Self {
        self.queue_names.push(name.into());
        self
    }

    #[must_use]
    pub fn with_max_queue_size(mut self, max: u64) -> Self {
        self.max_queue_size = max;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Compares broker queue depths against a threshold.
pub struct QueueMonitor {
    source: Arc<dyn QueueDepthSource>,
    queue_names: Vec<String>,
    max_queue_size: u64,
}

impl std::fmt::Debug for QueueMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueMonitor")
            .field("queue_names", &self.queue_names)
            .field("max_queue_size", &self.max_queue_size)
            .finish_non_exhaustive()
    }
}

impl QueueMonitor {
    pub fn new(
        source: Arc<dyn QueueDepthSource>,
        queue_names: Vec<String>,
        max_queue_size: u64,
    ) -> Self {
        Self {
            source,
            queue_names,
            max_queue_size,
        }
    }

    /// Build a monitor backed by the broker's Jolokia endpoint.
    pub fn from_config(config: &QueueMonitorConfig) -> Result<Self, QueueError> {
        let client = JolokiaClient::new(
            &config.host,
            &config.username,
            &config.password,
            config.timeout,
        )?
        .with_broker_name(&config.broker_name);
        Ok(Self::new(
            Arc::new(client),
            config.queue_names.clone(),
            config.max_queue_size,
        ))
    }

    pub fn queue_names(&self) -> &[String] {
        &self.queue_names
    }

    pub fn max_queue_size(&self) -> u64 {
        self.max_queue_size
    }

    /// Current depth of one queue.
    pub async fn queue_size(&self, queue: &str) -> Result<u64, QueueError> {
        self.source.queue_size(queue).await
    }

    /// Depths of every configured queue, in configuration order.
    pub async fn queue_sizes(&self) -> Result<Vec<(String, u64)>, QueueError> {
        let mut sizes = Vec::with_capacity(self.queue_names.len());
        for name in &self.queue_names {
            sizes.push((name.clone(), self.source.queue_size(name).await?));
        }
        Ok(sizes)
    }

    /// `true` as soon as one queue is deeper than the maximum.
    ///
    /// Queues are checked in order and checking stops at the first one over
    /// the limit. Errors are returned as-is.
    pub async fn try_queue_size_too_large(&self) -> Result<bool, QueueError> {
        for name in &self.queue_names {
            let size = self.source.queue_size(name).await?;
            if size > self.max_queue_size {
                debug!(queue = %name, size, max = self.max_queue_size, "queue over limit");
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[async_trait]
impl Backpressure for QueueMonitor {
    /// Like [`QueueMonitor::try_queue_size_too_large`], except that a queue
    /// whose depth cannot be read is logged and skipped.
    async fn queue_size_too_large(&self) -> bool {
        for name in &self.queue_names {
            match self.source.queue_size(name).await {
                Ok(size) if size > self.max_queue_size => {
                    debug!(queue = %name, size, max = self.max_queue_size, "queue over limit");
                    return true;
                }
                Ok(_) => {}
                Err(e) => warn!(queue = %name, error = %e, "could not read queue size"),
            }
        }
        false
    }
}
