use std::time::Duration;

use tracing::info;

/// Identifiers per batch unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Pause between batches unless configured otherwise.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(30);

/// Extra waits allowed at one batch boundary while the broker is backed up.
pub const DEFAULT_BACKPRESSURE_MAX_WAITS: u32 = 20;

/// How a run is throttled.
///
/// # Examples
///
/// ```
/// use regen_ocr_engine::PacingConfig;
/// use std::time::Duration;
///
/// let pacing = PacingConfig::default();
/// assert_eq!(pacing.batch_size, 10);
/// assert_eq!(pacing.delay, Duration::from_secs(30));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingConfig {
    /// Number of identifiers between pauses. Zero is treated as one.
    pub batch_size: usize,
    /// Length of each pause.
    pub delay: Duration,
    /// Cap on additional waits at a boundary when backpressure is reported.
    pub backpressure_max_waits: u32,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            delay: DEFAULT_DELAY,
            backpressure_max_waits: DEFAULT_BACKPRESSURE_MAX_WAITS,
        }
    }
}

impl PacingConfig {
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    #[must_use]
    pub fn with_backpressure_max_waits(mut self, waits: u32) -> Self {
        self.backpressure_max_waits = waits;
        self
    }
}

/// Inserts a pause before every item that starts a new batch.
///
/// The first item never waits. With batch size `B`, items `B`, `2B`, ...
/// (zero-based) are preceded by one pause each, so `N` items cause
/// `(N - 1) / B` pauses. Outcomes do not matter, only position.
#[derive(Debug)]
pub struct BatchPacer {
    batch_size: usize,
    delay: Duration,
    position: usize,
}

impl BatchPacer {
    pub fn new(config: &PacingConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            delay: config.delay,
            position: 0,
        }
    }

    /// Whether the next item begins a new batch after the first.
    pub fn at_boundary(&self) -> bool {
        self.position > 0 && self.position % self.batch_size == 0
    }

    /// Number of items seen so far.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Call before processing each item. Sleeps at batch boundaries and
    /// returns whether it did.
    pub async fn before_item(&mut self) -> bool {
        let pause = self.at_boundary();
        if pause {
            info!(
                processed = self.position,
                delay_secs = self.delay.as_secs_f64(),
                "batch complete, pausing"
            );
            tokio::time::sleep(self.delay).await;
        }
        self.position += 1;
        pause
    }
}
