//! Queue-depth monitoring for the OCR regeneration tool.
//!
//! The OCR service consumes work from message broker queues. A
//! [`QueueMonitor`] reads the depth of those queues and reports whether any
//! of them is over a configured limit, so that a long backfill can wait for
//! the consumers to catch up.

pub mod error;
pub mod jolokia;
pub mod monitor;

pub use error::QueueError;
pub use jolokia::{DEFAULT_BROKER_NAME, JolokiaClient, QueueDepthSource};
pub use monitor::{Backpressure, DEFAULT_MAX_QUEUE_SIZE, QueueMonitor, QueueMonitorConfig};
