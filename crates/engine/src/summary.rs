use std::collections::BTreeMap;
use std::fmt;

use regen_ocr_core::{OutcomeKind, RegenerationOutcome};

/// Tally of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    counts: BTreeMap<OutcomeKind, usize>,
    /// Identifiers whose outcome counts as a failure, in processing order.
    pub failed: Vec<String>,
    /// Pacing pauses taken between batches.
    pub pauses: usize,
    /// Extra waits taken because the broker reported backpressure.
    pub backpressure_waits: usize,
}

impl RunSummary {
    pub fn record(&mut self, identifier: &str, outcome: &RegenerationOutcome) {
        *self.counts.entry(outcome.kind()).or_default() += 1;
        if outcome.is_failure() {
            self.failed.push(identifier.trim().to_owned());
        }
    }

    pub fn count(&self, kind: OutcomeKind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    /// Number of identifiers processed.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "processed {}", self.total())?;
        for kind in OutcomeKind::ALL {
            let n = self.count(kind);
            if n > 0 {
                write!(f, ", {kind}={n}")?;
            }
        }
        write!(f, ", pauses={}", self.pauses)?;
        if self.backpressure_waits > 0 {
            write!(f, ", backpressure_waits={}", self.backpressure_waits)?;
        }
        Ok(())
    }
}
