use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use regen_ocr_core::{
    Cutoff, OCR_DSID, Pid, RegenerationOutcome, Staleness, is_regeneration_success,
};
use regen_ocr_fedora::DatastreamLister;
use regen_ocr_queue::Backpressure;
use tracing::{Instrument, Span, debug, error, info, info_span, warn};

use crate::error::EngineError;
use crate::generator::OcrTrigger;
use crate::pacing::{BatchPacer, PacingConfig};
use crate::source::{IdentifierSource, SourceLine};
use crate::summary::RunSummary;

/// Checks objects for outdated OCR text and asks for it to be rebuilt.
///
/// Identifiers are handled one at a time, in order. Every problem with a
/// single identifier is turned into a [`RegenerationOutcome`]; only an
/// unreadable identifier source ends a run early.
pub struct Regenerator {
    lister: Arc<dyn DatastreamLister>,
    trigger: Arc<dyn OcrTrigger>,
    monitor: Option<Arc<dyn Backpressure>>,
    cutoff: Cutoff,
    pacing: PacingConfig,
    span: Span,
}

impl std::fmt::Debug for Regenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Regenerator")
            .field("cutoff", &self.cutoff)
            .field("pacing", &self.pacing)
            .field("monitor", &self.monitor.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for a [`Regenerator`].
pub struct RegeneratorBuilder {
    lister: Arc<dyn DatastreamLister>,
    trigger: Arc<dyn OcrTrigger>,
    cutoff: Cutoff,
    monitor: Option<Arc<dyn Backpressure>>,
    pacing: PacingConfig,
    span: Option<Span>,
}

impl RegeneratorBuilder {
    /// Throttling settings (defaults to [`PacingConfig::default`]).
    #[must_use]
    pub fn pacing(mut self, pacing: PacingConfig) -> Self {
        self.pacing = pacing;
        self
    }

    /// Consult `monitor` at each batch boundary and wait while it reports
    /// backpressure.
    #[must_use]
    pub fn monitor(mut self, monitor: Arc<dyn Backpressure>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Span that all engine log events are recorded under.
    #[must_use]
    pub fn span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn build(self) -> Regenerator {
        Regenerator {
            lister: self.lister,
            trigger: self.trigger,
            monitor: self.monitor,
            cutoff: self.cutoff,
            pacing: self.pacing,
            span: self
                .span
                .unwrap_or_else(|| info_span!("regenerator", cutoff = %self.cutoff)),
        }
    }
}

impl Regenerator {
    pub fn builder(
        lister: Arc<dyn DatastreamLister>,
        trigger: Arc<dyn OcrTrigger>,
        cutoff: Cutoff,
    ) -> RegeneratorBuilder {
        RegeneratorBuilder {
            lister,
            trigger,
            cutoff,
            monitor: None,
            pacing: PacingConfig::default(),
            span: None,
        }
    }

    pub fn cutoff(&self) -> Cutoff {
        self.cutoff
    }

    pub fn pacing(&self) -> &PacingConfig {
        &self.pacing
    }

    /// Replace the cutoff. It must lie strictly in the past.
    pub fn set_cutoff(&mut self, at: DateTime<Utc>) -> Result<(), EngineError> {
        self.cutoff = Cutoff::in_past(at, Utc::now())?;
        Ok(())
    }

    /// Check one raw identifier and regenerate its OCR text if outdated.
    pub async fn check(&self, raw: &str) -> RegenerationOutcome {
        self.check_inner(raw).instrument(self.span.clone()).await
    }

    async fn check_inner(&self, raw: &str) -> RegenerationOutcome {
        let pid = match Pid::parse(raw) {
            Ok(pid) => pid,
            Err(e) => {
                warn!(identifier = raw.trim(), error = %e, "skipping invalid identifier");
                return RegenerationOutcome::InvalidIdentifier {
                    reason: e.to_string(),
                };
            }
        };

        let datastreams = match self.lister.list_datastreams(&pid, true).await {
            Ok(set) => set,
            Err(e) => {
                error!(%pid, error = %e, "could not fetch datastream metadata");
                return RegenerationOutcome::MetadataUnavailable {
                    reason: e.to_string(),
                };
            }
        };

        let Some(ocr) = datastreams.ocr() else {
            debug!(%pid, "no {OCR_DSID} datastream");
            return RegenerationOutcome::NoOcrDatastream;
        };

        match self.cutoff.assess(ocr) {
            Staleness::Current { created } => {
                debug!(%pid, %created, "OCR is up to date");
                RegenerationOutcome::UpToDate { created }
            }
            Staleness::Stale { created } => {
                match created {
                    Some(created) => debug!(%pid, %created, "OCR predates cutoff"),
                    None => debug!(%pid, "OCR creation date unknown, treating as stale"),
                }
                self.regenerate(&pid, created).await
            }
        }
    }

    async fn regenerate(&self, pid: &Pid, previous: Option<DateTime<Utc>>) -> RegenerationOutcome {
        debug!(%pid, "regenerating OCR");
        match self.trigger.trigger(pid).await {
            Ok(status) if is_regeneration_success(status) => {
                info!(%pid, status, "regenerated OCR");
                RegenerationOutcome::Regenerated { status, previous }
            }
            Ok(status) => {
                error!(%pid, status, "failed to regenerate OCR");
                RegenerationOutcome::RegenerationFailed {
                    status: Some(status),
                    reason: format!("OCR service answered HTTP {status}"),
                }
            }
            Err(e) => {
                error!(%pid, error = %e, "failed to regenerate OCR");
                RegenerationOutcome::RegenerationFailed {
                    status: None,
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Process every identifier of `source`, pausing between batches.
    pub async fn run(&self, source: &IdentifierSource) -> Result<RunSummary, EngineError> {
        self.run_inner(source).instrument(self.span.clone()).await
    }

    async fn run_inner(&self, source: &IdentifierSource) -> Result<RunSummary, EngineError> {
        let source_error = |e: std::io::Error| EngineError::Source {
            path: source
                .path()
                .map_or_else(|| PathBuf::from("-"), ToOwned::to_owned),
            source: e,
        };

        info!(%source, "starting OCR check");
        let mut reader = source.open().await.map_err(source_error)?;
        let mut pacer = BatchPacer::new(&self.pacing);
        let mut summary = RunSummary::default();

        while let Some(line) = reader.next_identifier().await.map_err(source_error)? {
            if pacer.before_item().await {
                summary.pauses += 1;
                summary.backpressure_waits += self.wait_for_backpressure().await;
            }
            match line {
                SourceLine::Text(raw) => {
                    let outcome = self.check_inner(&raw).await;
                    summary.record(&raw, &outcome);
                }
                SourceLine::InvalidUtf8(lossy) => {
                    warn!(identifier = lossy.trim(), "skipping line that is not valid UTF-8");
                    let outcome = RegenerationOutcome::InvalidIdentifier {
                        reason: "line is not valid UTF-8".to_owned(),
                    };
                    summary.record(&lossy, &outcome);
                }
            }
        }

        info!(%summary, "OCR check finished");
        Ok(summary)
    }

    /// Hold off while the monitor reports backpressure. Returns the number
    /// of extra waits taken.
    async fn wait_for_backpressure(&self) -> usize {
        let Some(monitor) = &self.monitor else {
            return 0;
        };

        let mut waits: u32 = 0;
        while monitor.queue_size_too_large().await {
            if waits >= self.pacing.backpressure_max_waits {
                warn!(waits, "queues still backed up, continuing anyway");
                break;
            }
            info!(
                delay_secs = self.pacing.delay.as_secs_f64(),
                "queues backed up, waiting"
            );
            tokio::time::sleep(self.pacing.delay).await;
            waits += 1;
        }
        usize::try_from(waits).unwrap_or(usize::MAX)
    }
}
