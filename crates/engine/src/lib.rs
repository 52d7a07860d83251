//! Staleness check and paced regeneration of OCR text.
//!
//! A [`Regenerator`] walks an [`IdentifierSource`], looks up each object's
//! `OCR` datastream, and asks the OCR service to rebuild any whose creation
//! time predates the cutoff. Work is split into batches with a pause between
//! them; when a queue monitor is attached the pause is stretched while the
//! broker reports backpressure.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use regen_ocr_core::Cutoff;
//! use regen_ocr_engine::{IdentifierSource, OcrGeneratorClient, PacingConfig, Regenerator};
//! use regen_ocr_fedora::FedoraClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fedora = FedoraClient::builder("http://localhost:8080/fcrepo")
//!     .credentials("fedoraAdmin", "secret")
//!     .build()?;
//! let ocr = OcrGeneratorClient::new("http://localhost:8080/ocr", None)?;
//!
//! let regenerator = Regenerator::builder(
//!     Arc::new(fedora),
//!     Arc::new(ocr),
//!     Cutoff::parse_local_date("2015-01-01")?,
//! )
//! .pacing(PacingConfig::default().with_batch_size(20))
//! .build();
//!
//! let summary = regenerator.run(&IdentifierSource::detect("pids.txt")).await?;
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod generator;
pub mod pacing;
pub mod regenerator;
pub mod source;
pub mod summary;

pub use error::{EngineError, GeneratorError};
pub use generator::{OcrGeneratorClient, OcrTrigger};
pub use pacing::{
    BatchPacer, DEFAULT_BACKPRESSURE_MAX_WAITS, DEFAULT_BATCH_SIZE, DEFAULT_DELAY, PacingConfig,
};
pub use regenerator::{Regenerator, RegeneratorBuilder};
pub use source::{IdentifierReader, IdentifierSource, SourceLine};
pub use summary::RunSummary;
