//! Client for the Fedora repository REST API.
//!
//! Only the read side needed by the OCR regeneration tool is covered:
//! resolving object and datastream URLs, and fetching the datastream listing
//! of an object with or without full profiles.
//!
//! ```no_run
//! use regen_ocr_core::Pid;
//! use regen_ocr_fedora::FedoraClient;
//!
//! # async fn example() -> Result<(), regen_ocr_fedora::FedoraError> {
//! let client = FedoraClient::builder("http://localhost:8080/fcrepo")
//!     .credentials("fedoraAdmin", "secret")
//!     .build()?;
//! let pid = Pid::parse("demo:1").expect("valid pid");
//! let datastreams = client.list_datastreams(&pid, true).await?;
//! if let Some(ocr) = datastreams.ocr() {
//!     println!("{ocr}");
//! }
//! # Ok(())
//! # }
//! ```

mod client;
pub mod error;
pub mod xml;

pub use client::{DatastreamLister, FedoraClient, FedoraClientBuilder, PATH_SEGMENT};
pub use error::FedoraError;
