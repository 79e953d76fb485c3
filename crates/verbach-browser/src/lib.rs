//! Browser automation for diploma verification on the MEC portal
//!
//! This crate drives a real Chrome through the Chrome DevTools Protocol to
//! look up one secondary-school diploma, classify the outcome and, when the
//! diploma is validated, keep a PDF of the result page.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use verbach_browser::VerificationAgent;
//! use verbach_core::{VerbachConfig, VerificationRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let agent = VerificationAgent::new(Arc::new(VerbachConfig::default()));
//!
//!     let request = VerificationRequest::new("1234567", None)?;
//!     let result = agent.run(&request).await?;
//!
//!     println!("{}: {}", result.status, result.message);
//!     if let Some(url) = result.artifact_url {
//!         println!("PDF available at {}", url);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Requirements
//!
//! - Chrome or Chromium installed (or `browser.chrome_path` configured)
//! - Network access to the portal
//!
//! # Architecture
//!
//! - [`page`]: the `PageDriver` / `SessionLauncher` seam
//! - [`browser`]: `headless_chrome` implementation of that seam
//! - [`agent`]: the staged lookup and its session lifecycle
//! - [`extract`]: result text fallback chain and classification
//! - [`render`]: DOM sanitization and PDF printing
//! - [`artifacts`]: the shared artifact directory
//! - [`screenshot`]: diagnostic captures

pub mod agent;
pub mod artifacts;
pub mod browser;
pub mod extract;
pub mod page;
pub mod render;
pub mod screenshot;

// Re-export commonly used types
pub use agent::{VerificationAgent, Verifier, NO_RESULT_MESSAGE};
pub use artifacts::{ArtifactStore, StoredArtifact};
pub use browser::{BrowserSession, ChromeLauncher};
pub use extract::{classify, extract_result_text, Extraction, ExtractionSource};
pub use page::{PageDriver, PdfOptions, SessionLauncher};
