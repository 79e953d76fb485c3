//! # verbach-core
//!
//! Core types for verbach, an automated verifier for secondary-school
//! diplomas published on the Paraguayan Ministry of Education portal.
//!
//! ## Core Paradigm
//!
//! - One lookup IS one browser session (never pooled, never reused)
//! - Results are ephemeral; only the PDF artifact outlives a request
//! - Every site-specific constant lives in [`VerbachConfig`]
//! - Failures surface as a single wrapped [`VerbachError::Automation`]

pub mod config;
mod error;
pub mod fail_open;
mod types;

pub use config::VerbachConfig;
pub use error::{Result, Stage, VerbachError};
pub use types::*;
