//! Unified error types for verbach

use thiserror::Error;

/// Named step of a verification run
///
/// Every failure the agent reports is tagged with the stage it happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Launch,
    Navigate,
    FillForm,
    AwaitResult,
    Extract,
    Render,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Launch => write!(f, "launch"),
            Self::Navigate => write!(f, "navigate"),
            Self::FillForm => write!(f, "fill_form"),
            Self::AwaitResult => write!(f, "await_result"),
            Self::Extract => write!(f, "extract"),
            Self::Render => write!(f, "render"),
        }
    }
}

/// Unified error type for all verbach operations
#[derive(Error, Debug)]
pub enum VerbachError {
    // Input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Browser errors
    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Element not found: {selector}")]
    ElementNotFound { selector: String },

    #[error("Timed out after {timeout_ms}ms waiting for {what}")]
    Timeout { what: String, timeout_ms: u64 },

    #[error("{0}")]
    NoResult(String),

    #[error("PDF rendering failed: {0}")]
    Rendering(String),

    /// Wrapper returned by the agent for any failed stage
    #[error("Automation failed: {message}")]
    Automation { stage: Stage, message: String },

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl VerbachError {
    /// Wrap this error as the failure of `stage`, keeping its message as context
    pub fn into_automation(self, stage: Stage) -> Self {
        match self {
            already @ Self::Automation { .. } => already,
            other => Self::Automation {
                stage,
                message: other.to_string(),
            },
        }
    }

    /// Stage that produced this error, when it was wrapped by the agent
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Automation { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Result type alias using VerbachError
pub type Result<T> = std::result::Result<T, VerbachError>;
