//! Request and result types for a single diploma lookup

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Result, VerbachError};

/// Outcome of classifying the extracted result text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    Validated,
    NotValidated,
}

impl VerificationStatus {
    pub fn is_validated(&self) -> bool {
        matches!(self, Self::Validated)
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validated => write!(f, "VALIDATED"),
            Self::NotValidated => write!(f, "NOT_VALIDATED"),
        }
    }
}

impl std::str::FromStr for VerificationStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "VALIDATED" | "VALIDADO" => Ok(Self::Validated),
            "NOT_VALIDATED" | "NAO_VALIDADO" => Ok(Self::NotValidated),
            _ => Err(format!("Invalid verification status: {}", s)),
        }
    }
}

/// A single lookup request
///
/// Construct through [`VerificationRequest::new`], which enforces a non-empty
/// identifier and folds a blank birth date into "absent".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRequest {
    identifier: String,
    birth_date: Option<String>,
}

impl VerificationRequest {
    pub fn new(identifier: &str, birth_date: Option<&str>) -> Result<Self> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(VerbachError::InvalidInput(
                "Identifier is required".to_string(),
            ));
        }

        let birth_date = birth_date
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        Ok(Self {
            identifier: identifier.to_string(),
            birth_date,
        })
    }

    /// Student document number, trimmed
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Birth date as typed by the caller (`DD/MM/YYYY` expected, not checked)
    pub fn birth_date(&self) -> Option<&str> {
        self.birth_date.as_deref()
    }
}

/// Raw request body accepted over HTTP
///
/// Both the current field names and the legacy Spanish ones are accepted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationPayload {
    #[serde(default, alias = "bachillerato")]
    pub identifier: Option<String>,
    #[serde(default, alias = "fechaNacimiento")]
    pub birth_date: Option<String>,
}

impl TryFrom<VerificationPayload> for VerificationRequest {
    type Error = VerbachError;

    fn try_from(payload: VerificationPayload) -> Result<Self> {
        VerificationRequest::new(
            payload.identifier.as_deref().unwrap_or_default(),
            payload.birth_date.as_deref(),
        )
    }
}

/// Result of one lookup, returned to the caller and then discarded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub status: VerificationStatus,
    pub message: String,
    pub identifier: String,
    pub artifact_url: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl VerificationResult {
    /// Build a validated result; a validated lookup always carries its artifact
    pub fn validated(identifier: &str, message: &str, artifact_url: String) -> Self {
        Self {
            status: VerificationStatus::Validated,
            message: message.trim().to_string(),
            identifier: identifier.to_string(),
            artifact_url: Some(artifact_url),
            timestamp: Utc::now(),
        }
    }

    pub fn not_validated(identifier: &str, message: &str) -> Self {
        Self {
            status: VerificationStatus::NotValidated,
            message: message.trim().to_string(),
            identifier: identifier.to_string(),
            artifact_url: None,
            timestamp: Utc::now(),
        }
    }
}
