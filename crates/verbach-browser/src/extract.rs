//! Result text extraction and classification
//!
//! Extraction walks a fixed fallback chain and stops at the first hit:
//! success panel, error panel, any panel, then the page body if it carries
//! one of the known markers. Classification is a pure keyword match on the
//! trimmed text.

use crate::page::PageDriver;
use tracing::{debug, info};
use verbach_core::config::SiteConfig;
use verbach_core::{Result, VerificationStatus};

/// Where the result text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionSource {
    SuccessPanel,
    ErrorPanel,
    GenericPanel,
    PageBody,
    /// Nothing usable; the text is the configured sentinel
    NotFound,
}

impl std::fmt::Display for ExtractionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SuccessPanel => write!(f, "success panel"),
            Self::ErrorPanel => write!(f, "error panel"),
            Self::GenericPanel => write!(f, "generic panel"),
            Self::PageBody => write!(f, "page body"),
            Self::NotFound => write!(f, "not found"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub source: ExtractionSource,
    /// Trimmed text
    pub text: String,
}

/// Recover the result text from whichever panel variant rendered
pub async fn extract_result_text(page: &dyn PageDriver, site: &SiteConfig) -> Result<Extraction> {
    let chain = [
        (ExtractionSource::SuccessPanel, &site.extract.success),
        (ExtractionSource::ErrorPanel, &site.extract.error),
        (ExtractionSource::GenericPanel, &site.extract.generic),
    ];

    for (source, selector) in chain {
        debug!("Looking for {} ({})", source, selector);
        if let Some(text) = page.inner_text(selector).await? {
            let extraction = Extraction {
                source,
                text: text.trim().to_string(),
            };
            info!(
                "Result ({}) extracted: {}",
                source,
                crate::screenshot::excerpt(&extraction.text, 200)
            );
            return Ok(extraction);
        }
    }

    let body = page.body_text().await?;
    let extraction = body_fallback(&body, &site.body_markers, &site.not_found_text);
    info!(
        "Result ({}) extracted: {}",
        extraction.source,
        crate::screenshot::excerpt(&extraction.text, 200)
    );
    Ok(extraction)
}

/// Last link of the chain: the whole body if it mentions a marker
pub fn body_fallback(body: &str, markers: &[String], not_found_text: &str) -> Extraction {
    if markers.iter().any(|marker| body.contains(marker.as_str())) {
        Extraction {
            source: ExtractionSource::PageBody,
            text: body.trim().to_string(),
        }
    } else {
        Extraction {
            source: ExtractionSource::NotFound,
            text: not_found_text.trim().to_string(),
        }
    }
}

/// Case-insensitive keyword match; any hit means validated
pub fn classify(text: &str, keywords: &[String]) -> VerificationStatus {
    let haystack = text.trim().to_lowercase();
    let matched = keywords
        .iter()
        .any(|keyword| haystack.contains(&keyword.to_lowercase()));

    if matched {
        VerificationStatus::Validated
    } else {
        VerificationStatus::NotValidated
    }
}
