//! Diagnostic captures for troubleshooting portal changes

use crate::artifacts::ArtifactStore;
use crate::page::PageDriver;
use std::path::PathBuf;
use tracing::{debug, info};
use verbach_core::Result;

/// Captured right after the page settles, before the form is touched
pub const INITIAL_CAPTURE: &str = "debug_initial.png";

/// Captured when no result panel shows up
pub const AFTER_FILL_CAPTURE: &str = "debug_after_fill.png";

/// How much of the page body goes into the log on a missing result
pub const BODY_DUMP_CHARS: usize = 1000;

/// Capture a full-page PNG and store it under `name`
pub async fn capture_diagnostic(
    page: &dyn PageDriver,
    store: &ArtifactStore,
    name: &str,
) -> Result<PathBuf> {
    debug!("Capturing diagnostic screenshot '{}'", name);

    let data = page.screenshot().await?;
    let path = store.write_diagnostic(name, &data).await?;

    info!(
        "Diagnostic screenshot stored: {} ({} bytes)",
        path.display(),
        data.len()
    );
    Ok(path)
}

/// First `limit` characters of `text`, cut on a char boundary
pub fn excerpt(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
