//! Artifact store - PDFs of validated lookups and diagnostic captures
//!
//! PDFs are written once under `<prefix>_<identifier>_<epochMillis>.pdf` and
//! never touched again. Retention is somebody else's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use verbach_core::config::ArtifactSettings;
use verbach_core::{Result, VerbachError};

/// Last suffix handed out in this process
static LAST_SUFFIX: AtomicI64 = AtomicI64::new(0);

/// Metadata for a stored PDF artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredArtifact {
    pub filename: String,
    /// Absolute or working-directory-relative location on disk
    pub path: PathBuf,
    /// Path under which the static file server exposes it
    pub public_url: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

/// Manages the shared artifact directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    public_prefix: String,
    file_prefix: String,
}

impl ArtifactStore {
    pub fn new(settings: &ArtifactSettings) -> Self {
        Self {
            dir: settings.dir.clone(),
            public_prefix: settings.public_prefix.trim_end_matches('/').to_string(),
            file_prefix: settings.file_prefix.clone(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the directory if needed; racing creators are fine
    pub async fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).await.map_err(|e| {
            VerbachError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to create artifact directory {}: {}", self.dir.display(), e),
            ))
        })
    }

    /// Next PDF filename for `identifier`
    pub fn pdf_filename(&self, identifier: &str) -> String {
        format!(
            "{}_{}_{}.pdf",
            self.file_prefix,
            sanitize_identifier(identifier),
            next_suffix()
        )
    }

    pub fn public_url(&self, filename: &str) -> String {
        format!("{}/{}", self.public_prefix, filename)
    }

    /// Location of a named diagnostic capture
    pub fn diagnostic_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Persist a rendered PDF for `identifier`
    ///
    /// The file is created exclusively; an existing file is never overwritten.
    pub async fn store_pdf(&self, identifier: &str, data: &[u8]) -> Result<StoredArtifact> {
        self.ensure_dir().await?;

        let filename = self.pdf_filename(identifier);
        let path = self.dir.join(&filename);

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        file.write_all(data).await?;
        file.flush().await?;

        Ok(StoredArtifact {
            public_url: self.public_url(&filename),
            filename,
            path,
            size_bytes: data.len() as u64,
            created_at: Utc::now(),
        })
    }

    /// Write (or replace) a diagnostic capture such as `debug_initial.png`
    pub async fn write_diagnostic(&self, name: &str, data: &[u8]) -> Result<PathBuf> {
        self.ensure_dir().await?;
        let path = self.diagnostic_path(name);
        fs::write(&path, data).await?;
        Ok(path)
    }
}

/// Epoch milliseconds, bumped when needed so no two calls share a value
fn next_suffix() -> i64 {
    let now = Utc::now().timestamp_millis();
    let previous = LAST_SUFFIX
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(now.max(last + 1))
        })
        .unwrap_or(now);
    now.max(previous + 1)
}

/// Keep ASCII alphanumerics, `-` and `_`; everything else becomes `_`
fn sanitize_identifier(identifier: &str) -> String {
    identifier
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
