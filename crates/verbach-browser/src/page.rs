//! Page driver abstraction
//!
//! The agent talks to the remote page only through [`PageDriver`], so every
//! stage can run against a scripted page in tests. [`SessionLauncher`] hands
//! out one fresh driver per lookup.

use async_trait::async_trait;
use std::time::Duration;
use verbach_core::config::PdfLayout;
use verbach_core::Result;

const MM_PER_INCH: f64 = 25.4;

/// Print settings in the units CDP expects (inches)
#[derive(Debug, Clone, PartialEq)]
pub struct PdfOptions {
    pub landscape: bool,
    pub print_background: bool,
    pub paper_width_in: f64,
    pub paper_height_in: f64,
    pub margin_in: f64,
    pub scale: f64,
}

impl From<&PdfLayout> for PdfOptions {
    fn from(layout: &PdfLayout) -> Self {
        Self {
            landscape: layout.landscape,
            print_background: layout.print_background,
            paper_width_in: layout.paper_width_mm / MM_PER_INCH,
            paper_height_in: layout.paper_height_mm / MM_PER_INCH,
            margin_in: layout.margin_mm / MM_PER_INCH,
            scale: layout.scale,
        }
    }
}

/// One open page in one isolated browser session
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate and wait for the load to finish within `timeout`
    async fn goto(&self, url: &str, timeout: Duration) -> Result<()>;

    /// Wait until `selector` matches an element in the DOM
    async fn wait_for_element(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// Wait until `selector` matches an element that is rendered and visible
    async fn wait_for_visible(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// Select the field's current content and type `text` over it
    async fn replace_text(&self, selector: &str, text: &str) -> Result<()>;

    async fn click(&self, selector: &str) -> Result<()>;

    /// Press a named key (e.g. "Enter") on the focused element
    async fn press_key(&self, key: &str) -> Result<()>;

    /// `innerText` of the first element matching `selector`, `None` if nothing matches
    async fn inner_text(&self, selector: &str) -> Result<Option<String>>;

    /// `innerText` of the document body
    async fn body_text(&self) -> Result<String>;

    /// Evaluate a script in the page and return its JSON value
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;

    /// Full-page PNG capture
    async fn screenshot(&self) -> Result<Vec<u8>>;

    async fn print_pdf(&self, options: &PdfOptions) -> Result<Vec<u8>>;

    /// Tear the session down; later calls on this driver fail
    async fn close(&self) -> Result<()>;
}

/// Source of fresh, isolated browser sessions
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn PageDriver>>;
}
