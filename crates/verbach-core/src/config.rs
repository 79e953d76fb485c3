//! Configuration management for verbach
//!
//! Every site-specific constant (URL, selectors, keywords, delays, PDF layout)
//! lives here so a markup change on the portal is a config edit, not a code
//! change. Resolution order: built-in defaults, then `verbach.toml`, then
//! environment overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{Result, VerbachError};

/// Default configuration file name, looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "verbach.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerbachConfig {
    /// Target page, selectors and keywords
    #[serde(default)]
    pub site: SiteConfig,

    /// Timeouts and settle delays
    #[serde(default)]
    pub timings: Timings,

    /// Browser launch settings
    #[serde(default)]
    pub browser: BrowserSettings,

    /// PDF page layout
    #[serde(default)]
    pub pdf: PdfLayout,

    /// Where artifacts and diagnostics are written
    #[serde(default)]
    pub artifacts: ArtifactSettings,

    /// HTTP service settings
    #[serde(default)]
    pub server: ServerSettings,
}

/// Everything that depends on the portal's markup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Lookup page URL
    #[serde(default = "default_url")]
    pub url: String,

    /// Student document field
    #[serde(default = "default_identifier_selector")]
    pub identifier_selector: String,

    /// Birth date field
    #[serde(default = "default_birth_date_selector")]
    pub birth_date_selector: String,

    /// Watch selectors raced after submission
    #[serde(default)]
    pub watch: PanelSelectors,

    /// Extraction selectors, tried in order success -> error -> generic
    #[serde(default = "PanelSelectors::extraction")]
    pub extract: PanelSelectors,

    /// Body substrings that make the whole body an acceptable result text
    #[serde(default = "default_body_markers")]
    pub body_markers: Vec<String>,

    /// Text returned when nothing usable is found on the page
    #[serde(default = "default_not_found_text")]
    pub not_found_text: String,

    /// Case-insensitive keywords that mark a lookup as validated
    #[serde(default = "default_keywords")]
    pub validated_keywords: Vec<String>,

    /// Selectors of navigation anchors stripped before printing
    #[serde(default = "default_nav_link_selectors")]
    pub nav_link_selectors: Vec<String>,

    /// Mobile menu toggle stripped before printing
    #[serde(default = "default_menu_toggle_selector")]
    pub menu_toggle_selector: String,
}

/// Success, error and generic panel selectors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelSelectors {
    pub success: String,
    pub error: String,
    pub generic: String,
}

impl PanelSelectors {
    /// Broader selectors used when reading the panel text
    pub fn extraction() -> Self {
        Self {
            success: ".panel.panel-success, .panel-success".to_string(),
            error: ".panel.panel-danger, .panel-danger, .alert-danger".to_string(),
            generic: ".panel".to_string(),
        }
    }
}

impl Default for PanelSelectors {
    fn default() -> Self {
        Self {
            success: ".panel.panel-success".to_string(),
            error: ".panel.panel-danger".to_string(),
            generic: ".panel".to_string(),
        }
    }
}

/// Timeouts and settle delays, in milliseconds
///
/// The settle delays come from the portal's observed behaviour. They are
/// tuning knobs, not a contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timings {
    /// Navigation budget, also used for the form field waits
    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,

    /// Pause after the page loads, before the first screenshot
    #[serde(default = "default_initial_settle_ms")]
    pub initial_settle_ms: u64,

    /// Pause after pressing Enter
    #[serde(default = "default_submit_settle_ms")]
    pub submit_settle_ms: u64,

    /// Budget of each result watch
    #[serde(default = "default_result_timeout_ms")]
    pub result_timeout_ms: u64,

    /// Pause after a result panel shows up, before reading it
    #[serde(default = "default_result_settle_ms")]
    pub result_settle_ms: u64,

    /// Pause after DOM sanitization, before printing
    #[serde(default = "default_print_settle_ms")]
    pub print_settle_ms: u64,

    /// Interval between visibility checks
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Timings {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn initial_settle(&self) -> Duration {
        Duration::from_millis(self.initial_settle_ms)
    }

    pub fn submit_settle(&self) -> Duration {
        Duration::from_millis(self.submit_settle_ms)
    }

    pub fn result_timeout(&self) -> Duration {
        Duration::from_millis(self.result_timeout_ms)
    }

    pub fn result_settle(&self) -> Duration {
        Duration::from_millis(self.result_settle_ms)
    }

    pub fn print_settle(&self) -> Duration {
        Duration::from_millis(self.print_settle_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Browser launch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserSettings {
    /// Show the browser window and slow down interactive steps
    #[serde(default)]
    pub debug: bool,

    /// Pause before each interactive step when `debug` is on
    #[serde(default = "default_slow_mo_ms")]
    pub slow_mo_ms: u64,

    #[serde(default = "default_window_width")]
    pub window_width: u32,

    #[serde(default = "default_window_height")]
    pub window_height: u32,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Explicit Chrome/Chromium binary, auto-detected when unset
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,
}

impl BrowserSettings {
    /// Run headless unless debugging
    pub fn headless(&self) -> bool {
        !self.debug
    }

    /// Delay inserted before clicks and keystrokes, if any
    pub fn slow_mo(&self) -> Option<Duration> {
        (self.debug && self.slow_mo_ms > 0).then(|| Duration::from_millis(self.slow_mo_ms))
    }
}

/// PDF page layout
///
/// Lengths are in millimetres; conversion to the inches CDP expects happens
/// at render time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfLayout {
    #[serde(default = "default_true")]
    pub landscape: bool,

    #[serde(default = "default_true")]
    pub print_background: bool,

    #[serde(default = "default_paper_width_mm")]
    pub paper_width_mm: f64,

    #[serde(default = "default_paper_height_mm")]
    pub paper_height_mm: f64,

    #[serde(default = "default_margin_mm")]
    pub margin_mm: f64,

    /// Below 1.0 so the result panel is not clipped
    #[serde(default = "default_scale")]
    pub scale: f64,
}

/// Artifact output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactSettings {
    /// Directory holding PDFs and diagnostic captures
    #[serde(default = "default_prints_dir")]
    pub dir: PathBuf,

    /// URL prefix the directory is served under
    #[serde(default = "default_public_prefix")]
    pub public_prefix: String,

    /// PDF filename prefix
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

/// HTTP service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

// Default value providers
fn default_url() -> String {
    "https://tramites.mec.gov.py/gestion_tramites/verificar_bachilleratos/".to_string()
}

fn default_identifier_selector() -> String {
    "#form_buscar_documento_estudiante".to_string()
}

fn default_birth_date_selector() -> String {
    "#form_buscar_fecha_nacimiento".to_string()
}

fn default_body_markers() -> Vec<String> {
    vec!["egresado".to_string(), "Datos del Egresado".to_string()]
}

fn default_not_found_text() -> String {
    "No result found".to_string()
}

fn default_keywords() -> Vec<String> {
    vec![
        "es egresado de la institución".to_string(),
        "Datos del Egresado".to_string(),
        "egresado".to_string(),
    ]
}

fn default_nav_link_selectors() -> Vec<String> {
    ["Inicio", "Portal", "Consultar", "Iniciar", "Ayuda"]
        .iter()
        .map(|label| format!("a[href*=\"{}\"]", label))
        .collect()
}

fn default_menu_toggle_selector() -> String {
    ".navbar-toggle, button[data-toggle]".to_string()
}

fn default_navigation_timeout_ms() -> u64 {
    90_000
}

fn default_initial_settle_ms() -> u64 {
    3_000
}

fn default_submit_settle_ms() -> u64 {
    2_000
}

fn default_result_timeout_ms() -> u64 {
    15_000
}

fn default_result_settle_ms() -> u64 {
    2_000
}

fn default_print_settle_ms() -> u64 {
    500
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_slow_mo_ms() -> u64 {
    100
}

fn default_window_width() -> u32 {
    1280
}

fn default_window_height() -> u32 {
    800
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string()
}

fn default_true() -> bool {
    true
}

fn default_paper_width_mm() -> f64 {
    210.0
}

fn default_paper_height_mm() -> f64 {
    297.0
}

fn default_margin_mm() -> f64 {
    15.0
}

fn default_scale() -> f64 {
    0.8
}

fn default_prints_dir() -> PathBuf {
    PathBuf::from("prints")
}

fn default_public_prefix() -> String {
    "/prints".to_string()
}

fn default_file_prefix() -> String {
    "bachillerato".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl VerbachConfig {
    /// Load configuration from `path` or use defaults when it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content).map_err(|e| {
                VerbachError::Config(format!("Failed to parse {}: {}", path.display(), e))
            })
        } else {
            Ok(Self::default())
        }
    }

    /// Load from `path` (or defaults) and apply process environment overrides
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::load_or_default(path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Write the default configuration to `path`
    pub fn write_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, Self::default().to_toml()?)?;
        Ok(())
    }

    /// Render as pretty TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| VerbachError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Apply overrides from a variable lookup (the environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("VERBACH_TARGET_URL") {
            self.site.url = url;
        }
        if let Some(raw) = lookup("VERBACH_TIMEOUT_MS") {
            self.timings.navigation_timeout_ms = parse_number("VERBACH_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = lookup("VERBACH_DEBUG_BROWSER").or_else(|| lookup("DEBUG_PUPPETEER")) {
            self.browser.debug = parse_flag(&raw);
        }
        if let Some(dir) = lookup("VERBACH_PRINTS_DIR") {
            self.artifacts.dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup("PORT") {
            self.server.port = parse_number("PORT", &raw)?;
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| VerbachError::Config(format!("{} must be a number, got '{}'", key, raw)))
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            identifier_selector: default_identifier_selector(),
            birth_date_selector: default_birth_date_selector(),
            watch: PanelSelectors::default(),
            extract: PanelSelectors::extraction(),
            body_markers: default_body_markers(),
            not_found_text: default_not_found_text(),
            validated_keywords: default_keywords(),
            nav_link_selectors: default_nav_link_selectors(),
            menu_toggle_selector: default_menu_toggle_selector(),
        }
    }
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            navigation_timeout_ms: default_navigation_timeout_ms(),
            initial_settle_ms: default_initial_settle_ms(),
            submit_settle_ms: default_submit_settle_ms(),
            result_timeout_ms: default_result_timeout_ms(),
            result_settle_ms: default_result_settle_ms(),
            print_settle_ms: default_print_settle_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            debug: false,
            slow_mo_ms: default_slow_mo_ms(),
            window_width: default_window_width(),
            window_height: default_window_height(),
            user_agent: default_user_agent(),
            chrome_path: None,
        }
    }
}

impl Default for PdfLayout {
    fn default() -> Self {
        Self {
            landscape: true,
            print_background: true,
            paper_width_mm: default_paper_width_mm(),
            paper_height_mm: default_paper_height_mm(),
            margin_mm: default_margin_mm(),
            scale: default_scale(),
        }
    }
}

impl Default for ArtifactSettings {
    fn default() -> Self {
        Self {
            dir: default_prints_dir(),
            public_prefix: default_public_prefix(),
            file_prefix: default_file_prefix(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}
