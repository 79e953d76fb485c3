//! Verification agent - one browser session per lookup
//!
//! A lookup is a fixed sequence of stages:
//!
//! 1. `Launch` - fresh, isolated browser session
//! 2. `Navigate` - load the portal, settle, capture `debug_initial.png`
//! 3. `FillForm` - type the document number (and birth date), press Enter
//! 4. `AwaitResult` - race the success, error and generic panel watches
//! 5. `Extract` - read the result text through the fallback chain
//! 6. `Render` - only for validated lookups, print the page to PDF
//!
//! Any stage failure is wrapped once into [`VerbachError::Automation`]. The
//! session is closed on every path before the outcome is returned.

use crate::artifacts::ArtifactStore;
use crate::browser::ChromeLauncher;
use crate::extract::{classify, extract_result_text};
use crate::page::{PageDriver, SessionLauncher};
use crate::render::render_pdf;
use crate::screenshot::{
    capture_diagnostic, excerpt, AFTER_FILL_CAPTURE, BODY_DUMP_CHARS, INITIAL_CAPTURE,
};
use async_trait::async_trait;
use futures::future::select_ok;
use std::sync::Arc;
use tracing::{error, info, warn};
use verbach_core::fail_open::fail_open;
use verbach_core::{
    Result, Stage, VerbachConfig, VerbachError, VerificationRequest, VerificationResult,
    VerificationStatus,
};

/// Key that submits the lookup form; the portal has no submit button
const CONFIRM_KEY: &str = "Enter";

/// Message of the no-result failure
pub const NO_RESULT_MESSAGE: &str =
    "No result appeared after filling the form fields. Check the submitted data.";

/// Anything that can answer a lookup request
#[async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(&self, request: &VerificationRequest) -> Result<VerificationResult>;
}

/// Drives the portal for one request at a time
pub struct VerificationAgent<L = ChromeLauncher> {
    config: Arc<VerbachConfig>,
    launcher: L,
    artifacts: ArtifactStore,
}

impl VerificationAgent<ChromeLauncher> {
    /// Agent backed by a real Chrome
    pub fn new(config: Arc<VerbachConfig>) -> Self {
        let launcher = ChromeLauncher::new(&config);
        Self::with_launcher(config, launcher)
    }
}

impl<L: SessionLauncher> VerificationAgent<L> {
    pub fn with_launcher(config: Arc<VerbachConfig>, launcher: L) -> Self {
        let artifacts = ArtifactStore::new(&config.artifacts);
        Self {
            config,
            launcher,
            artifacts,
        }
    }

    pub fn config(&self) -> &VerbachConfig {
        &self.config
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Run one lookup end to end
    ///
    /// Returns a fully populated result or a single `Automation` error.
    pub async fn run(&self, request: &VerificationRequest) -> Result<VerificationResult> {
        info!("Starting lookup for document {}", request.identifier());

        let page = self.launcher.launch().await.map_err(|e| {
            error!("Browser launch failed: {}", e);
            e.into_automation(Stage::Launch)
        })?;

        let outcome = self.run_stages(page.as_ref(), request).await;

        fail_open("session_teardown", || page.close()).await;

        match &outcome {
            Ok(result) => info!(
                "Lookup for document {} finished: {}",
                request.identifier(),
                result.status
            ),
            Err(e) => error!("Lookup for document {} failed: {}", request.identifier(), e),
        }
        outcome
    }

    async fn run_stages(
        &self,
        page: &dyn PageDriver,
        request: &VerificationRequest,
    ) -> Result<VerificationResult> {
        self.navigate(page)
            .await
            .map_err(|e| e.into_automation(Stage::Navigate))?;

        self.fill_form(page, request)
            .await
            .map_err(|e| e.into_automation(Stage::FillForm))?;

        self.await_result(page)
            .await
            .map_err(|e| e.into_automation(Stage::AwaitResult))?;

        let extraction = extract_result_text(page, &self.config.site)
            .await
            .map_err(|e| e.into_automation(Stage::Extract))?;

        match classify(&extraction.text, &self.config.site.validated_keywords) {
            VerificationStatus::Validated => {
                info!("Document {} validated, generating PDF", request.identifier());
                let artifact = render_pdf(page, &self.config, &self.artifacts, request.identifier())
                    .await
                    .map_err(|e| e.into_automation(Stage::Render))?;
                Ok(VerificationResult::validated(
                    request.identifier(),
                    &extraction.text,
                    artifact.public_url,
                ))
            }
            VerificationStatus::NotValidated => {
                info!("Document {} not validated", request.identifier());
                Ok(VerificationResult::not_validated(
                    request.identifier(),
                    &extraction.text,
                ))
            }
        }
    }

    async fn navigate(&self, page: &dyn PageDriver) -> Result<()> {
        let timings = &self.config.timings;

        info!("Opening {}", self.config.site.url);
        page.goto(&self.config.site.url, timings.navigation_timeout())
            .await?;

        tokio::time::sleep(timings.initial_settle()).await;

        fail_open("initial_screenshot", || {
            capture_diagnostic(page, &self.artifacts, INITIAL_CAPTURE)
        })
        .await;
        Ok(())
    }

    async fn fill_form(&self, page: &dyn PageDriver, request: &VerificationRequest) -> Result<()> {
        let site = &self.config.site;
        let timeout = self.config.timings.navigation_timeout();

        page.wait_for_element(&site.identifier_selector, timeout)
            .await?;
        page.replace_text(&site.identifier_selector, request.identifier())
            .await?;

        match request.birth_date() {
            Some(birth_date) => {
                info!("Filling birth date");
                page.wait_for_element(&site.birth_date_selector, timeout)
                    .await?;
                page.replace_text(&site.birth_date_selector, birth_date)
                    .await?;
            }
            None => {
                page.click(&site.identifier_selector).await?;
            }
        }
        page.press_key(CONFIRM_KEY).await?;

        info!("Form submitted, waiting for the portal to load the result");
        tokio::time::sleep(self.config.timings.submit_settle()).await;
        Ok(())
    }

    /// Race the three panel watches; first visible panel wins
    async fn await_result(&self, page: &dyn PageDriver) -> Result<()> {
        let watch = &self.config.site.watch;
        let timeout = self.config.timings.result_timeout();

        let watches = [&watch.success, &watch.error, &watch.generic]
            .into_iter()
            .map(|selector| {
                Box::pin(async move {
                    page.wait_for_visible(selector, timeout)
                        .await
                        .map(|()| selector)
                })
            });

        match select_ok(watches).await {
            Ok((selector, _abandoned)) => {
                info!("Result panel rendered ({})", selector);
                tokio::time::sleep(self.config.timings.result_settle()).await;
                Ok(())
            }
            Err(last) => {
                warn!("No result panel within {:?}: {}", timeout, last);

                fail_open("after_fill_screenshot", || {
                    capture_diagnostic(page, &self.artifacts, AFTER_FILL_CAPTURE)
                })
                .await;
                if let Some(body) = fail_open("body_dump", || page.body_text()).await {
                    warn!("Page text: {}", excerpt(&body, BODY_DUMP_CHARS));
                }

                Err(VerbachError::NoResult(NO_RESULT_MESSAGE.to_string()))
            }
        }
    }
}

#[async_trait]
impl<L: SessionLauncher> Verifier for VerificationAgent<L> {
    async fn verify(&self, request: &VerificationRequest) -> Result<VerificationResult> {
        self.run(request).await
    }
}
