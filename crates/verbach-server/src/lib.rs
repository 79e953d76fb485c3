//! # verbach-server
//!
//! HTTP front of the verification agent: accepts a lookup, runs it, returns
//! JSON, and serves the generated PDFs under `/prints`.

mod error;
mod server;

pub use error::ApiError;
pub use server::{router, AppState, SharedState};

use std::sync::Arc;
use tracing::info;
use verbach_browser::VerificationAgent;
use verbach_core::VerbachConfig;

/// Run the HTTP service with a Chrome-backed agent
pub async fn run(config: VerbachConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let config = Arc::new(config);

    let agent = VerificationAgent::new(Arc::clone(&config));
    agent.artifacts().ensure_dir().await?;

    info!("Starting verbach server on {}", addr);
    info!("Serving artifacts from {}", config.artifacts.dir.display());

    let state = Arc::new(AppState {
        verifier: Arc::new(agent),
        config,
    });

    server::serve(state, &addr).await
}
