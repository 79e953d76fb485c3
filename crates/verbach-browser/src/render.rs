//! PDF snapshot of a validated result page

use crate::artifacts::{ArtifactStore, StoredArtifact};
use crate::browser::js_string;
use crate::page::{PageDriver, PdfOptions};
use tracing::{debug, info};
use verbach_core::{Result, VerbachConfig};

/// Script that strips navigation chrome and applies print spacing
///
/// Anchors matching `nav_link_selectors` go unless they wrap an image (the
/// ministry logo); the menu toggle always goes. Evaluates to the number of
/// removed nodes.
pub fn sanitize_script(config: &VerbachConfig) -> String {
    let site = &config.site;
    let link_selectors = site
        .nav_link_selectors
        .iter()
        .map(|s| js_string(s))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"(() => {{
    let removed = 0;
    for (const selector of [{links}]) {{
        document.querySelectorAll(selector).forEach(link => {{
            if (!link.querySelector('img')) {{
                link.remove();
                removed += 1;
            }}
        }});
    }}
    const toggle = document.querySelector({toggle});
    if (toggle) {{
        toggle.remove();
        removed += 1;
    }}
    document.body.style.padding = '20px';
    document.body.style.margin = '0';
    return removed;
}})()"#,
        links = link_selectors,
        toggle = js_string(&site.menu_toggle_selector),
    )
}

/// Sanitize the page, print it and persist the PDF
pub async fn render_pdf(
    page: &dyn PageDriver,
    config: &VerbachConfig,
    store: &ArtifactStore,
    identifier: &str,
) -> Result<StoredArtifact> {
    info!("Rendering PDF for document {}", identifier);

    let removed = page.evaluate(&sanitize_script(config)).await?;
    debug!("Removed {} navigation elements before printing", removed);

    tokio::time::sleep(config.timings.print_settle()).await;

    let data = page.print_pdf(&PdfOptions::from(&config.pdf)).await?;
    let artifact = store.store_pdf(identifier, &data).await?;

    info!(
        "PDF stored: {} ({} bytes)",
        artifact.public_url, artifact.size_bytes
    );
    Ok(artifact)
}
