//! Route manifest for prerendering.
//!
//! The storefront prerenders a single page, so the manifest is always
//! `["/"]`. The home entry is fetched first: a manifest is only written
//! when the content it would render actually exists.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::Config;
use crate::contentful::{ContentSource, ContentfulClient};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteManifest {
    pub routes: Vec<String>,
}

/// Verify the home entry exists and write the manifest to `output`.
pub async fn generate_routes(
    source: &dyn ContentSource,
    home_page_id: &str,
    output: &Path,
) -> Result<RouteManifest> {
    source
        .fetch_entry(home_page_id, 1)
        .await
        .with_context(|| format!("Failed to fetch home page '{}'", home_page_id))?;

    let manifest = RouteManifest {
        routes: vec!["/".to_string()],
    };

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(output, serde_json::to_string_pretty(&manifest)?)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    Ok(manifest)
}

/// CLI entry point for `storefront routes`.
pub async fn run_routes(config: &Config, output: Option<&Path>) -> Result<()> {
    let client = ContentfulClient::new(&config.contentful)?;
    let output = output.unwrap_or(config.export.routes_path.as_path());

    let manifest = generate_routes(&client, &config.contentful.home_page_id, output).await?;
    println!(
        "Routes generated: {} -> {}",
        manifest.routes.join(", "),
        output.display()
    );
    Ok(())
}
