//! Export the storefront content as a static JSON snapshot.
//!
//! Produces a `data.json` containing the home page, its products and
//! export metadata, with every image URL rewritten to a locally downloaded
//! copy under the assets directory. Runs as a build step before the
//! storefront is prerendered.
//!
//! # Pipeline
//!
//! ```text
//! fetch home (include=N) ─▶ collect assets ─▶ download each asset
//!                                                    │ (failure: keep remote URL)
//!                                                    ▼
//!        write data.json ◀─ rewrite image URLs ◀─ extract home + products
//! ```
//!
//! Only a failed root fetch or a failed snapshot write aborts the run.

use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::assets::{normalize_url, prepare_dirs, AssetFetcher, HttpAssetFetcher};
use crate::collect::{collect_assets, AssetCollection};
use crate::config::{Config, ExportConfig};
use crate::contentful::{ContentSource, ContentfulClient};
use crate::error::ExportError;
use crate::extract::{EntityKind, Extractor};
use crate::models::{
    EntityGraph, HomeEntity, ImageRef, ProductEntity, Snapshot, SnapshotMeta,
};
use crate::progress::{ExportProgressEvent, ExportProgressReporter, NoProgress, ProgressMode};

/// Asset id → URL the snapshot should use (local path, or the normalized
/// remote URL when the download failed).
pub type LocalAssetMap = HashMap<String, String>;

/// Knobs for one export run.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub include_depth: u8,
    pub assets_dir: PathBuf,
    pub data_dir: PathBuf,
    pub public_asset_prefix: String,
    pub default_file_name: String,
    /// Skip downloads and the snapshot write.
    pub dry_run: bool,
}

impl From<&ExportConfig> for ExportOptions {
    fn from(config: &ExportConfig) -> Self {
        Self {
            include_depth: config.include_depth,
            assets_dir: config.assets_dir.clone(),
            data_dir: config.data_dir.clone(),
            public_asset_prefix: config.public_asset_prefix.clone(),
            default_file_name: config.default_file_name.clone(),
            dry_run: false,
        }
    }
}

impl ExportOptions {
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(crate::config::SNAPSHOT_FILE_NAME)
    }

    /// Public URL of a downloaded asset file.
    fn local_url(&self, file_name: &str) -> String {
        format!(
            "{}/{}",
            self.public_asset_prefix.trim_end_matches('/'),
            file_name
        )
    }
}

/// Outcome of a successful export run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    /// `None` on a dry run.
    pub snapshot_path: Option<PathBuf>,
    /// Distinct assets discovered.
    pub asset_count: usize,
    pub downloaded: usize,
    pub failed: usize,
    pub product_count: usize,
}

struct DownloadOutcome {
    urls: LocalAssetMap,
    downloaded: usize,
    failed: usize,
}

/// Drives one export run end to end.
pub struct SnapshotBuilder<'a> {
    source: &'a dyn ContentSource,
    fetcher: &'a dyn AssetFetcher,
    home_page_id: String,
    options: ExportOptions,
    progress: Box<dyn ExportProgressReporter>,
}

impl<'a> SnapshotBuilder<'a> {
    pub fn new(
        source: &'a dyn ContentSource,
        fetcher: &'a dyn AssetFetcher,
        home_page_id: impl Into<String>,
        options: ExportOptions,
    ) -> Self {
        Self {
            source,
            fetcher,
            home_page_id: home_page_id.into(),
            options,
            progress: Box::new(NoProgress),
        }
    }

    pub fn with_progress(mut self, progress: Box<dyn ExportProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Run the export: fetch, download, extract, rewrite, write.
    pub async fn run(&self) -> Result<ExportSummary, ExportError> {
        let options = &self.options;
        let home_id = self.home_page_id.as_str();

        if !options.dry_run {
            prepare_dirs(&options.assets_dir, &options.data_dir)
                .await
                .map_err(|source| ExportError::Io {
                    path: options.assets_dir.clone(),
                    source,
                })?;
        }

        info!(home = home_id, include = options.include_depth, "fetching home page");
        self.progress.report(ExportProgressEvent::Fetching {
            entry_id: home_id.to_string(),
        });
        let response = self
            .source
            .fetch_entry(home_id, options.include_depth)
            .await?;
        let graph = EntityGraph::from_response(&response);

        let assets = collect_assets(&graph, home_id, &options.default_file_name);
        info!(count = assets.len(), "found unique assets to download");

        let outcome = self.download_assets(&assets).await;

        let mut extractor = Extractor::new(&graph);
        let missing_home = || ExportError::MissingHome {
            id: home_id.to_string(),
        };
        let home_handle = extractor
            .extract(home_id, EntityKind::Home)
            .ok_or_else(missing_home)?;
        let homepage = extractor
            .home(home_handle)
            .cloned()
            .ok_or_else(missing_home)?;
        let products: Vec<ProductEntity> = extractor
            .products_of(home_handle)
            .iter()
            .filter_map(|handle| extractor.product(*handle).cloned())
            .collect();
        info!(count = products.len(), "extracted products");

        let snapshot = build_snapshot(homepage, products, &outcome.urls, assets.len());
        let summary = ExportSummary {
            snapshot_path: None,
            asset_count: snapshot.meta.asset_count,
            downloaded: outcome.downloaded,
            failed: outcome.failed,
            product_count: snapshot.meta.product_count,
        };

        if options.dry_run {
            return Ok(summary);
        }

        let path = options.snapshot_path();
        self.progress.report(ExportProgressEvent::Writing {
            path: path.display().to_string(),
        });
        write_snapshot(&path, &snapshot).await?;
        info!(path = %path.display(), "snapshot written");

        Ok(ExportSummary {
            snapshot_path: Some(path),
            ..summary
        })
    }

    /// Download every asset once, sequentially, in discovery order.
    /// Failures are logged and mapped to the normalized remote URL.
    async fn download_assets(&self, assets: &AssetCollection) -> DownloadOutcome {
        let mut outcome = DownloadOutcome {
            urls: LocalAssetMap::new(),
            downloaded: 0,
            failed: 0,
        };
        let total = assets.len() as u64;

        for (i, reference) in assets.iter().enumerate() {
            let remote = normalize_url(&reference.remote_url);

            if self.options.dry_run {
                outcome.urls.insert(reference.id.clone(), remote);
                continue;
            }

            self.progress.report(ExportProgressEvent::Downloading {
                n: i as u64 + 1,
                total,
                file_name: reference.suggested_file_name.clone(),
            });

            let url = match self
                .fetcher
                .fetch(&reference.remote_url, &reference.suggested_file_name)
                .await
            {
                Ok(path) => {
                    outcome.downloaded += 1;
                    let file_name = path
                        .file_name()
                        .and_then(|name| name.to_str())
                        .unwrap_or(&reference.suggested_file_name);
                    info!(asset = %reference.id, file = file_name, "downloaded asset");
                    self.options.local_url(file_name)
                }
                Err(err) => {
                    outcome.failed += 1;
                    warn!(asset = %reference.id, error = %err, "asset download failed, keeping remote URL");
                    remote
                }
            };
            outcome.urls.insert(reference.id.clone(), url);
        }

        outcome
    }
}

/// Assemble the snapshot, rewriting every image through `urls`.
///
/// `relatedProducts` links are kept only when they point at a product in
/// `products`, so every link in the snapshot resolves within it.
pub fn build_snapshot(
    mut homepage: HomeEntity,
    mut products: Vec<ProductEntity>,
    urls: &LocalAssetMap,
    asset_count: usize,
) -> Snapshot {
    homepage.fields.hero_banner_image = homepage
        .fields
        .hero_banner_image
        .take()
        .and_then(|image| localize_image(image, urls));

    let listed: HashSet<String> = products.iter().map(|p| p.id().to_string()).collect();

    for product in &mut products {
        let fields = &mut product.fields;
        fields
            .related_products
            .retain(|link| listed.contains(link.id()));
        fields.featured_product_image = fields
            .featured_product_image
            .take()
            .and_then(|image| localize_image(image, urls));
        if let Some(images) = fields.product_images.take() {
            fields.product_images = Some(
                images
                    .into_iter()
                    .filter_map(|image| localize_image(image, urls))
                    .collect(),
            );
        }
    }

    let product_count = products.len();
    Snapshot {
        homepage,
        products,
        meta: SnapshotMeta {
            export_date: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            asset_count,
            product_count,
        },
    }
}

/// Resolve one image's URL. Images that end up with no URL at all are
/// dropped so every image in the snapshot is loadable.
pub fn localize_image(mut image: ImageRef, urls: &LocalAssetMap) -> Option<ImageRef> {
    let url = match urls.get(image.id()) {
        Some(url) => url.clone(),
        None if !image.url().is_empty() => normalize_url(image.url()),
        None => return None,
    };
    image.set_url(url);
    Some(image)
}

/// Serialize `snapshot` to `path`, replacing any previous file.
///
/// The JSON goes to a temporary sibling first and is renamed into place,
/// so a failed write leaves the old snapshot (or nothing) behind.
pub async fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<(), ExportError> {
    let json = serde_json::to_string_pretty(snapshot)?;

    let io_err = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }

    let tmp = path.with_extension("json.tmp");
    if let Err(source) = tokio::fs::write(&tmp, json.as_bytes()).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(io_err(source));
    }
    tokio::fs::rename(&tmp, path).await.map_err(io_err)
}

/// CLI entry point for `storefront export`.
pub async fn run_export(config: &Config, dry_run: bool, progress: ProgressMode) -> Result<()> {
    let client = ContentfulClient::new(&config.contentful)?;
    let fetcher = HttpAssetFetcher::new(
        config.export.assets_dir.clone(),
        std::time::Duration::from_secs(config.contentful.timeout_secs),
    )?;

    let options = ExportOptions {
        dry_run,
        ..ExportOptions::from(&config.export)
    };
    let builder = SnapshotBuilder::new(&client, &fetcher, &config.contentful.home_page_id, options)
        .with_progress(progress.reporter());

    let summary = builder.run().await?;

    println!("products:   {}", summary.product_count);
    println!("assets:     {}", summary.asset_count);
    println!("downloaded: {}", summary.downloaded);
    println!("failed:     {}", summary.failed);
    match &summary.snapshot_path {
        Some(path) => println!("snapshot:   {}", path.display()),
        None => println!("snapshot:   (dry run, not written)"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntryLink, HomeFields, ProductFields, Sys};

    fn urls(pairs: &[(&str, &str)]) -> LocalAssetMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn localize_prefers_mapped_url() {
        let map = urls(&[("A1", "/assets/contentful/A1_a.jpg")]);
        let image = localize_image(ImageRef::new("A1", "//cdn/a.jpg"), &map).unwrap();
        assert_eq!(image.url(), "/assets/contentful/A1_a.jpg");
    }

    #[test]
    fn localize_normalizes_unmapped_url() {
        let image = localize_image(ImageRef::new("A1", "//cdn/a.jpg"), &urls(&[])).unwrap();
        assert_eq!(image.url(), "https://cdn/a.jpg");
    }

    #[test]
    fn localize_drops_images_without_any_url() {
        assert!(localize_image(ImageRef::new("A1", ""), &urls(&[])).is_none());
    }

    #[test]
    fn snapshot_meta_counts() {
        let homepage = HomeEntity {
            sys: Sys { id: "H1".into(), sys_type: "Entry".into() },
            fields: HomeFields {
                hero_banner_image: Some(ImageRef::new("A1", "//cdn/a.jpg")),
                ..Default::default()
            },
        };
        let product = |id: &str| ProductEntity {
            sys: Sys { id: id.into(), sys_type: "Entry".into() },
            fields: ProductFields {
                product_images: Some(vec![ImageRef::new("A2", ""), ImageRef::new("A3", "//cdn/c.jpg")]),
                ..Default::default()
            },
        };

        let map = urls(&[("A1", "/assets/contentful/A1_a.jpg")]);
        let snapshot = build_snapshot(homepage, vec![product("P1"), product("P2")], &map, 7);

        assert_eq!(snapshot.meta.product_count, 2);
        assert_eq!(snapshot.meta.asset_count, 7);
        assert!(snapshot.meta.export_date.ends_with('Z'));
        assert_eq!(
            snapshot.homepage.fields.hero_banner_image.unwrap().url(),
            "/assets/contentful/A1_a.jpg"
        );
        let gallery = snapshot.products[0].fields.product_images.as_ref().unwrap();
        assert_eq!(gallery, &vec![ImageRef::new("A3", "https://cdn/c.jpg")]);
    }

    #[test]
    fn related_links_outside_product_list_are_dropped() {
        let homepage = HomeEntity {
            sys: Sys { id: "H1".into(), sys_type: "Entry".into() },
            fields: HomeFields::default(),
        };
        let p1 = ProductEntity {
            sys: Sys { id: "P1".into(), sys_type: "Entry".into() },
            fields: ProductFields {
                related_products: vec![EntryLink::new("P3"), EntryLink::new("P2")],
                ..Default::default()
            },
        };
        let p2 = ProductEntity {
            sys: Sys { id: "P2".into(), sys_type: "Entry".into() },
            fields: ProductFields {
                related_products: vec![EntryLink::new("P3")],
                ..Default::default()
            },
        };

        let snapshot = build_snapshot(homepage, vec![p1, p2], &urls(&[]), 0);

        assert_eq!(snapshot.products[0].fields.related_products, vec![EntryLink::new("P2")]);
        assert!(snapshot.products[1].fields.related_products.is_empty());
    }

    #[tokio::test]
    async fn write_snapshot_replaces_previous_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("data/data.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "stale").unwrap();

        let snapshot = build_snapshot(
            HomeEntity {
                sys: Sys { id: "H1".into(), sys_type: "Entry".into() },
                fields: HomeFields::default(),
            },
            Vec::new(),
            &urls(&[]),
            0,
        );
        write_snapshot(&path, &snapshot).await.unwrap();

        let written: Snapshot =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, snapshot);
        assert!(!tmp.path().join("data/data.json.tmp").exists());
    }
}
