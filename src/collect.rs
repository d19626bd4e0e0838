//! Asset reference collection.
//!
//! Walks the same image fields the extractor projects (home hero image,
//! then each listed product's featured image and gallery) and records every
//! distinct asset once, in order of first discovery.

use indexmap::map::Entry;
use indexmap::IndexMap;

use crate::models::{field, EntityGraph};

/// A remote asset to download, keyed by asset id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetReference {
    pub id: String,
    /// URL as delivered by the API (possibly protocol-relative).
    pub remote_url: String,
    /// `<id>_<fileName>`, stable across runs.
    pub suggested_file_name: String,
}

/// Insertion-ordered set of [`AssetReference`]s, deduplicated by id.
#[derive(Debug, Clone, Default)]
pub struct AssetCollection {
    by_id: IndexMap<String, AssetReference>,
}

impl AssetCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `reference` unless its id is already present. Returns whether
    /// it was added.
    pub fn insert(&mut self, reference: AssetReference) -> bool {
        match self.by_id.entry(reference.id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(reference);
                true
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&AssetReference> {
        self.by_id.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// References in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &AssetReference> {
        self.by_id.values()
    }
}

pub fn suggested_file_name(id: &str, file_name: Option<&str>, default_file_name: &str) -> String {
    format!("{}_{}", id, file_name.unwrap_or(default_file_name))
}

/// Collect the distinct assets referenced by the home page `home_id` and
/// its listed products.
///
/// Images without a URL are skipped. Unknown ids contribute nothing.
pub fn collect_assets(graph: &EntityGraph, home_id: &str, default_file_name: &str) -> AssetCollection {
    let mut assets = AssetCollection::new();
    let Some(home) = graph.get(home_id) else {
        return assets;
    };

    let mut visit = |asset_id: &str| {
        let Some(asset) = graph.get(asset_id) else {
            return;
        };
        let Some(url) = asset.asset_url() else {
            return;
        };
        assets.insert(AssetReference {
            id: asset_id.to_string(),
            remote_url: url.to_string(),
            suggested_file_name: suggested_file_name(
                asset_id,
                asset.asset_file_name(),
                default_file_name,
            ),
        });
    };

    for name in field::HOME_IMAGE_FIELDS {
        for asset_id in home.reference_ids(name) {
            visit(asset_id);
        }
    }

    for product_id in home.reference_ids(field::PRODUCTS) {
        let Some(product) = graph.get(product_id) else {
            continue;
        };
        for name in field::PRODUCT_IMAGE_FIELDS {
            for asset_id in product.reference_ids(name) {
                visit(asset_id);
            }
        }
    }

    assets
}
