//! Core data models used throughout the storefront snapshot pipeline.
//!
//! Two families of types live here:
//!
//! - The **wire graph** ([`ContentEntity`], [`FieldValue`], [`EntityGraph`]):
//!   loosely-typed entries and assets as delivered by the Contentful API,
//!   flattened into an arena keyed by id so that shared and cyclic
//!   references are plain id links.
//! - The **snapshot** types ([`ExtractedEntity`], [`ImageRef`], [`Snapshot`],
//!   [`HomePageView`]): the minimal, typed, acyclic projection that is
//!   written to `data.json` and served to the storefront.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// Field names the pipeline reads from Contentful entries.
///
/// The extractor and the asset collector both walk these, so an image
/// field added to one must be added to the other.
pub mod field {
    pub const INTERNAL_NAME: &str = "internalName";
    pub const NAME: &str = "name";
    pub const DESCRIPTION: &str = "description";
    pub const PRICE: &str = "price";
    pub const FEATURED_PRODUCT_IMAGE: &str = "featuredProductImage";
    pub const PRODUCT_IMAGES: &str = "productImages";
    pub const RELATED_PRODUCTS: &str = "relatedProducts";
    pub const HERO_BANNER_HEADLINE: &str = "heroBannerHeadline";
    pub const HERO_BANNER_IMAGE: &str = "heroBannerImage";
    pub const PRODUCTS: &str = "products";
    pub const FILE: &str = "file";

    /// Image-bearing fields of a landing (home) page.
    pub const HOME_IMAGE_FIELDS: &[&str] = &[HERO_BANNER_IMAGE];
    /// Image-bearing fields of a product page, in traversal order.
    pub const PRODUCT_IMAGE_FIELDS: &[&str] = &[FEATURED_PRODUCT_IMAGE, PRODUCT_IMAGES];
}

pub const SYS_TYPE_ENTRY: &str = "Entry";
pub const SYS_TYPE_ASSET: &str = "Asset";
pub const SYS_TYPE_LINK: &str = "Link";

// ═══════════════════════════════════════════════════════════════════════
// Wire graph
// ═══════════════════════════════════════════════════════════════════════

/// A single field of a raw entity.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Any non-reference JSON value (text, number, rich text, file metadata).
    Scalar(Value),
    /// Link to another entity by id.
    Reference(String),
    /// Ordered list of links.
    References(Vec<String>),
}

/// Raw node fetched from the content source.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentEntity {
    pub id: String,
    /// `Entry` or `Asset`.
    pub sys_type: String,
    /// Content type id for entries (`pageLanding`, `pageProduct`).
    pub content_type: Option<String>,
    pub fields: HashMap<String, FieldValue>,
}

impl ContentEntity {
    pub fn scalar(&self, name: &str) -> Option<&Value> {
        match self.fields.get(name) {
            Some(FieldValue::Scalar(v)) if !v.is_null() => Some(v),
            _ => None,
        }
    }

    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.scalar(name).and_then(Value::as_str)
    }

    /// The single linked id of `name`, if the field is a reference.
    pub fn reference(&self, name: &str) -> Option<&str> {
        match self.fields.get(name) {
            Some(FieldValue::Reference(id)) => Some(id),
            _ => None,
        }
    }

    /// All linked ids of `name`, whether the field holds one link or many.
    pub fn reference_ids(&self, name: &str) -> &[String] {
        match self.fields.get(name) {
            Some(FieldValue::Reference(id)) => std::slice::from_ref(id),
            Some(FieldValue::References(ids)) => ids,
            _ => &[],
        }
    }

    pub fn is_asset(&self) -> bool {
        self.sys_type == SYS_TYPE_ASSET
    }

    /// `fields.file.url` of an asset.
    pub fn asset_url(&self) -> Option<&str> {
        self.scalar(field::FILE)?
            .get("url")?
            .as_str()
            .filter(|url| !url.is_empty())
    }

    /// `fields.file.fileName` of an asset.
    pub fn asset_file_name(&self) -> Option<&str> {
        self.scalar(field::FILE)?
            .get("fileName")?
            .as_str()
            .filter(|name| !name.is_empty())
    }
}

/// Arena of raw entities keyed by id.
///
/// Built from a Contentful collection response (`items` + `includes`).
/// Both the raw link form (`{"sys": {"type": "Link", "id": ...}}`) and the
/// SDK's resolved form (entries nested in place) are accepted; either way
/// nested entities are hoisted into the arena and replaced by references.
#[derive(Debug, Clone, Default)]
pub struct EntityGraph {
    entities: HashMap<String, ContentEntity>,
    roots: Vec<String>,
}

impl EntityGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from a collection response. `items` become roots.
    pub fn from_response(response: &Value) -> Self {
        let mut graph = Self::new();

        if let Some(items) = response.get("items").and_then(Value::as_array) {
            for item in items {
                if let Some(id) = graph.absorb(item) {
                    graph.roots.push(id);
                }
            }
        }

        if let Some(includes) = response.get("includes") {
            for kind in [SYS_TYPE_ENTRY, SYS_TYPE_ASSET] {
                if let Some(list) = includes.get(kind).and_then(Value::as_array) {
                    for item in list {
                        graph.absorb(item);
                    }
                }
            }
        }

        graph
    }

    /// Parse `value` (and any entities nested inside it) into the arena.
    ///
    /// Returns the id of the top-level entity, or `None` if `value` has
    /// no usable `sys.id`.
    pub fn absorb(&mut self, value: &Value) -> Option<String> {
        let sys = value.get("sys")?;
        let id = sys.get("id")?.as_str().filter(|id| !id.is_empty())?;
        let sys_type = sys.get("type").and_then(Value::as_str).unwrap_or(SYS_TYPE_ENTRY);
        if sys_type == SYS_TYPE_LINK {
            return Some(id.to_string());
        }

        let content_type = sys
            .pointer("/contentType/sys/id")
            .and_then(Value::as_str)
            .map(str::to_owned);

        let mut fields = HashMap::new();
        if let Some(raw) = value.get("fields").and_then(Value::as_object) {
            for (name, raw_value) in raw {
                fields.insert(name.clone(), self.field_value(raw_value));
            }
        }

        self.insert(ContentEntity {
            id: id.to_string(),
            sys_type: sys_type.to_string(),
            content_type,
            fields,
        });
        Some(id.to_string())
    }

    fn field_value(&mut self, raw: &Value) -> FieldValue {
        if is_entity_like(raw) {
            if let Some(id) = self.absorb(raw) {
                return FieldValue::Reference(id);
            }
        }
        if let Some(list) = raw.as_array() {
            if !list.is_empty() && list.iter().all(is_entity_like) {
                let ids = list.iter().filter_map(|item| self.absorb(item)).collect();
                return FieldValue::References(ids);
            }
        }
        FieldValue::Scalar(raw.clone())
    }

    /// Insert an entity. An existing entry with fields is kept; a bare
    /// one (e.g. depth-limited by the API) is replaced by a fuller copy.
    pub fn insert(&mut self, entity: ContentEntity) {
        let keep_existing = self
            .entities
            .get(&entity.id)
            .is_some_and(|existing| !existing.fields.is_empty() || entity.fields.is_empty());
        if !keep_existing {
            self.entities.insert(entity.id.clone(), entity);
        }
    }

    pub fn get(&self, id: &str) -> Option<&ContentEntity> {
        self.entities.get(id)
    }

    /// Ids of the response's top-level `items`, in order.
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Rebuild entity `id` as JSON with its links inlined, in the shape the
    /// Contentful SDK's `getEntry` returns.
    ///
    /// Links are expanded up to `depth` levels. Past that depth, or on a
    /// link back to an entity that is already being expanded, the raw link
    /// object is written instead. Links to entities missing from the graph
    /// are left out.
    pub fn resolve(&self, id: &str, depth: u8) -> Option<Value> {
        let entity = self.entities.get(id)?;
        let mut ancestors = Vec::new();
        Some(self.resolve_entity(entity, depth, &mut ancestors))
    }

    fn resolve_entity<'a>(
        &'a self,
        entity: &'a ContentEntity,
        depth: u8,
        ancestors: &mut Vec<&'a str>,
    ) -> Value {
        ancestors.push(&entity.id);
        let mut fields = Map::new();
        for (name, value) in &entity.fields {
            let resolved = match value {
                FieldValue::Scalar(v) => Some(v.clone()),
                FieldValue::Reference(id) => self.resolve_link(id, depth, ancestors),
                FieldValue::References(ids) => Some(Value::Array(
                    ids.iter()
                        .filter_map(|id| self.resolve_link(id, depth, ancestors))
                        .collect(),
                )),
            };
            if let Some(resolved) = resolved {
                fields.insert(name.clone(), resolved);
            }
        }
        ancestors.pop();

        let mut sys = json!({ "id": entity.id, "type": entity.sys_type });
        if let Some(content_type) = &entity.content_type {
            sys["contentType"] =
                json!({ "sys": { "type": SYS_TYPE_LINK, "linkType": "ContentType", "id": content_type } });
        }
        json!({ "sys": sys, "fields": fields })
    }

    fn resolve_link<'a>(&'a self, id: &str, depth: u8, ancestors: &mut Vec<&'a str>) -> Option<Value> {
        let entity = self.entities.get(id)?;
        if depth == 0 || ancestors.iter().any(|ancestor| *ancestor == id) {
            return Some(json!({
                "sys": { "type": SYS_TYPE_LINK, "linkType": entity.sys_type, "id": entity.id }
            }));
        }
        Some(self.resolve_entity(entity, depth - 1, ancestors))
    }
}

/// True for objects carrying a `sys` block of type `Entry`, `Asset` or `Link`.
fn is_entity_like(value: &Value) -> bool {
    value
        .get("sys")
        .and_then(|sys| sys.get("type"))
        .and_then(Value::as_str)
        .is_some_and(|t| matches!(t, SYS_TYPE_ENTRY | SYS_TYPE_ASSET | SYS_TYPE_LINK))
}

// ═══════════════════════════════════════════════════════════════════════
// Snapshot types
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sys {
    pub id: String,
    #[serde(rename = "type")]
    pub sys_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFields {
    pub file: FileRef,
}

/// Projected image: `{ sys: { id, type: "Asset" }, fields: { file: { url } } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub sys: Sys,
    pub fields: ImageFields,
}

impl ImageRef {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            sys: Sys {
                id: id.into(),
                sys_type: SYS_TYPE_ASSET.to_string(),
            },
            fields: ImageFields {
                file: FileRef { url: url.into() },
            },
        }
    }

    pub fn id(&self) -> &str {
        &self.sys.id
    }

    pub fn url(&self) -> &str {
        &self.fields.file.url
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.fields.file.url = url.into();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkSys {
    pub id: String,
    #[serde(rename = "type")]
    pub sys_type: String,
    pub link_type: String,
}

/// Entry-to-entry link, used where nesting would make the output cyclic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryLink {
    pub sys: LinkSys,
}

impl EntryLink {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            sys: LinkSys {
                id: id.into(),
                sys_type: SYS_TYPE_LINK.to_string(),
                link_type: SYS_TYPE_ENTRY.to_string(),
            },
        }
    }

    pub fn id(&self) -> &str {
        &self.sys.id
    }
}

/// Minimal projection of a [`ContentEntity`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntity<F> {
    pub sys: Sys,
    pub fields: F,
}

impl<F> ExtractedEntity<F> {
    pub fn id(&self) -> &str {
        &self.sys.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hero_banner_headline: Option<String>,
    #[serde(default)]
    pub hero_banner_image: Option<ImageRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Long text or rich text document, copied as-is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured_product_image: Option<ImageRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_images: Option<Vec<ImageRef>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_products: Vec<EntryLink>,
}

pub type HomeEntity = ExtractedEntity<HomeFields>;
pub type ProductEntity = ExtractedEntity<ProductFields>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMeta {
    /// ISO-8601 UTC timestamp with millisecond precision.
    pub export_date: String,
    pub asset_count: usize,
    pub product_count: usize,
}

/// The persisted `data.json`.
///
/// Products are stored as siblings of the home page rather than under
/// `homepage.fields.products`, so each product appears on disk once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub homepage: HomeEntity,
    pub products: Vec<ProductEntity>,
    pub meta: SnapshotMeta,
}

impl Snapshot {
    /// Re-attach the products to the home page for the storefront.
    pub fn into_home_page(self) -> HomePageView {
        HomePageView {
            sys: self.homepage.sys,
            fields: HomePageViewFields {
                home: self.homepage.fields,
                products: self.products,
            },
        }
    }
}

/// Home page as served to the storefront: the home fields plus the full
/// product list under `fields.products`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomePageView {
    pub sys: Sys,
    pub fields: HomePageViewFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomePageViewFields {
    #[serde(flatten)]
    pub home: HomeFields,
    pub products: Vec<ProductEntity>,
}
