//! Entity extraction: raw Contentful entries → minimal snapshot entities.
//!
//! The [`Extractor`] projects entries through a fixed allow-list per
//! [`EntityKind`] and drops every other field. It keeps a per-run identity
//! cache, so each entry id is projected at most once and every later
//! request for the same id yields the same [`EntityHandle`].
//!
//! A handle is registered *before* the extractor descends into the entry's
//! own references. A reference cycle (`A → B → A`) therefore resolves to
//! the already-registered, still-being-filled entity instead of recursing
//! forever. Entry-to-entry references are written out as [`EntryLink`]s,
//! which keeps the serialized snapshot acyclic.

use std::collections::HashMap;
use tracing::debug;

use crate::error::MalformedEntity;
use crate::models::{
    field, ContentEntity, EntityGraph, EntryLink, ExtractedEntity, HomeEntity, HomeFields,
    ImageRef, ProductEntity, ProductFields, Sys,
};

/// Which allow-list to project an entry with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// Landing page: `internalName`, `heroBannerHeadline`, `heroBannerImage`
    /// (plus its `products`, extracted as siblings).
    Home,
    /// Product page: `internalName`, `name`, `description`, `price`,
    /// `featuredProductImage`, `productImages`, `relatedProducts`.
    Product,
}

/// Stable identity of an extracted entity within one [`Extractor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityHandle(usize);

#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    Home(HomeEntity),
    Product(ProductEntity),
}

impl Extracted {
    pub fn id(&self) -> &str {
        match self {
            Extracted::Home(e) => e.id(),
            Extracted::Product(e) => e.id(),
        }
    }
}

/// Per-run, identity-caching projector over an [`EntityGraph`].
pub struct Extractor<'g> {
    graph: &'g EntityGraph,
    slots: Vec<Option<Extracted>>,
    index: HashMap<String, EntityHandle>,
    listed_products: HashMap<EntityHandle, Vec<EntityHandle>>,
}

impl<'g> Extractor<'g> {
    pub fn new(graph: &'g EntityGraph) -> Self {
        Self {
            graph,
            slots: Vec::new(),
            index: HashMap::new(),
            listed_products: HashMap::new(),
        }
    }

    /// Extract entry `id` as `kind`.
    ///
    /// Returns `None` for an empty id, a dangling reference or an asset;
    /// the entry is dropped (logged at debug) rather than failing the run.
    /// A cached id is returned as-is, whatever `kind` was asked for.
    pub fn extract(&mut self, id: &str, kind: EntityKind) -> Option<EntityHandle> {
        if let Some(&handle) = self.index.get(id) {
            return Some(handle);
        }

        let graph = self.graph;
        let entity = match resolve(graph, id) {
            Ok(entity) => entity,
            Err(err) => {
                debug!(%err, "dropping entity");
                return None;
            }
        };

        let handle = EntityHandle(self.slots.len());
        self.slots.push(None);
        self.index.insert(id.to_string(), handle);

        let extracted = match kind {
            EntityKind::Home => Extracted::Home(self.project_home(entity, handle)),
            EntityKind::Product => Extracted::Product(self.project_product(entity)),
        };
        self.slots[handle.0] = Some(extracted);
        Some(handle)
    }

    /// The entity behind `handle`. `None` only while it is still being
    /// populated (i.e. from inside a cycle).
    pub fn get(&self, handle: EntityHandle) -> Option<&Extracted> {
        self.slots.get(handle.0).and_then(Option::as_ref)
    }

    pub fn home(&self, handle: EntityHandle) -> Option<&HomeEntity> {
        match self.get(handle)? {
            Extracted::Home(home) => Some(home),
            Extracted::Product(_) => None,
        }
    }

    pub fn product(&self, handle: EntityHandle) -> Option<&ProductEntity> {
        match self.get(handle)? {
            Extracted::Product(product) => Some(product),
            Extracted::Home(_) => None,
        }
    }

    /// Products listed on home page `home`, deduplicated, in list order.
    pub fn products_of(&self, home: EntityHandle) -> &[EntityHandle] {
        self.listed_products
            .get(&home)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn handle_of(&self, id: &str) -> Option<EntityHandle> {
        self.index.get(id).copied()
    }

    /// Number of distinct entities extracted so far.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn project_home(&mut self, entity: &'g ContentEntity, handle: EntityHandle) -> HomeEntity {
        let mut products = Vec::new();
        for product_id in entity.reference_ids(field::PRODUCTS) {
            if let Some(product) = self.extract(product_id, EntityKind::Product) {
                if !products.contains(&product) {
                    products.push(product);
                }
            }
        }
        self.listed_products.insert(handle, products);

        ExtractedEntity {
            sys: sys_of(entity),
            fields: HomeFields {
                internal_name: owned_str(entity, field::INTERNAL_NAME),
                hero_banner_headline: owned_str(entity, field::HERO_BANNER_HEADLINE),
                hero_banner_image: entity
                    .reference(field::HERO_BANNER_IMAGE)
                    .map(|id| self.image(id)),
            },
        }
    }

    fn project_product(&mut self, entity: &'g ContentEntity) -> ProductEntity {
        let mut related_products = Vec::new();
        for related_id in entity.reference_ids(field::RELATED_PRODUCTS) {
            if self.extract(related_id, EntityKind::Product).is_some() {
                related_products.push(EntryLink::new(related_id.as_str()));
            }
        }

        let product_images = match entity.fields.get(field::PRODUCT_IMAGES) {
            Some(_) => Some(
                entity
                    .reference_ids(field::PRODUCT_IMAGES)
                    .iter()
                    .map(|id| self.image(id))
                    .collect(),
            ),
            None => None,
        };

        ExtractedEntity {
            sys: sys_of(entity),
            fields: ProductFields {
                internal_name: owned_str(entity, field::INTERNAL_NAME),
                name: owned_str(entity, field::NAME),
                description: entity.scalar(field::DESCRIPTION).cloned(),
                price: entity.scalar(field::PRICE).cloned(),
                featured_product_image: entity
                    .reference(field::FEATURED_PRODUCT_IMAGE)
                    .map(|id| self.image(id)),
                product_images,
                related_products,
            },
        }
    }

    /// Project an asset link. A missing asset or URL becomes `""`.
    fn image(&self, asset_id: &str) -> ImageRef {
        let url = self
            .graph
            .get(asset_id)
            .and_then(ContentEntity::asset_url)
            .unwrap_or("");
        ImageRef::new(asset_id, url)
    }
}

fn resolve<'g>(graph: &'g EntityGraph, id: &str) -> Result<&'g ContentEntity, MalformedEntity> {
    let malformed = |reason| MalformedEntity {
        id: id.to_string(),
        reason,
    };
    if id.trim().is_empty() {
        return Err(malformed("missing id"));
    }
    let entity = graph.get(id).ok_or_else(|| malformed("unresolved reference"))?;
    if entity.is_asset() {
        return Err(malformed("asset where an entry was expected"));
    }
    Ok(entity)
}

fn sys_of(entity: &ContentEntity) -> Sys {
    Sys {
        id: entity.id.clone(),
        sys_type: entity.sys_type.clone(),
    }
}

fn owned_str(entity: &ContentEntity, name: &str) -> Option<String> {
    entity.str_field(name).map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn link(id: &str) -> serde_json::Value {
        json!({ "sys": { "type": "Link", "linkType": "Entry", "id": id } })
    }

    fn graph_of(entries: serde_json::Value) -> EntityGraph {
        EntityGraph::from_response(&json!({ "items": entries }))
    }

    #[test]
    fn same_id_yields_same_instance() {
        let graph = graph_of(json!([
            { "sys": { "id": "P1", "type": "Entry" }, "fields": { "name": "Mug" } }
        ]));
        let mut extractor = Extractor::new(&graph);

        let first = extractor.extract("P1", EntityKind::Product).unwrap();
        let second = extractor.extract("P1", EntityKind::Product).unwrap();

        assert_eq!(first, second);
        assert!(std::ptr::eq(
            extractor.get(first).unwrap(),
            extractor.get(second).unwrap()
        ));
        assert_eq!(extractor.len(), 1);
    }

    #[test]
    fn mutual_references_terminate_with_two_entities() {
        let graph = graph_of(json!([
            { "sys": { "id": "A", "type": "Entry" }, "fields": { "relatedProducts": [link("B")] } },
            { "sys": { "id": "B", "type": "Entry" }, "fields": { "relatedProducts": [link("A")] } }
        ]));
        let mut extractor = Extractor::new(&graph);

        let a = extractor.extract("A", EntityKind::Product).unwrap();
        let b = extractor.handle_of("B").unwrap();

        assert_eq!(extractor.len(), 2);
        let a = extractor.product(a).unwrap();
        let b = extractor.product(b).unwrap();
        assert_eq!(a.fields.related_products, vec![EntryLink::new("B")]);
        assert_eq!(b.fields.related_products, vec![EntryLink::new("A")]);
    }

    #[test]
    fn self_reference_is_safe() {
        let graph = graph_of(json!([
            { "sys": { "id": "A", "type": "Entry" }, "fields": { "relatedProducts": [link("A")] } }
        ]));
        let mut extractor = Extractor::new(&graph);
        let a = extractor.extract("A", EntityKind::Product).unwrap();
        assert_eq!(
            extractor.product(a).unwrap().fields.related_products,
            vec![EntryLink::new("A")]
        );
    }

    #[test]
    fn unlisted_fields_are_dropped() {
        let graph = graph_of(json!([{
            "sys": { "id": "P1", "type": "Entry" },
            "fields": {
                "internalName": "mug-001",
                "name": "Mug",
                "description": "A mug.",
                "price": 12.5,
                "sku": "SKU-1",
                "inventory": 40
            }
        }]));
        let mut extractor = Extractor::new(&graph);
        let handle = extractor.extract("P1", EntityKind::Product).unwrap();
        let json = serde_json::to_value(extractor.product(handle).unwrap()).unwrap();

        assert_eq!(
            json,
            json!({
                "sys": { "id": "P1", "type": "Entry" },
                "fields": {
                    "internalName": "mug-001",
                    "name": "Mug",
                    "description": "A mug.",
                    "price": 12.5
                }
            })
        );
    }

    #[test]
    fn non_numeric_price_is_copied_as_is() {
        let graph = graph_of(json!([
            { "sys": { "id": "P1", "type": "Entry" }, "fields": { "price": "12.50" } },
            { "sys": { "id": "P2", "type": "Entry" }, "fields": { "price": { "amount": 9, "currency": "EUR" } } }
        ]));
        let mut extractor = Extractor::new(&graph);
        let p1 = extractor.extract("P1", EntityKind::Product).unwrap();
        let p2 = extractor.extract("P2", EntityKind::Product).unwrap();

        assert_eq!(extractor.product(p1).unwrap().fields.price, Some(json!("12.50")));
        assert_eq!(
            extractor.product(p2).unwrap().fields.price,
            Some(json!({ "amount": 9, "currency": "EUR" }))
        );
    }

    #[test]
    fn missing_image_url_degrades_to_empty_string() {
        let graph = graph_of(json!([{
            "sys": { "id": "P1", "type": "Entry" },
            "fields": {
                "featuredProductImage": { "sys": { "id": "A9", "type": "Asset" }, "fields": {} },
                "productImages": [{ "sys": { "id": "A404", "type": "Link", "linkType": "Asset" } }]
            }
        }]));
        let mut extractor = Extractor::new(&graph);
        let handle = extractor.extract("P1", EntityKind::Product).unwrap();
        let product = extractor.product(handle).unwrap();

        assert_eq!(product.fields.featured_product_image, Some(ImageRef::new("A9", "")));
        assert_eq!(
            product.fields.product_images,
            Some(vec![ImageRef::new("A404", "")])
        );
    }

    #[test]
    fn unresolvable_entries_are_dropped() {
        let graph = graph_of(json!([
            { "sys": { "id": "A1", "type": "Asset" }, "fields": {} }
        ]));
        let mut extractor = Extractor::new(&graph);

        assert!(extractor.extract("", EntityKind::Product).is_none());
        assert!(extractor.extract("missing", EntityKind::Product).is_none());
        assert!(extractor.extract("A1", EntityKind::Product).is_none());
        assert!(extractor.is_empty());
    }

    #[test]
    fn home_lists_products_once_in_order() {
        let graph = graph_of(json!([{
            "sys": { "id": "H1", "type": "Entry" },
            "fields": {
                "internalName": "Home",
                "heroBannerHeadline": "Welcome",
                "products": [
                    { "sys": { "id": "P2", "type": "Entry" }, "fields": { "name": "Two" } },
                    { "sys": { "id": "P1", "type": "Entry" }, "fields": { "name": "One" } },
                    link("P2"),
                    link("P404")
                ]
            }
        }]));
        let mut extractor = Extractor::new(&graph);
        let home = extractor.extract("H1", EntityKind::Home).unwrap();

        let ids: Vec<&str> = extractor
            .products_of(home)
            .iter()
            .map(|h| extractor.product(*h).unwrap().id())
            .collect();
        assert_eq!(ids, ["P2", "P1"]);

        let home = extractor.home(home).unwrap();
        assert_eq!(home.fields.hero_banner_headline.as_deref(), Some("Welcome"));
        assert_eq!(home.fields.hero_banner_image, None);
    }
}
