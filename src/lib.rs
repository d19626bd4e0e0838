//! # Storefront Snapshot
//!
//! Export a Contentful-backed storefront (home page, product catalog,
//! images) to a local JSON snapshot, and serve it back with a live API
//! fallback.
//!
//! ## Architecture
//!
//! ```text
//!                 build time                               request time
//! ┌────────────┐  ┌──────────┐  ┌──────────┐          ┌──────────────────┐
//! │ Contentful │─▶│ collect  │─▶│  assets  │          │  ContentAccess   │
//! │    CDA     │  └──────────┘  └────┬─────┘          │ snapshot ─▶ live │
//! └─────┬──────┘                     ▼                └────────┬─────────┘
//!       │        ┌──────────┐  ┌──────────┐  data.json         │
//!       └───────▶│ extract  │─▶│  export  │───────────────────▶┘
//!                └──────────┘  └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export CONTENTFUL_SPACE_ID=... CONTENTFUL_ACCESS_TOKEN=... CONTENTFUL_HOME_PAGE_ID=...
//! storefront export             # download assets, write src/assets/data/data.json
//! storefront home               # print the home page (snapshot or live)
//! storefront entries pageProduct
//! storefront routes             # write src/assets/routes.json
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and `CONTENTFUL_*` overrides |
//! | [`models`] | Wire graph and snapshot types |
//! | [`contentful`] | Content Delivery API client |
//! | [`assets`] | URL normalization and asset downloads |
//! | [`extract`] | Identity-cached, cycle-safe entity projection |
//! | [`collect`] | Deduplicated asset references |
//! | [`export`] | Snapshot builder |
//! | [`content`] | Snapshot-first content access |
//! | [`progress`] | Export progress on stderr |
//! | [`routes`] | Prerender route manifest |
//! | [`error`] | Error types |

pub mod assets;
pub mod collect;
pub mod config;
pub mod content;
pub mod contentful;
pub mod error;
pub mod export;
pub mod extract;
pub mod models;
pub mod progress;
pub mod routes;
