//! Contentful Content Delivery API client.
//!
//! Fetches entries as collection responses (`items` + `includes`) so that
//! linked products and assets arrive in one round trip, bounded by the
//! `include` depth.
//!
//! # Endpoints
//!
//! | Operation | Request |
//! |-----------|---------|
//! | [`ContentSource::fetch_entry`] | `GET /spaces/{space}/environments/{env}/entries?sys.id={id}&include={n}` |
//! | [`ContentSource::fetch_entries`] | `GET /spaces/{space}/environments/{env}/entries?content_type={type}&include={n}` |
//!
//! Every request carries `Authorization: Bearer <access_token>`.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::config::{Config, ContentfulConfig};
use crate::error::RemoteFetchError;

/// Read-only access to a remote content source.
///
/// The export pipeline and the content facade depend on this trait rather
/// than on [`ContentfulClient`], so tests can run them against an
/// in-memory source.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetch one entry by id, with linked entries and assets expanded up
    /// to `include` levels. Returns the raw collection response.
    ///
    /// An empty result is [`RemoteFetchError::NotFound`].
    async fn fetch_entry(&self, id: &str, include: u8) -> Result<Value, RemoteFetchError>;

    /// Fetch all entries of one content type.
    async fn fetch_entries(&self, content_type: &str, include: u8)
        -> Result<Value, RemoteFetchError>;
}

/// HTTP implementation of [`ContentSource`] for the Content Delivery API.
#[derive(Debug, Clone)]
pub struct ContentfulClient {
    http: reqwest::Client,
    entries_url: String,
    access_token: String,
}

impl ContentfulClient {
    pub fn new(config: &ContentfulConfig) -> Result<Self, RemoteFetchError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|source| RemoteFetchError::Http {
                url: config.base_url.clone(),
                source,
            })?;

        let entries_url = format!(
            "{}/spaces/{}/environments/{}/entries",
            config.base_url.trim_end_matches('/'),
            config.space_id,
            config.environment
        );

        Ok(Self {
            http,
            entries_url,
            access_token: config.access_token.clone(),
        })
    }

    async fn query(&self, params: &[(&str, String)]) -> Result<Value, RemoteFetchError> {
        let url = self.entries_url.clone();
        debug!(%url, ?params, "querying content delivery API");

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(params)
            .send()
            .await
            .map_err(|source| RemoteFetchError::Http {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteFetchError::Status {
                url,
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|source| RemoteFetchError::Decode { url, source })
    }
}

#[async_trait]
impl ContentSource for ContentfulClient {
    async fn fetch_entry(&self, id: &str, include: u8) -> Result<Value, RemoteFetchError> {
        let response = self
            .query(&[("sys.id", id.to_string()), ("include", include.to_string())])
            .await?;

        if collection_is_empty(&response) {
            return Err(RemoteFetchError::NotFound { id: id.to_string() });
        }
        Ok(response)
    }

    async fn fetch_entries(
        &self,
        content_type: &str,
        include: u8,
    ) -> Result<Value, RemoteFetchError> {
        self.query(&[
            ("content_type", content_type.to_string()),
            ("include", include.to_string()),
        ])
        .await
    }
}

fn collection_is_empty(response: &Value) -> bool {
    response
        .get("items")
        .and_then(Value::as_array)
        .map_or(true, Vec::is_empty)
}

/// CLI entry point for `storefront entries <content_type>`: prints the
/// raw collection response as pretty JSON on stdout.
pub async fn run_entries(config: &Config, content_type: &str, include: Option<u8>) -> Result<()> {
    let client = ContentfulClient::new(&config.contentful)?;
    let include = include.unwrap_or(config.content.include_depth);
    let response = client.fetch_entries(content_type, include).await?;

    let count = response
        .get("items")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    eprintln!("Fetched {} '{}' entries", count, content_type);

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entries_url_includes_space_and_environment() {
        let config = ContentfulConfig {
            space_id: "space".into(),
            access_token: "token".into(),
            environment: "staging".into(),
            base_url: "https://cdn.example.com/".into(),
            ..Default::default()
        };
        let client = ContentfulClient::new(&config).unwrap();
        assert_eq!(
            client.entries_url,
            "https://cdn.example.com/spaces/space/environments/staging/entries"
        );
    }

    #[test]
    fn empty_collection_detection() {
        assert!(collection_is_empty(&json!({ "items": [] })));
        assert!(collection_is_empty(&json!({})));
        assert!(!collection_is_empty(&json!({ "items": [{}] })));
    }
}
