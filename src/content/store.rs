//! Content store lookups
//!
//! The content store returns a rich content item; only the fields needed for
//! the artefact view are decoded. Items whose document type is a placeholder
//! are treated as missing.

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::models::{Artefact, Detail, Part};

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("no content item for slug '{slug}'")]
    NotFound { slug: String },
    #[error("content store returned status {status}")]
    Status { status: u16 },
    #[error("content store request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("got JSON that doesn't look like an artefact: {0}")]
    Unparsable(String),
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn artefact(&self, slug: &str) -> Result<Artefact, ContentError>;
}

#[derive(Debug, Deserialize)]
struct ContentItem {
    content_id: Option<String>,
    title: Option<String>,
    base_path: Option<String>,
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    document_type: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    need_ids: Vec<String>,
    #[serde(default)]
    details: ItemDetails,
}

#[derive(Debug, Default, Deserialize)]
struct ItemDetails {
    #[serde(default)]
    parts: Vec<ItemPart>,
}

#[derive(Debug, Deserialize)]
struct ItemPart {
    slug: String,
    title: String,
}

/// Turn a content store response body into an artefact.
///
/// `website_root` is prefixed to the item's base path to form its public URL.
pub fn parse_content_item(slug: &str, body: &str, website_root: &str) -> Result<Artefact, ContentError> {
    let item: ContentItem =
        serde_json::from_str(body).map_err(|e| ContentError::Unparsable(e.to_string()))?;

    if item
        .document_type
        .as_deref()
        .is_some_and(|t| t.contains("placeholder"))
    {
        return Err(ContentError::NotFound {
            slug: slug.to_string(),
        });
    }

    let missing = |field: &str| ContentError::Unparsable(format!("missing '{field}'"));
    let id = item.content_id.filter(|id| !id.is_empty()).ok_or_else(|| missing("content_id"))?;
    let title = item.title.ok_or_else(|| missing("title"))?;
    let base_path = item.base_path.ok_or_else(|| missing("base_path"))?;

    let web_url = format!("{}{}", website_root.trim_end_matches('/'), base_path);
    let parts = item
        .details
        .parts
        .into_iter()
        .map(|part| Part {
            web_url: format!("{}/{}", web_url, part.slug),
            title: part.title,
        })
        .collect();

    Ok(Artefact {
        id,
        web_url,
        title,
        format: item.format.or(item.document_type).unwrap_or_default(),
        details: Detail {
            need_ids: item.need_ids,
            business_proposition: false,
            description: item.description.unwrap_or_default(),
            parts,
        },
    })
}

pub struct HttpContentStore {
    base_url: String,
    website_root: String,
    client: Client,
}

impl HttpContentStore {
    pub fn new(base_url: impl Into<String>, website_root: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            website_root: website_root.into(),
            client,
        }
    }
}

#[async_trait]
impl ContentStore for HttpContentStore {
    async fn artefact(&self, slug: &str) -> Result<Artefact, ContentError> {
        let url = format!("{}/content/{}", self.base_url, slug.trim_start_matches('/'));
        debug!(%url, "requesting content item");

        let response = self
            .client
            .get(&url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::GONE => Err(ContentError::NotFound {
                slug: slug.to_string(),
            }),
            status if !status.is_success() => Err(ContentError::Status {
                status: status.as_u16(),
            }),
            _ => {
                let body = response.text().await?;
                parse_content_item(slug, &body, &self.website_root)
            }
        }
    }
}
