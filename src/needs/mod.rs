//! User needs from the need API

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organisation {
    pub id: String,
    pub name: String,
    #[serde(rename = "govuk_status", default)]
    pub status: Option<String>,
    #[serde(default)]
    pub abbreviation: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub parent_ids: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub child_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeedStatus {
    pub description: String,
}

/// A user need as published by the need API
///
/// Most evidence fields are nullable upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Need {
    pub id: u64,
    pub role: Option<String>,
    pub goal: Option<String>,
    pub benefit: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub organisation_ids: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub organisations: Vec<Organisation>,
    #[serde(deserialize_with = "null_as_default")]
    pub justifications: Vec<String>,
    pub impact: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub met_when: Vec<String>,
    pub yearly_user_contacts: Option<u64>,
    pub yearly_site_views: Option<u64>,
    pub yearly_need_views: Option<u64>,
    pub yearly_searches: Option<u64>,
    pub other_evidence: Option<String>,
    pub legislation: Option<String>,
    #[serde(rename = "applies_to_all_organisations", deserialize_with = "null_as_default")]
    pub all_organisations: bool,
    pub duplicate_of: Option<u64>,
    pub status: Option<NeedStatus>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Error)]
pub enum NeedError {
    #[error("need {id} not found")]
    NotFound { id: String },
    #[error("need API returned status {status}")]
    Status { status: u16 },
    #[error("need API request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unparsable need: {0}")]
    Unparsable(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct ResponseInfo {
    status: String,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "_response_info")]
    response_info: Option<ResponseInfo>,
}

/// Decode a need API body.
///
/// The API can answer `200` with `_response_info.status = "not found"`, which
/// is reported as [`NeedError::NotFound`].
pub fn parse_need(id: &str, body: &str) -> Result<Need, NeedError> {
    let envelope: Envelope = serde_json::from_str(body)?;
    if envelope
        .response_info
        .is_some_and(|info| info.status == "not found")
    {
        return Err(NeedError::NotFound { id: id.to_string() });
    }

    Ok(serde_json::from_str(body)?)
}

#[async_trait]
pub trait NeedApi: Send + Sync {
    async fn need(&self, id: &str) -> Result<Need, NeedError>;
}

pub struct HttpNeedApi {
    base_url: String,
    bearer_token: Option<String>,
    client: Client,
}

impl HttpNeedApi {
    pub fn new(base_url: impl Into<String>, bearer_token: Option<String>, client: Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer_token,
            client,
        }
    }
}

#[async_trait]
impl NeedApi for HttpNeedApi {
    async fn need(&self, id: &str) -> Result<Need, NeedError> {
        let url = format!("{}/needs/{}", self.base_url, id);
        debug!(%url, "requesting need");

        let mut request = self
            .client
            .get(&url)
            .header(header::ACCEPT, "application/json");
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(NeedError::NotFound { id: id.to_string() }),
            status if !status.is_success() => Err(NeedError::Status {
                status: status.as_u16(),
            }),
            _ => parse_need(id, &response.text().await?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_body() {
        assert!(matches!(parse_need("1", ""), Err(NeedError::Unparsable(_))));
    }

    #[test]
    fn not_found_envelope() {
        let body = r#"{"_response_info":{"status":"not found"}}"#;
        assert!(matches!(parse_need("1", body), Err(NeedError::NotFound { .. })));
    }

    #[test]
    fn parses_need_with_null_evidence() {
        let body = r#"{
            "_response_info": { "status": "ok" },
            "id": 100019,
            "role": "To test need code",
            "goal": "provide a test need",
            "benefit": "test",
            "organisation_ids": ["foo-id"],
            "organisations": [{
                "id": "foo-id",
                "name": "Foo Name",
                "govuk_status": "joining",
                "abbreviation": "MHRA",
                "parent_ids": ["department-of-health"]
            }],
            "applies_to_all_organisations": false,
            "justifications": ["This is a test need"],
            "impact": null,
            "met_when": null,
            "yearly_user_contacts": null,
            "yearly_site_views": null,
            "other_evidence": null,
            "legislation": null,
            "in_scope": null,
            "duplicate_of": null
        }"#;

        let need = parse_need("100019", body).unwrap();

        assert_eq!(
            need,
            Need {
                id: 100019,
                role: Some("To test need code".to_string()),
                goal: Some("provide a test need".to_string()),
                benefit: Some("test".to_string()),
                organisation_ids: vec!["foo-id".to_string()],
                organisations: vec![Organisation {
                    id: "foo-id".to_string(),
                    name: "Foo Name".to_string(),
                    status: Some("joining".to_string()),
                    abbreviation: Some("MHRA".to_string()),
                    parent_ids: vec!["department-of-health".to_string()],
                    child_ids: vec![],
                }],
                justifications: vec!["This is a test need".to_string()],
                ..Default::default()
            }
        );
    }
}
