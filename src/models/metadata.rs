use serde::{Deserialize, Serialize};

use crate::content::Artefact;
use crate::needs::Need;
use crate::performance::Statistics;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseInfo {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ResponseInfo {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            message: None,
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: "not found".to_string(),
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: Some(message.into()),
        }
    }
}

/// Everything known about a slug
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub artefact: Artefact,
    pub needs: Vec<Need>,
    pub performance: Statistics,
    #[serde(rename = "_response_info")]
    pub response_info: ResponseInfo,
}

/// Body returned alongside non-200 statuses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "_response_info")]
    pub response_info: ResponseInfo,
}
