use serde::{Deserialize, Serialize};

/// A sub-page of multipart content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub web_url: String,
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detail {
    pub need_ids: Vec<String>,
    pub business_proposition: bool,
    pub description: String,
    pub parts: Vec<Part>,
}

/// Editorial metadata for a slug
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artefact {
    pub id: String,
    pub web_url: String,
    pub title: String,
    pub format: String,
    pub details: Detail,
}

impl Artefact {
    /// Content spread over several sub-paths has its statistics filtered by
    /// path prefix rather than exact path.
    pub fn is_multipart(&self) -> bool {
        !self.details.parts.is_empty()
    }
}
