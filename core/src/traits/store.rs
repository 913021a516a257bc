use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const META_LINK: &str = "link";
pub const META_CATEGORIES: &str = "categories";
pub const META_TITLE: &str = "title";
pub const META_FEED: &str = "feed";
pub const META_PUBLISHED: &str = "published";

/// A text unit with metadata. Immutable once ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    pub metadata: BTreeMap<String, String>,
}

impl Document {
    pub fn new(
        content: impl Into<String>,
        link: impl Into<String>,
        categories: impl Into<String>,
    ) -> Self {
        let link = link.into();
        let mut metadata = BTreeMap::new();
        metadata.insert(META_CATEGORIES.to_string(), categories.into());
        metadata.insert(META_LINK.to_string(), link.clone());
        Self {
            id: format!("{:x}", md5::compute(link.as_bytes())),
            content: content.into(),
            metadata,
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn link(&self) -> &str {
        self.metadata.get(META_LINK).map(String::as_str).unwrap_or("")
    }

    pub fn categories(&self) -> &str {
        self.metadata
            .get(META_CATEGORIES)
            .map(String::as_str)
            .unwrap_or("")
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    fn name(&self) -> &str;

    async fn add(&self, documents: Vec<Document>) -> anyhow::Result<usize>;

    /// Up to `k` documents, most similar first. An empty index yields an empty list.
    async fn search(&self, query: &str, k: usize) -> anyhow::Result<Vec<Document>>;

    async fn count(&self) -> usize;
}
