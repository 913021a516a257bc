//! RSS/Atom ingestion: fetches each configured feed, turns entries into
//! [`Document`]s and drops entries whose link has already been seen.
//!
//! Deduplication is by exact link string. Near-duplicate stories syndicated
//! under different links are kept.

use crate::error::IngestError;
use crate::traits::Document;
use crate::traits::store::{META_FEED, META_PUBLISHED, META_TITLE};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Default)]
pub struct IngestReport {
    pub documents: Vec<Document>,
    /// `(feed url, entries in the feed)` for every feed that parsed.
    pub loaded: Vec<(String, usize)>,
    pub failures: Vec<IngestError>,
}

pub struct FeedIngestor {
    client: reqwest::Client,
    feeds: Vec<String>,
}

impl FeedIngestor {
    pub fn new(feeds: Vec<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(30))
            .user_agent(concat!("feedsage/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self { client, feeds }
    }

    pub fn feeds(&self) -> &[String] {
        &self.feeds
    }

    /// Ingests every feed in order. A feed that fails is recorded and skipped.
    pub async fn ingest(&self) -> IngestReport {
        let mut report = IngestReport::default();
        let mut seen_links = HashSet::new();

        for url in &self.feeds {
            match self.fetch(url).await {
                Ok(body) => match documents_from_feed(&body, url, &mut seen_links) {
                    Ok((documents, entries)) => {
                        info!("Loaded {} entries from {}", entries, url);
                        report.documents.extend(documents);
                        report.loaded.push((url.clone(), entries));
                    }
                    Err(e) => {
                        warn!("Error processing {}: {}", url, e);
                        report.failures.push(e);
                    }
                },
                Err(e) => {
                    warn!("Error processing {}: {}", url, e);
                    report.failures.push(e);
                }
            }
        }

        report
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, IngestError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| IngestError::Fetch {
                url: url.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(IngestError::Status {
                url: url.to_string(),
                status: response.status(),
            });
        }

        let body = response.bytes().await.map_err(|source| IngestError::Fetch {
            url: url.to_string(),
            source,
        })?;
        Ok(body.to_vec())
    }
}

/// Parses one feed body. Returns the new documents and the total number of
/// entries the feed carried (including skipped duplicates).
pub fn documents_from_feed(
    body: &[u8],
    url: &str,
    seen_links: &mut HashSet<String>,
) -> Result<(Vec<Document>, usize), IngestError> {
    let feed = feed_rs::parser::parse(body).map_err(|source| IngestError::Parse {
        url: url.to_string(),
        source,
    })?;

    let total = feed.entries.len();
    let mut documents = Vec::new();

    for entry in feed.entries {
        let link = entry
            .links
            .first()
            .map(|l| l.href.clone())
            .unwrap_or_default();
        if !seen_links.insert(link.clone()) {
            continue;
        }

        let title = entry.title.map(|t| t.content).unwrap_or_default();
        let mut content = title.clone();
        if let Some(body) = entry.content.and_then(|c| c.body) {
            content.push('\n');
            content.push_str(&body);
        }
        if let Some(summary) = entry.summary {
            content.push('\n');
            content.push_str(&summary.content);
        }

        let categories = entry
            .categories
            .iter()
            .map(|c| c.term.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let mut document = Document::new(content, link, categories)
            .with_metadata(META_TITLE, title)
            .with_metadata(META_FEED, url);
        if let Some(published) = entry.published.or(entry.updated) {
            document = document.with_metadata(META_PUBLISHED, published.to_rfc3339());
        }
        documents.push(document);
    }

    Ok((documents, total))
}
