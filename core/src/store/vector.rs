use crate::traits::{Document, DocumentStore, Embedder};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    document: Document,
    vector: Vec<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CollectionFile {
    name: String,
    embedder: String,
    entries: Vec<Entry>,
}

/// Cosine-similarity index over embedded documents, optionally backed by a
/// named collection file on disk.
pub struct VectorStore {
    name: String,
    path: Option<PathBuf>,
    embedder: Arc<dyn Embedder>,
    min_score: Option<f32>,
    entries: RwLock<Vec<Entry>>,
}

impl VectorStore {
    pub fn in_memory(name: impl Into<String>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            name: name.into(),
            path: None,
            embedder,
            min_score: None,
            entries: RwLock::new(Vec::new()),
        }
    }

    pub fn collection_path(dir: &Path, name: &str) -> PathBuf {
        dir.join(format!("{name}.json"))
    }

    pub fn exists(dir: &Path, name: &str) -> bool {
        Self::collection_path(dir, name).exists()
    }

    /// Opens the collection `name` under `dir`, loading it when the file exists.
    pub async fn open(dir: &Path, name: &str, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let path = Self::collection_path(dir, name);
        let mut store = Self::in_memory(name, embedder);

        if path.exists() {
            let raw = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read collection {}", path.display()))?;
            let file: CollectionFile = serde_json::from_slice(&raw)
                .with_context(|| format!("Failed to parse collection {}", path.display()))?;

            if file.embedder != store.embedder.name() {
                tracing::warn!(
                    collection = name,
                    stored = %file.embedder,
                    current = store.embedder.name(),
                    "Collection was built with a different embedder, rebuild it before searching"
                );
            }

            info!(collection = name, documents = file.entries.len(), "Loaded collection");
            store.entries = RwLock::new(file.entries);
        }

        store.path = Some(path);
        Ok(store)
    }

    pub fn with_min_score(mut self, min_score: Option<f32>) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub async fn reset(&self) {
        self.entries.write().await.clear();
    }

    /// Writes the collection to its file. A store without a path is a no-op.
    pub async fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let body = {
            let entries = self.entries.read().await;
            serde_json::to_vec(&CollectionFile {
                name: self.name.clone(),
                embedder: self.embedder.name().to_string(),
                entries: entries.clone(),
            })?
        };

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, path)
            .await
            .with_context(|| format!("Failed to replace {}", path.display()))?;

        debug!(path = %path.display(), "Persisted collection");
        Ok(())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    let score = dot / (norm_a * norm_b);
    if score.is_finite() { score } else { 0.0 }
}

#[async_trait]
impl DocumentStore for VectorStore {
    fn name(&self) -> &str {
        &self.name
    }

    /// Documents whose id is already indexed are skipped.
    async fn add(&self, documents: Vec<Document>) -> Result<usize> {
        let fresh: Vec<Document> = {
            let entries = self.entries.read().await;
            let mut seen: HashSet<String> =
                entries.iter().map(|e| e.document.id.clone()).collect();
            documents
                .into_iter()
                .filter(|d| seen.insert(d.id.clone()))
                .collect()
        };

        if fresh.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = fresh.iter().map(|d| d.content.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;
        if vectors.len() != fresh.len() {
            return Err(anyhow::anyhow!(
                "Embedder returned {} vectors for {} documents",
                vectors.len(),
                fresh.len()
            ));
        }

        let mut entries = self.entries.write().await;
        let mut added = 0;
        for (document, vector) in fresh.into_iter().zip(vectors) {
            if entries.iter().any(|e| e.document.id == document.id) {
                continue;
            }
            entries.push(Entry { document, vector });
            added += 1;
        }

        Ok(added)
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<Document>> {
        if k == 0 || self.entries.read().await.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self
            .embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("Embedder returned no vector for query"))?;

        let entries = self.entries.read().await;
        if let Some(stale) = entries.iter().find(|e| e.vector.len() != query_vector.len()) {
            anyhow::bail!(
                "Collection '{}' holds {}-dimensional vectors but the embedder produced {}; \
                 rebuild it with 'feedsage ingest'",
                self.name,
                stale.vector.len(),
                query_vector.len()
            );
        }

        let mut scored: Vec<(f32, &Entry)> = entries
            .iter()
            .map(|e| (cosine_similarity(&query_vector, &e.vector), e))
            .filter(|(score, _)| self.min_score.is_none_or(|min| *score >= min))
            .collect();

        // Stable sort keeps insertion order between equal scores.
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(_, e)| e.document.clone())
            .collect())
    }

    async fn count(&self) -> usize {
        self.entries.read().await.len()
    }
}
