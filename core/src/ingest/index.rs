use crate::ingest::IngestReport;
use crate::store::VectorStore;
use crate::traits::DocumentStore;
use anyhow::{Context, Result};
use tracing::{info, warn};

/// Loads an ingestion report into `store` and persists it.
///
/// Without `append` the collection is replaced. When no feed loaded at all the
/// store and its file are left untouched and an error is returned instead.
pub async fn index_report(
    store: &VectorStore,
    report: IngestReport,
    append: bool,
) -> Result<usize> {
    if report.loaded.is_empty() {
        warn!(
            failures = report.failures.len(),
            "No feed loaded, keeping the existing collection"
        );
        anyhow::bail!(
            "No feed could be loaded ({} failed); the existing collection '{}' was kept",
            report.failures.len(),
            store.name()
        );
    }

    if !append {
        store.reset().await;
    }

    let added = store
        .add(report.documents)
        .await
        .context("Failed to build the vector index")?;
    store
        .persist()
        .await
        .context("Failed to persist the vector index")?;

    info!(collection = store.name(), added, "Indexed ingested documents");
    Ok(added)
}
