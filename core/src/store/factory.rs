use crate::config::Config;
use crate::store::VectorStore;
use crate::traits::Embedder;
use anyhow::Result;
use std::sync::Arc;

pub async fn open_store(
    config: &Config,
    embedder: Arc<dyn Embedder>,
) -> Result<Arc<VectorStore>> {
    let store = VectorStore::open(&config.persist_directory, &config.collection_name, embedder)
        .await?
        .with_min_score(config.min_score);
    Ok(Arc::new(store))
}
