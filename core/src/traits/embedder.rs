use async_trait::async_trait;

#[async_trait]
pub trait Embedder: Send + Sync {
    fn name(&self) -> &str;

    /// One vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}
