use crate::config::Number;

/// Source of embedding vectors for document and query text.
///
/// The pipeline never calls a model itself; callers plug one in here and the
/// returned vector is validated like any other input.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> anyhow::Result<Vec<Number>>;

    /// Length of every vector `embed` returns.
    fn dimensions(&self) -> usize;

    /// Provider name for logging.
    fn name(&self) -> &str;
}
