// Embedding generation module
// Wraps the Ollama embedding API behind the Embedder capability

pub mod ollama;

pub use ollama::OllamaClient;

use anyhow::Result;

/// Capability to map text to fixed-dimension dense vectors, batch-capable.
///
/// One shared implementation instance must serve both corpus chunks and
/// incoming queries; vectors produced by different model instances or
/// configurations are not comparable.
pub trait Embedder: Send + Sync {
    /// Embed `texts` in order, returning one vector per input text.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}
