
use tracing::{debug, info, warn};

use crate::chunker::{Chunk, ChunkingConfig, chunk_text};
use crate::embeddings::Embedder;
use crate::index::{VectorIndex, l2_normalize};
use crate::{AskdocError, Result};

/// Build-once, query-many retrieval over a single document.
///
/// `build` must complete before the retriever is exposed to callers; after
/// that everything is read-only and safe for concurrent queries.
pub struct Retriever {
    chunks: Vec<Chunk>,
    index: VectorIndex,
    embedder: Box<dyn Embedder>,
}

impl Retriever {
    /// Chunk and embed `text`, then build the searchable index.
    ///
    /// Fails with a configuration error when chunking produces nothing; an
    /// empty index can never be queried meaningfully, so silently degrading
    /// is not an option.
    #[inline]
    pub fn build(
        text: &str,
        chunking: &ChunkingConfig,
        embedder: Box<dyn Embedder>,
    ) -> Result<Self> {
        let chunks = chunk_text(text, chunking)?;
        if chunks.is_empty() {
            return Err(AskdocError::Config(
                "no chunks produced from the training document; check the document contents"
                    .to_string(),
            ));
        }

        info!("Embedding {} chunks", chunks.len());
        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let mut vectors = embedder
            .embed_batch(&texts)
            .map_err(|e| AskdocError::Embedding(format!("{e:#}")))?;

        if vectors.len() != chunks.len() {
            return Err(AskdocError::Embedding(format!(
                "embedder returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        for vector in &mut vectors {
            l2_normalize(vector);
        }

        let index = VectorIndex::build(vectors)?;
        info!(
            "Built retrieval index: {} chunks, dimension {}",
            index.len(),
            index.dimension()
        );

        Ok(Self {
            chunks,
            index,
            embedder,
        })
    }

    /// Return the top-ranked chunk texts for `question`, best first.
    ///
    /// An empty result is a valid outcome, never an error; the caller
    /// decides what "no result" means to the end user.
    #[inline]
    pub fn query(&self, question: &str, top_k: usize) -> Result<Vec<String>> {
        let query_texts = [question.to_string()];
        let mut embedded = self
            .embedder
            .embed_batch(&query_texts)
            .map_err(|e| AskdocError::Embedding(format!("{e:#}")))?;

        let Some(query_vector) = embedded.first_mut() else {
            return Err(AskdocError::Embedding(
                "embedder returned no vector for the query".to_string(),
            ));
        };
        l2_normalize(query_vector);

        let ranked = self.index.search(query_vector, top_k);
        debug!(
            "Search returned {} of up to {} requested slots",
            ranked.len(),
            top_k
        );

        let mut results = Vec::with_capacity(ranked.len());
        for (slot, score) in ranked {
            match self.chunks.get(slot) {
                Some(chunk) => {
                    debug!("Matched chunk {} (score {:.4})", slot, score);
                    results.push(chunk.text.clone());
                }
                None => {
                    // An approximate backend may emit sentinel slots
                    warn!("Search returned out-of-range slot {}, dropping", slot);
                }
            }
        }

        Ok(results)
    }

    /// Number of chunks backing the index.
    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Embedding dimension of the built index.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }
}
