//! Embedding engine trait and implementations.
//!
//! The `EmbedderBackend` trait abstracts over embedding generation.
//! Implementations:
//! - `OnnxEmbedder`: ONNX Runtime sentence-transformer (requires `onnx` feature)
//! - `NoopEmbedder`: no model loaded; every call fails with an inference error

use gapfinder_core::{Error, Result};
use ndarray::Array1;

/// Trait for embedding backends.
pub trait EmbedderBackend: Send + Sync {
    /// Embed a batch of texts, one vector per input, in input order.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Array1<f32>>>;

    /// Embed a single text.
    fn embed(&self, text: &str) -> Result<Array1<f32>> {
        self.embed_batch(&[text])?
            .pop()
            .ok_or_else(|| Error::Inference("embedder returned no vector".into()))
    }

    /// Get the embedding dimension.
    fn dimension(&self) -> usize;

    /// Check if the embedder is available (model loaded).
    fn is_available(&self) -> bool;
}

/// Placeholder embedder used when no model could be loaded.
pub struct NoopEmbedder {
    dim: usize,
}

impl NoopEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl EmbedderBackend for NoopEmbedder {
    fn embed_batch(&self, _texts: &[&str]) -> Result<Vec<Array1<f32>>> {
        Err(Error::Inference("no embedding model loaded".into()))
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn is_available(&self) -> bool {
        false
    }
}
