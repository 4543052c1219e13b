//! GapFinder Infer — embedding engine, semantic and sentiment scoring.
//!
//! Provides the `EmbedderBackend` trait for batch embeddings. When the
//! `onnx` feature is enabled and model files are present, `OnnxEmbedder`
//! loads a multilingual sentence-transformer. Without it, `NoopEmbedder`
//! is used and semantic scoring reports an inference error.

pub mod embedder;
pub mod onnx_embedder;
pub mod semantic;
pub mod sentiment;
pub mod similarity;

pub use embedder::{EmbedderBackend, NoopEmbedder};
pub use semantic::SemanticScorer;
pub use sentiment::{SentimentBackend, VaderSentiment};
pub use similarity::cosine_similarity;

#[cfg(feature = "onnx")]
pub use onnx_embedder::OnnxEmbedder;

use std::path::Path;
use std::sync::Arc;

/// Create the best available embedder for the given model directory.
///
/// Tries ONNX first (if feature enabled and model files present),
/// falls back to NoopEmbedder.
pub fn create_embedder(model_dir: &Path) -> Arc<dyn EmbedderBackend> {
    #[cfg(feature = "onnx")]
    {
        match OnnxEmbedder::load(model_dir) {
            Ok(embedder) => {
                tracing::info!("Using ONNX embedder (dim={})", embedder.dimension());
                return Arc::new(embedder);
            }
            Err(e) => {
                tracing::warn!("ONNX embedder unavailable: {}. Semantic scoring disabled.", e);
            }
        }
    }

    #[cfg(not(feature = "onnx"))]
    {
        let _ = model_dir;
        tracing::info!("ONNX feature disabled. Semantic scoring unavailable.");
    }

    Arc::new(NoopEmbedder::new(onnx_embedder::DEFAULT_DIM))
}
