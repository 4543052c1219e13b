//! Semantic similarity of paragraphs to a fixed set of gap anchor phrases.

use std::sync::Arc;

use gapfinder_core::{notify, Error, Progress, Result};
use ndarray::{Array1, Array2};
use tracing::{debug, info};

use crate::embedder::EmbedderBackend;
use crate::similarity::normalized_matrix;

/// Texts per embedding call; bounds activation memory for long documents.
pub const EMBED_BATCH_SIZE: usize = 32;

/// Scores texts by their best cosine match against the anchor phrases.
///
/// Anchors are embedded once at construction and kept as a row-normalized
/// matrix, so scoring a batch is one embedding call and one matrix product.
pub struct SemanticScorer {
    embedder: Arc<dyn EmbedderBackend>,
    anchors: Array2<f32>,
    batch_size: usize,
}

impl SemanticScorer {
    pub fn new(embedder: Arc<dyn EmbedderBackend>, anchor_phrases: &[String]) -> Result<Self> {
        if anchor_phrases.is_empty() {
            return Err(Error::Config("at least one anchor phrase is required".into()));
        }
        let phrases: Vec<&str> = anchor_phrases.iter().map(String::as_str).collect();
        let vectors = embedder.embed_batch(&phrases)?;
        if vectors.len() != phrases.len() {
            return Err(Error::Inference(format!(
                "expected {} anchor embeddings, got {}",
                phrases.len(),
                vectors.len()
            )));
        }
        let dim = vectors[0].len();
        check_dimensions(&vectors, dim)?;
        let anchors = normalized_matrix(&vectors, dim);
        info!("Semantic scorer ready with {} anchors (dim={})", phrases.len(), dim);
        Ok(Self {
            embedder,
            anchors,
            batch_size: EMBED_BATCH_SIZE,
        })
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn anchor_count(&self) -> usize {
        self.anchors.nrows()
    }

    /// One score in [0, 1] per input text, in input order.
    pub fn score(&self, texts: &[&str], progress: Progress<'_>) -> Result<Vec<f32>> {
        if texts.is_empty() {
            return Err(Error::NoCandidates);
        }
        notify(progress, &format!("Embedding {} candidate paragraphs...", texts.len()));

        let mut vectors = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            vectors.extend(self.embedder.embed_batch(chunk)?);
        }
        if vectors.len() != texts.len() {
            return Err(Error::Scoring(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        check_dimensions(&vectors, self.anchors.ncols())?;

        let candidates = normalized_matrix(&vectors, self.anchors.ncols());
        // [n_texts, n_anchors]
        let similarities = candidates.dot(&self.anchors.t());
        let scores: Vec<f32> = similarities
            .rows()
            .into_iter()
            .map(|row| {
                row.iter()
                    .copied()
                    .fold(f32::NEG_INFINITY, f32::max)
                    .clamp(0.0, 1.0)
            })
            .collect();

        debug!("Scored {} texts against {} anchors", scores.len(), self.anchor_count());
        notify(progress, "Semantic scoring complete.");
        Ok(scores)
    }
}

fn check_dimensions(vectors: &[Array1<f32>], dim: usize) -> Result<()> {
    match vectors.iter().find(|v| v.len() != dim) {
        Some(v) => Err(Error::Scoring(format!(
            "embedding dimension {} does not match anchors ({})",
            v.len(),
            dim
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::sync::Mutex;

    /// Maps texts to fixed vectors by keyword.
    struct KeywordEmbedder;

    impl EmbedderBackend for KeywordEmbedder {
        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Array1<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    if t.contains("gap") {
                        array![1.0f32, 0.0, 0.0]
                    } else if t.contains("opposite") {
                        array![-1.0f32, 0.0, 0.0]
                    } else if t.contains("partial") {
                        array![1.0f32, 1.0, 0.0]
                    } else {
                        array![0.0f32, 0.0, 1.0]
                    }
                })
                .collect())
        }

        fn dimension(&self) -> usize {
            3
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    fn scorer() -> SemanticScorer {
        SemanticScorer::new(
            Arc::new(KeywordEmbedder),
            &["a research gap exists".to_string(), "unrelated".to_string()],
        )
        .unwrap()
    }

    #[test]
    fn test_scores_max_over_anchors() {
        let scores = scorer()
            .score(&["this gap is open", "partial overlap", "nothing here"], None)
            .unwrap();
        assert!((scores[0] - 1.0).abs() < 1e-6);
        assert!((scores[1] - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-5);
        // Matches the second anchor exactly.
        assert!((scores[2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_negative_similarity_clamped_to_zero() {
        let scorer = SemanticScorer::new(Arc::new(KeywordEmbedder), &["gap".to_string()]).unwrap();
        let scores = scorer.score(&["the opposite"], None).unwrap();
        assert_eq!(scores, vec![0.0]);
    }

    #[test]
    fn test_empty_input_is_error() {
        assert!(matches!(scorer().score(&[], None), Err(Error::NoCandidates)));
    }

    #[test]
    fn test_no_anchors_rejected() {
        assert!(matches!(
            SemanticScorer::new(Arc::new(KeywordEmbedder), &[]),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_noop_embedder_surfaces_inference_error() {
        let result = SemanticScorer::new(
            Arc::new(crate::NoopEmbedder::new(3)),
            &["gap".to_string()],
        );
        assert!(matches!(result, Err(Error::Inference(_))));
    }

    /// Records the size of every embedding call; vectors encode the text length.
    struct RecordingEmbedder {
        calls: Mutex<Vec<usize>>,
    }

    impl EmbedderBackend for RecordingEmbedder {
        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Array1<f32>>> {
            self.calls.lock().unwrap().push(texts.len());
            Ok(texts.iter().map(|t| array![1.0f32, t.len() as f32]).collect())
        }

        fn dimension(&self) -> usize {
            2
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_candidates_embedded_in_bounded_batches() {
        let embedder = Arc::new(RecordingEmbedder {
            calls: Mutex::new(Vec::new()),
        });
        let scorer = SemanticScorer::new(embedder.clone(), &["".to_string()])
            .unwrap()
            .with_batch_size(3);
        embedder.calls.lock().unwrap().clear();

        let texts: Vec<String> = (0..7).map(|n| "x".repeat(n)).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let scores = scorer.score(&refs, None).unwrap();

        assert_eq!(*embedder.calls.lock().unwrap(), vec![3, 3, 1]);
        // The anchor is [1, 0]; cosine falls as the text grows, so order survives the split.
        assert_eq!(scores.len(), 7);
        assert!((scores[0] - 1.0).abs() < 1e-6);
        assert!(scores.windows(2).all(|w| w[0] > w[1]));
    }

    /// Returns vectors of differing length.
    struct RaggedEmbedder;

    impl EmbedderBackend for RaggedEmbedder {
        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Array1<f32>>> {
            Ok(texts
                .iter()
                .enumerate()
                .map(|(i, _)| Array1::ones(i + 2))
                .collect())
        }

        fn dimension(&self) -> usize {
            2
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_ragged_anchor_vectors_rejected() {
        let result = SemanticScorer::new(
            Arc::new(RaggedEmbedder),
            &["first".to_string(), "second".to_string()],
        );
        assert!(matches!(result, Err(Error::Scoring(_))));
    }

    #[test]
    fn test_progress_reported() {
        let messages = Mutex::new(Vec::new());
        let callback = |m: &str| messages.lock().unwrap().push(m.to_string());
        scorer().score(&["gap"], Some(&callback)).unwrap();
        let messages = messages.into_inner().unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].contains("1 candidate"));
    }
}
