//! ONNX-based sentence embedding engine.
//!
//! Loads a SentenceTransformers ONNX export (default:
//! paraphrase-multilingual-MiniLM-L12-v2) and its tokenizer to produce
//! 384-dimensional float32 embeddings. Requires the `onnx` feature.

/// Embedding dimension of the MiniLM family.
pub const DEFAULT_DIM: usize = 384;

#[cfg(feature = "onnx")]
mod inner {
    use std::path::Path;

    use gapfinder_core::{Error, Result};
    use ndarray::Array1;
    use ort::session::Session;
    use ort::value::Tensor;
    use parking_lot::Mutex;
    use tokenizers::Tokenizer;
    use tracing::{debug, info};

    use super::DEFAULT_DIM;
    use crate::embedder::EmbedderBackend;

    /// Maximum sequence length for the model.
    const MAX_SEQ_LEN: usize = 256;

    /// Texts per forward pass.
    const MAX_BATCH_SIZE: usize = 32;

    /// Architectures whose exports take no `token_type_ids` input.
    const NO_TOKEN_TYPE_MODELS: &[&str] = &["xlm-roberta", "roberta", "distilbert", "camembert"];

    /// ONNX sentence-transformer embedder.
    pub struct OnnxEmbedder {
        session: Mutex<Session>,
        tokenizer: Tokenizer,
        uses_token_type_ids: bool,
        dimension: usize,
    }

    impl OnnxEmbedder {
        /// Load an ONNX model and tokenizer from the given directory.
        ///
        /// Expects:
        /// - `model_dir/model.onnx` — the ONNX model file
        /// - `model_dir/tokenizer.json` — the HuggingFace tokenizer
        /// - `model_dir/config.json` — optional, read for `model_type`
        pub fn load(model_dir: &Path) -> Result<Self> {
            let model_path = model_dir.join("model.onnx");
            let tokenizer_path = model_dir.join("tokenizer.json");

            if !model_path.exists() {
                return Err(Error::Inference(format!("Model not found: {}", model_path.display())));
            }
            if !tokenizer_path.exists() {
                return Err(Error::Inference(format!(
                    "Tokenizer not found: {}",
                    tokenizer_path.display()
                )));
            }

            // With load-dynamic feature, ORT_DYLIB_PATH env var must point to libonnxruntime.so
            ort::init().commit();

            let session = Session::builder()
                .map_err(|e| Error::Inference(format!("Failed to create session builder: {}", e)))?
                .with_intra_threads(2)
                .map_err(|e| Error::Inference(format!("Failed to set threads: {}", e)))?
                .commit_from_file(&model_path)
                .map_err(|e| Error::Inference(format!("Failed to load ONNX model: {}", e)))?;

            let tokenizer = Tokenizer::from_file(&tokenizer_path)
                .map_err(|e| Error::Inference(format!("Failed to load tokenizer: {}", e)))?;

            let uses_token_type_ids = model_type(model_dir)
                .map(|t| !NO_TOKEN_TYPE_MODELS.contains(&t.as_str()))
                .unwrap_or(true);

            info!(
                "ONNX embedder loaded: dim={}, model={}, token_type_ids={}",
                DEFAULT_DIM,
                model_path.display(),
                uses_token_type_ids
            );

            Ok(Self {
                session: Mutex::new(session),
                tokenizer,
                uses_token_type_ids,
                dimension: DEFAULT_DIM,
            })
        }

        /// Run one padded forward pass over at most `MAX_BATCH_SIZE` texts.
        fn infer_batch(&self, texts: &[&str]) -> Result<Vec<Array1<f32>>> {
            let encodings = self
                .tokenizer
                .encode_batch(texts.to_vec(), true)
                .map_err(|e| Error::Inference(format!("Tokenization failed: {}", e)))?;

            let batch = encodings.len();
            let seq_len = encodings
                .iter()
                .map(|e| e.get_ids().len())
                .max()
                .unwrap_or(0)
                .clamp(1, MAX_SEQ_LEN);

            let mut ids = vec![0i64; batch * seq_len];
            let mut mask = vec![0i64; batch * seq_len];
            for (row, encoding) in encodings.iter().enumerate() {
                let len = encoding.get_ids().len().min(seq_len);
                let offset = row * seq_len;
                for i in 0..len {
                    ids[offset + i] = encoding.get_ids()[i] as i64;
                    mask[offset + i] = encoding.get_attention_mask()[i] as i64;
                }
            }

            let tensor = |data: Vec<i64>, name: &str| {
                Tensor::from_array(([batch, seq_len], data))
                    .map_err(|e| Error::Inference(format!("Failed to create {} tensor: {}", name, e)))
            };
            let ids_tensor = tensor(ids, "input_ids")?;
            let mask_tensor = tensor(mask.clone(), "attention_mask")?;

            let mut session = self.session.lock();
            let outputs = if self.uses_token_type_ids {
                let type_ids_tensor = tensor(vec![0i64; batch * seq_len], "token_type_ids")?;
                session.run(ort::inputs![
                    "input_ids" => ids_tensor,
                    "attention_mask" => mask_tensor,
                    "token_type_ids" => type_ids_tensor
                ])
            } else {
                session.run(ort::inputs![
                    "input_ids" => ids_tensor,
                    "attention_mask" => mask_tensor
                ])
            }
            .map_err(|e| Error::Inference(format!("ONNX inference failed: {}", e)))?;

            // SentenceTransformers exports output either:
            //   [batch, seq_len, dim] (token_embeddings) → needs mean pooling
            //   [batch, dim] (sentence_embedding) → already pooled
            let (shape, data) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| Error::Inference(format!("Failed to extract output tensor: {}", e)))?;
            let dims: Vec<i64> = shape.iter().copied().collect();

            let mut embeddings = Vec::with_capacity(batch);
            match dims.as_slice() {
                [_, s, d] => {
                    let (s, d) = (*s as usize, *d as usize);
                    for row in 0..batch {
                        let row_mask = &mask[row * seq_len..row * seq_len + s.min(seq_len)];
                        let mask_sum: f32 = row_mask.iter().map(|&m| m as f32).sum();
                        let mut pooled = Array1::<f32>::zeros(d);
                        if mask_sum > 0.0 {
                            for (t, &m) in row_mask.iter().enumerate() {
                                if m > 0 {
                                    let base = (row * s + t) * d;
                                    for k in 0..d {
                                        pooled[k] += data[base + k];
                                    }
                                }
                            }
                            pooled /= mask_sum;
                        }
                        embeddings.push(l2_normalize(pooled));
                    }
                }
                [_, d] => {
                    let d = *d as usize;
                    for row in 0..batch {
                        let slice = &data[row * d..(row + 1) * d];
                        embeddings.push(l2_normalize(Array1::from_vec(slice.to_vec())));
                    }
                }
                other => {
                    return Err(Error::Inference(format!("Unexpected output shape: {:?}", other)));
                }
            }

            debug!("Embedded batch of {} (seq_len={})", batch, seq_len);
            Ok(embeddings)
        }
    }

    impl EmbedderBackend for OnnxEmbedder {
        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Array1<f32>>> {
            let mut embeddings = Vec::with_capacity(texts.len());
            for chunk in texts.chunks(MAX_BATCH_SIZE) {
                embeddings.extend(self.infer_batch(chunk)?);
            }
            Ok(embeddings)
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    fn l2_normalize(v: Array1<f32>) -> Array1<f32> {
        let norm = v.dot(&v).sqrt();
        if norm > 1e-12 {
            v / norm
        } else {
            v
        }
    }

    fn model_type(model_dir: &Path) -> Option<String> {
        let raw = std::fs::read_to_string(model_dir.join("config.json")).ok()?;
        let config: serde_json::Value = serde_json::from_str(&raw).ok()?;
        config["model_type"].as_str().map(str::to_string)
    }
}

#[cfg(feature = "onnx")]
pub use inner::OnnxEmbedder;
