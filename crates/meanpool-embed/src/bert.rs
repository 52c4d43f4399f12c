//! BERT encoder engine using Candle.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, HiddenAct, PositionEmbeddingType};
use tracing::{debug, info};

use crate::batch::SequenceSet;
use crate::engine::{Encoder, EngineOutput};
use crate::model::ModelFiles;
use crate::{EmbedError, Result};

/// Token id used to fill padding positions.
const PAD_TOKEN_ID: u32 = 0;

/// BERT-family encoder returning the last hidden state.
///
/// Candle's BERT has no pooling head, so every forward pass yields
/// [`EngineOutput::HiddenState`].
pub struct BertEncoder {
    model: Arc<BertModel>,
    device: Device,
    hidden_size: usize,
    max_positions: usize,
    name: String,
}

impl BertEncoder {
    /// Load weights and config from resolved model files onto `device`.
    pub fn load(files: &ModelFiles, device: Device, name: impl Into<String>) -> Result<Self> {
        let start = Instant::now();
        let bert_config = Self::load_config(&files.config)?;

        let vb = if files.is_safetensors() {
            // SAFETY: the weights file is not modified while mapped.
            unsafe { VarBuilder::from_mmaped_safetensors(&[&files.weights], DType::F32, &device)? }
        } else {
            VarBuilder::from_pth(&files.weights, DType::F32, &device)?
        };

        let model = BertModel::load(vb, &bert_config)
            .map_err(|e| EmbedError::ModelLoad(e.to_string()))?;
        info!("Model loaded in {:.2}s", start.elapsed().as_secs_f32());

        Ok(Self {
            model: Arc::new(model),
            device,
            hidden_size: bert_config.hidden_size,
            max_positions: bert_config.max_position_embeddings,
            name: name.into(),
        })
    }

    /// Load BERT config from file.
    fn load_config(path: &Path) -> Result<Config> {
        let content = std::fs::read_to_string(path)?;
        let json: serde_json::Value = serde_json::from_str(&content)?;
        Ok(config_from_json(&json))
    }
}

/// Build a Candle BERT config, tolerating missing keys.
fn config_from_json(json: &serde_json::Value) -> Config {
    let usize_or = |key: &str, default: usize| {
        json.get(key)
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
            .unwrap_or(default)
    };
    let f64_or = |key: &str, default: f64| json.get(key).and_then(|v| v.as_f64()).unwrap_or(default);

    let hidden_act = match json.get("hidden_act").and_then(|v| v.as_str()) {
        Some("relu") => HiddenAct::Relu,
        Some("gelu_new") | Some("gelu_approximate") | Some("gelu_pytorch_tanh") => {
            HiddenAct::GeluApproximate
        }
        _ => HiddenAct::Gelu,
    };

    Config {
        vocab_size: usize_or("vocab_size", 30522),
        hidden_size: usize_or("hidden_size", 768),
        num_hidden_layers: usize_or("num_hidden_layers", 12),
        num_attention_heads: usize_or("num_attention_heads", 12),
        intermediate_size: usize_or("intermediate_size", 3072),
        hidden_act,
        hidden_dropout_prob: f64_or("hidden_dropout_prob", 0.1),
        max_position_embeddings: usize_or("max_position_embeddings", 512),
        type_vocab_size: usize_or("type_vocab_size", 2),
        initializer_range: f64_or("initializer_range", 0.02),
        layer_norm_eps: f64_or("layer_norm_eps", 1e-12),
        pad_token_id: usize_or("pad_token_id", 0),
        position_embedding_type: PositionEmbeddingType::Absolute,
        use_cache: true,
        classifier_dropout: None,
        model_type: None,
    }
}

/// Right-pad sequences into a (batch, max_len) id matrix and attention mask.
///
/// `max_len` is at least 1 so an all-empty batch still forms a valid input.
fn pad_batch(sequences: &SequenceSet) -> (Vec<u32>, Vec<f32>, usize) {
    let max_len = sequences.iter().map(Vec::len).max().unwrap_or(0).max(1);
    let mut ids = Vec::with_capacity(sequences.len() * max_len);
    let mut mask = Vec::with_capacity(sequences.len() * max_len);

    for seq in sequences {
        ids.extend_from_slice(seq);
        ids.extend(std::iter::repeat_n(PAD_TOKEN_ID, max_len - seq.len()));
        mask.extend(std::iter::repeat_n(1.0f32, seq.len()));
        mask.extend(std::iter::repeat_n(0.0f32, max_len - seq.len()));
    }

    (ids, mask, max_len)
}

#[async_trait]
impl Encoder for BertEncoder {
    async fn forward(&self, sequences: SequenceSet) -> Result<EngineOutput> {
        if sequences.is_empty() {
            return Ok(EngineOutput::NoOutput);
        }
        if let Some((index, seq)) = sequences
            .iter()
            .enumerate()
            .find(|(_, s)| s.len() > self.max_positions)
        {
            return Err(EmbedError::Inference(format!(
                "sequence {} has {} tokens, model supports at most {}",
                index,
                seq.len(),
                self.max_positions
            )));
        }

        let model = Arc::clone(&self.model);
        let device = self.device.clone();

        tokio::task::spawn_blocking(move || -> Result<EngineOutput> {
            let start = Instant::now();
            let batch_size = sequences.len();
            let (ids, mask, max_len) = pad_batch(&sequences);

            let input_ids = Tensor::from_vec(ids, (batch_size, max_len), &device)?;
            let token_type_ids = input_ids.zeros_like()?;
            let attention_mask = Tensor::from_vec(mask, (batch_size, max_len), &device)?;

            let hidden = model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
            debug!(
                "Forward pass over {}x{} tokens in {:.2}ms",
                batch_size,
                max_len,
                start.elapsed().as_secs_f32() * 1000.0
            );
            Ok(EngineOutput::HiddenState(hidden))
        })
        .await
        .map_err(|e| EmbedError::Inference(format!("forward task failed: {}", e)))?
    }

    fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_batch() {
        let sequences = vec![vec![101, 7, 102], vec![101, 102], vec![]];

        let (ids, mask, max_len) = pad_batch(&sequences);

        assert_eq!(max_len, 3);
        assert_eq!(ids, vec![101, 7, 102, 101, 102, 0, 0, 0, 0]);
        assert_eq!(mask, vec![1.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_pad_batch_all_empty_keeps_one_column() {
        let (ids, mask, max_len) = pad_batch(&vec![vec![], vec![]]);
        assert_eq!(max_len, 1);
        assert_eq!(ids, vec![0, 0]);
        assert_eq!(mask, vec![0.0, 0.0]);
    }

    #[test]
    fn test_config_from_json_defaults_and_overrides() {
        let json = serde_json::json!({
            "hidden_size": 384,
            "num_hidden_layers": 6,
            "hidden_act": "gelu_new",
        });

        let config = config_from_json(&json);

        assert_eq!(config.hidden_size, 384);
        assert_eq!(config.num_hidden_layers, 6);
        assert_eq!(config.max_position_embeddings, 512);
        assert_eq!(config.vocab_size, 30522);
        assert!(matches!(config.hidden_act, HiddenAct::GeluApproximate));
    }
}
