//! Encoder handle: pack, forward, pool.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::batch::pack;
use crate::bert::BertEncoder;
use crate::engine::Encoder;
use crate::model::{model_name, ModelFiles};
use crate::pooling::{l2_normalize, reduce, PooledEmbeddingSet};
use crate::{EmbedError, EncoderConfig, Result};

/// Handle over a loaded encoder.
///
/// Model path and device are fixed at construction. The handle is cheap to
/// clone and may be shared across concurrent requests; it holds no mutable
/// state and takes no locks.
#[derive(Clone)]
pub struct EncoderHandle {
    engine: Arc<dyn Encoder>,
    normalize: bool,
}

impl EncoderHandle {
    /// Load a BERT encoder from a local directory or Hub model ID.
    ///
    /// `device` must be `cpu`, `cuda[:N]` or `metal[:N]`; anything else is a
    /// construction error.
    pub async fn new(model_path: &str, device: &str) -> Result<Self> {
        Self::from_config(EncoderConfig::new(model_path, device)?).await
    }

    pub async fn from_config(config: EncoderConfig) -> Result<Self> {
        let model_path = config.model_path.clone();
        let cache_dir = config.cache_dir.clone();
        let files = tokio::task::spawn_blocking(move || {
            ModelFiles::resolve(&model_path, cache_dir.as_deref())
        })
        .await
        .map_err(|e| EmbedError::Download(e.to_string()))??;

        Self::from_files(&files, &config).await
    }

    /// Load from already resolved model files.
    pub async fn from_files(files: &ModelFiles, config: &EncoderConfig) -> Result<Self> {
        info!("Loading encoder {} on {}", config.model_path, config.device);
        let device = config.device.to_device()?;
        debug!("Using device: {:?}", device);

        let files = files.clone();
        let name = model_name(&config.model_path);
        let engine = tokio::task::spawn_blocking(move || BertEncoder::load(&files, device, name))
            .await
            .map_err(|e| EmbedError::ModelLoad(e.to_string()))??;

        Ok(Self {
            engine: Arc::new(engine),
            normalize: config.normalize,
        })
    }

    /// Wrap an already constructed engine.
    pub fn with_engine(engine: Arc<dyn Encoder>) -> Self {
        Self {
            engine,
            normalize: false,
        }
    }

    /// L2-normalize every pooled vector.
    pub fn normalized(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// Embed a flattened batch: one pooled vector per entry in `lengths`.
    ///
    /// Either every sequence is pooled or the whole call fails; an empty
    /// batch returns an empty set without touching the engine.
    pub async fn encode(&self, token_ids: &[u32], lengths: &[usize]) -> Result<PooledEmbeddingSet> {
        let sequences = pack(token_ids, lengths)?;
        if sequences.is_empty() {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let output = self.engine.forward(sequences).await?;
        let mut pooled = reduce(output, lengths)?;

        if self.normalize {
            l2_normalize(&mut pooled);
        }

        debug!(
            "Encoded {} sequences ({} tokens) in {:.2}ms",
            lengths.len(),
            token_ids.len(),
            start.elapsed().as_secs_f32() * 1000.0
        );

        Ok(pooled)
    }

    /// Width of the pooled embeddings.
    pub fn dimension(&self) -> usize {
        self.engine.hidden_size()
    }

    /// Get the model name.
    pub fn model_name(&self) -> &str {
        self.engine.name()
    }
}
