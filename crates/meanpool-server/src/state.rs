//! Shared application state.

use std::sync::Arc;

use meanpool_embed::{EncoderHandle, FlatBatch};
use tokenizers::Tokenizer;
use tracing::debug;

use crate::error::ApiError;
use crate::tokenize::tokenize_texts;

/// Embeddings for a list of texts plus the number of tokens consumed.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedTexts {
    pub embeddings: Vec<Vec<f32>>,
    pub prompt_tokens: usize,
}

/// State shared by every request.
pub struct AppState {
    /// Model name reported to clients
    pub name: String,
    pub handle: EncoderHandle,
    pub tokenizer: Arc<Tokenizer>,
    /// Sequences per forward pass
    pub batch_size: usize,
    /// Tokens kept per text
    pub max_length: usize,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(name: impl Into<String>, handle: EncoderHandle, tokenizer: Tokenizer) -> Self {
        Self {
            name: name.into(),
            handle,
            tokenizer: Arc::new(tokenizer),
            batch_size: 32,
            max_length: 512,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    /// Tokenize and embed `texts`, one forward pass per `batch_size` chunk.
    ///
    /// Embeddings come back in input order. Any failing chunk fails the
    /// whole call.
    pub async fn embed_texts(&self, texts: Vec<String>) -> Result<EmbeddedTexts, ApiError> {
        if texts.is_empty() {
            return Err(ApiError::BadRequest("Input is empty".to_string()));
        }

        let tokenizer = Arc::clone(&self.tokenizer);
        let max_length = self.max_length;
        let sequences = tokio::task::spawn_blocking(move || {
            tokenize_texts(&tokenizer, &texts, max_length)
        })
        .await?
        .map_err(|e| ApiError::Tokenizer(e.to_string()))?;

        let mut embeddings = Vec::with_capacity(sequences.len());
        let mut prompt_tokens = 0;

        for chunk in sequences.chunks(self.batch_size) {
            let batch = FlatBatch::from_sequences(chunk, None);
            prompt_tokens += batch.total_tokens();

            let pooled = self.handle.encode(&batch.token_ids, &batch.lengths).await?;
            embeddings.extend(pooled);
        }

        debug!(
            "Embedded {} texts ({} tokens) with {}",
            embeddings.len(),
            prompt_tokens,
            self.name
        );

        Ok(EmbeddedTexts {
            embeddings,
            prompt_tokens,
        })
    }
}
