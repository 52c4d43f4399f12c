//! Inference engine boundary.

use async_trait::async_trait;
use candle_core::Tensor;

use crate::batch::SequenceSet;
use crate::Result;

/// Result of one forward pass.
#[derive(Debug)]
pub enum EngineOutput {
    /// Last hidden state, shape (batch_size, max_len, hidden_dim).
    HiddenState(Tensor),

    /// Output of a dedicated pooling head, shape (batch_size, hidden_dim).
    /// Never used for embeddings; see [`crate::pooling::reduce`].
    PoolerOutput(Tensor),

    /// The engine ran but produced nothing usable.
    NoOutput,
}

/// A pretrained encoder that turns token id sequences into per-token states.
///
/// Implementations must be safe to call from several requests at once.
/// Padding is the engine's business: rows past a sequence's true length may
/// hold anything.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Run a single forward pass over the whole batch.
    async fn forward(&self, sequences: SequenceSet) -> Result<EngineOutput>;

    /// Width of the per-token hidden state.
    fn hidden_size(&self) -> usize;

    fn name(&self) -> &str;
}
