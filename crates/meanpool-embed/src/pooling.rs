//! Length-aware mean pooling.

use candle_core::{DType, Tensor};
use tracing::warn;

use crate::engine::EngineOutput;
use crate::{EmbedError, Result};

/// One vector per input sequence, in length-table order.
pub type PooledEmbeddingSet = Vec<Vec<f32>>;

/// Reduce an engine result to pooled embeddings.
///
/// Only the per-token hidden state is accepted. A pooler-head result is
/// rejected so the pooling method never depends on what the engine happens
/// to expose.
pub fn reduce(output: EngineOutput, lengths: &[usize]) -> Result<PooledEmbeddingSet> {
    match output {
        EngineOutput::HiddenState(hidden) => mean_pool(&hidden, lengths),
        EngineOutput::PoolerOutput(pooled) => {
            warn!(
                "Engine returned only pooler output {:?}; mean pooling needs per-token states",
                pooled.dims()
            );
            Err(EmbedError::NoEncoderOutput)
        }
        EngineOutput::NoOutput => Err(EmbedError::NoEncoderOutput),
    }
}

/// Mean pooling over the first `lengths[i]` time steps of each sequence.
///
/// # Arguments
/// * `hidden` - Tensor of shape (batch_size, max_len, hidden_dim)
/// * `lengths` - true length of each sequence, one entry per batch row
///
/// # Returns
/// `batch_size` vectors of `hidden_dim` values. Padding rows are never read;
/// a zero-length sequence pools to the zero vector.
pub fn mean_pool(hidden: &Tensor, lengths: &[usize]) -> Result<PooledEmbeddingSet> {
    let (batch_size, max_len, hidden_dim) = match *hidden.dims() {
        [b, t, d] => (b, t, d),
        ref dims => {
            return Err(EmbedError::InvalidShape(format!(
                "expected (batch_size, max_len, hidden_dim), got {:?}",
                dims
            )))
        }
    };

    if batch_size != lengths.len() {
        return Err(EmbedError::InvalidShape(format!(
            "batch size {} does not match {} sequence lengths",
            batch_size,
            lengths.len()
        )));
    }

    let hidden = if hidden.dtype() == DType::F32 {
        hidden.clone()
    } else {
        hidden.to_dtype(DType::F32)?
    };

    let mut pooled = Vec::with_capacity(batch_size);
    for (index, &seq_len) in lengths.iter().enumerate() {
        if seq_len > max_len {
            return Err(EmbedError::SequenceTooLong {
                index,
                length: seq_len,
                max_len,
            });
        }

        if seq_len == 0 {
            pooled.push(vec![0.0f32; hidden_dim]);
            continue;
        }

        // (seq_len, hidden_dim), padding rows excluded
        let rows = hidden.get(index)?.narrow(0, 0, seq_len)?.to_vec2::<f32>()?;

        let mut sum = vec![0.0f64; hidden_dim];
        for row in &rows {
            for (acc, &value) in sum.iter_mut().zip(row) {
                *acc += f64::from(value);
            }
        }

        let inv_len = 1.0 / seq_len as f64;
        pooled.push(sum.into_iter().map(|s| (s * inv_len) as f32).collect());
    }

    Ok(pooled)
}

/// L2 normalize each embedding in place. Zero vectors are left as they are.
pub fn l2_normalize(embeddings: &mut [Vec<f32>]) {
    for embedding in embeddings.iter_mut() {
        let norm = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 1e-9 {
            embedding.iter_mut().for_each(|x| *x /= norm);
        }
    }
}
