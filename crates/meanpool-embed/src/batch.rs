//! Ragged batch packing.
//!
//! A batch travels to the encoder as one flat token buffer plus a length
//! table. [`pack`] rebuilds the individual sequences from that pair and
//! [`FlatBatch`] is the inverse used by callers to produce it.

use crate::{EmbedError, Result};

/// Owned token id sequences, in length-table order.
pub type SequenceSet = Vec<Vec<u32>>;

/// Split a flat token buffer into sequences according to `lengths`.
///
/// `sum(lengths)` must equal `tokens.len()`. An entry that runs past the end
/// of the buffer fails with [`EmbedError::LengthOverrun`] before anything is
/// returned; tokens left over after the last entry fail with
/// [`EmbedError::TrailingTokens`]. Zero-length entries produce empty
/// sequences.
pub fn pack(tokens: &[u32], lengths: &[usize]) -> Result<SequenceSet> {
    let mut sequences = Vec::with_capacity(lengths.len());
    let mut cursor = 0usize;

    for (index, &len) in lengths.iter().enumerate() {
        let available = tokens.len() - cursor;
        if len > available {
            return Err(EmbedError::LengthOverrun {
                index,
                requested: len,
                available,
            });
        }

        sequences.push(tokens[cursor..cursor + len].to_vec());
        cursor += len;
    }

    if cursor != tokens.len() {
        return Err(EmbedError::TrailingTokens {
            consumed: cursor,
            total: tokens.len(),
        });
    }

    Ok(sequences)
}

/// Flat token buffer plus length table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatBatch {
    pub token_ids: Vec<u32>,
    pub lengths: Vec<usize>,
}

impl FlatBatch {
    /// Concatenate sequences, truncating each to `max_length` tokens if set.
    pub fn from_sequences<S: AsRef<[u32]>>(sequences: &[S], max_length: Option<usize>) -> Self {
        let mut batch = FlatBatch {
            token_ids: Vec::new(),
            lengths: Vec::with_capacity(sequences.len()),
        };
        for seq in sequences {
            batch.push(seq.as_ref(), max_length);
        }
        batch
    }

    /// Append one sequence.
    pub fn push(&mut self, ids: &[u32], max_length: Option<usize>) {
        let len = max_length.map_or(ids.len(), |max| ids.len().min(max));
        self.token_ids.extend_from_slice(&ids[..len]);
        self.lengths.push(len);
    }

    /// Number of sequences.
    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }

    /// Total number of tokens across all sequences.
    pub fn total_tokens(&self) -> usize {
        self.token_ids.len()
    }
}
