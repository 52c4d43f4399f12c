//! End-to-end `encode` behaviour against an in-memory engine.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use candle_core::{Device, Tensor};
use meanpool_embed::{
    EmbedError, Encoder, EncoderHandle, EngineOutput, ErrorKind, Result, SequenceSet,
};

const HIDDEN: usize = 3;
const PADDING_VALUE: f32 = 1e4;

/// Token `id` at position `t` embeds to `[id, t, 1]`; padding rows are filled
/// with a large constant so any leak shows up in the mean.
struct TableEncoder {
    calls: AtomicUsize,
}

impl TableEncoder {
    fn new() -> Self {
        Self { calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl Encoder for TableEncoder {
    async fn forward(&self, sequences: SequenceSet) -> Result<EngineOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let max_len = sequences.iter().map(Vec::len).max().unwrap_or(0).max(1);
        let mut data = Vec::with_capacity(sequences.len() * max_len * HIDDEN);
        for seq in &sequences {
            for t in 0..max_len {
                match seq.get(t) {
                    Some(&id) => data.extend([id as f32, t as f32, 1.0]),
                    None => data.extend([PADDING_VALUE; HIDDEN]),
                }
            }
        }
        let hidden = Tensor::from_vec(data, (sequences.len(), max_len, HIDDEN), &Device::Cpu)?;
        Ok(EngineOutput::HiddenState(hidden))
    }

    fn hidden_size(&self) -> usize {
        HIDDEN
    }

    fn name(&self) -> &str {
        "table"
    }
}

/// Engine that reports a fixed, unusable result.
struct FixedEncoder(fn() -> EngineOutput);

#[async_trait]
impl Encoder for FixedEncoder {
    async fn forward(&self, _sequences: SequenceSet) -> Result<EngineOutput> {
        Ok((self.0)())
    }

    fn hidden_size(&self) -> usize {
        HIDDEN
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

fn table_handle() -> (EncoderHandle, Arc<TableEncoder>) {
    let engine = Arc::new(TableEncoder::new());
    (EncoderHandle::with_engine(engine.clone()), engine)
}

#[tokio::test]
async fn test_encode_pools_each_sequence_in_order() {
    let (handle, engine) = table_handle();

    // lengths 3, 1, 2: padding on the shorter rows
    let tokens = [2, 4, 6, 10, 1, 3];
    let pooled = handle.encode(&tokens, &[3, 1, 2]).await.unwrap();

    assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        pooled,
        vec![
            vec![4.0, 1.0, 1.0],
            vec![10.0, 0.0, 1.0],
            vec![2.0, 0.5, 1.0],
        ]
    );
}

#[tokio::test]
async fn test_encode_zero_length_sequence_is_zero_vector() {
    let (handle, _) = table_handle();

    let pooled = handle.encode(&[7, 9], &[2, 0]).await.unwrap();

    assert_eq!(pooled[0], vec![8.0, 0.5, 1.0]);
    assert_eq!(pooled[1], vec![0.0; HIDDEN]);
}

#[tokio::test]
async fn test_encode_overrun_never_reaches_engine() {
    let (handle, engine) = table_handle();

    let err = handle.encode(&[1, 2, 3], &[2, 2]).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::LengthOverrun);
    assert_eq!(err.sequence_index(), Some(1));
    assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_encode_empty_batch() {
    let (handle, engine) = table_handle();
    assert!(handle.encode(&[], &[]).await.unwrap().is_empty());
    assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_encode_is_deterministic() {
    let (handle, _) = table_handle();
    let tokens = [5, 8, 13, 21, 34];
    let lengths = [2, 3];

    let first = handle.encode(&tokens, &lengths).await.unwrap();
    let second = handle.encode(&tokens, &lengths).await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_encode_normalized() {
    let (handle, _) = table_handle();
    let handle = handle.normalized(true);

    let pooled = handle.encode(&[3, 3], &[1, 1]).await.unwrap();

    for row in &pooled {
        let norm: f32 = row.iter().map(|x| x * x).sum();
        assert!((norm - 1.0).abs() < 1e-5);
    }
}

#[tokio::test]
async fn test_encode_missing_or_pooler_output_fails() {
    let no_output = EncoderHandle::with_engine(Arc::new(FixedEncoder(|| EngineOutput::NoOutput)));
    let err = no_output.encode(&[1], &[1]).await.unwrap_err();
    assert!(matches!(err, EmbedError::NoEncoderOutput));

    let pooler_only = EncoderHandle::with_engine(Arc::new(FixedEncoder(|| {
        EngineOutput::PoolerOutput(Tensor::ones((1, HIDDEN), candle_core::DType::F32, &Device::Cpu).unwrap())
    })));
    let err = pooler_only.encode(&[1], &[1]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoEncoderOutput);
}

#[tokio::test]
async fn test_encode_rejects_wrong_rank() {
    let flat = EncoderHandle::with_engine(Arc::new(FixedEncoder(|| {
        EngineOutput::HiddenState(Tensor::zeros((1, HIDDEN), candle_core::DType::F32, &Device::Cpu).unwrap())
    })));

    let err = flat.encode(&[1], &[1]).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidShape);
}

#[tokio::test]
async fn test_concurrent_requests_share_handle() {
    let (handle, engine) = table_handle();

    let tasks: Vec<_> = (0..8u32)
        .map(|i| {
            let handle = handle.clone();
            tokio::spawn(async move { handle.encode(&[i, i + 2], &[2]).await })
        })
        .collect();

    for (i, task) in tasks.into_iter().enumerate() {
        let pooled = task.await.unwrap().unwrap();
        assert_eq!(pooled, vec![vec![i as f32 + 1.0, 0.5, 1.0]]);
    }
    assert_eq!(engine.calls.load(Ordering::SeqCst), 8);
}
