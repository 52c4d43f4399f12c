//! meanpool embedding core
//!
//! Fixed-size sentence embeddings from a pretrained encoder using Candle
//! (Hugging Face). No Python dependency - direct model loading from a local
//! directory or the Hugging Face Hub.
//!
//! # Pipeline
//! - [`batch::pack`] rebuilds ragged sequences from a flat token buffer and a
//!   length table
//! - an [`Encoder`] runs one forward pass over the batch
//! - [`pooling::reduce`] mean-pools each sequence over its true length only
//!
//! # Example
//! ```no_run
//! use meanpool_embed::EncoderHandle;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let handle = EncoderHandle::new("sentence-transformers/all-MiniLM-L6-v2", "cpu").await?;
//!
//!     // Two tokenized sentences, flattened
//!     let token_ids = [101, 7592, 2088, 102, 101, 2129, 102];
//!     let lengths = [4, 3];
//!
//!     let embeddings = handle.encode(&token_ids, &lengths).await?;
//!     println!("Embedding dimension: {}", embeddings[0].len()); // 384
//!
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod bert;
pub mod config;
pub mod embedder;
pub mod engine;
pub mod error;
pub mod model;
pub mod pooling;

pub use batch::{pack, FlatBatch, SequenceSet};
pub use bert::BertEncoder;
pub use config::{DeviceKind, EncoderConfig};
pub use embedder::EncoderHandle;
pub use engine::{Encoder, EngineOutput};
pub use error::{EmbedError, ErrorKind, Result};
pub use model::ModelFiles;
pub use pooling::{mean_pool, PooledEmbeddingSet};
