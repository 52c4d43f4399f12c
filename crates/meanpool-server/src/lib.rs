//! meanpool-server: HTTP and CLI front end for meanpool-embed
//!
//! Provides:
//!   - `POST /v1/embeddings` (OpenAI-compatible request/response)
//!   - `GET /health`
//!   - parallel tokenization feeding batched encoder calls

pub mod cli;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;
pub mod tokenize;
