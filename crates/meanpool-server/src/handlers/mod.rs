//! HTTP handlers.

pub mod embeddings;
pub mod health;
