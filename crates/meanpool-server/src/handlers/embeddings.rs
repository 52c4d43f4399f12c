//! OpenAI-compatible embeddings endpoint.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use crate::state::SharedState;

/// A single string or a list of strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum InputData {
    Single(String),
    Batch(Vec<String>),
}

impl InputData {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            InputData::Single(s) => vec![s],
            InputData::Batch(v) => v,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingRequest {
    pub input: InputData,
    /// Accepted for client compatibility; the server always uses its loaded model.
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    pub object: String,
    pub model: String,
    pub data: Vec<EmbeddingData>,
    pub usage: Usage,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EmbeddingData {
    pub object: String,
    pub index: usize,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub total_tokens: usize,
}

/// POST /v1/embeddings
pub async fn create_embeddings(
    State(state): State<SharedState>,
    Json(payload): Json<EmbeddingRequest>,
) -> Result<Json<EmbeddingResponse>, ApiError> {
    if let Some(requested) = payload.model.as_deref() {
        if requested != state.name {
            debug!("Request names model '{}', serving '{}'", requested, state.name);
        }
    }

    let embedded = state.embed_texts(payload.input.into_vec()).await?;

    let data = embedded
        .embeddings
        .into_iter()
        .enumerate()
        .map(|(index, embedding)| EmbeddingData {
            object: "embedding".to_string(),
            index,
            embedding,
        })
        .collect();

    Ok(Json(EmbeddingResponse {
        object: "list".to_string(),
        model: state.name.clone(),
        data,
        usage: Usage {
            prompt_tokens: embedded.prompt_tokens,
            total_tokens: embedded.prompt_tokens,
        },
    }))
}
