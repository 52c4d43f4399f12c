//! Error types for the embedding service.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EmbedError>;

#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Unrecognized device '{0}' (expected cpu, cuda[:N] or metal[:N])")]
    UnknownDevice(String),

    #[error("Device error: {0}")]
    Device(String),

    #[error("Model download failed: {0}")]
    Download(String),

    /// The length table asks for more tokens than the buffer holds.
    #[error("Length overrun at sequence {index}: needs {requested} tokens but only {available} remain ({shortfall} short)", shortfall = .requested - .available)]
    LengthOverrun {
        index: usize,
        requested: usize,
        available: usize,
    },

    #[error("Length table covers {consumed} tokens but the buffer holds {total}")]
    TrailingTokens { consumed: usize, total: usize },

    #[error("Invalid hidden state shape: {0}")]
    InvalidShape(String),

    #[error("Sequence {index} has length {length} but the hidden state only holds {max_len} time steps")]
    SequenceTooLong {
        index: usize,
        length: usize,
        max_len: usize,
    },

    #[error("Encoder forward pass returned no output")]
    NoEncoderOutput,

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse failure category reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Construction,
    LengthOverrun,
    InvalidShape,
    NoEncoderOutput,
    Inference,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Construction => "construction_error",
            ErrorKind::LengthOverrun => "length_overrun_error",
            ErrorKind::InvalidShape => "invalid_shape_error",
            ErrorKind::NoEncoderOutput => "no_encoder_output_error",
            ErrorKind::Inference => "inference_error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl EmbedError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EmbedError::ModelLoad(_)
            | EmbedError::UnknownDevice(_)
            | EmbedError::Device(_)
            | EmbedError::Download(_)
            | EmbedError::Io(_)
            | EmbedError::Json(_) => ErrorKind::Construction,
            EmbedError::LengthOverrun { .. } | EmbedError::TrailingTokens { .. } => {
                ErrorKind::LengthOverrun
            }
            EmbedError::InvalidShape(_) | EmbedError::SequenceTooLong { .. } => {
                ErrorKind::InvalidShape
            }
            EmbedError::NoEncoderOutput => ErrorKind::NoEncoderOutput,
            EmbedError::Inference(_) => ErrorKind::Inference,
        }
    }

    /// Index of the sequence that triggered the failure, when one did.
    pub fn sequence_index(&self) -> Option<usize> {
        match self {
            EmbedError::LengthOverrun { index, .. } | EmbedError::SequenceTooLong { index, .. } => {
                Some(*index)
            }
            _ => None,
        }
    }
}

impl From<candle_core::Error> for EmbedError {
    fn from(e: candle_core::Error) -> Self {
        EmbedError::Inference(e.to_string())
    }
}

impl From<hf_hub::api::sync::ApiError> for EmbedError {
    fn from(e: hf_hub::api::sync::ApiError) -> Self {
        EmbedError::Download(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrun_message_names_index_and_shortfall() {
        let err = EmbedError::LengthOverrun { index: 2, requested: 5, available: 3 };
        let msg = err.to_string();
        assert!(msg.contains("sequence 2"), "{msg}");
        assert!(msg.contains("2 short"), "{msg}");
        assert_eq!(err.kind(), ErrorKind::LengthOverrun);
        assert_eq!(err.sequence_index(), Some(2));
    }

    #[test]
    fn test_kinds() {
        assert_eq!(EmbedError::UnknownDevice("tpu".into()).kind(), ErrorKind::Construction);
        assert_eq!(EmbedError::NoEncoderOutput.kind().as_str(), "no_encoder_output_error");
        assert_eq!(EmbedError::InvalidShape("rank 2".into()).kind(), ErrorKind::InvalidShape);
        assert_eq!(EmbedError::NoEncoderOutput.sequence_index(), None);
    }
}
