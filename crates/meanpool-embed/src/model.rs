//! Locating model files on disk or on the Hugging Face Hub.

use std::path::{Path, PathBuf};

use hf_hub::api::sync::{Api, ApiBuilder};
use hf_hub::{Repo, RepoType};
use tracing::info;

use crate::{EmbedError, Result};

/// Files making up a pretrained encoder.
#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub config: PathBuf,
    pub weights: PathBuf,
    /// `tokenizer.json`, when the model ships one.
    pub tokenizer: Option<PathBuf>,
    /// `vocab.txt` for older BERT checkpoints without `tokenizer.json`.
    pub vocab: Option<PathBuf>,
}

impl ModelFiles {
    /// Resolve `model_path` as a local directory if it exists, otherwise as a
    /// Hub model ID (blocking download).
    pub fn resolve(model_path: &str, cache_dir: Option<&str>) -> Result<Self> {
        let dir = Path::new(model_path);
        if dir.is_dir() {
            Self::from_dir(dir)
        } else {
            Self::download(model_path, cache_dir)
        }
    }

    /// Use files from a local model directory.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let existing = |name: &str| Some(dir.join(name)).filter(|p| p.is_file());

        let config = existing("config.json").ok_or_else(|| {
            EmbedError::ModelLoad(format!("no config.json in {}", dir.display()))
        })?;
        let weights = existing("model.safetensors")
            .or_else(|| existing("pytorch_model.bin"))
            .ok_or_else(|| {
                EmbedError::ModelLoad(format!(
                    "no model.safetensors or pytorch_model.bin in {}",
                    dir.display()
                ))
            })?;

        Ok(Self {
            config,
            weights,
            tokenizer: existing("tokenizer.json"),
            vocab: existing("vocab.txt"),
        })
    }

    /// Download from the Hugging Face Hub using the sync API.
    pub fn download(model_id: &str, cache_dir: Option<&str>) -> Result<Self> {
        let api = match cache_dir {
            Some(dir) => ApiBuilder::new().with_cache_dir(PathBuf::from(dir)).build(),
            None => Api::new(),
        }
        .map_err(|e| EmbedError::Download(format!("API init: {}", e)))?;

        let repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

        info!("Downloading config.json for {}...", model_id);
        let config = repo
            .get("config.json")
            .map_err(|e| EmbedError::Download(format!("config.json: {}", e)))?;

        // Try tokenizer.json first (newer format), fall back to vocab.txt (older BERT models)
        let tokenizer = repo.get("tokenizer.json").ok();
        let vocab = if tokenizer.is_none() {
            info!("tokenizer.json not found, fetching vocab.txt");
            Some(
                repo.get("vocab.txt")
                    .map_err(|e| EmbedError::Download(format!("vocab.txt: {}", e)))?,
            )
        } else {
            None
        };

        info!("Downloading model weights...");
        let weights = repo
            .get("model.safetensors")
            .or_else(|_| repo.get("pytorch_model.bin"))
            .map_err(|e| EmbedError::Download(format!("model weights: {}", e)))?;
        info!("Weights at: {:?}", weights);

        Ok(Self {
            config,
            weights,
            tokenizer,
            vocab,
        })
    }

    pub fn is_safetensors(&self) -> bool {
        self.weights
            .extension()
            .map(|e| e == "safetensors")
            .unwrap_or(false)
    }
}

/// Short display name for a model path: the last path component.
pub fn model_name(model_path: &str) -> String {
    Path::new(model_path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("model")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("meanpool-model-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_from_dir_prefers_safetensors() {
        let dir = scratch_dir("safetensors");
        for file in ["config.json", "model.safetensors", "pytorch_model.bin", "tokenizer.json"] {
            fs::write(dir.join(file), b"{}").unwrap();
        }

        let files = ModelFiles::from_dir(&dir).unwrap();

        assert_eq!(files.weights, dir.join("model.safetensors"));
        assert!(files.is_safetensors());
        assert_eq!(files.tokenizer, Some(dir.join("tokenizer.json")));
        assert!(files.vocab.is_none());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_from_dir_falls_back_to_bin_and_vocab() {
        let dir = scratch_dir("bin");
        for file in ["config.json", "pytorch_model.bin", "vocab.txt"] {
            fs::write(dir.join(file), b"").unwrap();
        }

        let files = ModelFiles::from_dir(&dir).unwrap();

        assert!(!files.is_safetensors());
        assert!(files.tokenizer.is_none());
        assert_eq!(files.vocab, Some(dir.join("vocab.txt")));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_from_dir_requires_config_and_weights() {
        let dir = scratch_dir("missing");
        assert!(matches!(ModelFiles::from_dir(&dir), Err(EmbedError::ModelLoad(_))));

        fs::write(dir.join("config.json"), b"{}").unwrap();
        let err = ModelFiles::from_dir(&dir).unwrap_err();
        assert!(err.to_string().contains("model.safetensors"), "{err}");
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_model_name() {
        assert_eq!(model_name("/models/all-MiniLM-L6-v2"), "all-MiniLM-L6-v2");
        assert_eq!(model_name("BAAI/bge-small-en-v1.5"), "bge-small-en-v1.5");
        assert_eq!(model_name("/"), "model");
    }
}
