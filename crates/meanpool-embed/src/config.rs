//! Configuration for the encoder handle.

use std::fmt;
use std::str::FromStr;

use candle_core::Device;
use serde::{Deserialize, Serialize};

use crate::{EmbedError, Result};

/// Hardware target the engine runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub enum DeviceKind {
    #[default]
    Cpu,
    Cuda(usize),
    Metal(usize),
}

impl DeviceKind {
    /// Instantiate the Candle device. Fails if the backend was not compiled in
    /// or the ordinal does not exist; there is no silent CPU fallback.
    pub fn to_device(self) -> Result<Device> {
        match self {
            DeviceKind::Cpu => Ok(Device::Cpu),
            DeviceKind::Cuda(ordinal) => Device::new_cuda(ordinal)
                .map_err(|e| EmbedError::Device(format!("cuda:{}: {}", ordinal, e))),
            DeviceKind::Metal(ordinal) => Device::new_metal(ordinal)
                .map_err(|e| EmbedError::Device(format!("metal:{}: {}", ordinal, e))),
        }
    }

    pub fn is_gpu(&self) -> bool {
        !matches!(self, DeviceKind::Cpu)
    }
}

impl FromStr for DeviceKind {
    type Err = EmbedError;

    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_ascii_lowercase();
        let (name, ordinal) = match lowered.split_once(':') {
            Some((name, idx)) => {
                let idx = idx
                    .parse::<usize>()
                    .map_err(|_| EmbedError::UnknownDevice(s.to_string()))?;
                (name, Some(idx))
            }
            None => (lowered.as_str(), None),
        };

        match (name, ordinal) {
            ("cpu", None) => Ok(DeviceKind::Cpu),
            ("cuda", idx) => Ok(DeviceKind::Cuda(idx.unwrap_or(0))),
            ("metal", idx) => Ok(DeviceKind::Metal(idx.unwrap_or(0))),
            _ => Err(EmbedError::UnknownDevice(s.to_string())),
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Cpu => write!(f, "cpu"),
            DeviceKind::Cuda(i) => write!(f, "cuda:{}", i),
            DeviceKind::Metal(i) => write!(f, "metal:{}", i),
        }
    }
}

impl TryFrom<String> for DeviceKind {
    type Error = EmbedError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<DeviceKind> for String {
    fn from(value: DeviceKind) -> Self {
        value.to_string()
    }
}

/// Configuration for an [`EncoderHandle`](crate::EncoderHandle).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Local model directory or Hugging Face model ID
    pub model_path: String,

    /// Target device (default: cpu)
    #[serde(default)]
    pub device: DeviceKind,

    /// L2-normalize pooled embeddings (default: false)
    #[serde(default)]
    pub normalize: bool,

    /// Cache directory for downloaded models
    #[serde(default)]
    pub cache_dir: Option<String>,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            model_path: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            device: DeviceKind::Cpu,
            normalize: false,
            cache_dir: None,
        }
    }
}

impl EncoderConfig {
    /// Build a config from the construction pair, validating the device name.
    pub fn new(model_path: impl Into<String>, device: &str) -> Result<Self> {
        Ok(Self {
            model_path: model_path.into(),
            device: device.parse()?,
            ..Default::default()
        })
    }

    /// Use a custom model.
    pub fn with_model(mut self, model_path: impl Into<String>) -> Self {
        self.model_path = model_path.into();
        self
    }

    pub fn with_device(mut self, device: DeviceKind) -> Self {
        self.device = device;
        self
    }

    /// Enable L2 normalization of the pooled output.
    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<String>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }
}
