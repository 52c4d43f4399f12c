//! Command-line arguments.

use clap::Parser;
use meanpool_embed::{EncoderConfig, Result};

use crate::router::Limits;

#[derive(Parser, Debug, Clone)]
#[command(name = "meanpool", version, about = "Mean-pooled sentence embeddings")]
pub struct Args {
    /// Local model directory or Hugging Face model ID
    #[arg(short, long, env = "MEANPOOL_MODEL")]
    pub model: String,

    /// Device to run on: cpu, cuda[:N] or metal[:N]
    #[arg(short, long, env = "MEANPOOL_DEVICE", default_value = "cpu")]
    pub device: String,

    /// Serve the HTTP API instead of embedding `texts`
    #[arg(long, default_value_t = false)]
    pub server: bool,

    #[arg(long, env = "MEANPOOL_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "MEANPOOL_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Sequences per forward pass
    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Tokens kept per text
    #[arg(long, default_value_t = 512)]
    pub max_length: usize,

    /// L2-normalize embeddings
    #[arg(long, default_value_t = false)]
    pub normalize: bool,

    /// Cache directory for Hub downloads
    #[arg(long, env = "MEANPOOL_CACHE_DIR")]
    pub cache_dir: Option<String>,

    #[arg(long, default_value_t = 10 * 1024 * 1024)]
    pub max_payload_bytes: usize,

    #[arg(long, default_value_t = 100)]
    pub max_concurrency: usize,

    /// Texts to embed in CLI mode; read from stdin, one per line, when empty
    pub texts: Vec<String>,
}

impl Args {
    /// Encoder settings; fails on an unrecognized device.
    pub fn encoder_config(&self) -> Result<EncoderConfig> {
        let mut config = EncoderConfig::new(&self.model, &self.device)?.with_normalize(self.normalize);
        if let Some(dir) = &self.cache_dir {
            config = config.with_cache_dir(dir);
        }
        Ok(config)
    }

    pub fn limits(&self) -> Limits {
        Limits {
            max_payload_bytes: self.max_payload_bytes,
            max_concurrency: self.max_concurrency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meanpool_embed::DeviceKind;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["meanpool", "--model", "/models/minilm"]).unwrap();

        assert_eq!(args.device, "cpu");
        assert!(!args.server);
        assert_eq!(args.port, 3000);
        assert_eq!(args.batch_size, 32);
        assert_eq!(args.limits().max_payload_bytes, 10 * 1024 * 1024);
        assert!(args.texts.is_empty());
    }

    #[test]
    fn test_encoder_config() {
        let args = Args::try_parse_from([
            "meanpool", "-m", "bge-small", "-d", "cuda:1", "--normalize", "hello", "world",
        ])
        .unwrap();

        let config = args.encoder_config().unwrap();

        assert_eq!(config.device, DeviceKind::Cuda(1));
        assert!(config.normalize);
        assert_eq!(args.texts, vec!["hello", "world"]);
    }

    #[test]
    fn test_unknown_device() {
        let args = Args::try_parse_from(["meanpool", "-m", "x", "-d", "abacus"]).unwrap();
        assert!(args.encoder_config().is_err());
    }
}
