//! Text tokenization for the encoder.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use meanpool_embed::ModelFiles;
use rayon::prelude::*;
use serde_json::json;
use tokenizers::Tokenizer;
use tracing::info;

/// Load the tokenizer shipped with a model.
///
/// Uses `tokenizer.json` when present, otherwise builds a BERT WordPiece
/// tokenizer (lowercasing, [CLS]/[SEP]) from `vocab.txt`.
pub fn load_tokenizer(files: &ModelFiles) -> anyhow::Result<Tokenizer> {
    if let Some(path) = &files.tokenizer {
        info!("Loading tokenizer from {}", path.display());
        return Tokenizer::from_file(path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e));
    }

    let vocab_path = files
        .vocab
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("Model has neither tokenizer.json nor vocab.txt"))?;
    info!("tokenizer.json not found, building from {}", vocab_path.display());
    wordpiece_from_vocab(vocab_path)
}

fn wordpiece_from_vocab(path: &Path) -> anyhow::Result<Tokenizer> {
    let content = std::fs::read_to_string(path)?;
    let vocab: HashMap<String, u32> = content
        .lines()
        .enumerate()
        .map(|(i, line)| (line.to_string(), i as u32))
        .collect();
    info!("Loaded vocab with {} tokens", vocab.len());

    let special = |token: &str| {
        vocab
            .get(token)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("vocab.txt is missing {}", token))
    };
    let cls = special("[CLS]")?;
    let sep = special("[SEP]")?;
    special("[UNK]")?;

    let spec = json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": {
            "type": "BertNormalizer",
            "clean_text": true,
            "handle_chinese_chars": true,
            "strip_accents": null,
            "lowercase": true
        },
        "pre_tokenizer": { "type": "BertPreTokenizer" },
        "post_processor": {
            "type": "BertProcessing",
            "sep": ["[SEP]", sep],
            "cls": ["[CLS]", cls]
        },
        "decoder": null,
        "model": {
            "type": "WordPiece",
            "unk_token": "[UNK]",
            "continuing_subword_prefix": "##",
            "max_input_chars_per_word": 100,
            "vocab": vocab
        }
    });

    Tokenizer::from_str(&spec.to_string())
        .map_err(|e| anyhow::anyhow!("WordPiece build: {}", e))
}

/// Tokenize texts in parallel, adding special tokens and truncating each to
/// `max_length`. Output order matches input order.
pub fn tokenize_texts(
    tokenizer: &Tokenizer,
    texts: &[String],
    max_length: usize,
) -> anyhow::Result<Vec<Vec<u32>>> {
    texts
        .par_iter()
        .map(|text| {
            let encoding = tokenizer
                .encode(text.as_str(), true)
                .map_err(|e| anyhow::anyhow!("Tokenizer error: {}", e))?;
            let ids = encoding.get_ids();
            Ok(ids[..ids.len().min(max_length)].to_vec())
        })
        .collect()
}
