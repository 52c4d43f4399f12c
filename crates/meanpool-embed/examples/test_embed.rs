//! Encode a pre-tokenized batch with a BERT checkpoint.
//!
//! cargo run -p meanpool-embed --example test_embed -- [model] [device]

use meanpool_embed::EncoderHandle;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let model = args
        .next()
        .unwrap_or_else(|| "sentence-transformers/all-MiniLM-L6-v2".to_string());
    let device = args.next().unwrap_or_else(|| "cpu".to_string());

    println!("Loading {} on {}...", model, device);
    let handle = EncoderHandle::new(&model, &device).await?;

    // [CLS] hello world [SEP] / [CLS] hello [SEP] / empty
    let token_ids = [101, 7592, 2088, 102, 101, 7592, 102];
    let lengths = [4, 3, 0];

    let start = std::time::Instant::now();
    let embeddings = handle.encode(&token_ids, &lengths).await?;
    println!(
        "Generated {} embeddings of dimension {} in {:.2}ms",
        embeddings.len(),
        handle.dimension(),
        start.elapsed().as_secs_f64() * 1000.0
    );

    for (i, emb) in embeddings.iter().enumerate() {
        let head: Vec<String> = emb.iter().take(5).map(|x| format!("{:.4}", x)).collect();
        println!("  {} (len {}): [{}, ...]", i, lengths[i], head.join(", "));
    }

    println!(
        "\nCosine similarity 0 vs 1: {:.4}",
        cosine_similarity(&embeddings[0], &embeddings[1])
    );

    Ok(())
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    dot / (norm_a * norm_b)
}
