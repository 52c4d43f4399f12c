//! meanpool embedding server
//!
//! Run with: cargo run -p meanpool-server -- --model <dir|hub-id> --server

use std::io::BufRead;
use std::net::SocketAddr;

use clap::Parser;
use meanpool_embed::{model::model_name, EncoderHandle, ModelFiles};
use meanpool_server::{cli::Args, router::build_router, state::AppState, tokenize::load_tokenizer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("meanpool_server=info,meanpool_embed=info,tower_http=info")
            }),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = args.encoder_config()?;

    info!("Loading model from {} on {}...", config.model_path, config.device);
    let files = {
        let model_path = config.model_path.clone();
        let cache_dir = config.cache_dir.clone();
        tokio::task::spawn_blocking(move || ModelFiles::resolve(&model_path, cache_dir.as_deref()))
            .await??
    };
    let tokenizer = load_tokenizer(&files)?;
    let handle = EncoderHandle::from_files(&files, &config).await?;
    info!("Encoder ready: {} ({} dims)", handle.model_name(), handle.dimension());

    let state = AppState::new(model_name(&args.model), handle, tokenizer)
        .with_batch_size(args.batch_size)
        .with_max_length(args.max_length);

    if args.server {
        let app = build_router(state, args.limits());

        let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("Server listening on http://{}", addr);
        axum::serve(listener, app).await?;
    } else {
        let texts = if args.texts.is_empty() {
            std::io::stdin()
                .lock()
                .lines()
                .collect::<std::io::Result<Vec<_>>>()?
        } else {
            args.texts.clone()
        };

        let embedded = state.embed_texts(texts).await?;
        for embedding in &embedded.embeddings {
            println!("{}", serde_json::to_string(embedding)?);
        }
        info!(
            "Embedded {} texts ({} tokens)",
            embedded.embeddings.len(),
            embedded.prompt_tokens
        );
    }

    Ok(())
}
