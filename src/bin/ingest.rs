use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use council_search::chunking::{MetadataPolicy, DEFAULT_CHUNK_SIZE};
use council_search::config::Config;
use council_search::ingest::source::DirectorySource;
use council_search::ingest::Ingestor;
use council_search::llm::embeddings::HttpEmbedder;
use council_search::search;

/// Chunk council transcripts, embed them and upsert them into the vector index
#[derive(Parser)]
#[command(name = "council-ingest")]
#[command(version)]
struct Cli {
    /// Directory of exported transcripts (`<id>.json`, optional `<id>.event.json`)
    #[arg(long, env = "COUNCIL_INGEST_SOURCE", value_name = "DIR")]
    source: PathBuf,

    /// Ingest at most this many transcripts
    #[arg(long)]
    limit: Option<usize>,

    /// Character budget per chunk
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Index namespace; defaults to PINECONE_NAMESPACE or "seattle"
    #[arg(long)]
    namespace: Option<String>,

    /// Which sentences chunk metadata is taken from
    #[arg(long, value_enum, default_value_t = MetadataPolicy::Span)]
    metadata_policy: MetadataPolicy,

    /// Chunk and report without embedding or writing
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    let namespace = cli.namespace.unwrap_or_else(|| config.index.namespace.clone());

    let llm_client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(config.llm.timeout_secs))
        .build()?;
    let index_client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(config.index.timeout_secs))
        .build()?;

    let embedder = Arc::new(HttpEmbedder::new(llm_client, config.llm.clone()));
    let index = search::connect_index(&config, index_client)?;

    let ingestor = Ingestor::new(embedder, index, namespace)
        .with_chunk_size(cli.chunk_size)
        .with_policy(cli.metadata_policy)
        .dry_run(cli.dry_run);

    let source = DirectorySource::new(&cli.source);
    let report = ingestor.run(&source, cli.limit).await?;

    println!("Transcripts indexed: {}", report.transcripts_indexed);
    println!("Transcripts failed:  {}", report.transcripts_failed);
    println!("Chunks produced:     {}", report.chunks_produced);
    println!("Chunks upserted:     {}", report.chunks_upserted);
    Ok(())
}
