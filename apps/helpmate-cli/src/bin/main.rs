use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::EnvFilter;

use helpmate_core::config::Config;
use helpmate_core::traits::ChunkSink;
use helpmate_core::types::Chunk;
use helpmate_pipeline::AppContext;

const EMBED_BATCH: usize = 64;
const PREVIEW_CHARS: usize = 160;

#[derive(Parser)]
#[command(name = "helpmate")]
#[command(about = "Question answering over an insurance policy", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Embed pre-chunked policy text (JSON lines of {id, text, metadata}) into the index
    Ingest { file: PathBuf },
    /// Retrieve and rerank without generating an answer
    Search {
        #[arg(short, long)]
        query: String,
        #[arg(long)]
        top_k: Option<usize>,
        #[arg(long)]
        top_n: Option<usize>,
    },
    /// Answer a question from the reranked policy excerpts
    Ask {
        #[arg(short, long)]
        query: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Config::load()?.settings()?;
    let ctx = AppContext::open(settings).await?;

    match cli.command {
        Command::Ingest { file } => ingest(&ctx, &file).await,
        Command::Search { query, top_k, top_n } => search(&ctx, &query, top_k, top_n).await,
        Command::Ask { query } => ask(&ctx, &query).await,
    }
}

fn read_chunks(path: &Path) -> Result<Vec<Chunk>> {
    let reader = BufReader::new(File::open(path).with_context(|| format!("cannot open {}", path.display()))?);
    let mut chunks = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let chunk: Chunk = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: not a chunk record", path.display(), n + 1))?;
        chunks.push(chunk);
    }
    Ok(chunks)
}

async fn ingest(ctx: &AppContext, file: &Path) -> Result<()> {
    let chunks = read_chunks(file)?;
    if chunks.is_empty() {
        bail!("{} holds no chunks", file.display());
    }
    let embedder = ctx.embedder();
    let writer = ctx.chunk_writer().await?;

    let pb = ProgressBar::new(chunks.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} chunks")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    let mut written = 0;
    for batch in chunks.chunks(EMBED_BATCH) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let model = Arc::clone(&embedder);
        let vectors = tokio::task::spawn_blocking(move || model.embed_batch(&texts)).await??;
        written += writer.upsert(batch, &vectors).await?;
        pb.inc(batch.len() as u64);
    }
    pb.finish_and_clear();
    info!(file = %file.display(), chunks = written, "ingest complete");
    println!("Indexed {} chunks from {}", written, file.display());
    Ok(())
}

async fn search(ctx: &AppContext, query: &str, top_k: Option<usize>, top_n: Option<usize>) -> Result<()> {
    let retrieval = &ctx.settings().retrieval;
    let pipeline = ctx.pipeline().await?;
    let ranked = pipeline
        .run_with(query, top_k.unwrap_or(retrieval.top_k), top_n.unwrap_or(retrieval.top_n))
        .await?;
    if ranked.is_empty() {
        println!("No matching chunks.");
        return Ok(());
    }
    for (i, item) in ranked.iter().enumerate() {
        let page = item.chunk().page().unwrap_or("-");
        let source = item.chunk().source().unwrap_or("-");
        println!("{:>2}. {:<12} score={:.4} page={} source={}", i + 1, item.id(), item.score, page, source);
        println!("    {}", preview(&item.chunk().text));
    }
    Ok(())
}

async fn ask(ctx: &AppContext, query: &str) -> Result<()> {
    let answerer = ctx.answerer().await?;
    let answer = answerer.answer(query).await?;
    println!("{}\n", answer.text);
    if !answer.sources.is_empty() {
        println!("Sources:");
        for item in &answer.sources {
            match item.chunk().page() {
                Some(page) => println!("  [{}] page {} (score {:.3})", item.id(), page, item.score),
                None => println!("  [{}] (score {:.3})", item.id(), item.score),
            }
        }
    }
    Ok(())
}

fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(PREVIEW_CHARS).collect();
    format!("{cut}...")
}
