use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use ragdb_core::chunker::Chunker;
use ragdb_core::config::{expand_path, Config};
use ragdb_core::snapshot::{IndexManager, IndexSnapshot};
use ragdb_core::traits::{ChunkStore, Embedder};
use ragdb_core::types::{ChunkRecord, RetrievalMethod};
use ragdb_embed::default_embedder;
use ragdb_index::{LanceDenseIndex, TantivySparseIndex};
use ragdb_pipeline::{ExtractiveSynthesizer, QueryPipeline, RetrievalService, TemplateReformulator};

const DENSE_TABLE: &str = "chunks";

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() {
        eprintln!("Usage: {} <ingest|ask|search> [args...]", prog);
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    (cmd, args)
}

fn parse_method(s: Option<&String>) -> RetrievalMethod {
    match s.map(String::as_str) {
        Some("sparse") => RetrievalMethod::Sparse,
        Some("dense") => RetrievalMethod::Dense,
        Some("hybrid") => RetrievalMethod::Hybrid { rerank: false },
        Some("hybrid_rerank") | None => RetrievalMethod::Hybrid { rerank: true },
        Some(other) => {
            eprintln!("Unknown method '{}', expected sparse|dense|hybrid|hybrid_rerank", other);
            std::process::exit(1);
        }
    }
}

struct IndexPaths {
    sparse_dir: PathBuf,
    dense_dir: PathBuf,
}

fn index_paths(config: &Config) -> IndexPaths {
    let sparse: String = config
        .get("data.sparse_index_dir")
        .unwrap_or_else(|_| "./data/indexes/tantivy".to_string());
    let dense: String = config
        .get("data.dense_index_dir")
        .unwrap_or_else(|_| "./data/indexes/lancedb".to_string());
    IndexPaths { sparse_dir: expand_path(sparse), dense_dir: expand_path(dense) }
}

fn open_snapshot(paths: &IndexPaths, dim: usize) -> anyhow::Result<IndexSnapshot> {
    let sparse = TantivySparseIndex::open(&paths.sparse_dir)?;
    let rt = tokio::runtime::Runtime::new()?;
    let dense =
        rt.block_on(async { LanceDenseIndex::connect(&paths.dense_dir, DENSE_TABLE, dim).await })?;
    let dense = Arc::new(dense);
    Ok(IndexSnapshot::new(Arc::new(sparse), dense.clone(), dense))
}

fn ingest(config: &Config, args: &[String]) -> anyhow::Result<()> {
    let data_dir = args.get(0).map(PathBuf::from).unwrap_or_else(|| {
        let dir: String =
            config.get("data.corpus_dir").unwrap_or_else(|_| "./data/corpus".to_string());
        expand_path(dir)
    });
    println!("Ingesting from {}", data_dir.display());

    let mut chunker = Chunker::new();
    let chunks = chunker.process_directory(&data_dir)?;
    if chunks.is_empty() {
        println!("Nothing to ingest.");
        return Ok(());
    }

    let embedder = default_embedder();
    let pb = ProgressBar::new(chunks.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%)")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    let mut records = Vec::with_capacity(chunks.len());
    for chunk in &chunks {
        let embedding = embedder.embed(&chunk.text)?;
        records.push(ChunkRecord {
            chunk: chunk.clone(),
            embedding,
            embedder_id: embedder.id().to_string(),
        });
        pb.inc(1);
    }
    pb.finish_with_message("embedded");

    let paths = index_paths(config);
    let mut sparse = TantivySparseIndex::create(&paths.sparse_dir)?;
    sparse.index_chunks(&chunks)?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let dense =
            LanceDenseIndex::connect(&paths.dense_dir, DENSE_TABLE, embedder.dim()).await?;
        dense.reset().await?;
        dense.index_records(&records).await
    })?;

    let doc_count = chunks
        .iter()
        .map(|c| c.doc_id.as_str())
        .collect::<std::collections::HashSet<&str>>()
        .len();
    println!("Ingest complete ({} chunks from {} documents)", chunks.len(), doc_count);
    Ok(())
}

fn ask(config: &Config, args: &[String]) -> anyhow::Result<()> {
    let query = args.get(0).cloned().unwrap_or_else(|| {
        eprintln!("Usage: ragdb ask \"<question>\" [sparse|dense|hybrid|hybrid_rerank]");
        std::process::exit(1)
    });
    let method = parse_method(args.get(1));

    let embedder: Arc<dyn Embedder> = Arc::from(default_embedder());
    let paths = index_paths(config);
    let snapshot = open_snapshot(&paths, embedder.dim())?;
    let pipeline = QueryPipeline::new(
        Arc::new(IndexManager::new(snapshot)),
        embedder,
        Arc::new(TemplateReformulator),
        Arc::new(ExtractiveSynthesizer::default()),
        config.pipeline()?,
    );

    let rt = tokio::runtime::Runtime::new()?;
    let outcome = rt.block_on(pipeline.execute(&query, method));

    println!("Answer: {}", if outcome.answer.is_empty() { "(none)" } else { &outcome.answer });
    println!();
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

fn search(config: &Config, args: &[String]) -> anyhow::Result<()> {
    let query = args.get(0).cloned().unwrap_or_else(|| {
        eprintln!("Usage: ragdb search \"<query>\" [sparse|dense|hybrid|hybrid_rerank]");
        std::process::exit(1)
    });
    let method = parse_method(args.get(1));

    let embedder: Arc<dyn Embedder> = Arc::from(default_embedder());
    let paths = index_paths(config);
    let snapshot = Arc::new(open_snapshot(&paths, embedder.dim())?);
    let pipeline_config = config.pipeline()?;
    let depth = pipeline_config.retrieval_depth;
    let service = RetrievalService::new(snapshot.clone(), embedder, pipeline_config);

    let outcome = service.retrieve(&query, method, depth);
    if outcome.ranked.is_empty() {
        println!("No results.");
    }
    for (i, scored) in outcome.ranked.iter().enumerate() {
        match snapshot.store.fetch(scored.chunk_id)? {
            Some(record) => {
                let text: String = record.chunk.text.chars().take(120).collect();
                println!("{:2}. [{:.4}] {}: {}", i + 1, scored.score, record.chunk.doc_id, text);
            }
            None => println!("{:2}. [{:.4}] chunk {}", i + 1, scored.score, scored.chunk_id),
        }
    }
    for degradation in &outcome.degraded {
        eprintln!("warning: {}", degradation);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let (cmd, args) = parse_args();
    match cmd.as_str() {
        "ingest" => ingest(&config, &args),
        "ask" => ask(&config, &args),
        "search" => search(&config, &args),
        _ => {
            eprintln!("Unknown command: {}", cmd);
            std::process::exit(1);
        }
    }
}
