use std::fs;
use std::io::Write;
use std::sync::Arc;
use tempfile::TempDir;

use ragdb_core::chunker::Chunker;
use ragdb_core::config::{ConfidenceRule, PipelineConfig};
use ragdb_core::snapshot::{IndexManager, IndexSnapshot};
use ragdb_core::traits::{ChunkStore, DenseRetriever, SparseRetriever, TermStatistics};
use ragdb_core::types::{ChunkRecord, CorpusStats, QueryVariantSet, RetrievedItem};

#[test]
fn chunk_directory_single_small_file() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    let file_path = dir.join("a.txt");
    let mut f = fs::File::create(&file_path).unwrap();
    writeln!(f, "Short text").unwrap();

    let mut chunker = Chunker::new();
    let chunks = chunker.process_directory(dir).expect("process");

    assert_eq!(chunks.len(), 1, "one small paragraph becomes one chunk");
    assert_eq!(chunks[0].text.trim(), "Short text");
    assert_eq!(chunks[0].id, 1);
    assert_eq!(chunks[0].position, 0);
}

#[test]
fn chunk_ids_are_unique_across_documents() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("a.txt"), "alpha bravo\n\ncharlie delta").unwrap();
    fs::write(dir.join("b.txt"), "echo foxtrot").unwrap();

    let mut chunker = Chunker::new();
    let chunks = chunker.process_directory(dir).expect("process");

    let mut ids = std::collections::HashSet::new();
    for c in &chunks {
        assert!(ids.insert(c.id), "duplicate chunk id {}", c.id);
    }
    assert_eq!(chunks.len(), 3);
}

#[test]
fn oversized_paragraph_splits_with_overlap() {
    let long: String = (0..900).map(|i| format!("w{} ", i)).collect();
    let mut chunker = Chunker::new();
    let chunks = chunker.chunk_text("doc", std::path::Path::new("doc.txt"), &long);

    assert!(chunks.len() > 1, "900 words must split");
    // consecutive windows share words
    let first: Vec<&str> = chunks[0].text.split_whitespace().collect();
    let second: Vec<&str> = chunks[1].text.split_whitespace().collect();
    assert!(first.iter().rev().take(10).all(|w| second.contains(w)));
}

#[test]
fn variant_set_keeps_original_first_and_dedupes() {
    let mut variants = QueryVariantSet::new("how do decorators work");
    variants.push("explain decorators");
    variants.push("explain decorators");
    variants.push("   ");
    variants.push("what is a decorator?");

    assert_eq!(variants.len(), 3);
    assert_eq!(variants.original(), "how do decorators work");
    let all: Vec<&String> = variants.iter().collect();
    assert_eq!(all[1], "explain decorators");
}

#[test]
fn pipeline_config_defaults_and_validation() {
    let cfg = PipelineConfig::default();
    assert_eq!(cfg.rrf_k, 60);
    assert_eq!(cfg.top_k, 5);
    assert!((cfg.mmr_lambda - 0.7).abs() < 1e-6);
    assert!((cfg.entropy_threshold - 0.3).abs() < 1e-12);
    assert!((cfg.grounding_threshold - 0.7).abs() < 1e-12);
    assert_eq!(cfg.overall_confidence, ConfidenceRule::Minimum);
    cfg.validate().expect("defaults are valid");

    let bad = PipelineConfig { mmr_lambda: 1.5, ..PipelineConfig::default() };
    assert!(bad.validate().is_err());

    let bad = PipelineConfig { top_k: 0, ..PipelineConfig::default() };
    assert!(bad.validate().is_err());
}

struct EmptySparse;
impl TermStatistics for EmptySparse {
    fn stats(&self) -> CorpusStats {
        CorpusStats { doc_count: 0, avg_doc_len: 0.0 }
    }
    fn doc_frequency(&self, _term: &str) -> u64 {
        0
    }
}
impl SparseRetriever for EmptySparse {
    fn query(&self, _text: &str, _k: usize) -> anyhow::Result<Vec<RetrievedItem>> {
        Ok(vec![])
    }
}

struct EmptyDense;
impl DenseRetriever for EmptyDense {
    fn query(&self, _vector: &[f32], _k: usize) -> anyhow::Result<Vec<RetrievedItem>> {
        Ok(vec![])
    }
}

struct EmptyStore;
impl ChunkStore for EmptyStore {
    fn fetch(&self, _id: u64) -> anyhow::Result<Option<ChunkRecord>> {
        Ok(None)
    }
}

fn empty_snapshot() -> IndexSnapshot {
    IndexSnapshot::new(Arc::new(EmptySparse), Arc::new(EmptyDense), Arc::new(EmptyStore))
}

#[test]
fn snapshot_publish_advances_generation_and_keeps_pinned_readers() {
    let manager = IndexManager::new(empty_snapshot());
    let pinned = manager.snapshot();
    assert_eq!(pinned.generation, 0);

    manager.publish(empty_snapshot());
    let fresh = manager.snapshot();
    assert_eq!(fresh.generation, 1);
    // the reader that pinned generation 0 still holds a usable snapshot
    assert_eq!(pinned.generation, 0);

    manager.publish(empty_snapshot());
    assert_eq!(manager.snapshot().generation, 2);
}
