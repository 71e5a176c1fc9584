use std::path::Path;

use ragdb_core::traits::{ChunkStore, DenseRetriever, Embedder, SparseRetriever, TermStatistics};
use ragdb_core::types::{Chunk, ChunkRecord, RetrieverKind};
use ragdb_embed::HashEmbedder;
use ragdb_index::{LanceDenseIndex, TantivySparseIndex};

fn chunk(id: u64, text: &str) -> Chunk {
    Chunk {
        id,
        doc_id: format!("doc{}", id),
        doc_path: format!("/tmp/doc{}.txt", id),
        text: text.to_string(),
        position: 0,
    }
}

#[test]
fn tantivy_roundtrip_and_statistics() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let index_dir = tmp.path().join("tantivy");

    let mut sparse = TantivySparseIndex::create(&index_dir).expect("create");
    sparse
        .index_chunks(&[
            chunk(1, "reciprocal rank fusion merges ranked lists"),
            chunk(2, "maximal marginal relevance picks diverse results"),
            chunk(3, "rank fusion uses rank positions not raw scores"),
        ])
        .expect("index");

    let hits = sparse.query("rank fusion", 10).expect("query");
    assert!(!hits.is_empty());
    assert!(hits.iter().all(|h| h.retriever == RetrieverKind::Sparse));
    // both fusion chunks outrank the unrelated one
    let ids: Vec<u64> = hits.iter().map(|h| h.chunk_id).collect();
    assert!(ids.contains(&1) && ids.contains(&3));
    for w in hits.windows(2) {
        assert!(w[0].raw_score >= w[1].raw_score, "best-first ordering");
    }
    assert_eq!(hits[0].rank, 0);

    let stats = sparse.stats();
    assert_eq!(stats.doc_count, 3);
    assert!(stats.avg_doc_len > 0.0);
    assert!(sparse.doc_frequency("rank") >= 2);
    assert_eq!(sparse.doc_frequency("zebra"), 0);

    // reopening sees the same corpus and sidecar statistics
    let reopened = TantivySparseIndex::open(&index_dir).expect("open");
    let stats = reopened.stats();
    assert_eq!(stats.doc_count, 3);
    assert!(stats.avg_doc_len > 0.0);
    assert!(!reopened.query("diverse results", 5).expect("query").is_empty());
}

#[test]
fn tantivy_open_missing_dir_is_an_error() {
    assert!(TantivySparseIndex::open(Path::new("/nonexistent/ragdb-index")).is_err());
}

fn records(embedder: &dyn Embedder, texts: &[(u64, &str)]) -> Vec<ChunkRecord> {
    texts
        .iter()
        .map(|&(id, text)| ChunkRecord {
            chunk: chunk(id, text),
            embedding: embedder.embed(text).expect("embed"),
            embedder_id: embedder.id().to_string(),
        })
        .collect()
}

#[tokio::test]
async fn lancedb_index_search_and_fetch() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let embedder = HashEmbedder::new(64);
    let dense = LanceDenseIndex::connect(tmp.path(), "chunks", embedder.dim()).await?;
    dense.reset().await?;

    let rows = records(
        &embedder,
        &[
            (10, "entropy measures retrieval consistency across variants"),
            (11, "cosine similarity compares embedding directions"),
            (12, "tomato seedlings need warmth and light"),
        ],
    );
    dense.index_records(&rows).await?;

    // query with an embedding close to row 10
    let query_vec = embedder.embed("entropy of retrieval consistency")?;
    let task = tokio::task::spawn_blocking(move || {
        let hits = dense.query(&query_vec, 2)?;
        anyhow::ensure!(hits.len() == 2);
        anyhow::ensure!(hits.iter().all(|h| h.retriever == RetrieverKind::Dense));
        anyhow::ensure!(hits.iter().all(|h| h.raw_score > 0.0 && h.raw_score <= 1.0));
        anyhow::ensure!(hits[0].chunk_id == 10, "closest chunk first, got {}", hits[0].chunk_id);

        let record = dense.fetch(11)?.expect("chunk 11 stored");
        anyhow::ensure!(record.chunk.text.contains("cosine"));
        anyhow::ensure!(record.embedding.len() == 64);
        anyhow::ensure!(dense.fetch(999)?.is_none());
        Ok(())
    });
    task.await??;
    Ok(())
}
