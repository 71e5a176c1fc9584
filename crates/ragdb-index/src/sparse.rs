//! Tantivy-backed sparse retriever.
//!
//! One tantivy document per chunk, keyword-scored by the engine's BM25.
//! Besides query ranking this adapter exposes the corpus-wide statistics
//! the keyword reranker needs: live document counts and per-term document
//! frequencies come from the searcher, the average document length is
//! accumulated at indexing time and persisted in a sidecar next to the
//! index.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::{
    IndexRecordOption, Schema, TextFieldIndexing, TextOptions, Value, FAST, INDEXED, STORED,
};
use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, TextAnalyzer};
use tantivy::{doc, Index, IndexReader, TantivyDocument, Term};

use ragdb_core::error::Error;
use ragdb_core::traits::{SparseRetriever, TermStatistics};
use ragdb_core::types::{Chunk, CorpusStats, RetrievedItem, RetrieverKind};

const TOKENIZER: &str = "lowercase_simple";
const STATS_FILE: &str = "corpus_stats.json";

fn build_schema() -> Schema {
    let mut schema_builder = Schema::builder();
    let _id_field = schema_builder.add_u64_field("id", INDEXED | STORED | FAST);
    let text_field_indexing = TextFieldIndexing::default()
        .set_tokenizer(TOKENIZER)
        .set_index_option(IndexRecordOption::WithFreqsAndPositions);
    let text_options = TextOptions::default().set_indexing_options(text_field_indexing);
    let _text_field = schema_builder.add_text_field("text", text_options);
    schema_builder.build()
}

fn register_tokenizer(index: &Index) {
    let tokenizer = TextAnalyzer::builder(SimpleTokenizer::default()).filter(LowerCaser).build();
    index.tokenizers().register(TOKENIZER, tokenizer);
}

/// Token totals that tantivy does not surface directly; kept in a sidecar
/// file so `open` sees the same averages the writer computed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct StatsSidecar {
    doc_count: u64,
    total_tokens: u64,
}

pub struct TantivySparseIndex {
    index: Index,
    reader: IndexReader,
    id_field: tantivy::schema::Field,
    text_field: tantivy::schema::Field,
    sidecar: StatsSidecar,
    stats_path: PathBuf,
}

impl TantivySparseIndex {
    /// Creates a fresh index directory, wiping whatever was there. Used by
    /// ingestion; search paths use [`TantivySparseIndex::open`].
    pub fn create(index_dir: &Path) -> Result<Self> {
        let schema = build_schema();
        if index_dir.exists() {
            fs::remove_dir_all(index_dir)?;
        }
        fs::create_dir_all(index_dir)?;
        let index = Index::create_in_dir(index_dir, schema)?;
        register_tokenizer(&index);
        Self::finish(index, index_dir, StatsSidecar::default())
    }

    /// Opens an existing index. An unreadable directory is an unrecoverable
    /// snapshot failure, not a degradable one.
    pub fn open(index_dir: &Path) -> Result<Self> {
        let index = Index::open_in_dir(index_dir)
            .map_err(|e| Error::IndexCorrupted(format!("{}: {}", index_dir.display(), e)))?;
        register_tokenizer(&index);
        let sidecar = fs::read(index_dir.join(STATS_FILE))
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_default();
        Self::finish(index, index_dir, sidecar)
    }

    fn finish(index: Index, index_dir: &Path, sidecar: StatsSidecar) -> Result<Self> {
        let reader = index.reader()?;
        let schema = index.schema();
        let id_field = schema.get_field("id")?;
        let text_field = schema.get_field("text")?;
        Ok(Self {
            index,
            reader,
            id_field,
            text_field,
            sidecar,
            stats_path: index_dir.join(STATS_FILE),
        })
    }

    pub fn index_chunks(&mut self, chunks: &[Chunk]) -> Result<()> {
        let mut writer = self.index.writer(50_000_000)?;
        let mut added_tokens = 0u64;
        for c in chunks {
            writer.add_document(doc!(
                self.id_field => c.id,
                self.text_field => c.text.clone(),
            ))?;
            added_tokens += c.text.split_whitespace().count() as u64;
        }
        writer.commit()?;
        self.reader.reload()?;

        self.sidecar.doc_count += chunks.len() as u64;
        self.sidecar.total_tokens += added_tokens;
        fs::write(&self.stats_path, serde_json::to_vec(&self.sidecar)?)?;
        tracing::info!(chunks = chunks.len(), "indexed into tantivy");
        Ok(())
    }
}

impl TermStatistics for TantivySparseIndex {
    fn stats(&self) -> CorpusStats {
        let doc_count = self.reader.searcher().num_docs();
        let avg_doc_len = if doc_count > 0 {
            self.sidecar.total_tokens as f32 / doc_count as f32
        } else {
            0.0
        };
        CorpusStats { doc_count, avg_doc_len }
    }

    fn doc_frequency(&self, term: &str) -> u64 {
        let term = Term::from_field_text(self.text_field, &term.to_lowercase());
        self.reader.searcher().doc_freq(&term).unwrap_or(0)
    }
}

impl SparseRetriever for TantivySparseIndex {
    fn query(&self, text: &str, k: usize) -> Result<Vec<RetrievedItem>> {
        if k == 0 {
            return Ok(vec![]);
        }
        let searcher = self.reader.searcher();
        let parser = QueryParser::for_index(&self.index, vec![self.text_field]);
        // lenient: free-text questions may contain parser syntax characters
        let (query, _errors) = parser.parse_query_lenient(text);
        let top_docs = searcher.search(&query, &TopDocs::with_limit(k))?;

        let mut scored: Vec<(u64, f32)> = Vec::with_capacity(top_docs.len());
        for (score, addr) in top_docs {
            let stored: TantivyDocument = searcher.doc(addr)?;
            let Some(chunk_id) = stored.get_first(self.id_field).and_then(|v| v.as_u64()) else {
                tracing::warn!("document without chunk id, skipping");
                continue;
            };
            scored.push((chunk_id, score));
        }
        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(rank, (chunk_id, raw_score))| RetrievedItem {
                chunk_id,
                raw_score,
                rank,
                retriever: RetrieverKind::Sparse,
            })
            .collect())
    }
}
