//! LanceDB-backed dense retriever and chunk store.
//!
//! One table row per chunk: identity, text, position, and the embedding
//! vector. Vector search serves the dense ranking path; id point lookups
//! serve the chunk store the reranker, MMR, and validator read from.
//! L2 distance maps to similarity `1 / (1 + d)`, which keeps dense scores
//! inside `(0, 1]`.

use anyhow::{anyhow, Result};
use futures::TryStreamExt;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use arrow_array::cast::AsArray;
use arrow_array::{
    FixedSizeListArray, Float32Array, Int32Array, RecordBatch, RecordBatchIterator, StringArray,
    UInt64Array,
};
use arrow_schema::{DataType, Field, Schema};
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection};

use ragdb_core::traits::{ChunkStore, DenseRetriever};
use ragdb_core::types::{Chunk, ChunkId, ChunkRecord, RetrievedItem, RetrieverKind};

pub struct LanceDenseIndex {
    db: Connection,
    table_name: String,
    dim: i32,
}

fn build_arrow_schema(dim: i32) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::UInt64, false),
        Field::new("doc_id", DataType::Utf8, false),
        Field::new("doc_path", DataType::Utf8, false),
        Field::new("text", DataType::Utf8, false),
        Field::new("position", DataType::Int32, false),
        Field::new("embedder_id", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim),
            true,
        ),
    ]))
}

impl LanceDenseIndex {
    pub async fn connect(db_path: &Path, table_name: &str, dim: usize) -> Result<Self> {
        let db = connect(db_path.to_string_lossy().as_ref()).execute().await?;
        Ok(Self { db, table_name: table_name.to_string(), dim: dim as i32 })
    }

    /// Drops the chunk table if present. Ingestion calls this before
    /// re-indexing a corpus from scratch.
    pub async fn reset(&self) -> Result<()> {
        let names = self.db.table_names().execute().await?;
        if names.contains(&self.table_name) {
            self.db.drop_table(&self.table_name, &[]).await?;
        }
        Ok(())
    }

    pub async fn index_records(&self, records: &[ChunkRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let batch_size = 1000usize;
        for slice in records.chunks(batch_size) {
            self.insert_batch(slice).await?;
        }
        tracing::info!(chunks = records.len(), table = %self.table_name, "indexed into lancedb");
        Ok(())
    }

    async fn insert_batch(&self, records: &[ChunkRecord]) -> Result<()> {
        let record_batch = self.records_to_batch(records)?;
        let schema = record_batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(record_batch)].into_iter(), schema));
        if self.db.table_names().execute().await?.contains(&self.table_name) {
            self.db.open_table(&self.table_name).execute().await?.add(reader).execute().await?;
        } else {
            self.db.create_table(&self.table_name, reader).execute().await?;
        }
        Ok(())
    }

    fn records_to_batch(&self, records: &[ChunkRecord]) -> Result<RecordBatch> {
        let schema = build_arrow_schema(self.dim);
        let mut ids = Vec::new();
        let mut doc_ids = Vec::new();
        let mut doc_paths = Vec::new();
        let mut texts = Vec::new();
        let mut positions = Vec::new();
        let mut embedder_ids = Vec::new();
        let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::new();
        for r in records {
            ids.push(r.chunk.id);
            doc_ids.push(r.chunk.doc_id.clone());
            doc_paths.push(r.chunk.doc_path.clone());
            texts.push(r.chunk.text.clone());
            positions.push(r.chunk.position as i32);
            embedder_ids.push(r.embedder_id.clone());
            vectors.push(Some(r.embedding.iter().map(|&x| Some(x)).collect()));
        }
        let record_batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(UInt64Array::from(ids)),
                Arc::new(StringArray::from(doc_ids)),
                Arc::new(StringArray::from(doc_paths)),
                Arc::new(StringArray::from(texts)),
                Arc::new(Int32Array::from(positions)),
                Arc::new(StringArray::from(embedder_ids)),
                Arc::new(FixedSizeListArray::from_iter_primitive::<
                    arrow_array::types::Float32Type,
                    _,
                    _,
                >(vectors.into_iter(), self.dim)),
            ],
        )?;
        Ok(record_batch)
    }

    async fn search_async(&self, vector: &[f32], k: usize) -> Result<Vec<RetrievedItem>> {
        if k == 0 {
            return Ok(vec![]);
        }
        let table = self.db.open_table(&self.table_name).execute().await?;
        let mut stream = table.vector_search(vector.to_vec())?.limit(k).execute().await?;

        let mut seen: HashSet<ChunkId> = HashSet::new();
        let mut hits = Vec::new();
        while let Some(batch) = TryStreamExt::try_next(&mut stream).await? {
            let id_col = batch
                .column_by_name("id")
                .and_then(|c| c.as_any().downcast_ref::<UInt64Array>())
                .ok_or_else(|| anyhow!("id column missing"))?;
            let distance_col = batch
                .column_by_name("_distance")
                .and_then(|c| c.as_any().downcast_ref::<Float32Array>());
            for i in 0..batch.num_rows() {
                let chunk_id = id_col.value(i);
                if !seen.insert(chunk_id) {
                    continue;
                }
                let raw_score = match distance_col {
                    Some(col) => 1.0 / (1.0 + col.value(i)),
                    None => 0.5,
                };
                hits.push((chunk_id, raw_score));
            }
        }
        Ok(hits
            .into_iter()
            .take(k)
            .enumerate()
            .map(|(rank, (chunk_id, raw_score))| RetrievedItem {
                chunk_id,
                raw_score,
                rank,
                retriever: RetrieverKind::Dense,
            })
            .collect())
    }

    async fn fetch_async(&self, id: ChunkId) -> Result<Option<ChunkRecord>> {
        let names = self.db.table_names().execute().await?;
        if !names.contains(&self.table_name) {
            return Ok(None);
        }
        let table = self.db.open_table(&self.table_name).execute().await?;
        let mut stream = table.query().only_if(format!("id = {}", id)).limit(1).execute().await?;
        while let Some(batch) = TryStreamExt::try_next(&mut stream).await? {
            if batch.num_rows() == 0 {
                continue;
            }
            return Ok(Some(parse_record(&batch, 0)?));
        }
        Ok(None)
    }
}

fn string_value(batch: &RecordBatch, column: &str, row: usize) -> Result<String> {
    Ok(batch
        .column_by_name(column)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| anyhow!("{column} column missing"))?
        .value(row)
        .to_string())
}

fn parse_record(batch: &RecordBatch, row: usize) -> Result<ChunkRecord> {
    let id = batch
        .column_by_name("id")
        .and_then(|c| c.as_any().downcast_ref::<UInt64Array>())
        .ok_or_else(|| anyhow!("id column missing"))?
        .value(row);
    let position = batch
        .column_by_name("position")
        .and_then(|c| c.as_any().downcast_ref::<Int32Array>())
        .ok_or_else(|| anyhow!("position column missing"))?
        .value(row);
    let vector_col = batch
        .column_by_name("vector")
        .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>())
        .ok_or_else(|| anyhow!("vector column missing"))?;
    let embedding: Vec<f32> = vector_col
        .value(row)
        .as_primitive::<arrow_array::types::Float32Type>()
        .values()
        .iter()
        .copied()
        .collect();

    Ok(ChunkRecord {
        chunk: Chunk {
            id,
            doc_id: string_value(batch, "doc_id", row)?,
            doc_path: string_value(batch, "doc_path", row)?,
            text: string_value(batch, "text", row)?,
            position: position as usize,
        },
        embedding,
        embedder_id: string_value(batch, "embedder_id", row)?,
    })
}

impl DenseRetriever for LanceDenseIndex {
    fn query(&self, vector: &[f32], k: usize) -> Result<Vec<RetrievedItem>> {
        // sync trait over an async backend; called from blocking contexts
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.search_async(vector, k))
    }
}

impl ChunkStore for LanceDenseIndex {
    fn fetch(&self, id: ChunkId) -> Result<Option<ChunkRecord>> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.fetch_async(id))
    }
}
