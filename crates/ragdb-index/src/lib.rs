//! ragdb-index
//!
//! Concrete index adapters behind the core retriever traits: tantivy for
//! keyword ranking and corpus term statistics, LanceDB for vector search
//! and chunk storage. The pipeline consumes both only through
//! `ragdb_core::traits`, pinned inside an `IndexSnapshot`.

pub mod dense;
pub mod sparse;

pub use dense::LanceDenseIndex;
pub use sparse::TantivySparseIndex;
