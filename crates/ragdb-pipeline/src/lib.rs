//! ragdb-pipeline
//!
//! Query-time orchestration: per-variant retrieval sub-pipelines, the
//! parallel fan-out across query reformulations, validation, diversity
//! selection, and response assembly. Index and model concerns stay behind
//! the `ragdb_core::traits` seams.

pub mod offline;
pub mod pipeline;
pub mod retrieval;

pub use offline::{ExtractiveSynthesizer, TemplateReformulator};
pub use pipeline::QueryPipeline;
pub use retrieval::{RetrievalService, VariantOutcome};
