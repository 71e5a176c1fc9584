use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::{Chunk, ChunkId};

#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    pub max_tokens: usize,
    pub overlap_percent: f32,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { max_tokens: 500, overlap_percent: 0.2 }
    }
}

/// Splits source documents into retrievable chunks.
///
/// Paragraphs (blank-line delimited) become chunks directly; oversized
/// paragraphs are split into overlapping word windows. Chunk ids are
/// sequential integers assigned in walk order and never reused.
pub struct Chunker {
    config: ChunkingConfig,
    next_id: ChunkId,
}

impl Chunker {
    pub fn new() -> Self {
        Self::with_config(ChunkingConfig::default())
    }

    pub fn with_config(config: ChunkingConfig) -> Self {
        Self { config, next_id: 1 }
    }

    /// Chunks all `.txt` files under `data_dir`. Unreadable files are
    /// skipped with a warning rather than aborting the walk.
    pub fn process_directory(&mut self, data_dir: &Path) -> Result<Vec<Chunk>> {
        let files = list_txt_files(data_dir);
        if files.is_empty() {
            tracing::warn!(dir = %data_dir.display(), "no .txt files found");
            return Ok(vec![]);
        }
        let mut all_chunks = Vec::new();
        for file_path in &files {
            let content = match read_file_content(file_path) {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(file = %file_path.display(), error = %e, "skipping unreadable file");
                    continue;
                }
            };
            let doc_id = extract_doc_id(file_path);
            all_chunks.extend(self.chunk_text(&doc_id, file_path, &content));
        }
        tracing::info!(files = files.len(), chunks = all_chunks.len(), "chunked corpus");
        Ok(all_chunks)
    }

    /// Chunks a single document's text, assigning fresh ids.
    pub fn chunk_text(&mut self, doc_id: &str, doc_path: &Path, content: &str) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut position = 0;
        for paragraph in content.split("\n\n") {
            let paragraph = paragraph.trim();
            if paragraph.is_empty() {
                continue;
            }
            if estimate_tokens(paragraph) <= self.config.max_tokens {
                chunks.push(self.make_chunk(doc_id, doc_path, paragraph.to_string(), position));
                position += 1;
            } else {
                for window in self.split_with_overlap(paragraph) {
                    chunks.push(self.make_chunk(doc_id, doc_path, window, position));
                    position += 1;
                }
            }
        }
        chunks
    }

    fn make_chunk(&mut self, doc_id: &str, doc_path: &Path, text: String, position: usize) -> Chunk {
        let id = self.next_id;
        self.next_id += 1;
        Chunk {
            id,
            doc_id: doc_id.to_string(),
            doc_path: doc_path.to_string_lossy().to_string(),
            text,
            position,
        }
    }

    fn split_with_overlap(&self, paragraph: &str) -> Vec<String> {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        let words_per_chunk = 300;
        let overlap_words = (words_per_chunk as f32 * self.config.overlap_percent) as usize;
        let mut out = Vec::new();
        let mut start = 0;
        while start < words.len() {
            let end = (start + words_per_chunk).min(words.len());
            out.push(words[start..end].join(" "));
            if end >= words.len() {
                break;
            }
            start = end - overlap_words;
        }
        out
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new()
    }
}

fn read_file_content(file_path: &Path) -> Result<String> {
    match fs::read_to_string(file_path) {
        Ok(content) => Ok(content),
        Err(_) => Ok(String::from_utf8_lossy(&fs::read(file_path)?).to_string()),
    }
}

fn extract_doc_id(file_path: &Path) -> String {
    file_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| file_path.to_string_lossy().to_string())
}

// ~0.75 words per token.
fn estimate_tokens(text: &str) -> usize {
    let word_count = text.split_whitespace().count();
    (word_count as f32 / 0.75) as usize
}

fn list_txt_files(root: &Path) -> Vec<PathBuf> {
    let mut txt_files = Vec::new();
    for entry in walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("txt") {
            txt_files.push(path.to_path_buf());
        }
    }
    txt_files.sort();
    txt_files
}
