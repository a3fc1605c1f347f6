//! In-memory vector index with cosine-similarity search.

use super::documents::Chunk;
use super::{Embedder, RagError};
use tracing::info;

pub struct VectorIndex {
    entries: Vec<(Chunk, Vec<f32>)>,
}

pub(crate) fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let n = a.len().min(b.len());
    let dot: f32 = a[..n].iter().zip(&b[..n]).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

impl VectorIndex {
    /// Embed every chunk. Fails on the first embedding error.
    pub fn build(chunks: Vec<Chunk>, embedder: &impl Embedder) -> Result<Self, RagError> {
        let mut entries = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let v = embedder.embed(&chunk.text)?;
            entries.push((chunk, v));
        }
        info!(chunks = entries.len(), "vector index built");
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Top `k` chunks by similarity; ties keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(&Chunk, f32)> {
        let mut scored: Vec<(&Chunk, f32)> = self
            .entries
            .iter()
            .map(|(c, v)| (c, cosine(query, v)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);
        scored
    }
}
