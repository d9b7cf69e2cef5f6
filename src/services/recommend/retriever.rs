use anyhow::Context;

use crate::services::ai::embeddings::Embedder;

pub const ACTIVITIES: [&str; 6] = [
    "Take a leisurely walk in the park and enjoy the fresh air.",
    "Visit a local museum and discover something new.",
    "Attend a live music concert and feel the rhythm.",
    "Go for a hike and admire the natural scenery.",
    "Have a picnic with friends and share some laughs.",
    "Explore a new cuisine by dining at an ethnic restaurant.",
];

pub const TOP_K: usize = 4;

struct Entry {
    text: String,
    vector: Vec<f32>,
}

/// Flat in-memory vector index. The corpus is tiny, so search is a linear
/// scan.
pub struct VectorIndex {
    entries: Vec<Entry>,
}

impl VectorIndex {
    pub async fn build(embedder: &dyn Embedder, documents: &[&str]) -> anyhow::Result<Self> {
        let mut entries = Vec::with_capacity(documents.len());
        for doc in documents {
            let vector = embedder
                .embed(doc)
                .await
                .with_context(|| format!("failed to embed document: {doc}"))?;
            entries.push(Entry {
                text: doc.to_string(),
                vector,
            });
        }

        tracing::info!(documents = entries.len(), "built activity index");
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns up to `k` documents, most similar first.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<&str> {
        let mut scored: Vec<(f32, &str)> = self
            .entries
            .iter()
            .map(|e| (cosine_similarity(query, &e.vector), e.text.as_str()))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.into_iter().take(k).map(|(_, text)| text).collect()
    }
}

/// Zero vectors and mismatched lengths score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
