//! In-memory keyed vector store: buckets of `(vector, value, expiry)`
//! supporting top-1 cosine search, `DashMap`-backed with lazy eviction
//! of expired entries on read.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;

#[derive(Clone)]
pub struct VectorEntry {
    pub vector: Vec<f32>,
    pub value: Value,
    inserted_at: Instant,
    ttl: Duration,
}

impl VectorEntry {
    fn is_expired(&self) -> bool {
        self.inserted_at.elapsed() >= self.ttl
    }
}

/// A bucketed store of vector entries with top-1 cosine-similarity search.
/// Buckets are independent so callers can segregate by tool or service.
#[derive(Default)]
pub struct VectorStore {
    buckets: DashMap<String, Vec<VectorEntry>>,
}

pub struct SearchHit {
    pub value: Value,
    pub similarity: f32,
}

impl VectorStore {
    pub fn new() -> Self {
        Self { buckets: DashMap::new() }
    }

    /// Appends an entry to `bucket`. Pruning is lazy — this never evicts.
    pub fn set(&self, bucket: &str, vector: Vec<f32>, value: Value, ttl: Duration) {
        let entry = VectorEntry { vector, value, inserted_at: Instant::now(), ttl };
        self.buckets.entry(bucket.to_string()).or_default().push(entry);
    }

    /// Searches `bucket` for the entry with the highest cosine similarity to
    /// `query`, dropping expired entries encountered along the way.
    pub fn search_top1(&self, bucket: &str, query: &[f32]) -> Option<SearchHit> {
        let mut slot = self.buckets.get_mut(bucket)?;
        slot.retain(|entry| !entry.is_expired());

        let mut best: Option<(f32, usize)> = None;
        for (index, entry) in slot.iter().enumerate() {
            let similarity = cosine_similarity(query, &entry.vector);
            if best.map(|(top, _)| similarity > top).unwrap_or(true) {
                best = Some((similarity, index));
            }
        }
        best.map(|(similarity, index)| SearchHit { value: slot[index].value.clone(), similarity })
    }

    /// Explicit pruning of expired entries in `bucket`.
    pub fn prune(&self, bucket: &str) {
        if let Some(mut slot) = self.buckets.get_mut(bucket) {
            slot.retain(|entry| !entry.is_expired());
        }
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
