//! Text embedding used for indexing and query similarity.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Vector tagged with the model that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    /// Embedding model version tag.
    pub model: String,
    /// Vector components.
    pub vector: Vec<f32>,
}

/// Embedding function shared by indexing and querying.
pub trait Embedder: Send + Sync {
    /// Version tag identifying the embedding space.
    fn model(&self) -> &str;

    /// Embed `text` into this model's space.
    fn embed(&self, text: &str) -> Embedding;
}

/// Common words that carry no creative signal.
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "in", "is", "it", "of",
    "on", "or", "so", "that", "the", "this", "to", "was", "with",
];

/// Deterministic feature-hashing embedder (unigrams plus weighted bigrams).
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
    model: String,
}

impl HashingEmbedder {
    /// Default vector width.
    pub const DEFAULT_DIMENSIONS: usize = 256;

    pub fn new(dimensions: usize) -> Self {
        let dimensions = dimensions.max(1);
        Self {
            dimensions,
            model: format!("hashing-v1-{dimensions}"),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn accumulate(&self, vector: &mut [f32], feature: &str, weight: f32) {
        let digest = Sha256::digest(feature.as_bytes());
        let mut bucket = [0u8; 8];
        bucket.copy_from_slice(&digest[..8]);
        let hash = u64::from_le_bytes(bucket);
        let index = (hash % self.dimensions as u64) as usize;
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        vector[index] += sign * weight;
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIMENSIONS)
    }
}

impl Embedder for HashingEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    fn embed(&self, text: &str) -> Embedding {
        let tokens = tokenize(text);
        let mut vector = vec![0.0; self.dimensions];
        for token in &tokens {
            self.accumulate(&mut vector, token, 1.0);
        }
        for pair in tokens.windows(2) {
            self.accumulate(&mut vector, &format!("{} {}", pair[0], pair[1]), 0.5);
        }
        normalize(&mut vector);
        Embedding {
            model: self.model.clone(),
            vector,
        }
    }
}

/// Lowercase word tokens with stopwords removed.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .filter(|token| !STOPWORDS.contains(&token.as_str()))
        .collect()
}

fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

/// Cosine similarity; zero when either vector is empty or zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let x = f64::from(x);
        let y = f64::from(y);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f64::EPSILON {
        return 0.0;
    }
    (dot / denom) as f32
}

/// Hex SHA-256 of a record body.
pub fn body_hash(body: &str) -> String {
    hex::encode(Sha256::digest(body.as_bytes()))
}
