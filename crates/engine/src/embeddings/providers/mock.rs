//! Offline provider: hashed character trigrams.

use crate::embeddings::provider::EmbeddingProvider;
use docsim_core::AppResult;
use std::collections::HashMap;

/// Deterministic, content-dependent embeddings without a model.
///
/// Each lowercased token is padded with spaces and split into character
/// trigrams; every trigram and the whole token are hashed into a bucket.
/// Texts sharing vocabulary land close together under L2 distance, which is
/// enough for local runs and tests. Non-Latin scripts work the same way
/// since trigrams are taken over `char`s, not bytes.
#[derive(Debug)]
pub struct MockProvider {
    dimensions: usize,
}

impl MockProvider {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn bucket(&self, hash: u64) -> usize {
        (hash % self.dimensions as u64) as usize
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];
        if self.dimensions == 0 {
            return embedding;
        }

        let lower = text.to_lowercase();
        let mut token_counts: HashMap<&str, u32> = HashMap::new();
        for token in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.chars().count() > 1)
        {
            *token_counts.entry(token).or_insert(0) += 1;
        }

        for (token, count) in &token_counts {
            let weight = (*count as f32).sqrt();

            let padded: Vec<char> = std::iter::once(' ')
                .chain(token.chars())
                .chain(std::iter::once(' '))
                .collect();
            for window in padded.windows(3) {
                let idx = self.bucket(fnv1a(window.iter().copied()));
                embedding[idx] += weight;
            }

            let idx = self.bucket(fnv1a(token.chars()).rotate_left(17));
            embedding[idx] += *count as f32;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        embedding
    }
}

fn fnv1a(chars: impl Iterator<Item = char>) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for c in chars {
        for b in (c as u32).to_le_bytes() {
            hash ^= b as u64;
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
    }
    hash
}

#[async_trait::async_trait]
impl EmbeddingProvider for MockProvider {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        Ok(self.vectorize(text))
    }
}
