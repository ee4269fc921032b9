//! Offline hashing encoder.
//!
//! Each lowercase alphanumeric token is hashed (FNV-1a, stable across builds)
//! into a seed for a ChaCha8 stream that yields that token's vector; a text's
//! embedding is the mean of its token vectors. Texts sharing words land close
//! together, which is enough for the forests to learn from when the ONNX model
//! is not installed.

use anyhow::Result;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::EmbeddingProvider;

pub struct HashingEmbeddingProvider {
    dimensions: usize,
}

impl HashingEmbeddingProvider {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut sum = vec![0.0f32; self.dimensions];
        let mut count = 0usize;

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut rng = ChaCha8Rng::seed_from_u64(fnv1a(&token.to_lowercase()));
            for value in &mut sum {
                *value += rng.gen_range(-1.0f32..1.0);
            }
            count += 1;
        }

        if count > 0 {
            for value in &mut sum {
                *value /= count as f32;
            }
        }
        sum
    }
}

impl EmbeddingProvider for HashingEmbeddingProvider {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> String {
        format!("hashing:{}", self.dimensions)
    }
}

fn fnv1a(s: &str) -> u64 {
    s.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(0x0000_0100_0000_01b3)
    })
}
