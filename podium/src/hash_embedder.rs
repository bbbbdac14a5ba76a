//! Dependency-free fallback embedder: deterministic signed feature hashing
//! over token unigrams/bigrams (SPEC_FULL.md §4.8). Used when no ONNX
//! model path is configured, and by default so the binary and its tests
//! run without downloading any weights.

use podium_core::embed::{l2_normalize, Embedder};
use podium_core::error::EngineError;

const DIMS: usize = 256;

pub struct HashEmbedder {
    dims: usize,
}

impl HashEmbedder {
    pub fn new() -> Self {
        HashEmbedder { dims: DIMS }
    }

    fn hash_token(token: &str) -> (u64, bool) {
        // FNV-1a, sign bit taken from the low bit of the hash (standard
        // signed feature hashing trick: reduces collision bias vs.
        // unsigned-only accumulation).
        let mut h: u64 = 1469598103934665603;
        for b in token.bytes() {
            h ^= b as u64;
            h = h.wrapping_mul(1099511628211);
        }
        let sign = h & 1 == 0;
        (h, sign)
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dims];
        let words: Vec<String> = text
            .to_lowercase()
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
            .filter(|w| !w.is_empty())
            .collect();

        for w in &words {
            let (h, sign) = Self::hash_token(w);
            let idx = (h as usize) % self.dims;
            v[idx] += if sign { 1.0 } else { -1.0 };
        }
        for pair in words.windows(2) {
            let bigram = format!("{}_{}", pair[0], pair[1]);
            let (h, sign) = Self::hash_token(&bigram);
            let idx = (h as usize) % self.dims;
            v[idx] += if sign { 0.5 } else { -0.5 };
        }

        l2_normalize(&mut v);
        v
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl Embedder for HashEmbedder {
    fn encode(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EngineError> {
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_text_encodes_identically() {
        let e = HashEmbedder::new();
        let a = e.encode_one("welcome to our talk about caches").unwrap();
        let b = e.encode_one("welcome to our talk about caches").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_topics_are_not_parallel() {
        let e = HashEmbedder::new();
        let a = e.encode_one("LRU and LFU eviction policies").unwrap();
        let b = e.encode_one("read after write linearizability consistency").unwrap();
        let sim = podium_core::embed::cosine_similarity(&a, &b);
        assert!(sim < 0.9, "unrelated topics should not look nearly identical, got {sim}");
    }

    #[test]
    fn output_is_unit_length() {
        let e = HashEmbedder::new();
        let v = e.encode_one("caches").unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-3 || norm == 0.0);
    }
}
