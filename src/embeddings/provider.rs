// src/embeddings/provider.rs
// Pluggable embedding generation behind one trait, mirroring the teacher's
// provider-priority pattern (OpenAI/Ollama) but reduced to what CRACE's
// core needs: batch text -> vector.

use async_trait::async_trait;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn dimensions(&self) -> usize;
    fn model_name(&self) -> &str;
    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Local, dependency-free provider used when no remote embedding API is
/// configured. Deterministic and bounded-lifetime: the "model" here is a
/// fixed hashing scheme rather than network state, so there is nothing to
/// warm up beyond the lazy `OnceLock` that holds it (§4.4 "bounded-lifetime
/// model loader invoked lazily on first call").
pub struct LocalHashProvider {
    dimensions: usize,
}

impl LocalHashProvider {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dimensions];
        for (i, token) in text.split_whitespace().enumerate() {
            let digest = md5::compute(token.as_bytes());
            for (j, byte) in digest.iter().enumerate() {
                let slot = (i * 16 + j) % self.dimensions;
                v[slot] += (*byte as f32 / 255.0) - 0.5;
            }
        }
        normalize(&mut v);
        v
    }
}

#[async_trait]
impl EmbeddingProvider for LocalHashProvider {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        "local-hash"
    }

    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

pub fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_provider_is_deterministic_and_unit_norm() {
        let provider = LocalHashProvider::new(32);
        let a = provider.embed_batch(&["hello world".to_string()]).await.unwrap();
        let b = provider.embed_batch(&["hello world".to_string()]).await.unwrap();
        assert_eq!(a, b);
        let norm: f32 = a[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-3 || norm == 0.0);
    }
}
