//! Embedding provider contract and local implementations.
//!
//! The pipeline treats embeddings as opaque vectors from an external
//! provider. [`HashEmbedder`] is a deterministic, dependency-free provider
//! used by tests and the CLI: token-hash bucketing gives overlapping texts
//! overlapping vectors, which is enough for the retrieval paths to behave
//! like the real thing. [`FlakyEmbedder`] injects failures for the
//! partial-failure paths.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use sha2::{Digest, Sha256};

use prospectus_core::cancel::CancelContext;
use prospectus_core::error::{Error, Result};

/// Embedding provider contract. Must be safe for concurrent use and must
/// honor cancellation.
pub trait EmbeddingProvider: Send + Sync {
    /// Identifier of the backing model.
    fn model_id(&self) -> &str;

    /// Vector dimension produced by this provider.
    fn dimension(&self) -> usize;

    /// Embed a batch of texts with one call. Errors are batch-level.
    fn embed_batch(&self, texts: &[&str], cancel: &CancelContext) -> Result<Vec<Vec<f32>>>;

    /// Embed one text.
    fn embed_single(&self, text: &str, cancel: &CancelContext) -> Result<Vec<f32>> {
        Ok(self
            .embed_batch(&[text], cancel)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("provider returned no vector".into()))?)
    }
}

/// Stable 64-bit hash of a token (first eight bytes of its SHA-256).
fn token_hash(token: &str) -> u64 {
    let digest = Sha256::digest(token.as_bytes());
    u64::from_be_bytes(digest[..8].try_into().expect("digest is 32 bytes"))
}

/// Tokens that carry no signal: question scaffolding, ubiquitous domain
/// words, and the structural labels of row-chunk text.
const EMBED_STOPWORDS: &[&str] = &[
    "a", "additional", "an", "and", "are", "can", "car", "category", "come", "do", "does",
    "feature", "for", "how", "in", "is", "it", "key", "metadata", "of", "on", "or",
    "specification", "sub", "that", "the", "this", "to", "usp", "value", "vehicle", "what",
    "when", "where", "which", "who", "why", "will", "with",
];

/// Fold light plurals so "colors" and "color" land in the same bucket.
fn stem(token: &str) -> &str {
    if token.len() > 3 {
        token.strip_suffix('s').unwrap_or(token)
    } else {
        token
    }
}

/// Deterministic token-hash embedder.
#[derive(Debug)]
pub struct HashEmbedder {
    dimension: usize,
    batch_calls: AtomicUsize,
    texts_embedded: AtomicUsize,
}

impl HashEmbedder {
    /// A provider producing vectors of `dimension`.
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            batch_calls: AtomicUsize::new(0),
            texts_embedded: AtomicUsize::new(0),
        }
    }

    /// Number of batch calls made so far.
    #[must_use]
    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    /// Number of texts embedded so far.
    #[must_use]
    pub fn texts_embedded(&self) -> usize {
        self.texts_embedded.load(Ordering::SeqCst)
    }

    /// Embed one text: stopword-filter, stem, bucket token hashes, then
    /// L2-normalize.
    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimension];
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty() && !EMBED_STOPWORDS.contains(t))
            .map(stem)
            .filter(|t| !EMBED_STOPWORDS.contains(t))
        {
            #[allow(clippy::cast_possible_truncation)]
            let bucket = (token_hash(token) % self.dimension as u64) as usize;
            vector[bucket] += 1.0;
        }
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

impl EmbeddingProvider for HashEmbedder {
    fn model_id(&self) -> &str {
        "token-hash"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_batch(&self, texts: &[&str], cancel: &CancelContext) -> Result<Vec<Vec<f32>>> {
        cancel.check("embed_batch")?;
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        self.texts_embedded.fetch_add(texts.len(), Ordering::SeqCst);
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}

/// A provider that fails whenever a marked text is present.
///
/// Batch calls fail wholesale if any text in the batch matches; single
/// calls fail only for the matching text. This reproduces the reference
/// partial-failure shape: batch collapse, then per-chunk recovery.
#[derive(Debug)]
pub struct FlakyEmbedder {
    inner: HashEmbedder,
    fail_markers: HashSet<String>,
}

impl FlakyEmbedder {
    /// Wrap a [`HashEmbedder`] with failure markers: any text containing
    /// one of `markers` as a substring fails.
    #[must_use]
    pub fn new(dimension: usize, markers: impl IntoIterator<Item = String>) -> Self {
        Self {
            inner: HashEmbedder::new(dimension),
            fail_markers: markers.into_iter().collect(),
        }
    }

    /// The wrapped provider's call counters.
    #[must_use]
    pub const fn inner(&self) -> &HashEmbedder {
        &self.inner
    }

    fn is_marked(&self, text: &str) -> bool {
        self.fail_markers.iter().any(|marker| text.contains(marker))
    }
}

impl EmbeddingProvider for FlakyEmbedder {
    fn model_id(&self) -> &str {
        "token-hash-flaky"
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn embed_batch(&self, texts: &[&str], cancel: &CancelContext) -> Result<Vec<Vec<f32>>> {
        cancel.check("embed_batch")?;
        if let Some(marked) = texts.iter().find(|text| self.is_marked(text)) {
            let snippet: String = marked.chars().take(40).collect();
            return Err(Error::Embedding(format!(
                "provider rejected batch containing: {snippet}"
            )));
        }
        self.inner.embed_batch(texts, cancel)
    }

    fn embed_single(&self, text: &str, cancel: &CancelContext) -> Result<Vec<f32>> {
        cancel.check("embed_single")?;
        if self.is_marked(text) {
            let snippet: String = text.chars().take(40).collect();
            return Err(Error::Embedding(format!("provider rejected: {snippet}")));
        }
        self.inner.embed_single(text, cancel)
    }
}
