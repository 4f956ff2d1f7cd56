use crate::domain::tts::LanguageCode;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

/// Number of leading words that form a chunk's bucket key
const PREFIX_WORDS: usize = 3;

/// Near-duplicate lookup for already synthesized chunks.
///
/// Chunks are bucketed by language and their first few lower-cased words, and
/// only chunks in the same bucket are scored. A match is a hint that audio can
/// be reused, never proof that two chunks are equal; exact equality is the
/// synthesis cache's job.
#[derive(Default)]
pub struct SimilarityIndex {
    inner: RwLock<Buckets>,
}

#[derive(Default)]
struct Buckets {
    /// bucket key -> chunk id -> text
    chunks: HashMap<String, HashMap<String, String>>,
    /// chunk id -> bucket key
    locations: HashMap<String, String>,
}

impl SimilarityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `text` under `chunk_id`. Re-adding an id replaces its text.
    pub fn add_chunk(&self, text: &str, language: LanguageCode, chunk_id: &str) {
        let key = bucket_key(text, language);
        let mut inner = self.inner.write();

        if let Some(previous) = inner.locations.insert(chunk_id.to_string(), key.clone()) {
            if previous != key {
                remove_from_bucket(&mut inner.chunks, &previous, chunk_id);
            }
        }
        inner
            .chunks
            .entry(key)
            .or_default()
            .insert(chunk_id.to_string(), text.to_string());
    }

    /// Forget `chunk_id`. Returns whether it was indexed.
    pub fn remove_chunk(&self, chunk_id: &str) -> bool {
        let mut inner = self.inner.write();
        let Some(key) = inner.locations.remove(chunk_id) else {
            return false;
        };
        remove_from_bucket(&mut inner.chunks, &key, chunk_id);
        true
    }

    /// Chunks of the same language and bucket whose similarity to `text` is
    /// strictly above `threshold`, best match first.
    pub fn find_similar(&self, text: &str, language: LanguageCode, threshold: f64) -> Vec<(String, f64)> {
        let key = bucket_key(text, language);
        let words = word_set(text);

        let mut matches: Vec<(String, f64)> = {
            let inner = self.inner.read();
            let Some(bucket) = inner.chunks.get(&key) else {
                return Vec::new();
            };
            bucket
                .iter()
                .map(|(id, candidate)| (id.clone(), jaccard(&words, &word_set(candidate))))
                .filter(|(_, score)| *score > threshold)
                .collect()
        };

        matches.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        matches
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.read().locations.len()
    }
}

fn remove_from_bucket(chunks: &mut HashMap<String, HashMap<String, String>>, key: &str, chunk_id: &str) {
    if let Some(bucket) = chunks.get_mut(key) {
        bucket.remove(chunk_id);
        if bucket.is_empty() {
            chunks.remove(key);
        }
    }
}

/// Jaccard similarity of the lower-cased word sets of two texts
pub fn similarity(a: &str, b: &str) -> f64 {
    jaccard(&word_set(a), &word_set(b))
}

fn word_set(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// `|a ∩ b| / |a ∪ b|`, defined as 0 when both sets are empty
fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

fn bucket_key(text: &str, language: LanguageCode) -> String {
    let prefix = text
        .split_whitespace()
        .take(PREFIX_WORDS)
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ");
    format!("{}\n{}", language.as_str(), prefix)
}
