//! In-memory store of extracted document text, keyed by content hash.
//!
//! Lets summarize and chat calls refer to a document by hash instead of
//! uploading and extracting it again. Bounded; the least recently used
//! entry is evicted once capacity is exceeded.
//!
//! Every entry remembers which users stored it. Lookups take a scope:
//! `Some(user_id)` only sees that user's documents, `None` sees all of them.

use std::{collections::BTreeSet, num::NonZeroUsize};

use chrono::{DateTime, Utc};
use lru::LruCache;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::AppError;

/// Filename recorded when the text was pasted rather than uploaded.
pub const UNTITLED: &str = "untitled";

#[derive(Debug, Clone, Serialize)]
pub struct StoredDocument {
    pub hash: String,
    pub text: String,
    pub filename: String,
    /// Length in characters.
    pub size: usize,
    pub timestamp: DateTime<Utc>,
    #[serde(skip)]
    owners: BTreeSet<i64>,
}

impl StoredDocument {
    fn visible_to(&self, scope: Option<i64>) -> bool {
        scope.is_none_or(|user_id| self.owners.contains(&user_id))
    }
}

/// Listing entry (no text).
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub hash: String,
    pub filename: String,
    pub size: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CacheStats {
    pub total_documents: usize,
    pub total_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_timestamp: Option<DateTime<Utc>>,
}

/// SHA-256 hex digest of the document text.
pub fn content_hash(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

pub struct DocumentCache {
    docs: LruCache<String, StoredDocument>,
}

impl DocumentCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            docs: LruCache::new(capacity),
        }
    }

    /// Stores `text` for `owner` and returns its hash. Storing the same text
    /// again refreshes the entry (new filename and timestamp) and adds the
    /// owner instead of duplicating it.
    pub fn store(
        &mut self,
        text: &str,
        filename: Option<&str>,
        owner: i64,
    ) -> Result<String, AppError> {
        if text.trim().is_empty() {
            return Err(AppError::BadRequest("Cannot store an empty document".to_string()));
        }

        let hash = content_hash(text);
        let filename = filename
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(UNTITLED)
            .to_string();

        if let Some(doc) = self.docs.get_mut(&hash) {
            doc.filename = filename;
            doc.timestamp = Utc::now();
            doc.owners.insert(owner);
            tracing::info!("Refreshed document {}", short(&hash));
            return Ok(hash);
        }

        let doc = StoredDocument {
            hash: hash.clone(),
            text: text.to_string(),
            filename,
            size: text.chars().count(),
            timestamp: Utc::now(),
            owners: BTreeSet::from([owner]),
        };

        if let Some((evicted, _)) = self.docs.push(hash.clone(), doc) {
            tracing::info!("Evicted document {}", short(&evicted));
        }

        tracing::info!("Stored document {}", short(&hash));
        Ok(hash)
    }

    /// Looks up a document visible in `scope`, refreshing its recency.
    pub fn get(&mut self, hash: &str, scope: Option<i64>) -> Option<&StoredDocument> {
        if !self.docs.peek(hash)?.visible_to(scope) {
            return None;
        }
        self.docs.get(hash)
    }

    pub fn get_text(&mut self, hash: &str, scope: Option<i64>) -> Option<String> {
        self.get(hash, scope).map(|doc| doc.text.clone())
    }

    /// Membership check that does not refresh recency.
    pub fn contains(&self, hash: &str) -> bool {
        self.docs.contains(hash)
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Documents visible in `scope`, most recently used first.
    pub fn list(&self, scope: Option<i64>) -> Vec<DocumentSummary> {
        self.visible(scope)
            .map(|doc| DocumentSummary {
                hash: doc.hash.clone(),
                filename: doc.filename.clone(),
                size: doc.size,
                timestamp: doc.timestamp,
            })
            .collect()
    }

    pub fn stats(&self, scope: Option<i64>) -> CacheStats {
        let total_documents = self.visible(scope).count();
        let total_size: usize = self.visible(scope).map(|doc| doc.size).sum();

        CacheStats {
            total_documents,
            total_size,
            average_size: (total_documents > 0).then(|| total_size / total_documents),
            oldest_timestamp: self.visible(scope).map(|doc| doc.timestamp).min(),
            newest_timestamp: self.visible(scope).map(|doc| doc.timestamp).max(),
        }
    }

    fn visible(&self, scope: Option<i64>) -> impl Iterator<Item = &StoredDocument> {
        self.docs
            .iter()
            .map(|(_, doc)| doc)
            .filter(move |doc| doc.visible_to(scope))
    }
}

fn short(hash: &str) -> &str {
    &hash[..hash.len().min(8)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_text_is_deduplicated() {
        let mut cache = DocumentCache::new(4);
        let first = cache.store("Photosynthesis converts light.", Some("bio.pdf"), 1).unwrap();
        let second = cache.store("Photosynthesis converts light.", Some("copy.pdf"), 1).unwrap();

        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&first, None).unwrap().filename, "copy.pdf");
    }

    #[test]
    fn empty_text_is_rejected() {
        let mut cache = DocumentCache::new(4);
        assert!(cache.store("   \n", None, 1).is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn missing_filename_defaults_to_untitled() {
        let mut cache = DocumentCache::new(4);
        let hash = cache.store("Some pasted notes", None, 1).unwrap();
        assert_eq!(cache.get(&hash, None).unwrap().filename, UNTITLED);
    }

    #[test]
    fn oldest_entry_is_evicted_at_capacity() {
        let mut cache = DocumentCache::new(2);
        let a = cache.store("document a", None, 1).unwrap();
        let b = cache.store("document b", None, 1).unwrap();
        let c = cache.store("document c", None, 1).unwrap();

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&a));
        assert!(cache.contains(&b));
        assert!(cache.contains(&c));
    }

    #[test]
    fn lookup_refreshes_recency() {
        let mut cache = DocumentCache::new(2);
        let a = cache.store("document a", None, 1).unwrap();
        let b = cache.store("document b", None, 1).unwrap();

        assert_eq!(cache.get_text(&a, Some(1)).as_deref(), Some("document a"));
        cache.store("document c", None, 1).unwrap();

        assert!(cache.contains(&a));
        assert!(!cache.contains(&b));
    }

    #[test]
    fn stats_on_empty_cache_have_no_averages() {
        let cache = DocumentCache::new(3);
        let stats = cache.stats(None);
        assert_eq!(stats.total_documents, 0);
        assert_eq!(stats.total_size, 0);
        assert!(stats.average_size.is_none());
        assert!(stats.oldest_timestamp.is_none());
    }

    #[test]
    fn stats_aggregate_sizes() {
        let mut cache = DocumentCache::new(3);
        cache.store("abcd", None, 1).unwrap();
        cache.store("abcdefgh", None, 1).unwrap();

        let stats = cache.stats(None);
        assert_eq!(stats.total_documents, 2);
        assert_eq!(stats.total_size, 12);
        assert_eq!(stats.average_size, Some(6));
        assert!(stats.oldest_timestamp <= stats.newest_timestamp);
    }

    #[test]
    fn documents_are_scoped_to_their_owners() {
        let mut cache = DocumentCache::new(4);
        let shared = cache.store("shared handout", Some("handout.txt"), 1).unwrap();
        cache.store("private notes", Some("notes.txt"), 1).unwrap();

        assert!(cache.get(&shared, Some(2)).is_none());
        assert!(cache.list(Some(2)).is_empty());
        assert_eq!(cache.stats(Some(2)).total_documents, 0);

        // Uploading the same text grants access without duplicating it.
        assert_eq!(cache.store("shared handout", None, 2).unwrap(), shared);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.list(Some(2)).len(), 1);
        assert!(cache.get(&shared, Some(2)).is_some());
        assert_eq!(cache.list(Some(1)).len(), 2);
        assert_eq!(cache.list(None).len(), 2);
    }

    #[test]
    fn hidden_lookup_does_not_refresh_recency() {
        let mut cache = DocumentCache::new(2);
        let a = cache.store("document a", None, 1).unwrap();
        let b = cache.store("document b", None, 1).unwrap();

        assert!(cache.get(&a, Some(2)).is_none());
        cache.store("document c", None, 1).unwrap();

        assert!(!cache.contains(&a));
        assert!(cache.contains(&b));
    }

    #[test]
    fn size_counts_characters() {
        let mut cache = DocumentCache::new(2);
        let hash = cache.store("naïve café ☕", None, 1).unwrap();

        assert_eq!(cache.get(&hash, None).unwrap().size, 12);
        assert_eq!(cache.stats(None).total_size, 12);
    }

    #[test]
    fn hash_is_stable_hex() {
        let hash = content_hash("hello");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, content_hash("hello"));
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
