//! # Response Cache
//!
//! Time-boxed memoization of solved questions, keyed by subject plus a
//! lowercased 50-character query prefix. Expiry is checked on read;
//! stale entries stay in the table until overwritten. There is no
//! capacity bound beyond the TTL, which matches expected traffic.
//!
//! The prefix key means two long queries sharing the same first 50
//! characters under one subject collide and share a cached answer.
//! That is a known, accepted approximation, not a bug.

use crate::models::{Solution, Subject};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Cached entries stay fresh for this long
pub const CACHE_TTL: Duration = Duration::from_secs(30 * 60);

/// How much of the lowercased query participates in the key
const KEY_PREFIX_CHARS: usize = 50;

struct CacheEntry {
    solution: Solution,
    stored_at: Instant,
}

/// In-memory TTL cache for solved questions
pub struct ResponseCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseCache {
    /// Create a cache with the standard 30-minute TTL
    pub fn new() -> Self {
        Self::with_ttl(CACHE_TTL)
    }

    /// Create a cache with a custom TTL (used by expiry tests)
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Deterministic cache key: `{subject}_{lowercased 50-char query prefix}`
    pub fn key(query: &str, subject: Subject) -> String {
        let prefix: String = query.to_lowercase().chars().take(KEY_PREFIX_CHARS).collect();
        format!("{}_{}", subject.as_str(), prefix)
    }

    /// Look up a fresh entry. Stale entries read as a miss and are left
    /// in place until the next `put` overwrites them.
    pub fn get(&self, key: &str) -> Option<Solution> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(key)?;
        if entry.stored_at.elapsed() < self.ttl {
            Some(entry.solution.clone())
        } else {
            None
        }
    }

    /// Store a solution, unconditionally overwriting any prior entry
    pub fn put(&self, key: impl Into<String>, solution: Solution) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            key.into(),
            CacheEntry {
                solution,
                stored_at: Instant::now(),
            },
        );
    }

    /// Number of entries in the table, fresh or stale
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Step;

    fn sample_solution(answer: &str) -> Solution {
        Solution {
            steps: vec![Step::new(1, "Identify the given values and the target")],
            final_answer: answer.to_string(),
            explanation: "Identify the given values and the target".to_string(),
        }
    }

    #[test]
    fn test_key_format() {
        let key = ResponseCache::key("What Is Newton's Second Law?", Subject::Physics);
        assert_eq!(key, "physics_what is newton's second law?");
    }

    #[test]
    fn test_key_truncates_to_prefix() {
        let long = "a".repeat(80);
        let key = ResponseCache::key(&long, Subject::Chemistry);
        assert_eq!(key, format!("chemistry_{}", "a".repeat(50)));
    }

    #[test]
    fn test_prefix_collision_is_shared_key() {
        // Documented approximation: same 50-char prefix, same subject,
        // same key - even for distinct queries.
        let shared = "x".repeat(50);
        let a = format!("{} followed by one tail", shared);
        let b = format!("{} followed by a different tail", shared);
        assert_eq!(
            ResponseCache::key(&a, Subject::Biology),
            ResponseCache::key(&b, Subject::Biology)
        );
    }

    #[test]
    fn test_round_trip_within_ttl() {
        let cache = ResponseCache::new();
        let key = ResponseCache::key("what is osmosis", Subject::Biology);
        let solution = sample_solution("water moves across the membrane");

        cache.put(key.clone(), solution.clone());
        assert_eq!(cache.get(&key), Some(solution));
    }

    #[test]
    fn test_expired_entry_reads_as_miss() {
        let cache = ResponseCache::with_ttl(Duration::ZERO);
        let key = ResponseCache::key("what is osmosis", Subject::Biology);
        cache.put(key.clone(), sample_solution("n/a"));

        assert!(cache.get(&key).is_none());
        // Entry is left in place, not evicted
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_put_overwrites() {
        let cache = ResponseCache::new();
        cache.put("k", sample_solution("first"));
        cache.put("k", sample_solution("second"));
        assert_eq!(cache.get("k").unwrap().final_answer, "second");
        assert_eq!(cache.len(), 1);
    }
}
