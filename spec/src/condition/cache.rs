//! Memoization of parsed conditions
//!
//! Condition sentences repeat heavily across modules,
//! so parsed trees are cached by their exact source text.
//! Entries are written once and never replaced,
//! which keeps repeated validation deterministic.
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::condition::{Condition, ConditionParser};

/// A write-once cache of parsed conditions, keyed by source text.
///
/// The cache is cheap to share:
/// lookups take a read lock,
/// and only the first parse of a given sentence takes the write lock.
#[derive(Debug, Default)]
pub struct ConditionCache {
    inner: RwLock<HashMap<String, Arc<Condition>>>,
}

impl ConditionCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        ConditionCache::default()
    }

    /// Fetch the parsed form of the given condition text,
    /// parsing and recording it on first use.
    pub fn get_or_parse(&self, parser: &ConditionParser<'_>, text: &str) -> Arc<Condition> {
        {
            let read = self.inner.read().unwrap_or_else(|e| e.into_inner());
            if let Some(condition) = read.get(text) {
                return Arc::clone(condition);
            }
        }
        let parsed = Arc::new(parser.parse(text));
        let mut write = self.inner.write().unwrap_or_else(|e| e.into_inner());
        Arc::clone(write.entry(text.to_owned()).or_insert(parsed))
    }

    /// The number of distinct condition texts parsed so far.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether no condition has been parsed yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
