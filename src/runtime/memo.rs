//! Packrat memoization.
//!
//! One cache per top-level parse call; entries are only meaningful for the
//! grammar and input they were computed against.

use std::collections::HashMap;

use super::eval::MatchResult;
use crate::grammar::RuleId;

/// Identifies one rule invocation.
///
/// `quiet` is part of the key: an invocation under lookahead records no
/// expectations, so its result must not stand in for a loud one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct MemoKey {
    pub rule: RuleId,
    pub position: usize,
    pub quiet: bool,
}

/// Cache counters, logged at the end of a parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoStats {
    pub hits: usize,
    pub misses: usize,
    pub entries: usize,
}

#[derive(Debug, Default)]
pub(crate) struct MemoCache {
    entries: HashMap<MemoKey, MatchResult>,
    hits: usize,
    misses: usize,
}

impl MemoCache {
    pub fn get(&mut self, key: &MemoKey) -> Option<MatchResult> {
        match self.entries.get(key) {
            Some(result) => {
                self.hits += 1;
                Some(result.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn put(&mut self, key: MemoKey, result: MatchResult) {
        self.entries.insert(key, result);
    }

    pub fn stats(&self) -> MemoStats {
        MemoStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.entries.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_hits_and_misses() {
        let mut cache = MemoCache::default();
        let key = MemoKey {
            rule: RuleId(0),
            position: 3,
            quiet: false,
        };

        assert!(cache.get(&key).is_none());
        cache.put(key, MatchResult::Failure { furthest: 3 });
        assert!(matches!(
            cache.get(&key),
            Some(MatchResult::Failure { furthest: 3 })
        ));

        let quiet = MemoKey { quiet: true, ..key };
        assert!(cache.get(&quiet).is_none());

        assert_eq!(
            cache.stats(),
            MemoStats {
                hits: 1,
                misses: 2,
                entries: 1
            }
        );
    }
}
