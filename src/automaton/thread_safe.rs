//! Thread-safe pattern matching.
//!
//! A finalized [`Automaton`](super::Automaton) is already safe to share:
//! searches and replaces only borrow it. What it cannot do is grow, since
//! pattern registration ends at finalization. [`ThreadSafeMatcher`] closes
//! that gap for long-lived concurrent use with a snapshot-swap scheme:
//! readers load the current finalized automaton lock-free through an
//! [`ArcSwap`], while writers serialize on a mutex, rebuild the automaton
//! from the full pattern list and swap the fresh snapshot in. Searches that
//! started on the old snapshot keep running on it unperturbed.

use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::pattern::{Pattern, MAX_PATTERN_LEN};
use super::trie::Automaton;
use crate::MultimatchError;

/// Patterns registered so far, with a by-key index for duplicate detection.
struct BuildState<X> {
    patterns: Vec<Pattern<X>>,
    by_key: FxHashMap<Arc<[u8]>, usize>,
}

impl<X> BuildState<X> {
    fn new() -> Self {
        Self {
            patterns: Vec::new(),
            by_key: FxHashMap::default(),
        }
    }
}

/// A concurrently usable matcher with snapshot semantics.
///
/// Pattern addition is serialized and rebuilds the automaton; matching is
/// lock-free on the latest snapshot.
pub struct ThreadSafeMatcher<X: Clone + Send + Sync> {
    /// The finalized snapshot - atomically swappable, lock-free reads.
    frozen: ArcSwap<Automaton<X>>,
    /// Serializes rebuilds and owns the authoritative pattern list.
    build_lock: Mutex<BuildState<X>>,
}

impl<X: Clone + Send + Sync> ThreadSafeMatcher<X> {
    /// Create a matcher whose initial snapshot matches nothing.
    pub fn new() -> Self {
        let mut empty = Automaton::new();
        empty.finalize();
        Self {
            frozen: ArcSwap::from_pointee(empty),
            build_lock: Mutex::new(BuildState::new()),
        }
    }

    /// Register a pattern and publish a fresh snapshot containing it.
    ///
    /// Validation mirrors [`Automaton::add`]; duplicates are detected
    /// against every pattern registered on this matcher so far.
    pub fn add_pattern(&self, pattern: Pattern<X>) -> Result<(), MultimatchError> {
        if pattern.key().is_empty() {
            return Err(MultimatchError::EmptyPattern);
        }
        if pattern.key().len() > MAX_PATTERN_LEN {
            return Err(MultimatchError::PatternTooLong(pattern.key().len()));
        }

        let mut state = self.build_lock.lock();
        if state.by_key.contains_key(pattern.key()) {
            return Err(MultimatchError::DuplicatePattern);
        }
        let index = state.patterns.len();
        state.by_key.insert(pattern.shared_key(), index);
        state.patterns.push(pattern);

        let mut rebuilt = Automaton::new();
        for registered in &state.patterns {
            rebuilt.add(registered.clone())?;
        }
        rebuilt.finalize();
        self.frozen.store(Arc::new(rebuilt));
        Ok(())
    }

    /// The latest finalized snapshot. Create searchers and replacers from
    /// it; a snapshot taken before a later `add_pattern` keeps matching the
    /// old pattern set.
    pub fn snapshot(&self) -> Arc<Automaton<X>> {
        self.frozen.load_full()
    }

    /// Number of patterns in the latest snapshot.
    pub fn pattern_count(&self) -> usize {
        self.frozen.load().pattern_count()
    }
}

impl<X: Clone + Send + Sync> Default for ThreadSafeMatcher<X> {
    fn default() -> Self {
        Self::new()
    }
}
