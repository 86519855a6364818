//! multimatch: multi-pattern string search and streaming replacement.
//!
//! Given a finite set of byte patterns, this crate locates every occurrence
//! of any pattern in an input text - optionally streamed in chunks - and can
//! rewrite matches to caller-supplied substitutes. The engine is an
//! Aho-Corasick automaton: a keyword trie augmented with failure links and
//! per-node match sets, giving total work linear in the input, the pattern
//! lengths and the number of matches, independent of pattern count.
//!
//! ```
//! use multimatch::{Automaton, Pattern};
//!
//! let mut automaton = Automaton::new();
//! automaton.add(Pattern::new("he").with_title("he")).unwrap();
//! automaton.add(Pattern::new("she").with_title("she")).unwrap();
//! automaton.add(Pattern::new("hers").with_title("hers")).unwrap();
//! automaton.finalize();
//!
//! let mut found = Vec::new();
//! let mut searcher = automaton.searcher();
//! searcher.search(b"ushers", false, |event| {
//!     for pattern in event.patterns() {
//!         found.push((event.position(), *pattern.title().unwrap()));
//!     }
//!     false // keep going
//! }).unwrap();
//!
//! assert_eq!(found, vec![(4, "she"), (4, "he"), (6, "hers")]);
//! ```
//!
//! Streaming replacement buffers candidate matches across chunk boundaries,
//! so a pattern split between chunks is still rewritten as one unit:
//!
//! ```
//! use multimatch::{Automaton, Pattern, ReplaceMode};
//!
//! let mut automaton: Automaton = Automaton::new();
//! automaton.add(Pattern::new("brown").with_replacement("grey")).unwrap();
//! automaton.finalize();
//!
//! let mut out = Vec::new();
//! let mut replacer = automaton.replacer();
//! for chunk in [&b"the bro"[..], b"wn fox"] {
//!     replacer.replace(chunk, ReplaceMode::Normal, |run| {
//!         out.extend_from_slice(run)
//!     }).unwrap();
//! }
//! replacer.flush(|run| out.extend_from_slice(run));
//!
//! assert_eq!(out, b"the grey fox");
//! ```
//!
//! A finalized [`Automaton`] is immutable; any number of threads may search
//! it concurrently, each through its own [`Searcher`] or [`Replacer`]. For
//! pattern sets that change over time, [`ThreadSafeMatcher`] publishes
//! finalized snapshots behind an atomic swap.

use std::fmt;

mod automaton;

pub use automaton::{
    Automaton, FindIter, Match, Pattern, ReplaceMode, Replacer, SearchOutcome, Searcher,
    ThreadSafeMatcher, BUFFER_SIZE, MAX_PATTERN_LEN,
};

/// Errors reported by automaton operations.
///
/// All of these are structural: they signal a misuse of the lifecycle or an
/// invalid pattern, never an I/O condition, and none of them mutate the
/// automaton.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultimatchError {
    /// A mutation was attempted after finalization.
    Finalized,
    /// A search or replace was attempted before finalization.
    NotFinalized,
    /// The pattern key is empty.
    EmptyPattern,
    /// The pattern key exceeds [`MAX_PATTERN_LEN`]; carries the length.
    PatternTooLong(usize),
    /// A pattern with the same key is already registered.
    DuplicatePattern,
    /// Replace was called on an automaton with no replacement patterns.
    NoReplacement,
}

impl fmt::Display for MultimatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MultimatchError::Finalized => {
                write!(f, "automaton is finalized and accepts no more patterns")
            }
            MultimatchError::NotFinalized => {
                write!(f, "automaton must be finalized first")
            }
            MultimatchError::EmptyPattern => write!(f, "pattern key is empty"),
            MultimatchError::PatternTooLong(len) => write!(
                f,
                "pattern key length {} exceeds the maximum of {}",
                len, MAX_PATTERN_LEN
            ),
            MultimatchError::DuplicatePattern => {
                write!(f, "a pattern with this key is already registered")
            }
            MultimatchError::NoReplacement => {
                write!(f, "no registered pattern carries a replacement")
            }
        }
    }
}

impl std::error::Error for MultimatchError {}
