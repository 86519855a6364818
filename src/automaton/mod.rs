//! Aho-Corasick pattern matching engine.
//!
//! The engine is a keyword trie augmented with failure links and per-node
//! match sets. The key components are:
//!
//! - `Pattern`: a search key plus optional replacement and caller tag
//! - `Node`/`NodeId`: arena-allocated trie vertices linked by index
//! - `Automaton`: trie construction, finalization and lookups
//! - `Searcher`: chunked search with callback and pull-style surfaces
//! - `Replacer`: streaming replacement with cross-chunk backlog handling
//! - `ThreadSafeMatcher`: snapshot-swap wrapper for concurrent use
//!
//! # Module Organization
//!
//! - `pattern`: pattern value type and the key length limit
//! - `node`: arena node and index types
//! - `trie`: the automaton itself (construction + finalization)
//! - `search`: the chunked search driver
//! - `replace`: the streaming replace engine
//! - `thread_safe`: concurrent snapshot wrapper

mod node;
mod pattern;
mod replace;
mod search;
mod thread_safe;
mod trie;

pub use pattern::{Pattern, MAX_PATTERN_LEN};
pub use replace::{ReplaceMode, Replacer, BUFFER_SIZE};
pub use search::{FindIter, Match, SearchOutcome, Searcher};
pub use thread_safe::ThreadSafeMatcher;
pub use trie::Automaton;
