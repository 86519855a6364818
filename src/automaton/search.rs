//! Chunked search over a finalized automaton.
//!
//! A [`Searcher`] is the resumable cursor of one search session: the node
//! reached by the last consumed byte plus the absolute offset of the current
//! chunk. It borrows the automaton immutably, so any number of sessions can
//! run over one finalized automaton at the same time.
//!
//! Two surfaces are provided:
//! - [`Searcher::search`]: callback-driven, consumes a whole chunk and emits
//!   match events as it goes.
//! - [`Searcher::find_iter`]: pull-style, yields one [`Match`] per call and
//!   remembers where it stopped.

use super::node::NodeId;
use super::pattern::Pattern;
use super::trie::Automaton;
use crate::MultimatchError;

/// How a callback search ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The chunk was consumed to its end.
    Done,
    /// The match callback requested a stop; the cursor points just past the
    /// stopping match and the same chunk can be re-fed to resume.
    Stopped,
}

/// A match event.
///
/// `position` is the absolute offset just past the last matched byte; a
/// pattern in the set starts at `position - key.len()`. The pattern slice is
/// a read-only view into the automaton's node and stays valid for the
/// automaton's lifetime.
pub struct Match<'a, X> {
    position: usize,
    patterns: &'a [Pattern<X>],
}

impl<'a, X> Match<'a, X> {
    /// Absolute offset just past the last matched byte.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Every pattern ending at this position, longest first.
    pub fn patterns(&self) -> &'a [Pattern<X>] {
        self.patterns
    }
}

impl<X> Clone for Match<'_, X> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<X> Copy for Match<'_, X> {}

/// Resumable search state over a finalized automaton.
pub struct Searcher<'a, X> {
    automaton: &'a Automaton<X>,
    /// Node reached by the last consumed byte.
    current: NodeId,
    /// Absolute offset of the current chunk's first byte.
    base_position: usize,
    /// Chunk-local offset where a stopped search left off.
    resume: usize,
}

impl<'a, X: Clone> Searcher<'a, X> {
    pub(crate) fn new(automaton: &'a Automaton<X>) -> Self {
        Self {
            automaton,
            current: NodeId::ROOT,
            base_position: 0,
            resume: 0,
        }
    }

    /// Rewind to the automaton root at absolute offset zero.
    pub fn reset(&mut self) {
        self.current = NodeId::ROOT;
        self.base_position = 0;
        self.resume = 0;
    }

    /// Search one chunk, invoking `on_match` for every match event.
    ///
    /// With `keep` false the cursor is reset first; with `keep` true the
    /// chunk is treated as the continuation of the previous one. The
    /// callback returns `true` to stop: the cursor then persists the
    /// chunk-local position, and feeding the same chunk again with
    /// `keep = true` resumes right after the stopping match without
    /// re-emitting it.
    pub fn search<F>(
        &mut self,
        chunk: &[u8],
        keep: bool,
        mut on_match: F,
    ) -> Result<SearchOutcome, MultimatchError>
    where
        F: FnMut(&Match<'a, X>) -> bool,
    {
        if self.automaton.is_open() {
            return Err(MultimatchError::NotFinalized);
        }
        if !keep {
            self.reset();
        }

        let automaton = self.automaton;
        let mut current = self.current;
        let mut position = self.resume;
        self.resume = 0;

        while position < chunk.len() {
            let next = automaton.node(current).step(chunk[position]);
            if next.is_none() {
                if current != NodeId::ROOT {
                    // Fall back without consuming the byte; the failure
                    // target retries it.
                    current = automaton.node(current).failure();
                } else {
                    position += 1;
                }
            } else {
                current = next;
                position += 1;

                // Only a forward transition reports. A failure landing on a
                // final node was already reported when the longer path
                // entered it.
                let node = automaton.node(current);
                if node.is_final() {
                    let event = Match {
                        position: self.base_position + position,
                        patterns: node.matches(),
                    };
                    if on_match(&event) {
                        self.current = current;
                        self.resume = position;
                        return Ok(SearchOutcome::Stopped);
                    }
                }
            }
        }

        self.current = current;
        self.base_position += chunk.len();
        Ok(SearchOutcome::Done)
    }

    /// Pull-style search over one chunk.
    ///
    /// With `keep` false the cursor is reset before the first item. The
    /// iterator ends when the chunk is exhausted; feed the next chunk with
    /// `keep = true` to continue the stream. Yields nothing if the automaton
    /// has not been finalized.
    pub fn find_iter<'s, 't>(
        &'s mut self,
        chunk: &'t [u8],
        keep: bool,
    ) -> FindIter<'s, 'a, 't, X> {
        FindIter {
            searcher: self,
            chunk,
            keep,
            started: false,
            done: false,
        }
    }
}

/// Iterator over the matches of one chunk. See [`Searcher::find_iter`].
pub struct FindIter<'s, 'a, 't, X> {
    searcher: &'s mut Searcher<'a, X>,
    chunk: &'t [u8],
    keep: bool,
    started: bool,
    done: bool,
}

impl<'s, 'a, 't, X: Clone> Iterator for FindIter<'s, 'a, 't, X> {
    type Item = Match<'a, X>;

    fn next(&mut self) -> Option<Match<'a, X>> {
        if self.done {
            return None;
        }
        let keep = self.started || self.keep;
        self.started = true;

        let mut found: Option<Match<'a, X>> = None;
        match self.searcher.search(self.chunk, keep, |event| {
            found = Some(*event);
            true
        }) {
            Ok(SearchOutcome::Stopped) => found,
            Ok(SearchOutcome::Done) | Err(_) => {
                self.done = true;
                None
            }
        }
    }
}
