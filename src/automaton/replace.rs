//! Streaming search-and-replace over a finalized automaton.
//!
//! A [`Replacer`] runs the same chunked walk as the search driver but, at
//! every final node carrying a nominated replacement, records a *nominee*
//! instead of emitting an event. Nominees stay pending until the end of the
//! chunk, when everything before the backlog point -- the offset beyond
//! which the remaining bytes may still be the prefix of an ongoing pattern
//! -- is resolved and emitted. The chunk tail after that point is carried in
//! a backlog buffer so a pattern split across chunk boundaries is rewritten
//! as one unit.
//!
//! Overlap resolution is selected per call with [`ReplaceMode`]:
//! - `Normal`: the longest match starting no later wins; shorter nominees it
//!   covers are retracted before they are committed.
//! - `Lazy`: the first committed match wins; later overlapping nominees are
//!   dropped.

use std::collections::VecDeque;

use super::node::NodeId;
use super::pattern::{Pattern, MAX_PATTERN_LEN};
use super::trie::Automaton;
use crate::MultimatchError;

/// Output buffer capacity. Runs of this size are handed to the sink.
pub const BUFFER_SIZE: usize = 2048;

// The backlog (at most MAX_PATTERN_LEN bytes) must always fit in the buffer.
const _: () = assert!(BUFFER_SIZE > MAX_PATTERN_LEN);

/// Overlap-resolution policy for a replace session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReplaceMode {
    /// Factor patterns are swallowed by the longest match covering them.
    #[default]
    Normal,
    /// Whichever pattern completes first is committed; overlapping later
    /// matches are dropped.
    Lazy,
}

/// A recognized pattern awaiting an overlap decision.
struct Nominee<X> {
    pattern: Pattern<X>,
    /// Absolute offset just past the last matched byte.
    position: usize,
}

impl<X> Nominee<X> {
    fn start(&self) -> usize {
        self.position - self.pattern.key().len()
    }
}

/// Streaming replace state over a finalized automaton.
///
/// Feed input with [`replace`](Self::replace), then call
/// [`flush`](Self::flush) once the logical input has ended. `flush` also
/// resets the session for reuse.
pub struct Replacer<'a, X> {
    automaton: &'a Automaton<X>,
    /// Node reached by the last consumed byte.
    current: NodeId,
    /// Absolute offset of the current chunk's first byte.
    base_position: usize,
    /// Absolute offset up to which output has been emitted.
    cursor: usize,
    mode: ReplaceMode,
    /// Matches pending an overlap decision, ordered by end position.
    nominees: VecDeque<Nominee<X>>,
    /// Output accumulator, drained to the sink at `BUFFER_SIZE`.
    buffer: Vec<u8>,
    /// Tail of previous chunks that may still be a pattern prefix.
    backlog: Vec<u8>,
}

impl<'a, X: Clone> Replacer<'a, X> {
    pub(crate) fn new(automaton: &'a Automaton<X>) -> Self {
        Self {
            automaton,
            current: NodeId::ROOT,
            base_position: 0,
            cursor: 0,
            mode: ReplaceMode::Normal,
            nominees: VecDeque::new(),
            buffer: Vec::with_capacity(BUFFER_SIZE),
            backlog: Vec::with_capacity(MAX_PATTERN_LEN),
        }
    }

    /// Process one input chunk, emitting rewritten output runs to `sink`.
    ///
    /// Output for the chunk tail that may still be a pattern prefix is
    /// withheld until a later chunk (or [`flush`](Self::flush)) decides it.
    pub fn replace<F>(
        &mut self,
        chunk: &[u8],
        mode: ReplaceMode,
        mut sink: F,
    ) -> Result<(), MultimatchError>
    where
        F: FnMut(&[u8]),
    {
        if self.automaton.is_open() {
            return Err(MultimatchError::NotFinalized);
        }
        if !self.automaton.has_replacement() {
            return Err(MultimatchError::NoReplacement);
        }
        self.mode = mode;

        let automaton = self.automaton;
        let mut current = self.current;
        let mut position = 0;

        while position < chunk.len() {
            let next = automaton.node(current).step(chunk[position]);
            if next.is_none() {
                if current != NodeId::ROOT {
                    current = automaton.node(current).failure();
                } else {
                    position += 1;
                }
            } else {
                current = next;
                position += 1;

                let node = automaton.node(current);
                if node.is_final() {
                    // A final node without a nominated replacement books
                    // nothing; its text passes through verbatim.
                    if let Some(pattern) = node.replacement() {
                        self.book_nominee(Nominee {
                            pattern: pattern.clone(),
                            position: self.base_position + position,
                        });
                    }
                }
            }
        }

        // Everything before this offset can no longer be extended by future
        // input; everything after it might be a pattern prefix.
        let backlog_position =
            self.base_position + chunk.len() - automaton.node(current).depth();

        self.resolve(backlog_position, chunk, &mut sink);
        self.save_backlog(backlog_position, chunk);

        self.current = current;
        self.base_position += chunk.len();
        Ok(())
    }

    /// End the logical input: resolve every pending nominee, drain the
    /// output buffer to `sink` and reset the session.
    pub fn flush<F>(&mut self, mut sink: F)
    where
        F: FnMut(&[u8]),
    {
        self.resolve(self.base_position, &[], &mut sink);
        if !self.buffer.is_empty() {
            sink(&self.buffer);
            self.buffer.clear();
        }

        self.backlog.clear();
        self.nominees.clear();
        self.cursor = 0;
        self.current = NodeId::ROOT;
        self.base_position = 0;
    }

    /// Record a nominee according to the session's overlap policy.
    fn book_nominee(&mut self, new: Nominee<X>) {
        let new_start = new.start();
        match self.mode {
            ReplaceMode::Lazy => {
                // An earlier commitment wins: drop the nominee if it
                // overlaps the emitted prefix or the last booked match.
                if new_start < self.cursor {
                    return;
                }
                if let Some(previous) = self.nominees.back() {
                    if new_start < previous.position {
                        return;
                    }
                }
            }
            ReplaceMode::Normal => {
                // A longer match starting no later supersedes the tail
                // nominees it covers.
                while let Some(previous) = self.nominees.back() {
                    if new_start <= previous.start() {
                        self.nominees.pop_back();
                    } else {
                        break;
                    }
                }
            }
        }
        self.nominees.push_back(new);
    }

    /// Commit every nominee ending at or before `to_position`, emit the
    /// verbatim gaps around them and advance the cursor to `to_position`.
    fn resolve<F>(&mut self, to_position: usize, chunk: &[u8], sink: &mut F)
    where
        F: FnMut(&[u8]),
    {
        if to_position < self.base_position {
            // The decidable region ends inside the backlog; nothing new can
            // be committed this round.
            return;
        }

        while let Some(front) = self.nominees.front() {
            let start = front.start();
            if to_position <= start {
                break;
            }
            if let Some(nominee) = self.nominees.pop_front() {
                self.append_factor(self.cursor, start, chunk, sink);
                append_bytes(
                    &mut self.buffer,
                    nominee.pattern.replacement().unwrap_or_default(),
                    sink,
                );
                self.cursor = nominee.position;
            }
        }

        if to_position > self.cursor {
            self.append_factor(self.cursor, to_position, chunk, sink);
            self.cursor = to_position;
        }

        if self.base_position <= self.cursor {
            // The whole backlog has been emitted or replaced.
            self.backlog.clear();
        }
    }

    /// Emit the verbatim bytes of absolute range `[from, to)`. The range may
    /// lie in the current chunk, in the backlog, or straddle both.
    fn append_factor<F>(&mut self, from: usize, to: usize, chunk: &[u8], sink: &mut F)
    where
        F: FnMut(&[u8]),
    {
        if to <= from {
            return;
        }

        if self.base_position <= from {
            let base = self.base_position;
            append_bytes(&mut self.buffer, &chunk[from - base..to - base], sink);
            return;
        }

        let backlog_base = self.base_position - self.backlog.len();
        if from < backlog_base {
            return;
        }
        if to <= self.base_position {
            append_bytes(
                &mut self.buffer,
                &self.backlog[from - backlog_base..to - backlog_base],
                sink,
            );
        } else {
            append_bytes(&mut self.buffer, &self.backlog[from - backlog_base..], sink);
            append_bytes(
                &mut self.buffer,
                &chunk[..to - self.base_position],
                sink,
            );
        }
    }

    /// Carry the undecidable chunk tail (everything from `backlog_position`
    /// on) into the backlog buffer. Its length is the depth of the current
    /// node, which never exceeds MAX_PATTERN_LEN.
    fn save_backlog(&mut self, backlog_position: usize, chunk: &[u8]) {
        let relative = backlog_position.saturating_sub(self.base_position);
        if relative >= chunk.len() {
            return;
        }
        self.backlog.extend_from_slice(&chunk[relative..]);
    }
}

/// Copy `text` into the output buffer, draining full buffers to the sink.
fn append_bytes<F>(buffer: &mut Vec<u8>, text: &[u8], sink: &mut F)
where
    F: FnMut(&[u8]),
{
    let mut copied = 0;
    while copied < text.len() {
        let space = BUFFER_SIZE - buffer.len();
        let take = space.min(text.len() - copied);
        buffer.extend_from_slice(&text[copied..copied + take]);
        copied += take;
        if buffer.len() == BUFFER_SIZE {
            sink(&buffer[..]);
            buffer.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn automaton(patterns: &[(&'static str, Option<&'static str>)]) -> Automaton<&'static str> {
        let mut automaton = Automaton::new();
        for &(key, replacement) in patterns {
            let mut pattern = Pattern::new(key).with_title(key);
            if let Some(replacement) = replacement {
                pattern = pattern.with_replacement(replacement);
            }
            automaton.add(pattern).unwrap();
        }
        automaton.finalize();
        automaton
    }

    fn run(
        automaton: &Automaton<&'static str>,
        chunks: &[&str],
        mode: ReplaceMode,
    ) -> String {
        let mut replacer = automaton.replacer();
        let mut out = Vec::new();
        for chunk in chunks {
            replacer
                .replace(chunk.as_bytes(), mode, |text| out.extend_from_slice(text))
                .unwrap();
        }
        replacer.flush(|text| out.extend_from_slice(text));
        String::from_utf8(out).unwrap()
    }

    const SHOWCASE: &[(&str, Option<&str>)] = &[
        ("city", Some("[S1]")),
        ("the ", Some("")),
        ("and", None),
        ("experience", Some("[practice]")),
        ("exp", Some("[S2]")),
        ("multi", Some("[S3]")),
        ("ease", Some("[S4]")),
    ];

    const SHOWCASE_CHUNKS: &[&str] =
        &["experience ", "the ease ", "and simplicity ", "of multimatch"];

    #[test]
    fn test_normal_mode_prefers_longest_match() {
        let automaton = automaton(SHOWCASE);
        let output = run(&automaton, SHOWCASE_CHUNKS, ReplaceMode::Normal);
        assert_eq!(output, "[practice] [S4] and simpli[S1] of [S3]match");
    }

    #[test]
    fn test_lazy_mode_commits_first_match() {
        let automaton = automaton(SHOWCASE);
        let output = run(&automaton, SHOWCASE_CHUNKS, ReplaceMode::Lazy);
        // "exp" completes before "experience" and wins; "city" overlaps
        // nothing, so it is still rewritten.
        assert_eq!(output, "[S2]erience [S4] and simpli[S1] of [S3]match");
    }

    #[test]
    fn test_chunking_is_invisible_in_output() {
        let automaton = automaton(SHOWCASE);
        let text: String = SHOWCASE_CHUNKS.concat();
        let whole = run(&automaton, &[&text], ReplaceMode::Normal);
        let split: Vec<&str> = text.split_inclusive(' ').collect();
        let chunked = run(&automaton, &split, ReplaceMode::Normal);
        let byte_by_byte: Vec<String> =
            text.chars().map(|c| c.to_string()).collect();
        let refs: Vec<&str> = byte_by_byte.iter().map(String::as_str).collect();
        let tiny = run(&automaton, &refs, ReplaceMode::Normal);

        assert_eq!(whole, "[practice] [S4] and simpli[S1] of [S3]match");
        assert_eq!(chunked, whole);
        assert_eq!(tiny, whole);
    }

    #[test]
    fn test_identity_replacement_round_trips() {
        let automaton = automaton(&[
            ("ab", Some("ab")),
            ("bc", Some("bc")),
            ("abc", Some("abc")),
        ]);
        let text = "xxabcxbcxabxx";
        let output = run(&automaton, &[text], ReplaceMode::Normal);
        assert_eq!(output, text);
    }

    #[test]
    fn test_pattern_split_across_chunks() {
        let automaton = automaton(&[("abc", Some("X"))]);
        let output = run(&automaton, &["xa", "bc"], ReplaceMode::Normal);
        assert_eq!(output, "xX");
    }

    #[test]
    fn test_pattern_split_across_many_chunks() {
        let automaton = automaton(&[("abcde", Some("-"))]);
        let output = run(
            &automaton,
            &["a", "b", "c", "d", "e", "f"],
            ReplaceMode::Normal,
        );
        assert_eq!(output, "-f");
    }

    #[test]
    fn test_unfinished_prefix_is_flushed_verbatim() {
        let automaton = automaton(&[("abc", Some("X"))]);
        let output = run(&automaton, &["zab"], ReplaceMode::Normal);
        assert_eq!(output, "zab");
    }

    #[test]
    fn test_normal_mode_retracts_covered_factor() {
        let automaton = automaton(&[("ab", Some("short")), ("abc", Some("long"))]);
        assert_eq!(run(&automaton, &["abc"], ReplaceMode::Normal), "long");
        assert_eq!(run(&automaton, &["abd"], ReplaceMode::Normal), "shortd");
    }

    #[test]
    fn test_lazy_mode_drops_overlapping_nominee() {
        let automaton = automaton(&[("ab", Some("X")), ("abc", Some("Y"))]);
        assert_eq!(run(&automaton, &["abc"], ReplaceMode::Lazy), "Xc");
    }

    #[test]
    fn test_lazy_mode_respects_emitted_prefix() {
        // "aa" at positions 0-2 is committed when the first chunk ends; the
        // occurrence starting inside it must not fire after that.
        let automaton = automaton(&[("aa", Some("X"))]);
        let output = run(&automaton, &["aa", "a"], ReplaceMode::Lazy);
        assert_eq!(output, "Xa");
    }

    #[test]
    fn test_empty_replacement_deletes_matches() {
        let automaton = automaton(&[("ab", Some(""))]);
        let output = run(&automaton, &["zabzabz"], ReplaceMode::Normal);
        assert_eq!(output, "zzz");
    }

    #[test]
    fn test_adjacent_matches_both_replace() {
        let automaton = automaton(&[("ab", Some("1"))]);
        let output = run(&automaton, &["abab"], ReplaceMode::Normal);
        assert_eq!(output, "11");
    }

    #[test]
    fn test_replace_requires_finalization() {
        let mut open: Automaton = Automaton::new();
        open.add(Pattern::new("x").with_replacement("y")).unwrap();
        let mut replacer = open.replacer();
        let result = replacer.replace(b"x", ReplaceMode::Normal, |_| {});
        assert!(matches!(result, Err(MultimatchError::NotFinalized)));
    }

    #[test]
    fn test_replace_requires_a_replacement_pattern() {
        let mut automaton: Automaton = Automaton::new();
        automaton.add(Pattern::new("x")).unwrap();
        automaton.finalize();
        let mut replacer = automaton.replacer();
        let result = replacer.replace(b"x", ReplaceMode::Normal, |_| {});
        assert!(matches!(result, Err(MultimatchError::NoReplacement)));
    }

    #[test]
    fn test_buffer_drains_at_capacity() {
        let automaton = automaton(&[("ab", Some("AB"))]);
        let text = "ab".repeat(2 * BUFFER_SIZE);
        let mut replacer = automaton.replacer();
        let mut calls = 0;
        let mut out = Vec::new();
        replacer
            .replace(text.as_bytes(), ReplaceMode::Normal, |run| {
                calls += 1;
                assert!(run.len() <= BUFFER_SIZE);
                out.extend_from_slice(run);
            })
            .unwrap();
        replacer.flush(|run| {
            calls += 1;
            out.extend_from_slice(run);
        });

        assert_eq!(out, "AB".repeat(2 * BUFFER_SIZE).as_bytes());
        assert!(calls > 1, "long output must be emitted in several runs");
    }

    #[test]
    fn test_session_resets_after_flush() {
        let automaton = automaton(&[("ab", Some("X"))]);
        let mut replacer = automaton.replacer();
        let mut out = Vec::new();
        replacer
            .replace(b"ab", ReplaceMode::Normal, |t| out.extend_from_slice(t))
            .unwrap();
        replacer.flush(|t| out.extend_from_slice(t));
        assert_eq!(out, b"X");

        out.clear();
        // A trailing "a" from before the flush must not leak in.
        replacer
            .replace(b"b", ReplaceMode::Normal, |t| out.extend_from_slice(t))
            .unwrap();
        replacer.flush(|t| out.extend_from_slice(t));
        assert_eq!(out, b"b");
    }

    #[test]
    fn test_flush_on_fresh_session_emits_nothing() {
        let automaton = automaton(&[("ab", Some("X"))]);
        let mut replacer = automaton.replacer();
        let mut called = false;
        replacer.flush(|_| called = true);
        assert!(!called);
    }
}
