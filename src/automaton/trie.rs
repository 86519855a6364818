//! Automaton construction and finalization.
//!
//! An [`Automaton`] starts life as a plain keyword trie that accepts pattern
//! registrations. [`Automaton::finalize`] computes failure links, extends
//! every node's match set along its failure chain, sorts edge lists for
//! binary search and nominates per-node replacements. After that the
//! structure is immutable: any number of searchers and replacers may borrow
//! it concurrently, each with its own cursor state.

use std::fmt;

use smallvec::SmallVec;

use super::node::{Node, NodeId};
use super::pattern::{Pattern, MAX_PATTERN_LEN};
use super::replace::Replacer;
use super::search::Searcher;
use crate::MultimatchError;

/// A multi-pattern matching automaton.
///
/// Lifecycle: register patterns with [`add`](Self::add), then call
/// [`finalize`](Self::finalize) once, then run any number of searches and
/// replacements. Registration after finalization is rejected.
pub struct Automaton<X = String> {
    /// Arena owning every node; all links are indices into it.
    nodes: Vec<Node<X>>,
    pattern_count: usize,
    open: bool,
    has_replacement: bool,
}

impl<X: Clone> Automaton<X> {
    /// Create an empty automaton containing only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::with_depth(0)],
            pattern_count: 0,
            open: true,
            has_replacement: false,
        }
    }

    /// Register a pattern.
    ///
    /// Walks the key through the trie, creating nodes as needed, and marks
    /// the terminal node final. Rejections leave the automaton observably
    /// unchanged: a duplicate key never touches the terminal node, and
    /// length checks run before any node is created.
    pub fn add(&mut self, pattern: Pattern<X>) -> Result<(), MultimatchError> {
        if !self.open {
            return Err(MultimatchError::Finalized);
        }
        if pattern.key().is_empty() {
            return Err(MultimatchError::EmptyPattern);
        }
        if pattern.key().len() > MAX_PATTERN_LEN {
            return Err(MultimatchError::PatternTooLong(pattern.key().len()));
        }

        let mut current = NodeId::ROOT;
        for i in 0..pattern.key().len() {
            let alpha = pattern.key()[i];
            let next = self.nodes[current.index()].child(alpha);
            current = if next.is_none() {
                self.create_child(current, alpha)
            } else {
                next
            };
        }

        if self.nodes[current.index()].is_final() {
            return Err(MultimatchError::DuplicatePattern);
        }
        self.nodes[current.index()].accept(pattern);
        self.pattern_count += 1;
        Ok(())
    }

    /// Finalize the automaton: compute failure links, collect match sets,
    /// sort edges and nominate replacements. After this call no more
    /// patterns are accepted. Calling it again is a no-op.
    pub fn finalize(&mut self) {
        if !self.open {
            return;
        }

        let mut prefix = Vec::with_capacity(MAX_PATTERN_LEN);
        self.traverse_set_failure(NodeId::ROOT, &mut prefix);

        self.collect_matches();

        let mut has_replacement = false;
        for node in &mut self.nodes {
            node.sort_edges();
            has_replacement |= node.select_replacement();
        }
        self.has_replacement = has_replacement;
        self.open = false;
    }

    /// Whether the automaton still accepts patterns.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Number of registered patterns.
    pub fn pattern_count(&self) -> usize {
        self.pattern_count
    }

    /// Number of trie nodes, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether any registered pattern carries a replacement. Only meaningful
    /// after finalization.
    pub fn has_replacement(&self) -> bool {
        self.has_replacement
    }

    /// Create a search cursor over this automaton.
    pub fn searcher(&self) -> Searcher<'_, X> {
        Searcher::new(self)
    }

    /// Create a replace session over this automaton.
    pub fn replacer(&self) -> Replacer<'_, X> {
        Replacer::new(self)
    }

    #[inline]
    pub(crate) fn node(&self, id: NodeId) -> &Node<X> {
        &self.nodes[id.index()]
    }

    fn create_child(&mut self, parent: NodeId, alpha: u8) -> NodeId {
        let depth = self.nodes[parent.index()].depth() + 1;
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(Node::with_depth(depth));
        self.nodes[parent.index()].add_edge(alpha, id);
        id
    }

    /// Depth-first walk that assigns every node its failure link. `prefix`
    /// accumulates the root-path alphas of the node being visited.
    fn traverse_set_failure(&mut self, id: NodeId, prefix: &mut Vec<u8>) {
        let failure = self.compute_failure(id, prefix);
        self.nodes[id.index()].set_failure(failure);

        for i in 0..self.nodes[id.index()].edge_count() {
            let (alpha, child) = self.nodes[id.index()].edge_at(i);
            prefix.push(alpha);
            self.traverse_set_failure(child, prefix);
            prefix.pop();
        }
    }

    /// The failure target for a node with root-path `prefix`: the deepest
    /// node whose root-path is a proper suffix of `prefix`. Tries suffixes
    /// longest-first; falls back to the root. The root itself has no
    /// failure link.
    fn compute_failure(&self, id: NodeId, prefix: &[u8]) -> NodeId {
        if id == NodeId::ROOT {
            return NodeId::NONE;
        }
        let depth = self.nodes[id.index()].depth();
        for start in 1..depth {
            let mut candidate = NodeId::ROOT;
            for &alpha in &prefix[start..depth] {
                candidate = self.nodes[candidate.index()].child(alpha);
                if candidate.is_none() {
                    break;
                }
            }
            if !candidate.is_none() {
                return candidate;
            }
        }
        NodeId::ROOT
    }

    /// Extend every node's match set with the matches of its failure chain,
    /// deduplicated by key, and propagate finality. Results are computed
    /// from the pre-collection sets and installed afterwards, so the walk is
    /// independent of node order.
    fn collect_matches(&mut self) {
        let mut collected: Vec<(SmallVec<[Pattern<X>; 1]>, bool)> =
            Vec::with_capacity(self.nodes.len());

        for node in &self.nodes {
            let mut matches = node.matches_snapshot();
            let mut is_final = node.is_final();
            let mut failure = node.failure();
            while !failure.is_none() {
                let chain = &self.nodes[failure.index()];
                for pattern in chain.matches() {
                    if !matches.iter().any(|known| known.key() == pattern.key()) {
                        matches.push(pattern.clone());
                    }
                }
                is_final |= chain.is_final();
                failure = chain.failure();
            }
            collected.push((matches, is_final));
        }

        for (node, (matches, is_final)) in self.nodes.iter_mut().zip(collected) {
            node.install_matches(matches, is_final);
        }
    }
}

impl<X: Clone> Default for Automaton<X> {
    fn default() -> Self {
        Self::new()
    }
}

impl<X> fmt::Debug for Automaton<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Automaton")
            .field("nodes", &self.nodes.len())
            .field("patterns", &self.pattern_count)
            .field("open", &self.open)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys<'a>(matches: &'a [Pattern<&'static str>]) -> Vec<&'a [u8]> {
        matches.iter().map(Pattern::key).collect()
    }

    #[test]
    fn test_add_shares_prefixes() {
        let mut automaton: Automaton = Automaton::new();
        automaton.add(Pattern::new("abc")).unwrap();
        automaton.add(Pattern::new("abd")).unwrap();
        // root + a + b + c + d
        assert_eq!(automaton.node_count(), 5);
        assert_eq!(automaton.pattern_count(), 2);
    }

    #[test]
    fn test_add_rejections() {
        let mut automaton: Automaton = Automaton::new();
        assert!(matches!(
            automaton.add(Pattern::new("")),
            Err(MultimatchError::EmptyPattern)
        ));
        assert!(matches!(
            automaton.add(Pattern::new(vec![b'x'; MAX_PATTERN_LEN + 1])),
            Err(MultimatchError::PatternTooLong(_))
        ));

        automaton.add(Pattern::new("abc")).unwrap();
        assert!(matches!(
            automaton.add(Pattern::new("abc")),
            Err(MultimatchError::DuplicatePattern)
        ));
        // The failed duplicate must not have bumped the count.
        assert_eq!(automaton.pattern_count(), 1);

        automaton.finalize();
        assert!(matches!(
            automaton.add(Pattern::new("late")),
            Err(MultimatchError::Finalized)
        ));
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let mut automaton: Automaton = Automaton::new();
        automaton.add(Pattern::new("ab")).unwrap();
        automaton.finalize();
        automaton.finalize();
        assert!(!automaton.is_open());
    }

    #[test]
    fn test_failure_links_point_to_longest_suffix() {
        let mut automaton: Automaton<&'static str> = Automaton::new();
        for key in ["he", "she", "his", "hers"] {
            automaton.add(Pattern::new(key)).unwrap();
        }
        automaton.finalize();

        // Walk to the node for "she" and check its failure target is "he".
        let mut id = NodeId::ROOT;
        for &alpha in b"she" {
            id = automaton.node(id).step(alpha);
            assert!(!id.is_none());
        }
        let she = automaton.node(id);
        let failure = automaton.node(she.failure());
        assert_eq!(failure.depth(), 2);
        assert!(failure.is_final());

        // "sh" has no suffix that is also a path, so it falls back to "h".
        let mut id = NodeId::ROOT;
        for &alpha in b"sh" {
            id = automaton.node(id).step(alpha);
        }
        let sh = automaton.node(id);
        assert_eq!(automaton.node(sh.failure()).depth(), 1);
    }

    #[test]
    fn test_match_sets_collect_suffix_patterns() {
        let mut automaton: Automaton<&'static str> = Automaton::new();
        for key in ["a", "aa", "aaa"] {
            automaton.add(Pattern::new(key)).unwrap();
        }
        automaton.finalize();

        let mut id = NodeId::ROOT;
        for _ in 0..3 {
            id = automaton.node(id).step(b'a');
        }
        let node = automaton.node(id);
        let mut found = keys(node.matches());
        found.sort();
        assert_eq!(found, vec![&b"a"[..], b"aa", b"aaa"]);
    }

    #[test]
    fn test_finality_propagates_along_failure_chain() {
        // The interior "ab" node must become final because its failure chain
        // reaches the "b" pattern node.
        let mut automaton: Automaton<&'static str> = Automaton::new();
        automaton.add(Pattern::new("abc")).unwrap();
        automaton.add(Pattern::new("b")).unwrap();
        automaton.finalize();

        let mut id = NodeId::ROOT;
        for &alpha in b"ab" {
            id = automaton.node(id).step(alpha);
        }
        let ab = automaton.node(id);
        assert!(ab.is_final(), "\"ab\" accepts the suffix pattern \"b\"");
        assert_eq!(keys(ab.matches()), vec![&b"b"[..]]);
    }

    #[test]
    fn test_edges_sorted_after_finalize() {
        let mut automaton: Automaton = Automaton::new();
        for key in ["zeta", "alpha", "mu", "beta"] {
            automaton.add(Pattern::new(key)).unwrap();
        }
        automaton.finalize();

        for index in 0..automaton.node_count() {
            let node = automaton.node(NodeId::new(index));
            let mut previous: Option<u8> = None;
            for i in 0..node.edge_count() {
                let (alpha, _) = node.edge_at(i);
                if let Some(p) = previous {
                    assert!(p < alpha, "edges must be strictly ascending");
                }
                previous = Some(alpha);
            }
        }
    }

    #[test]
    fn test_has_replacement_flag() {
        let mut automaton: Automaton = Automaton::new();
        automaton.add(Pattern::new("plain")).unwrap();
        automaton.finalize();
        assert!(!automaton.has_replacement());

        let mut automaton: Automaton = Automaton::new();
        automaton.add(Pattern::new("plain")).unwrap();
        automaton
            .add(Pattern::new("swap").with_replacement("out"))
            .unwrap();
        automaton.finalize();
        assert!(automaton.has_replacement());
    }
}
