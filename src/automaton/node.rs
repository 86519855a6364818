//! Trie nodes and the index type that links them.
//!
//! Nodes live in a single arena owned by the automaton and reference each
//! other by [`NodeId`] index: edges and failure links are non-owning, so the
//! trie graph (which is cyclic once failure links exist) needs no shared
//! ownership.

use smallvec::SmallVec;

use super::pattern::Pattern;

/// A node identifier - just an index into the automaton's arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) struct NodeId(u32);

impl NodeId {
    /// Sentinel for "no node": absent edges and the root's failure link.
    pub(crate) const NONE: NodeId = NodeId(u32::MAX);

    /// The root is always the first node allocated.
    pub(crate) const ROOT: NodeId = NodeId(0);

    pub(crate) fn new(index: usize) -> Self {
        NodeId(index as u32)
    }

    #[inline]
    pub(crate) fn is_none(self) -> bool {
        self.0 == u32::MAX
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A trie vertex.
///
/// Edges are appended unsorted during construction and sorted by alpha at
/// finalization, which switches lookups from linear scan to binary search.
/// The match set starts as the patterns accepted exactly here; finalization
/// extends it with every pattern reachable along the failure chain.
pub(crate) struct Node<X> {
    depth: usize,
    is_final: bool,
    failure: NodeId,
    /// Outgoing edges as (alpha, target) pairs. Most nodes have few.
    edges: SmallVec<[(u8, NodeId); 4]>,
    /// Patterns whose key is a suffix of this node's root-path.
    matches: SmallVec<[Pattern<X>; 1]>,
    /// The longest-keyed member of `matches` that carries a replacement.
    replacement: Option<Pattern<X>>,
}

impl<X: Clone> Node<X> {
    pub(crate) fn with_depth(depth: usize) -> Self {
        Self {
            depth,
            is_final: false,
            failure: NodeId::NONE,
            edges: SmallVec::new(),
            matches: SmallVec::new(),
            replacement: None,
        }
    }

    #[inline]
    pub(crate) fn depth(&self) -> usize {
        self.depth
    }

    #[inline]
    pub(crate) fn is_final(&self) -> bool {
        self.is_final
    }

    #[inline]
    pub(crate) fn failure(&self) -> NodeId {
        self.failure
    }

    pub(crate) fn set_failure(&mut self, failure: NodeId) {
        self.failure = failure;
    }

    pub(crate) fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub(crate) fn edge_at(&self, index: usize) -> (u8, NodeId) {
        self.edges[index]
    }

    /// Follow the edge for `alpha` by linear scan. Valid at any time; used
    /// while the edge list is still unsorted.
    pub(crate) fn child(&self, alpha: u8) -> NodeId {
        for &(edge_alpha, target) in &self.edges {
            if edge_alpha == alpha {
                return target;
            }
        }
        NodeId::NONE
    }

    /// Follow the edge for `alpha` by binary search. Only valid after
    /// finalization has sorted the edge list.
    #[inline]
    pub(crate) fn step(&self, alpha: u8) -> NodeId {
        match self.edges.binary_search_by_key(&alpha, |&(a, _)| a) {
            Ok(pos) => self.edges[pos].1,
            Err(_) => NodeId::NONE,
        }
    }

    /// Register a new outgoing edge. The caller guarantees `alpha` is not
    /// already present.
    pub(crate) fn add_edge(&mut self, alpha: u8, target: NodeId) {
        self.edges.push((alpha, target));
    }

    pub(crate) fn sort_edges(&mut self) {
        self.edges.sort_unstable_by_key(|&(alpha, _)| alpha);
    }

    /// Mark this node final and record the pattern accepted here.
    pub(crate) fn accept(&mut self, pattern: Pattern<X>) {
        self.is_final = true;
        self.matches.push(pattern);
    }

    #[inline]
    pub(crate) fn matches(&self) -> &[Pattern<X>] {
        &self.matches
    }

    pub(crate) fn matches_snapshot(&self) -> SmallVec<[Pattern<X>; 1]> {
        self.matches.clone()
    }

    /// Replace the match set and finality flag with the collected results of
    /// a failure-chain walk.
    pub(crate) fn install_matches(
        &mut self,
        matches: SmallVec<[Pattern<X>; 1]>,
        is_final: bool,
    ) {
        self.matches = matches;
        self.is_final = is_final;
    }

    #[inline]
    pub(crate) fn replacement(&self) -> Option<&Pattern<X>> {
        self.replacement.as_ref()
    }

    /// Nominate the replacement pattern for this node: the longest-keyed
    /// match that carries one. Returns whether a nomination was made.
    pub(crate) fn select_replacement(&mut self) -> bool {
        if !self.is_final {
            return false;
        }
        let mut longest: Option<&Pattern<X>> = None;
        for pattern in &self.matches {
            if pattern.replacement().is_none() {
                continue;
            }
            match longest {
                None => longest = Some(pattern),
                Some(best) if pattern.key().len() > best.key().len() => {
                    longest = Some(pattern)
                }
                Some(_) => {}
            }
        }
        self.replacement = longest.cloned();
        self.replacement.is_some()
    }
}
