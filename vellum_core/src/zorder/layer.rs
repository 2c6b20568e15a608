// Copyright 2026 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays storage for the layer container's node list.

use alloc::vec::Vec;
use core::fmt;

use crate::view::ViewId;

/// Sentinel value indicating "no node" in index fields.
const INVALID: u32 = u32::MAX;

/// A handle to a node in a [`Layer`].
///
/// Contains both a slot index and a generation counter so that stale handles
/// can be detected after a node is destroyed and the slot is reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}@gen{})", self.idx, self.generation)
    }
}

/// What a node in the layer container stands for.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Node {
    /// A mounted view.
    View(ViewId),
    /// A placeholder marking where views of the given `z` go.
    Pivot(f64),
}

/// A flat, ordered list of nodes: the mounted representation of a paper.
///
/// Nodes are created detached and then linked into the list. Destroyed
/// nodes are recycled via a free list, and generation counters prevent stale
/// handle access.
#[derive(Debug, Default)]
pub struct Layer {
    // -- Topology --
    next_sibling: Vec<u32>,
    prev_sibling: Vec<u32>,
    attached: Vec<bool>,
    first: Option<u32>,
    last: Option<u32>,

    // -- Payload --
    node: Vec<Node>,

    // -- Allocation --
    generation: Vec<u32>,
    alive: Vec<bool>,
    free_list: Vec<u32>,
    attached_len: usize,
}

impl Layer {
    /// Creates an empty layer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -- Allocation API --

    /// Creates a detached node and returns its handle.
    pub fn create(&mut self, node: Node) -> NodeId {
        let idx = if let Some(idx) = self.free_list.pop() {
            self.generation[idx as usize] += 1;
            self.next_sibling[idx as usize] = INVALID;
            self.prev_sibling[idx as usize] = INVALID;
            self.attached[idx as usize] = false;
            self.alive[idx as usize] = true;
            self.node[idx as usize] = node;
            idx
        } else {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "node count stays far below u32::MAX"
            )]
            let idx = self.node.len() as u32;
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.attached.push(false);
            self.alive.push(true);
            self.node.push(node);
            self.generation.push(0);
            idx
        };
        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Destroys a node, unlinking it first if needed.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn destroy(&mut self, id: NodeId) {
        self.validate(id);
        if self.attached[id.idx as usize] {
            self.unlink(id);
        }
        self.generation[id.idx as usize] += 1;
        self.alive[id.idx as usize] = false;
        self.free_list.push(id.idx);
    }

    /// Returns whether the handle refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        (id.idx as usize) < self.node.len()
            && self.generation[id.idx as usize] == id.generation
            && self.alive[id.idx as usize]
    }

    // -- Topology API --

    /// Links `id` as the last node.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the node is already attached.
    pub fn append(&mut self, id: NodeId) {
        self.validate_detached(id);
        let i = id.idx;
        match self.last {
            Some(last) => {
                self.next_sibling[last as usize] = i;
                self.prev_sibling[i as usize] = last;
            }
            None => self.first = Some(i),
        }
        self.last = Some(i);
        self.attach(i);
    }

    /// Links `id` as the first node.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the node is already attached.
    pub fn prepend(&mut self, id: NodeId) {
        self.validate_detached(id);
        let i = id.idx;
        match self.first {
            Some(first) => {
                self.prev_sibling[first as usize] = i;
                self.next_sibling[i as usize] = first;
            }
            None => self.last = Some(i),
        }
        self.first = Some(i);
        self.attach(i);
    }

    /// Links `id` immediately before `sibling`.
    ///
    /// # Panics
    ///
    /// Panics if handles are stale, `id` is already attached, or `sibling`
    /// is not attached.
    pub fn insert_before(&mut self, id: NodeId, sibling: NodeId) {
        self.validate_detached(id);
        self.validate(sibling);
        assert!(self.attached[sibling.idx as usize], "sibling is not attached");
        let (i, s) = (id.idx, sibling.idx);

        let prev = self.prev_sibling[s as usize];
        self.prev_sibling[i as usize] = prev;
        self.next_sibling[i as usize] = s;
        if prev == INVALID {
            self.first = Some(i);
        } else {
            self.next_sibling[prev as usize] = i;
        }
        self.prev_sibling[s as usize] = i;
        self.attach(i);
    }

    /// Links `id` immediately after `sibling`.
    ///
    /// # Panics
    ///
    /// Panics if handles are stale, `id` is already attached, or `sibling`
    /// is not attached.
    pub fn insert_after(&mut self, id: NodeId, sibling: NodeId) {
        self.validate_detached(id);
        self.validate(sibling);
        assert!(self.attached[sibling.idx as usize], "sibling is not attached");
        let (i, s) = (id.idx, sibling.idx);

        let next = self.next_sibling[s as usize];
        self.next_sibling[i as usize] = next;
        self.prev_sibling[i as usize] = s;
        if next == INVALID {
            self.last = Some(i);
        } else {
            self.prev_sibling[next as usize] = i;
        }
        self.next_sibling[s as usize] = i;
        self.attach(i);
    }

    /// Unlinks `id` from the list. Returns `false` if it was not attached.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn unlink(&mut self, id: NodeId) -> bool {
        self.validate(id);
        let i = id.idx as usize;
        if !self.attached[i] {
            return false;
        }
        let (prev, next) = (self.prev_sibling[i], self.next_sibling[i]);
        if prev == INVALID {
            self.first = (next != INVALID).then_some(next);
        } else {
            self.next_sibling[prev as usize] = next;
        }
        if next == INVALID {
            self.last = (prev != INVALID).then_some(prev);
        } else {
            self.prev_sibling[next as usize] = prev;
        }
        self.prev_sibling[i] = INVALID;
        self.next_sibling[i] = INVALID;
        self.attached[i] = false;
        self.attached_len -= 1;
        true
    }

    /// Returns what a node stands for.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Node {
        self.validate(id);
        self.node[id.idx as usize]
    }

    /// Iterates over attached nodes, back to front.
    pub fn children(&self) -> impl Iterator<Item = NodeId> + '_ {
        let mut current = self.first.unwrap_or(INVALID);
        core::iter::from_fn(move || {
            if current == INVALID {
                return None;
            }
            let idx = current;
            current = self.next_sibling[idx as usize];
            Some(NodeId {
                idx,
                generation: self.generation[idx as usize],
            })
        })
    }

    /// Attached view nodes, back to front. Pivots are skipped.
    pub fn views(&self) -> impl Iterator<Item = (ViewId, NodeId)> + '_ {
        self.children().filter_map(|id| match self.node[id.idx as usize] {
            Node::View(view) => Some((view, id)),
            Node::Pivot(_) => None,
        })
    }

    /// Number of attached nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attached_len
    }

    /// Returns whether no node is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attached_len == 0
    }

    // -- Internal helpers --

    fn attach(&mut self, i: u32) {
        self.attached[i as usize] = true;
        self.attached_len += 1;
    }

    fn validate(&self, id: NodeId) {
        assert!(self.is_alive(id), "stale NodeId");
    }

    fn validate_detached(&self, id: NodeId) {
        self.validate(id);
        assert!(!self.attached[id.idx as usize], "node is already attached");
    }
}
