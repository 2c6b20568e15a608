// Copyright 2026 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stacking order of mounted views.
//!
//! Mounted views live as nodes in a flat [`Layer`]. Where a view is linked in
//! depends on the [`Sorting`] policy:
//!
//! - [`Sorting::None`] and [`Sorting::Exact`] append. Exact ordering is
//!   restored later by [`ZOrder::sort_exact`].
//! - [`Sorting::Approximate`] keeps one pivot node per distinct `z` value and
//!   links a view immediately before the pivot of its `z`. A new pivot goes
//!   right after the pivot of the nearest lower `z`, or first when there is
//!   none.

mod layer;

pub use layer::{Layer, Node, NodeId};

use alloc::collections::BTreeMap;
use alloc::vec;
use alloc::vec::Vec;
use core::cmp::Ordering;

use hashbrown::HashMap;

use crate::scheduler::Sorting;
use crate::trace::SortEvent;
use crate::view::ViewId;

/// A `z` value usable as an ordered map key.
#[derive(Clone, Copy, Debug)]
struct ZKey(f64);

impl ZKey {
    fn new(z: f64) -> Self {
        // Fold -0.0 into 0.0 so both share a pivot.
        Self(if z == 0.0 { 0.0 } else { z })
    }
}

impl PartialEq for ZKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ZKey {}

impl PartialOrd for ZKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ZKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Places mounted views in a [`Layer`] according to a [`Sorting`] policy.
#[derive(Debug, Default)]
pub struct ZOrder {
    layer: Layer,
    views: HashMap<ViewId, NodeId>,
    pivots: BTreeMap<ZKey, NodeId>,
}

impl ZOrder {
    /// Creates an empty stacking order.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The underlying node list.
    #[must_use]
    pub fn layer(&self) -> &Layer {
        &self.layer
    }

    /// Links `view` into the layer. A view that is already linked is moved.
    pub fn insert(&mut self, view: ViewId, z: f64, sorting: Sorting) {
        let node = match self.views.get(&view) {
            Some(&node) => {
                self.layer.unlink(node);
                node
            }
            None => {
                let node = self.layer.create(Node::View(view));
                self.views.insert(view, node);
                node
            }
        };
        match sorting {
            Sorting::None | Sorting::Exact => self.layer.append(node),
            Sorting::Approximate => {
                let pivot = self.pivot(z);
                self.layer.insert_before(node, pivot);
            }
        }
    }

    /// Unlinks and forgets `view`. Returns `false` if it was not linked.
    pub fn remove(&mut self, view: ViewId) -> bool {
        let Some(node) = self.views.remove(&view) else {
            return false;
        };
        self.layer.destroy(node);
        true
    }

    /// Returns whether `view` is linked.
    #[must_use]
    pub fn contains(&self, view: ViewId) -> bool {
        self.views.contains_key(&view)
    }

    /// Number of linked views.
    #[must_use]
    pub fn len(&self) -> usize {
        self.views.len()
    }

    /// Returns whether no view is linked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Linked views, back to front.
    pub fn views(&self) -> impl Iterator<Item = ViewId> + '_ {
        self.layer.views().map(|(view, _)| view)
    }

    /// Stable-sorts linked views by `z`.
    ///
    /// Views on a longest already-ordered run stay linked. Only the others
    /// are unlinked and relinked next to their sorted neighbour, so
    /// [`SortEvent::moved`] is the fewest moves that restore the order.
    pub fn sort_exact(&mut self, mut z_of: impl FnMut(ViewId) -> f64) -> SortEvent {
        let linked: Vec<(f64, NodeId)> = self
            .layer
            .views()
            .map(|(view, node)| (z_of(view), node))
            .collect();
        let mut sorted: Vec<usize> = (0..linked.len()).collect();
        sorted.sort_by(|&a, &b| linked[a].0.total_cmp(&linked[b].0));
        let mut rank = vec![0; linked.len()];
        for (r, &i) in sorted.iter().enumerate() {
            rank[i] = r;
        }
        let stays = longest_increasing(&rank);
        let moved = stays.iter().filter(|&&s| !s).count();

        if moved > 0 {
            for (i, &(_, node)) in linked.iter().enumerate() {
                if !stays[i] {
                    self.layer.unlink(node);
                }
            }
            let anchor = sorted.iter().find(|&&i| stays[i]).map(|&i| linked[i].1);
            let mut prev: Option<NodeId> = None;
            for &i in &sorted {
                let node = linked[i].1;
                if !stays[i] {
                    match (prev, anchor) {
                        (Some(prev), _) => self.layer.insert_after(node, prev),
                        (None, Some(anchor)) => self.layer.insert_before(node, anchor),
                        (None, None) => self.layer.append(node),
                    }
                }
                prev = Some(node);
            }
        }
        SortEvent {
            moved,
            total: linked.len(),
        }
    }

    /// Drops every node.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// The pivot for `z`, created on demand.
    fn pivot(&mut self, z: f64) -> NodeId {
        let key = ZKey::new(z);
        if let Some(&pivot) = self.pivots.get(&key) {
            return pivot;
        }
        let pivot = self.layer.create(Node::Pivot(key.0));
        match self.pivots.range(..key).next_back() {
            Some((_, &lower)) => self.layer.insert_after(pivot, lower),
            None => self.layer.prepend(pivot),
        }
        self.pivots.insert(key, pivot);
        pivot
    }
}

/// Marks the positions of one longest strictly increasing run of `ranks`.
fn longest_increasing(ranks: &[usize]) -> Vec<bool> {
    // `tails[k]` is the position ending the best run of length `k + 1`.
    let mut tails: Vec<usize> = Vec::new();
    let mut parent: Vec<Option<usize>> = vec![None; ranks.len()];
    for (i, &r) in ranks.iter().enumerate() {
        let k = tails.partition_point(|&t| ranks[t] < r);
        parent[i] = k.checked_sub(1).map(|k| tails[k]);
        if k == tails.len() {
            tails.push(i);
        } else {
            tails[k] = i;
        }
    }
    let mut keep = vec![false; ranks.len()];
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        keep[i] = true;
        cursor = parent[i];
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(idx: u32) -> ViewId {
        ViewId { idx, generation: 0 }
    }

    fn order(z: &ZOrder) -> Vec<u32> {
        z.views().map(ViewId::index).collect()
    }

    #[test]
    fn approximate_orders_by_z() {
        let mut z = ZOrder::new();
        z.insert(id(5), 5.0, Sorting::Approximate);
        z.insert(id(1), 1.0, Sorting::Approximate);
        z.insert(id(3), 3.0, Sorting::Approximate);
        assert_eq!(order(&z), [1, 3, 5]);
    }

    #[test]
    fn approximate_keeps_mount_order_within_a_z() {
        let mut z = ZOrder::new();
        z.insert(id(0), 2.0, Sorting::Approximate);
        z.insert(id(1), 1.0, Sorting::Approximate);
        z.insert(id(2), 2.0, Sorting::Approximate);
        assert_eq!(order(&z), [1, 0, 2]);
    }

    #[test]
    fn reinsert_moves_the_view() {
        let mut z = ZOrder::new();
        z.insert(id(0), 1.0, Sorting::Approximate);
        z.insert(id(1), 2.0, Sorting::Approximate);
        z.insert(id(0), 3.0, Sorting::Approximate);
        assert_eq!(order(&z), [1, 0]);
        assert_eq!(z.len(), 2);
    }

    #[test]
    fn exact_sort_is_stable_and_counts_moves() {
        let mut z = ZOrder::new();
        let zs = [3.0, 1.0, 3.0, 2.0];
        for (i, _) in zs.iter().enumerate() {
            z.insert(id(i as u32), 0.0, Sorting::Exact);
        }
        let event = z.sort_exact(|view| zs[view.index() as usize]);
        assert_eq!(order(&z), [1, 3, 0, 2]);
        assert_eq!(event.total, 4);
        assert_eq!(event.moved, 2);

        let again = z.sort_exact(|view| zs[view.index() as usize]);
        assert_eq!(again.moved, 0, "already sorted");
    }

    #[test]
    fn exact_sort_moves_only_displaced_views() {
        let mut z = ZOrder::new();
        let zs = [1.0, 2.0, 3.0, 0.0, 4.0];
        for i in 0..zs.len() {
            z.insert(id(i as u32), 0.0, Sorting::Exact);
        }
        let event = z.sort_exact(|view| zs[view.index() as usize]);
        assert_eq!(order(&z), [3, 0, 1, 2, 4]);
        assert_eq!((event.moved, event.total), (1, 5));
    }

    #[test]
    fn exact_sort_reverses_with_all_but_one_moved() {
        let mut z = ZOrder::new();
        let zs = [4.0, 3.0, 2.0, 1.0];
        for i in 0..zs.len() {
            z.insert(id(i as u32), 0.0, Sorting::Exact);
        }
        let event = z.sort_exact(|view| zs[view.index() as usize]);
        assert_eq!(order(&z), [3, 2, 1, 0]);
        assert_eq!(event.moved, 3);
    }

    #[test]
    fn longest_increasing_keeps_an_ordered_run() {
        assert_eq!(
            longest_increasing(&[2, 0, 3, 1]),
            [false, true, false, true]
        );
        assert!(longest_increasing(&[]).is_empty());
        assert_eq!(longest_increasing(&[0, 1, 2]), [true; 3]);
    }

    #[test]
    fn remove_unlinks() {
        let mut z = ZOrder::new();
        z.insert(id(0), 0.0, Sorting::None);
        z.insert(id(1), 0.0, Sorting::None);
        assert!(z.remove(id(0)));
        assert!(!z.remove(id(0)));
        assert_eq!(order(&z), [1]);
        assert!(!z.contains(id(0)));
    }
}
