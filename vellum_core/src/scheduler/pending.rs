// Copyright 2026 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The pending-update table.
//!
//! Priority buckets in ascending order; inside a bucket, entries keep the
//! order in which they were first scheduled. Re-scheduling a view that is
//! already pending keeps its place. A bucket never stores an empty mask.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::ops::Bound;

use hashbrown::HashMap;

use super::Priority;
use crate::flags::Flags;
use crate::view::ViewId;

/// Position of an entry in table order.
pub(crate) type Cursor = (Priority, u64);

#[derive(Clone, Debug, Default)]
struct Bucket {
    entries: HashMap<ViewId, (u64, Flags)>,
    order: BTreeMap<u64, ViewId>,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct PendingTable {
    buckets: BTreeMap<Priority, Bucket>,
    next_seq: u64,
    len: usize,
}

impl PendingTable {
    /// Pending bits of `id` at `priority`, `0` if none.
    pub(crate) fn get(&self, priority: Priority, id: ViewId) -> Flags {
        self.buckets
            .get(&priority)
            .and_then(|bucket| bucket.entries.get(&id))
            .map_or(0, |&(_, flags)| flags)
    }

    /// Replaces the bits of `id` at `priority`. An empty mask removes the
    /// entry.
    pub(crate) fn set(&mut self, priority: Priority, id: ViewId, flags: Flags) {
        if flags == 0 {
            self.remove(priority, id);
            return;
        }
        let bucket = self.buckets.entry(priority).or_default();
        if let Some(entry) = bucket.entries.get_mut(&id) {
            entry.1 = flags;
            return;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        bucket.entries.insert(id, (seq, flags));
        bucket.order.insert(seq, id);
        self.len += 1;
    }

    /// Removes the entry of `id` at `priority`, returning its bits.
    pub(crate) fn remove(&mut self, priority: Priority, id: ViewId) -> Flags {
        let Some(bucket) = self.buckets.get_mut(&priority) else {
            return 0;
        };
        let Some((seq, flags)) = bucket.entries.remove(&id) else {
            return 0;
        };
        bucket.order.remove(&seq);
        if bucket.entries.is_empty() {
            self.buckets.remove(&priority);
        }
        self.len -= 1;
        flags
    }

    /// Removes every entry of `id`.
    pub(crate) fn remove_view(&mut self, id: ViewId) {
        let priorities: Vec<Priority> = self
            .buckets
            .iter()
            .filter(|(_, bucket)| bucket.entries.contains_key(&id))
            .map(|(&priority, _)| priority)
            .collect();
        for priority in priorities {
            self.remove(priority, id);
        }
    }

    /// Priorities in `[from, to)` that hold an entry for `id`.
    pub(crate) fn priorities_below(&self, id: ViewId, from: Priority, to: Priority) -> Vec<Priority> {
        if from >= to {
            return Vec::new();
        }
        self.buckets
            .range(from..to)
            .filter(|(_, bucket)| bucket.entries.contains_key(&id))
            .map(|(&priority, _)| priority)
            .collect()
    }

    /// The first entry strictly after `cursor` in table order, or the very
    /// first entry when `cursor` is `None`.
    pub(crate) fn next_after(&self, cursor: Option<Cursor>) -> Option<(Cursor, ViewId, Flags)> {
        let (from_priority, from_seq) = match cursor {
            Some((priority, seq)) => (priority, Some(seq)),
            None => (0, None),
        };
        for (&priority, bucket) in self.buckets.range(from_priority..) {
            let next = match from_seq {
                Some(seq) if priority == from_priority => {
                    bucket.order.range((Bound::Excluded(seq), Bound::Unbounded)).next()
                }
                _ => bucket.order.iter().next(),
            };
            if let Some((&seq, &id)) = next {
                let flags = bucket.entries.get(&id).map_or(0, |&(_, flags)| flags);
                return Some(((priority, seq), id, flags));
            }
        }
        None
    }

    /// Total number of entries.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn clear(&mut self) {
        self.buckets.clear();
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(idx: u32) -> ViewId {
        ViewId { idx, generation: 0 }
    }

    fn walk(table: &PendingTable) -> Vec<(Priority, u32)> {
        let mut out = Vec::new();
        let mut cursor = None;
        while let Some((at, view, _)) = table.next_after(cursor) {
            out.push((at.0, view.index()));
            cursor = Some(at);
        }
        out
    }

    #[test]
    fn walks_ascending_priority_then_schedule_order() {
        let mut table = PendingTable::default();
        table.set(1, id(5), 1);
        table.set(0, id(3), 1);
        table.set(0, id(1), 1);
        table.set(0, id(3), 2);
        assert_eq!(walk(&table), [(0, 3), (0, 1), (1, 5)]);
        assert_eq!(table.get(0, id(3)), 2, "re-scheduling replaces the bits");
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn empty_mask_removes() {
        let mut table = PendingTable::default();
        table.set(0, id(0), 4);
        table.set(0, id(0), 0);
        assert!(table.is_empty());
        assert_eq!(table.get(0, id(0)), 0);
    }

    #[test]
    fn remove_view_clears_every_priority() {
        let mut table = PendingTable::default();
        table.set(0, id(0), 1);
        table.set(2, id(0), 1);
        table.set(2, id(1), 1);
        assert_eq!(table.priorities_below(id(0), 0, 2), [0]);
        assert!(table.priorities_below(id(0), 2, 2).is_empty());
        table.remove_view(id(0));
        assert_eq!(walk(&table), [(2, 1)]);
    }

    #[test]
    fn cursor_survives_removal_of_current_entry() {
        let mut table = PendingTable::default();
        table.set(0, id(0), 1);
        table.set(0, id(1), 1);
        let (at, first, _) = table.next_after(None).unwrap();
        table.remove(at.0, first);
        let (_, second, _) = table.next_after(Some(at)).unwrap();
        assert_eq!(second, id(1));
    }
}
