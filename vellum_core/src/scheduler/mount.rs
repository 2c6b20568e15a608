// Copyright 2026 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mounted and unmounted view sets.
//!
//! Both sets are rotating queues. A bounded visibility sweep looks at the
//! head, then either moves the view to the other set or rotates it to the
//! tail, so successive sweeps visit every view before revisiting any.

use hashbrown::HashMap;

use crate::flags::{FLAG_INSERT, Flags};
use crate::view::ViewId;

/// Where a view currently stands with respect to the layer container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MountState {
    /// Attached.
    Mounted,
    /// Detached by culling, waiting to be admitted again.
    Unmounted,
    /// Never evaluated against the viewport.
    Unevaluated,
}

#[derive(Clone, Copy, Debug)]
struct Link {
    prev: Option<ViewId>,
    next: Option<ViewId>,
    value: Flags,
}

/// An insertion-ordered set of views with O(1) removal and rotation.
#[derive(Clone, Debug, Default)]
pub(crate) struct KeyedList {
    links: HashMap<ViewId, Link>,
    head: Option<ViewId>,
    tail: Option<ViewId>,
}

impl KeyedList {
    pub(crate) fn len(&self) -> usize {
        self.links.len()
    }

    pub(crate) fn contains(&self, id: ViewId) -> bool {
        self.links.contains_key(&id)
    }

    pub(crate) fn get(&self, id: ViewId) -> Option<Flags> {
        self.links.get(&id).map(|link| link.value)
    }

    pub(crate) fn peek_head(&self) -> Option<(ViewId, Flags)> {
        let head = self.head?;
        Some((head, self.links.get(&head)?.value))
    }

    /// Appends `id`, or updates its value in place if already present.
    pub(crate) fn push_tail(&mut self, id: ViewId, value: Flags) {
        if let Some(link) = self.links.get_mut(&id) {
            link.value = value;
            return;
        }
        let prev = self.tail;
        self.links.insert(
            id,
            Link {
                prev,
                next: None,
                value,
            },
        );
        match prev.and_then(|p| self.links.get_mut(&p)) {
            Some(p) => p.next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
    }

    pub(crate) fn pop_head(&mut self) -> Option<(ViewId, Flags)> {
        let head = self.head?;
        let value = self.remove(head)?;
        Some((head, value))
    }

    pub(crate) fn remove(&mut self, id: ViewId) -> Option<Flags> {
        let link = self.links.remove(&id)?;
        match link.prev.and_then(|p| self.links.get_mut(&p)) {
            Some(p) => p.next = link.next,
            None => self.head = link.next,
        }
        match link.next.and_then(|n| self.links.get_mut(&n)) {
            Some(n) => n.prev = link.prev,
            None => self.tail = link.prev,
        }
        Some(link.value)
    }

    /// Moves the head to the tail.
    pub(crate) fn rotate(&mut self) {
        if let Some((id, value)) = self.pop_head() {
            self.push_tail(id, value);
        }
    }

    /// Moves `id` to the front.
    pub(crate) fn move_to_head(&mut self, id: ViewId) -> bool {
        let Some(value) = self.remove(id) else {
            return false;
        };
        let next = self.head;
        self.links.insert(
            id,
            Link {
                prev: None,
                next,
                value,
            },
        );
        match next.and_then(|n| self.links.get_mut(&n)) {
            Some(n) => n.prev = Some(id),
            None => self.tail = Some(id),
        }
        self.head = Some(id);
        true
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = ViewId> + '_ {
        core::iter::successors(self.head, |id| self.links.get(id)?.next)
    }

    pub(crate) fn clear(&mut self) {
        self.links.clear();
        self.head = None;
        self.tail = None;
    }
}

/// Tracks which views are attached and which were culled.
///
/// The two sets are disjoint. A view in neither set was never evaluated.
/// Culled views keep the bits they still need applied once admitted again.
#[derive(Clone, Debug, Default)]
pub struct MountTracker {
    pub(crate) mounted: KeyedList,
    pub(crate) unmounted: KeyedList,
}

impl MountTracker {
    /// Creates empty sets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Where `id` stands.
    #[must_use]
    pub fn state(&self, id: ViewId) -> MountState {
        if self.mounted.contains(id) {
            MountState::Mounted
        } else if self.unmounted.contains(id) {
            MountState::Unmounted
        } else {
            MountState::Unevaluated
        }
    }

    /// Returns whether `id` is attached.
    #[must_use]
    pub fn is_mounted(&self, id: ViewId) -> bool {
        self.mounted.contains(id)
    }

    /// Moves `id` into the mounted set and returns the bits it retained while
    /// unmounted. Returns `0` if it was already mounted.
    pub fn register_mounted(&mut self, id: ViewId) -> Flags {
        if self.mounted.contains(id) {
            return 0;
        }
        let retained = self.unmounted.remove(id).unwrap_or(0);
        self.mounted.push_tail(id, 0);
        retained
    }

    /// Moves a mounted `id` into the unmounted set, retaining `flags` plus
    /// [`FLAG_INSERT`]. Returns `false` if it was not mounted.
    pub fn register_unmounted(&mut self, id: ViewId, flags: Flags) -> bool {
        if self.mounted.remove(id).is_none() {
            return false;
        }
        self.unmounted.push_tail(id, flags | FLAG_INSERT);
        true
    }

    /// ORs `flags` into the retained bits of an unmounted or unevaluated
    /// view, which ends up in the unmounted set.
    pub(crate) fn merge_unmounted(&mut self, id: ViewId, flags: Flags) {
        let retained = self.unmounted.get(id).unwrap_or(0);
        self.unmounted.push_tail(id, retained | flags);
    }

    /// Forgets `id` entirely.
    pub fn forget(&mut self, id: ViewId) {
        self.mounted.remove(id);
        self.unmounted.remove(id);
    }

    /// Number of attached views.
    #[must_use]
    pub fn mounted_len(&self) -> usize {
        self.mounted.len()
    }

    /// Number of culled views.
    #[must_use]
    pub fn unmounted_len(&self) -> usize {
        self.unmounted.len()
    }

    /// Attached views in sweep order.
    pub fn mounted_views(&self) -> impl Iterator<Item = ViewId> + '_ {
        self.mounted.iter()
    }

    /// Culled views in sweep order.
    pub fn unmounted_views(&self) -> impl Iterator<Item = ViewId> + '_ {
        self.unmounted.iter()
    }

    /// Bits retained by an unmounted view.
    #[must_use]
    pub fn retained(&self, id: ViewId) -> Option<Flags> {
        self.unmounted.get(id)
    }

    pub(crate) fn clear(&mut self) {
        self.mounted.clear();
        self.unmounted.clear();
    }
}
