// Copyright 2026 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Generational arena owning every live view.

use alloc::vec::Vec;

use super::id::ViewId;

/// Arena of views addressed by [`ViewId`].
///
/// Removed views free their slot for reuse; the slot's generation is bumped
/// so handles to the removed view stop resolving. Lookups never panic on a
/// stale handle, they just return `None`.
#[derive(Debug)]
pub struct ViewRegistry<V> {
    slots: Vec<Slot<V>>,
    free_list: Vec<u32>,
    live: usize,
}

#[derive(Debug)]
struct Slot<V> {
    generation: u32,
    state: SlotState<V>,
}

#[derive(Debug)]
enum SlotState<V> {
    Free,
    Live(V),
    /// Temporarily moved out while the view runs its own update.
    Lent,
}

impl<V> Default for ViewRegistry<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> ViewRegistry<V> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            live: 0,
        }
    }

    /// Registers a view and returns its handle.
    pub fn insert(&mut self, view: V) -> ViewId {
        self.live += 1;
        if let Some(idx) = self.free_list.pop() {
            let slot = &mut self.slots[idx as usize];
            slot.state = SlotState::Live(view);
            return ViewId {
                idx,
                generation: slot.generation,
            };
        }
        #[expect(
            clippy::cast_possible_truncation,
            reason = "slot count stays far below u32::MAX"
        )]
        let idx = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            state: SlotState::Live(view),
        });
        ViewId { idx, generation: 0 }
    }

    /// Unregisters a view, returning it if the handle was live.
    pub fn remove(&mut self, id: ViewId) -> Option<V> {
        let slot = self.slot_mut(id)?;
        if !matches!(slot.state, SlotState::Live(_)) {
            return None;
        }
        let SlotState::Live(view) = core::mem::replace(&mut slot.state, SlotState::Free) else {
            return None;
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(id.idx);
        self.live -= 1;
        Some(view)
    }

    /// Returns whether the handle refers to a registered view.
    #[must_use]
    pub fn contains(&self, id: ViewId) -> bool {
        self.slot(id)
            .is_some_and(|slot| !matches!(slot.state, SlotState::Free))
    }

    /// Returns the view behind a handle.
    #[must_use]
    pub fn get(&self, id: ViewId) -> Option<&V> {
        match &self.slot(id)?.state {
            SlotState::Live(view) => Some(view),
            _ => None,
        }
    }

    /// Returns the view behind a handle, mutably.
    pub fn get_mut(&mut self, id: ViewId) -> Option<&mut V> {
        match &mut self.slot_mut(id)?.state {
            SlotState::Live(view) => Some(view),
            _ => None,
        }
    }

    /// Number of registered views.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns whether no views are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Iterates over live views in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (ViewId, &V)> + '_ {
        self.slots.iter().enumerate().filter_map(|(idx, slot)| match &slot.state {
            SlotState::Live(view) => Some((
                ViewId {
                    idx: u32::try_from(idx).ok()?,
                    generation: slot.generation,
                },
                view,
            )),
            _ => None,
        })
    }

    /// Returns the handles of all live views.
    #[must_use]
    pub fn ids(&self) -> Vec<ViewId> {
        self.iter().map(|(id, _)| id).collect()
    }

    // -- Lending --

    /// Moves a view out of its slot so that it can be mutated while the rest
    /// of the registry stays readable. The slot keeps its handle valid.
    pub(crate) fn lend(&mut self, id: ViewId) -> Option<V> {
        let slot = self.slot_mut(id)?;
        match core::mem::replace(&mut slot.state, SlotState::Lent) {
            SlotState::Live(view) => Some(view),
            other => {
                slot.state = other;
                None
            }
        }
    }

    /// Puts a lent view back.
    ///
    /// # Panics
    ///
    /// Panics if the slot was not lent out under this handle.
    pub(crate) fn restore(&mut self, id: ViewId, view: V) {
        match self.slot_mut(id) {
            Some(slot) if matches!(slot.state, SlotState::Lent) => slot.state = SlotState::Live(view),
            _ => panic!("view slot was not lent out"),
        }
    }

    fn slot(&self, id: ViewId) -> Option<&Slot<V>> {
        self.slots
            .get(id.idx as usize)
            .filter(|slot| slot.generation == id.generation)
    }

    fn slot_mut(&mut self, id: ViewId) -> Option<&mut Slot<V>> {
        self.slots
            .get_mut(id.idx as usize)
            .filter(|slot| slot.generation == id.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_remove() {
        let mut reg = ViewRegistry::new();
        let a = reg.insert("a");
        let b = reg.insert("b");
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.get(a), Some(&"a"));
        assert_eq!(reg.remove(a), Some("a"));
        assert!(!reg.contains(a));
        assert!(reg.contains(b));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn generation_prevents_stale_access() {
        let mut reg = ViewRegistry::new();
        let old = reg.insert(1);
        reg.remove(old);
        let new = reg.insert(2);
        assert_eq!(old.index(), new.index(), "slot is reused");
        assert_ne!(old.generation(), new.generation());
        assert_eq!(reg.get(old), None);
        assert_eq!(reg.remove(old), None, "stale removal is a no-op");
        assert_eq!(reg.get(new), Some(&2));
    }

    #[test]
    fn lent_views_keep_their_handle() {
        let mut reg = ViewRegistry::new();
        let a = reg.insert(10);
        let view = reg.lend(a).unwrap();
        assert!(reg.contains(a));
        assert_eq!(reg.get(a), None, "lent views are not readable");
        assert_eq!(reg.lend(a), None, "cannot lend twice");
        reg.restore(a, view + 1);
        assert_eq!(reg.get(a), Some(&11));
    }

    #[test]
    fn iter_skips_free_slots() {
        let mut reg = ViewRegistry::new();
        let a = reg.insert('a');
        let b = reg.insert('b');
        let c = reg.insert('c');
        reg.remove(b);
        let ids: Vec<ViewId> = reg.ids();
        assert_eq!(ids, [a, c]);
    }

    #[test]
    #[should_panic(expected = "view slot was not lent out")]
    fn restore_without_lend_panics() {
        let mut reg = ViewRegistry::new();
        let a = reg.insert(0);
        reg.restore(a, 1);
    }
}
