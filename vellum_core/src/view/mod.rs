// Copyright 2026 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The view contract and the reference cell views.
//!
//! A [`View`] is the renderable counterpart of one model cell. The scheduler
//! never looks inside a view: it hands it a bitmask of pending change
//! categories through [`View::confirm_update`] and gets back the bits the view
//! could not apply yet.
//!
//! [`ElementView`] and [`LinkView`] are headless implementations for node and
//! edge cells. They share their attribute bookkeeping through
//! [`CellViewBase`] and are stored side by side in the [`CellView`] enum that
//! the [`Paper`](crate::paper::Paper) engine schedules.

mod base;
mod cell;
mod element;
mod id;
mod link;
mod registry;

pub use base::{CellViewBase, ViewEffects};
pub use cell::CellView;
pub use element::{ElementKind, ElementView};
pub use id::ViewId;
pub use link::{LinkKind, LinkView};
pub use registry::ViewRegistry;

use alloc::vec::Vec;

use kurbo::Rect;

use crate::flags::Flags;
use crate::scheduler::{MountTracker, Priority};

/// The renderable counterpart of a model cell.
///
/// Implementations must honor the leftover contract: consume every bit that
/// can be applied now, return the rest, and never apply a partial state that
/// depends on a view that is not mounted yet.
pub trait View: Sized {
    /// Default priority bucket for this view's updates. Lower runs earlier.
    fn update_priority(&self) -> Priority {
        0
    }

    /// Whether viewport culling applies to this view.
    fn is_detachable(&self) -> bool {
        true
    }

    /// Stacking value used by the z-order policy.
    fn z(&self) -> f64 {
        0.0
    }

    /// Model-space bounds used by viewport predicates, if known.
    fn bbox(&self) -> Option<Rect> {
        None
    }

    /// Applies pending changes and returns the bits that must wait.
    fn confirm_update(&mut self, flags: Flags, cx: &mut UpdateCx<'_, Self>) -> Flags;

    /// Called after the view was attached to the layer container.
    fn on_mount(&mut self, initial: bool) {
        _ = initial;
    }

    /// Detaches the on-screen representation. Must be idempotent.
    fn unmount(&mut self);

    /// Destroys the view. Implies [`unmount`](Self::unmount). Must be
    /// idempotent.
    fn remove(&mut self);
}

/// An update a view asked for while running its own update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct UpdateRequest {
    pub(crate) view: ViewId,
    pub(crate) flags: Flags,
    pub(crate) priority: Option<Priority>,
}

/// Read access to scheduler state during [`View::confirm_update`].
///
/// Other views can be inspected but not mutated. Updates requested through
/// [`request_update`](Self::request_update) are scheduled as soon as the
/// current view returns.
pub struct UpdateCx<'a, V> {
    id: ViewId,
    views: &'a ViewRegistry<V>,
    mounts: &'a MountTracker,
    requests: &'a mut Vec<UpdateRequest>,
}

impl<V> core::fmt::Debug for UpdateCx<'_, V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UpdateCx")
            .field("id", &self.id)
            .field("requests", &self.requests.len())
            .finish_non_exhaustive()
    }
}

impl<'a, V> UpdateCx<'a, V> {
    pub(crate) fn new(
        id: ViewId,
        views: &'a ViewRegistry<V>,
        mounts: &'a MountTracker,
        requests: &'a mut Vec<UpdateRequest>,
    ) -> Self {
        Self {
            id,
            views,
            mounts,
            requests,
        }
    }

    /// The view being updated.
    #[must_use]
    pub fn id(&self) -> ViewId {
        self.id
    }

    /// Returns whether another view is currently mounted.
    #[must_use]
    pub fn is_mounted(&self, view: ViewId) -> bool {
        self.mounts.is_mounted(view)
    }

    /// Returns another registered view. The view being updated is not
    /// readable through this accessor.
    #[must_use]
    pub fn view(&self, view: ViewId) -> Option<&'a V> {
        self.views.get(view)
    }

    /// Schedules an update for another view once this one returns.
    ///
    /// With `priority` set to `None` the target's own priority is used.
    pub fn request_update(&mut self, view: ViewId, flags: Flags, priority: Option<Priority>) {
        self.requests.push(UpdateRequest {
            view,
            flags,
            priority,
        });
    }
}
