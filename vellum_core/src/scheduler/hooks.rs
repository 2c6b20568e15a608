// Copyright 2026 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Callbacks from the scheduler into its owner.

use super::{Priority, Progress, RenderStats, Scheduler, UpdateOptions};
use crate::flags::Flags;
use crate::tick::TickSource;
use crate::view::{View, ViewId};
use crate::viewport::Viewport;

/// Receives scheduler callbacks.
///
/// Passed to every scheduler operation that can run them, so the owner can
/// lend out state the scheduler does not own. Hooks that react to an update
/// get the scheduler back and may schedule further updates through it.
///
/// All methods default to no-ops, so implementing only what you need is
/// fine.
pub trait SchedulerHooks<V: View, T: TickSource> {
    /// The viewport predicate. `None` treats every view as visible.
    fn viewport(&mut self) -> Option<&mut dyn Viewport<V>> {
        None
    }

    /// Called after bits were added to a view's pending entry.
    fn on_view_update(
        &mut self,
        scheduler: &mut Scheduler<V, T>,
        view: ViewId,
        flags: Flags,
        priority: Priority,
        opt: &UpdateOptions,
    ) {
        _ = (scheduler, view, flags, priority, opt);
    }

    /// Called when a view returned `leftover` bits.
    ///
    /// Return `true` after resolving the postponement (for example by
    /// force-applying the views it waits for). The entry still counts as
    /// postponed if it is pending afterwards.
    fn on_view_postponed(
        &mut self,
        scheduler: &mut Scheduler<V, T>,
        view: ViewId,
        leftover: Flags,
        opt: &UpdateOptions,
    ) -> bool {
        _ = (scheduler, view, leftover, opt);
        false
    }

    /// Called before a render cycle starts.
    fn before_render(&mut self, opt: &UpdateOptions) {
        _ = opt;
    }

    /// Called after a render cycle completes.
    fn after_render(&mut self, stats: &RenderStats, opt: &UpdateOptions) {
        _ = (stats, opt);
    }

    /// Called once per frame in frame-paced mode.
    fn on_progress(&mut self, progress: &Progress) {
        _ = progress;
    }

    /// Called when an auto-freezing scheduler goes idle.
    fn on_idle(&mut self) {}
}

/// Hooks that do nothing and see every view as visible.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoHooks;

impl<V: View, T: TickSource> SchedulerHooks<V, T> for NoHooks {}
