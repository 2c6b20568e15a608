// Copyright 2026 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Incremental view-update scheduling.
//!
//! The [`Scheduler`] owns every view, a table of pending change bits keyed by
//! priority and view, the mounted/unmounted sets, and the stacking order of
//! mounted views. Model changes are turned into bitmasks by the caller and
//! handed to [`schedule_view_update`](Scheduler::schedule_view_update); the
//! scheduler decides when each view sees them.
//!
//! # Execution modes
//!
//! - **Synchronous**: [`update_views`](Scheduler::update_views) drains the
//!   table in bounded batches until it is empty or no batch makes progress.
//! - **Frame-paced**: the scheduler requests a tick from its [`TickSource`]
//!   and runs one batch plus one bounded visibility sweep per
//!   [`on_frame`](Scheduler::on_frame).
//!
//! # Batches
//!
//! A batch walks the table in ascending priority and, inside a priority, in
//! the order views were first scheduled. Each entry is checked against the
//! viewport, mounted if needed, and handed to [`View::confirm_update`].
//! Leftover bits are stored back and reported to
//! [`SchedulerHooks::on_view_postponed`]. Nothing is retried within the same
//! batch, and there is no retry limit across batches.
//!
//! # Freezing
//!
//! A frozen scheduler only records. [`unfreeze`](Scheduler::unfreeze) runs
//! exactly one flush (or restarts the frame loop) and then a deferred exact
//! z-sort. Keyed freezes layer: a freeze under a new key while already
//! frozen under another key is ignored, and an unfreeze with a mismatched
//! key does nothing.

mod hooks;
mod mount;
mod options;
mod pending;

pub use hooks::{NoHooks, SchedulerHooks};
pub use mount::{MountState, MountTracker};
pub use options::{SchedulerOptions, Sorting, UpdateOptions, Visibility};

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use pending::PendingTable;

use crate::flags::{FLAG_INIT, FLAG_INSERT, FLAG_REMOVE, Flags};
use crate::tick::{FrameTick, TickId, TickSource};
use crate::time::HostTime;
use crate::trace::{
    BatchEvent, FrameEvent, FreezeEvent, PostponeEvent, RenderDoneEvent, TraceSink, Tracer,
    ViewChange, ViewEvent,
};
use crate::view::{UpdateCx, UpdateRequest, View, ViewId, ViewRegistry};
use crate::zorder::ZOrder;

/// Priority bucket of an update. Lower runs earlier.
pub type Priority = u32;

/// Sentinel for "no priority touched yet".
pub const MIN_PRIORITY: Priority = Priority::MAX;

/// Per-frame budget for moving views between the mounted and unmounted sets.
pub const MOUNT_BATCH_SIZE: usize = 1000;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors reported by the scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerError {
    /// The scheduler was torn down with [`Scheduler::remove_all`].
    Disabled,
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("cannot resume a scheduler after it was torn down"),
        }
    }
}

impl core::error::Error for SchedulerError {}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Outcome of one batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchStats {
    /// Lowest priority that consumed an entry, or [`MIN_PRIORITY`].
    pub priority: Priority,
    /// Entries consumed.
    pub updated: usize,
    /// Entries left pending with leftover bits.
    pub postponed: usize,
    /// Views attached.
    pub mounted: usize,
    /// Views culled.
    pub unmounted: usize,
    /// Whether the table was exhausted.
    pub empty: bool,
}

impl Default for BatchStats {
    fn default() -> Self {
        Self {
            priority: MIN_PRIORITY,
            updated: 0,
            postponed: 0,
            mounted: 0,
            unmounted: 0,
            empty: true,
        }
    }
}

impl BatchStats {
    fn made_progress(&self) -> bool {
        self.updated + self.mounted + self.unmounted > 0
    }
}

/// Outcome of a render cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderStats {
    /// Lowest priority that consumed an entry, or [`MIN_PRIORITY`].
    pub priority: Priority,
    /// Entries consumed.
    pub updated: usize,
    /// Entries still postponed at the end.
    pub postponed: usize,
    /// Views attached.
    pub mounted: usize,
    /// Views culled.
    pub unmounted: usize,
    /// Batches run.
    pub batches: usize,
}

impl Default for RenderStats {
    fn default() -> Self {
        Self {
            priority: MIN_PRIORITY,
            updated: 0,
            postponed: 0,
            mounted: 0,
            unmounted: 0,
            batches: 0,
        }
    }
}

impl RenderStats {
    fn absorb(&mut self, batch: &BatchStats) {
        self.priority = self.priority.min(batch.priority);
        self.updated += batch.updated;
        self.postponed = batch.postponed;
        self.mounted += batch.mounted;
        self.unmounted += batch.unmounted;
        self.batches += 1;
    }
}

/// Outcome of a visibility sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VisibilityStats {
    /// Views admitted.
    pub mounted: usize,
    /// Views culled.
    pub unmounted: usize,
}

/// Per-frame progress report in frame-paced mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    /// Whether the frame's batch exhausted the table.
    pub empty: bool,
    /// Entries processed since the render cycle began.
    pub processed: usize,
    /// Entries scheduled since the render cycle began.
    pub total: usize,
    /// The frame's batch.
    pub stats: BatchStats,
}

/// Bookkeeping carried from frame to frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct FrameProgress {
    processed: usize,
    priority: Priority,
    checked_mounted: usize,
    checked_unmounted: usize,
}

impl Default for FrameProgress {
    fn default() -> Self {
        Self {
            processed: 0,
            priority: MIN_PRIORITY,
            checked_mounted: 0,
            checked_unmounted: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Decides when, in what order, and whether each view is synchronized.
///
/// Generic over the view type and the tick source that paces frame-paced
/// mode. Operations that can call back into the owner take a
/// [`SchedulerHooks`] value.
pub struct Scheduler<V: View, T: TickSource> {
    options: SchedulerOptions,

    // -- Views --
    views: ViewRegistry<V>,
    pending: PendingTable,
    mounts: MountTracker,
    z_order: ZOrder,
    requests: Vec<UpdateRequest>,

    // -- Freezing --
    frozen: bool,
    freeze_key: Option<String>,
    key_frozen: bool,
    idle: bool,
    disabled: bool,
    sort_pending: bool,

    // -- Frame loop --
    ticks: T,
    tick: Option<TickId>,
    frame_options: UpdateOptions,
    progress: FrameProgress,
    count: usize,
    last_frame: Option<HostTime>,

    // -- Diagnostics --
    trace: Option<Box<dyn TraceSink>>,
}

impl<V: View + fmt::Debug, T: TickSource + fmt::Debug> fmt::Debug for Scheduler<V, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("options", &self.options)
            .field("views", &self.views.len())
            .field("pending", &self.pending.len())
            .field("mounted", &self.mounts.mounted_len())
            .field("unmounted", &self.mounts.unmounted_len())
            .field("frozen", &self.frozen)
            .field("freeze_key", &self.freeze_key)
            .field("idle", &self.idle)
            .field("ticks", &self.ticks)
            .field("tick", &self.tick)
            .finish_non_exhaustive()
    }
}

impl<V: View, T: TickSource> Scheduler<V, T> {
    /// Creates a scheduler. A frame-paced scheduler that does not start
    /// frozen requests its first tick immediately.
    pub fn new(options: SchedulerOptions, mut ticks: T) -> Self {
        let tick = (options.async_mode && !options.frozen).then(|| ticks.request_tick());
        Self {
            options,
            views: ViewRegistry::new(),
            pending: PendingTable::default(),
            mounts: MountTracker::new(),
            z_order: ZOrder::new(),
            requests: Vec::new(),
            frozen: options.frozen,
            freeze_key: None,
            key_frozen: false,
            idle: false,
            disabled: false,
            sort_pending: false,
            ticks,
            tick,
            frame_options: UpdateOptions::default(),
            progress: FrameProgress::default(),
            count: 0,
            last_frame: None,
            trace: None,
        }
    }

    // -- Accessors --

    /// The configuration.
    #[must_use]
    pub fn options(&self) -> &SchedulerOptions {
        &self.options
    }

    /// The tick source.
    #[must_use]
    pub fn ticks(&self) -> &T {
        &self.ticks
    }

    /// The tick source, mutably.
    pub fn ticks_mut(&mut self) -> &mut T {
        &mut self.ticks
    }

    /// All registered views.
    #[must_use]
    pub fn views(&self) -> &ViewRegistry<V> {
        &self.views
    }

    /// One view.
    #[must_use]
    pub fn view(&self, id: ViewId) -> Option<&V> {
        self.views.get(id)
    }

    /// One view, mutably.
    pub fn view_mut(&mut self, id: ViewId) -> Option<&mut V> {
        self.views.get_mut(id)
    }

    /// The mounted and unmounted sets.
    #[must_use]
    pub fn mounts(&self) -> &MountTracker {
        &self.mounts
    }

    /// The stacking order of mounted views.
    #[must_use]
    pub fn z_order(&self) -> &ZOrder {
        &self.z_order
    }

    /// Returns whether `id` is attached.
    #[must_use]
    pub fn is_view_mounted(&self, id: ViewId) -> bool {
        self.mounts.is_mounted(id)
    }

    /// Attached views in sweep order.
    pub fn mounted_views(&self) -> impl Iterator<Item = ViewId> + '_ {
        self.mounts.mounted_views()
    }

    /// Culled views in sweep order.
    pub fn unmounted_views(&self) -> impl Iterator<Item = ViewId> + '_ {
        self.mounts.unmounted_views()
    }

    /// Returns whether any update is pending.
    #[must_use]
    pub fn has_scheduled_updates(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Bits pending for `id` at `priority`.
    #[must_use]
    pub fn pending_flags(&self, id: ViewId, priority: Priority) -> Flags {
        self.pending.get(priority, id)
    }

    /// Returns whether updates are held back. An idle scheduler is not
    /// considered frozen.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen && !self.idle
    }

    /// Returns whether an auto-freezing scheduler went idle.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.idle
    }

    /// Returns whether the scheduler is frame-paced.
    #[must_use]
    pub fn is_async(&self) -> bool {
        self.options.async_mode
    }

    /// Returns whether the scheduler was torn down.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// The outstanding tick, if any.
    #[must_use]
    pub fn pending_tick(&self) -> Option<TickId> {
        self.tick
    }

    /// Returns whether a request made with `opt` would be flushed right away.
    #[must_use]
    pub fn flushes_immediately(&self, opt: &UpdateOptions) -> bool {
        !self.is_frozen() && (!self.options.async_mode || opt.force_sync)
    }

    // -- Diagnostics --

    /// Installs a trace sink. Events are only delivered with the `trace`
    /// feature enabled.
    pub fn set_trace_sink(&mut self, sink: Box<dyn TraceSink>) {
        self.trace = Some(sink);
    }

    /// Removes the trace sink.
    pub fn take_trace_sink(&mut self) -> Option<Box<dyn TraceSink>> {
        self.trace.take()
    }

    fn tracer(&mut self) -> Tracer<'_> {
        match &mut self.trace {
            Some(sink) => {
                let sink: &mut dyn TraceSink = sink.as_mut();
                Tracer::new(Some(sink))
            }
            None => Tracer::none(),
        }
    }

    // -- Registration --

    /// Registers a view. Nothing is scheduled for it yet.
    pub fn add_view(&mut self, view: V) -> ViewId {
        self.views.insert(view)
    }

    // -- Scheduling --

    /// Adds `flags` to the pending entry of `id` at `priority`.
    ///
    /// Bits pending at lower priorities down to the view's own priority move
    /// up to `priority`. When every bit is already pending nothing happens,
    /// which stops notification cycles. A pending insert and an incoming
    /// remove cancel (and the other way around). Afterwards
    /// [`SchedulerHooks::on_view_update`] runs.
    pub fn schedule_view_update<H: SchedulerHooks<V, T> + ?Sized>(
        &mut self,
        hooks: &mut H,
        id: ViewId,
        flags: Flags,
        priority: Priority,
        opt: &UpdateOptions,
    ) {
        let Some(view) = self.views.get(id) else {
            return;
        };
        let view_priority = view.update_priority();
        if self.idle && self.options.auto_freeze {
            let wake = self.frame_options;
            // An idle scheduler was never torn down.
            _ = self.unfreeze(hooks, None, &wake);
        }

        let mut current = self.pending.get(priority, id);
        let mut migrated = false;
        for lower in self.pending.priorities_below(id, view_priority, priority) {
            current |= self.pending.remove(lower, id);
            migrated = true;
        }
        if current & flags == flags {
            if migrated {
                self.pending.set(priority, id, current);
            }
            return;
        }
        if current == 0 {
            self.count += 1;
        }
        if flags & FLAG_REMOVE != 0 && current & FLAG_INSERT != 0 {
            current ^= FLAG_INSERT;
        } else if flags & FLAG_INSERT != 0 && current & FLAG_REMOVE != 0 {
            current ^= FLAG_REMOVE;
        }
        self.pending.set(priority, id, current | flags);
        hooks.on_view_update(self, id, flags, priority, opt);
    }

    /// Schedules an update and flushes right away unless frozen or
    /// frame-paced. Returns the flush statistics if a flush ran.
    pub fn request_view_update<H: SchedulerHooks<V, T> + ?Sized>(
        &mut self,
        hooks: &mut H,
        id: ViewId,
        flags: Flags,
        priority: Priority,
        opt: &UpdateOptions,
    ) -> Option<RenderStats> {
        self.schedule_view_update(hooks, id, flags, priority, opt);
        if !self.flushes_immediately(opt) {
            return None;
        }
        Some(self.update_views(hooks, opt))
    }

    // -- Flushing --

    /// Drains the table synchronously.
    ///
    /// Runs batches of `opt.batch_size` (or the configured size) until the
    /// table is empty or a batch makes no progress. Entries that are still
    /// postponed at that point stay queued.
    pub fn update_views<H: SchedulerHooks<V, T> + ?Sized>(
        &mut self,
        hooks: &mut H,
        opt: &UpdateOptions,
    ) -> RenderStats {
        self.notify_before_render(hooks, opt);
        let mut stats = RenderStats::default();
        loop {
            let batch = self.update_views_batch(hooks, opt);
            stats.absorb(&batch);
            if batch.empty || !batch.made_progress() {
                break;
            }
        }
        self.notify_after_render(hooks, &stats, opt);
        stats
    }

    /// Runs one batch over the pending table.
    pub fn update_views_batch<H: SchedulerHooks<V, T> + ?Sized>(
        &mut self,
        hooks: &mut H,
        opt: &UpdateOptions,
    ) -> BatchStats {
        let batch_size = opt
            .batch_size
            .or(self.options.batch_size)
            .unwrap_or(usize::MAX);
        let mut stats = BatchStats::default();
        let mut cursor = None;

        while let Some((at, id, mut flags)) = self.pending.next_after(cursor) {
            cursor = Some(at);
            let priority = at.0;
            if stats.updated >= batch_size {
                stats.empty = false;
                break;
            }
            if !self.views.contains(id) {
                self.pending.remove(priority, id);
                continue;
            }

            if flags & FLAG_REMOVE == 0 {
                let state = self.mounts.state(id);
                let was_mounted = state != MountState::Unmounted;
                if !self.evaluate_visibility(hooks, id, was_mounted, opt.visibility) {
                    match state {
                        MountState::Mounted => {
                            self.mounts.register_unmounted(id, flags);
                            self.hide_view(id);
                        }
                        MountState::Unmounted => self.mounts.merge_unmounted(id, flags),
                        MountState::Unevaluated => {
                            self.mounts.merge_unmounted(id, flags | FLAG_INSERT);
                        }
                    }
                    self.pending.remove(priority, id);
                    stats.unmounted += 1;
                    continue;
                }
                if state == MountState::Unmounted {
                    flags |= FLAG_INSERT;
                    stats.mounted += 1;
                }
                flags |= self.mounts.register_mounted(id);
            }

            let leftover = self.update_view(hooks, id, flags, opt);
            if leftover != 0 {
                self.pending.set(priority, id, leftover);
                let resolved = hooks.on_view_postponed(self, id, leftover, opt);
                let still_pending = self.pending.get(priority, id) != 0;
                self.tracer().postpone(&PostponeEvent {
                    view: id,
                    leftover,
                    resolved: resolved && !still_pending,
                });
                if !resolved || still_pending {
                    stats.postponed += 1;
                    stats.empty = false;
                    continue;
                }
            }
            stats.priority = stats.priority.min(priority);
            stats.updated += 1;
            self.pending.remove(priority, id);
        }

        if !self.pending.is_empty() {
            // Entries were added behind the cursor.
            stats.empty = false;
        }
        self.tracer().batch(&BatchEvent {
            priority: (stats.priority != MIN_PRIORITY).then_some(stats.priority),
            updated: stats.updated,
            postponed: stats.postponed,
            mounted: stats.mounted,
            unmounted: stats.unmounted,
            empty: stats.empty,
        });
        stats
    }

    /// Applies one view's pending bits at its own priority right now,
    /// mounting it if it was culled. Returns the leftover, which stays
    /// pending. Render hooks do not fire.
    pub fn dump_view<H: SchedulerHooks<V, T> + ?Sized>(
        &mut self,
        hooks: &mut H,
        id: ViewId,
        opt: &UpdateOptions,
    ) -> Flags {
        let Some(view) = self.views.get(id) else {
            return 0;
        };
        let priority = view.update_priority();
        let flags = self.mounts.register_mounted(id) | self.pending.remove(priority, id);
        if flags == 0 {
            return 0;
        }
        let leftover = self.update_view(hooks, id, flags, opt);
        if leftover != 0 {
            let queued = self.pending.get(priority, id);
            self.pending.set(priority, id, queued | leftover);
        }
        leftover
    }

    /// Flushes one view if it is registered. Returns whether it was.
    pub fn require_view<H: SchedulerHooks<V, T> + ?Sized>(
        &mut self,
        hooks: &mut H,
        id: ViewId,
        opt: &UpdateOptions,
    ) -> bool {
        if !self.views.contains(id) {
            return false;
        }
        self.dump_view(hooks, id, opt);
        true
    }

    /// Applies `flags` to a view: removal, insertion, then
    /// [`View::confirm_update`] for the rest.
    fn update_view<H: SchedulerHooks<V, T> + ?Sized>(
        &mut self,
        hooks: &mut H,
        id: ViewId,
        mut flags: Flags,
        opt: &UpdateOptions,
    ) -> Flags {
        if flags & FLAG_REMOVE != 0 {
            self.destroy_view(id);
            return 0;
        }
        if flags & FLAG_INSERT != 0 {
            self.insert_view(id, flags & FLAG_INIT != 0);
        }
        flags &= !(FLAG_INSERT | FLAG_INIT);
        if flags == 0 {
            return 0;
        }

        let Some(mut view) = self.views.lend(id) else {
            return 0;
        };
        let leftover = {
            let mut cx = UpdateCx::new(id, &self.views, &self.mounts, &mut self.requests);
            view.confirm_update(flags, &mut cx)
        };
        self.views.restore(id, view);
        self.apply_requests(hooks, opt);
        leftover
    }

    fn apply_requests<H: SchedulerHooks<V, T> + ?Sized>(
        &mut self,
        hooks: &mut H,
        opt: &UpdateOptions,
    ) {
        if self.requests.is_empty() {
            return;
        }
        for request in core::mem::take(&mut self.requests) {
            let priority = request
                .priority
                .or_else(|| self.views.get(request.view).map(View::update_priority));
            if let Some(priority) = priority {
                self.schedule_view_update(hooks, request.view, request.flags, priority, opt);
            }
        }
    }

    // -- Mounting --

    fn insert_view(&mut self, id: ViewId, initial: bool) {
        let Some(view) = self.views.get_mut(id) else {
            return;
        };
        let z = view.z();
        self.z_order.insert(id, z, self.options.sorting);
        view.on_mount(initial);
        self.tracer().view(&ViewEvent {
            view: id,
            change: ViewChange::Mount { initial },
        });
    }

    fn hide_view(&mut self, id: ViewId) {
        if let Some(view) = self.views.get_mut(id) {
            view.unmount();
        }
        self.z_order.remove(id);
        self.tracer().view(&ViewEvent {
            view: id,
            change: ViewChange::Unmount,
        });
    }

    fn destroy_view(&mut self, id: ViewId) {
        if let Some(mut view) = self.views.remove(id) {
            view.remove();
        }
        self.z_order.remove(id);
        self.mounts.forget(id);
        self.pending.remove_view(id);
        self.tracer().view(&ViewEvent {
            view: id,
            change: ViewChange::Remove,
        });
    }

    // -- Visibility --

    fn evaluate_visibility<H: SchedulerHooks<V, T> + ?Sized>(
        &mut self,
        hooks: &mut H,
        id: ViewId,
        was_mounted: bool,
        visibility: Visibility,
    ) -> bool {
        let Some(view) = self.views.get(id) else {
            return was_mounted;
        };
        if !view.is_detachable() {
            return true;
        }
        match visibility {
            Visibility::All => true,
            Visibility::KeepCurrent => was_mounted,
            Visibility::Hooks => hooks
                .viewport()
                .is_none_or(|viewport| viewport.is_visible(view, was_mounted)),
        }
    }

    /// Sweeps up to `limit` culled views and schedules those that became
    /// visible. Returns how many were admitted.
    pub fn check_unmounted_views<H: SchedulerHooks<V, T> + ?Sized>(
        &mut self,
        hooks: &mut H,
        limit: usize,
        visibility: Visibility,
    ) -> usize {
        let mut admitted = 0;
        let n = self.mounts.unmounted.len().min(limit);
        for _ in 0..n {
            let Some((id, _)) = self.mounts.unmounted.peek_head() else {
                break;
            };
            if !self.views.contains(id) {
                self.mounts.unmounted.pop_head();
                continue;
            }
            if !self.evaluate_visibility(hooks, id, false, visibility) {
                self.mounts.unmounted.rotate();
                continue;
            }
            let Some((_, retained)) = self.mounts.unmounted.pop_head() else {
                break;
            };
            admitted += 1;
            let flags = self.mounts.register_mounted(id) | retained;
            if flags != 0
                && let Some(priority) = self.views.get(id).map(View::update_priority)
            {
                let opt = UpdateOptions {
                    mounting: true,
                    ..UpdateOptions::default()
                };
                self.schedule_view_update(hooks, id, flags, priority, &opt);
            }
        }
        admitted
    }

    /// Sweeps up to `limit` mounted views and culls those that are no longer
    /// visible. Returns how many were culled. Does nothing without a viewport.
    pub fn check_mounted_views<H: SchedulerHooks<V, T> + ?Sized>(
        &mut self,
        hooks: &mut H,
        limit: usize,
        visibility: Visibility,
    ) -> usize {
        if visibility != Visibility::Hooks || hooks.viewport().is_none() {
            return 0;
        }
        let mut culled = 0;
        let n = self.mounts.mounted.len().min(limit);
        for _ in 0..n {
            let Some((id, _)) = self.mounts.mounted.peek_head() else {
                break;
            };
            if !self.views.contains(id) {
                self.mounts.mounted.pop_head();
                continue;
            }
            if self.evaluate_visibility(hooks, id, true, visibility) {
                self.mounts.mounted.rotate();
                continue;
            }
            culled += 1;
            if self.mounts.register_unmounted(id, 0) {
                self.hide_view(id);
            }
        }
        culled
    }

    /// Runs both sweeps, eviction first. Views evicted by this call are not
    /// reconsidered for admission.
    pub fn schedule_cells_visibility_update<H: SchedulerHooks<V, T> + ?Sized>(
        &mut self,
        hooks: &mut H,
        opt: &UpdateOptions,
    ) -> VisibilityStats {
        let mut mount_limit = opt.mount_batch_size.unwrap_or(usize::MAX);
        let unmount_limit = opt.unmount_batch_size.unwrap_or(usize::MAX);
        let unmounted = self.check_mounted_views(hooks, unmount_limit, opt.visibility);
        if unmounted > 0 {
            let earlier = self.mounts.unmounted_len().saturating_sub(unmounted);
            mount_limit = mount_limit.min(earlier);
        }
        let mounted = self.check_unmounted_views(hooks, mount_limit, opt.visibility);
        VisibilityStats { mounted, unmounted }
    }

    /// Re-evaluates a single view against the viewport.
    pub fn check_view_visibility<H: SchedulerHooks<V, T> + ?Sized>(
        &mut self,
        hooks: &mut H,
        id: ViewId,
        opt: &UpdateOptions,
    ) -> VisibilityStats {
        let visible = self.evaluate_visibility(hooks, id, false, opt.visibility);
        if self.mounts.is_mounted(id) && !visible {
            self.mounts.register_unmounted(id, 0);
            self.hide_view(id);
            return VisibilityStats {
                mounted: 0,
                unmounted: 1,
            };
        }
        if visible && let Some(retained) = self.mounts.unmounted.remove(id) {
            let flags = retained | self.mounts.register_mounted(id);
            if flags != 0
                && let Some(priority) = self.views.get(id).map(View::update_priority)
            {
                let opt = UpdateOptions {
                    mounting: true,
                    ..UpdateOptions::default()
                };
                self.schedule_view_update(hooks, id, flags, priority, &opt);
            }
            return VisibilityStats {
                mounted: 1,
                unmounted: 0,
            };
        }
        VisibilityStats::default()
    }

    /// Re-evaluates one view and, if it was admitted, applies it right away.
    pub fn update_view_visibility<H: SchedulerHooks<V, T> + ?Sized>(
        &mut self,
        hooks: &mut H,
        id: ViewId,
        opt: &UpdateOptions,
    ) {
        let stats = self.check_view_visibility(hooks, id, opt);
        if stats.mounted > 0 {
            self.require_view(hooks, id, opt);
        }
    }

    /// Sweeps every view and then flushes without consulting the viewport
    /// again.
    pub fn update_views_visibility<H: SchedulerHooks<V, T> + ?Sized>(
        &mut self,
        hooks: &mut H,
        opt: &UpdateOptions,
    ) -> RenderStats {
        let sweep = UpdateOptions {
            mount_batch_size: None,
            unmount_batch_size: None,
            ..*opt
        };
        self.schedule_cells_visibility_update(hooks, &sweep);
        let flush = UpdateOptions {
            visibility: Visibility::KeepCurrent,
            ..*opt
        };
        self.update_views(hooks, &flush)
    }

    /// Moves a culled view to the head of the admission sweep.
    pub fn prioritize_mount(&mut self, id: ViewId) -> bool {
        self.mounts.unmounted.move_to_head(id)
    }

    /// Moves a mounted view to the head of the eviction sweep.
    pub fn prioritize_unmount(&mut self, id: ViewId) -> bool {
        self.mounts.mounted.move_to_head(id)
    }

    // -- Frame loop --

    /// Handles a tick delivered by the tick source. Ticks other than the
    /// outstanding one are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Disabled`] after [`remove_all`](Self::remove_all).
    pub fn on_frame<H: SchedulerHooks<V, T> + ?Sized>(
        &mut self,
        hooks: &mut H,
        tick: FrameTick,
    ) -> Result<(), SchedulerError> {
        if self.tick != Some(tick.id) {
            return Ok(());
        }
        let interval = self
            .last_frame
            .map(|last| tick.now.saturating_duration_since(last));
        self.last_frame = Some(tick.now);
        self.tracer().frame(&FrameEvent {
            frame_index: tick.frame_index,
            now: tick.now,
            interval,
        });
        let opt = self.frame_options;
        self.update_views_async(hooks, &opt)
    }

    /// One slice of frame-paced work.
    ///
    /// Cancels the outstanding tick. If there was one, runs one batch and one
    /// bounded visibility sweep, updates progress and reports it, then
    /// requests the next tick unless a callback froze the scheduler.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Disabled`] after [`remove_all`](Self::remove_all).
    pub fn update_views_async<H: SchedulerHooks<V, T> + ?Sized>(
        &mut self,
        hooks: &mut H,
        opt: &UpdateOptions,
    ) -> Result<(), SchedulerError> {
        let id = self.tick;
        if let Some(id) = id {
            self.ticks.cancel_tick(id);

            if self.progress.processed == 0 && self.has_scheduled_updates() {
                self.notify_before_render(hooks, opt);
            }
            let mut stats = self.update_views_batch(hooks, opt);
            let budget = opt.mount_batch_size.unwrap_or(self.options.mount_batch_size);
            let sweep = UpdateOptions {
                mount_batch_size: Some(budget.saturating_sub(stats.mounted)),
                unmount_batch_size: Some(
                    opt.unmount_batch_size
                        .unwrap_or(budget)
                        .saturating_sub(stats.unmounted),
                ),
                ..*opt
            };
            let checked = self.schedule_cells_visibility_update(hooks, &sweep);
            let mut processed = self.progress.processed;
            let total = self.count;

            if stats.updated > 0 {
                processed += stats.updated + stats.unmounted;
                self.progress.priority = self.progress.priority.min(stats.priority);
                if stats.empty && checked.mounted == 0 {
                    stats.unmounted += checked.unmounted;
                    stats.priority = self.progress.priority;
                    let done = RenderStats {
                        priority: self.progress.priority,
                        updated: processed,
                        postponed: stats.postponed,
                        mounted: stats.mounted,
                        unmounted: stats.unmounted,
                        batches: 1,
                    };
                    self.notify_after_render(hooks, &done, opt);
                    self.progress.processed = 0;
                    self.progress.priority = MIN_PRIORITY;
                    self.count = 0;
                } else {
                    self.progress.processed = processed;
                }
                self.progress.checked_mounted = 0;
                self.progress.checked_unmounted = 0;
            } else {
                self.progress.checked_unmounted += sweep.mount_batch_size.unwrap_or(0);
                self.progress.checked_mounted += sweep.unmount_batch_size.unwrap_or(0);
                if self.options.auto_freeze
                    && !self.has_scheduled_updates()
                    && self.progress.checked_unmounted >= self.mounts.unmounted_len()
                    && self.progress.checked_mounted >= self.mounts.mounted_len()
                {
                    self.freeze(None);
                    self.idle = true;
                    self.frame_options = *opt;
                    self.tracer().idle();
                    hooks.on_idle();
                }
            }

            if total > 0 {
                hooks.on_progress(&Progress {
                    empty: stats.empty,
                    processed,
                    total,
                    stats,
                });
            }
            if self.tick != Some(id) {
                // A callback froze or restarted the loop.
                return Ok(());
            }
        }
        if self.disabled {
            return Err(SchedulerError::Disabled);
        }
        self.tick = Some(self.ticks.request_tick());
        Ok(())
    }

    // -- Freezing --

    /// Holds back every update until [`unfreeze`](Self::unfreeze).
    ///
    /// With a key, the freeze layers over an existing unkeyed freeze. A keyed
    /// freeze while already frozen under another key is ignored.
    pub fn freeze(&mut self, key: Option<&str>) {
        if let Some(key) = key
            && self.freeze_key.as_deref() != Some(key)
        {
            if self.frozen && self.freeze_key.is_some() {
                return;
            }
            self.freeze_key = Some(key.to_string());
            self.key_frozen = self.frozen;
        }
        self.frozen = true;
        self.idle = false;
        self.cancel_tick();
        self.tracer().freeze(&FreezeEvent {
            frozen: true,
            keyed: key.is_some(),
        });
    }

    /// Resumes updates.
    ///
    /// A key that does not match the current freeze key does nothing. The
    /// matching key of a freeze that was layered over an earlier freeze
    /// restores that freeze. Otherwise runs exactly one flush (synchronous
    /// mode, returning its statistics) or restarts the frame loop, then runs
    /// a deferred exact z-sort.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Disabled`] after [`remove_all`](Self::remove_all).
    pub fn unfreeze<H: SchedulerHooks<V, T> + ?Sized>(
        &mut self,
        hooks: &mut H,
        key: Option<&str>,
        opt: &UpdateOptions,
    ) -> Result<Option<RenderStats>, SchedulerError> {
        if let (Some(key), Some(current)) = (key, self.freeze_key.as_deref())
            && key != current
        {
            return Ok(None);
        }
        let matched = key.is_some() && key == self.freeze_key.as_deref();
        self.freeze_key = None;
        if matched && self.key_frozen {
            return Ok(None);
        }
        if self.disabled {
            return Err(SchedulerError::Disabled);
        }
        self.idle = false;

        let stats = if self.options.async_mode {
            self.cancel_tick();
            self.frame_options = *opt;
            self.progress = FrameProgress::default();
            self.update_views_async(hooks, opt)?;
            None
        } else {
            Some(self.update_views(hooks, opt))
        };
        self.frozen = false;
        self.key_frozen = false;
        self.tracer().freeze(&FreezeEvent {
            frozen: false,
            keyed: key.is_some(),
        });
        if self.sort_pending {
            self.sort_views_exact();
            self.sort_pending = false;
        }
        Ok(stats)
    }

    fn cancel_tick(&mut self) {
        if let Some(id) = self.tick.take() {
            self.ticks.cancel_tick(id);
        }
    }

    // -- Stacking --

    /// Restores exact stacking order, or defers it while frozen. Does
    /// nothing unless sorting is [`Sorting::Exact`].
    pub fn sort_views(&mut self) {
        if self.options.sorting != Sorting::Exact {
            return;
        }
        if self.is_frozen() {
            self.sort_pending = true;
            return;
        }
        self.sort_views_exact();
    }

    /// Stable-sorts mounted views by `z` now.
    pub fn sort_views_exact(&mut self) {
        let views = &self.views;
        let event = self
            .z_order
            .sort_exact(|id| views.get(id).map_or(0.0, View::z));
        self.tracer().sort(&event);
    }

    // -- Teardown --

    /// Destroys every view and disables the scheduler for good.
    pub fn remove_all(&mut self) {
        self.freeze(None);
        self.disabled = true;
        for id in self.views.ids() {
            if let Some(mut view) = self.views.remove(id) {
                view.remove();
            }
            self.tracer().view(&ViewEvent {
                view: id,
                change: ViewChange::Remove,
            });
        }
        self.pending.clear();
        self.mounts.clear();
        self.z_order.clear();
        self.count = 0;
    }

    // -- Notifications --

    fn notify_before_render<H: SchedulerHooks<V, T> + ?Sized>(
        &mut self,
        hooks: &mut H,
        opt: &UpdateOptions,
    ) {
        if opt.silent {
            return;
        }
        self.tracer().render_begin();
        hooks.before_render(opt);
    }

    fn notify_after_render<H: SchedulerHooks<V, T> + ?Sized>(
        &mut self,
        hooks: &mut H,
        stats: &RenderStats,
        opt: &UpdateOptions,
    ) {
        if opt.silent {
            return;
        }
        self.tracer().render_done(&RenderDoneEvent {
            updated: stats.updated,
            priority: (stats.priority != MIN_PRIORITY).then_some(stats.priority),
            batches: stats.batches,
        });
        hooks.after_render(stats, opt);
    }
}

#[cfg(test)]
mod tests;
