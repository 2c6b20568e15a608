// Copyright 2026 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the update scheduler.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! scheduler calls at each stage of a flush or frame. All method bodies
//! default to no-ops, so implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing. When **on**, each
//! method performs a single `Option` branch before dispatching.
//!
//! A scheduler owns its sink (see
//! [`Scheduler::set_trace_sink`](crate::scheduler::Scheduler::set_trace_sink))
//! and builds a `Tracer` around it whenever it emits.

use crate::flags::Flags;
use crate::scheduler::Priority;
use crate::time::{Duration, HostTime};
use crate::view::ViewId;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// What happened to a view's on-screen representation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViewChange {
    /// Attached to the layer container.
    Mount {
        /// Whether this was the view's first attachment.
        initial: bool,
    },
    /// Detached by viewport culling.
    Unmount,
    /// Destroyed.
    Remove,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a frame-paced scheduler receives a tick.
#[derive(Clone, Copy, Debug)]
pub struct FrameEvent {
    /// Frame counter of the tick source.
    pub frame_index: u64,
    /// Time of the tick.
    pub now: HostTime,
    /// Time since the previous tick, if there was one.
    pub interval: Option<Duration>,
}

/// Emitted after every batch over the pending table.
#[derive(Clone, Copy, Debug)]
pub struct BatchEvent {
    /// Lowest priority bucket that consumed an entry.
    pub priority: Option<Priority>,
    /// Entries consumed.
    pub updated: usize,
    /// Entries left pending with leftover bits.
    pub postponed: usize,
    /// Views attached by this batch.
    pub mounted: usize,
    /// Views culled by this batch.
    pub unmounted: usize,
    /// Whether the pending table was exhausted.
    pub empty: bool,
}

/// Emitted when a render cycle completes.
#[derive(Clone, Copy, Debug)]
pub struct RenderDoneEvent {
    /// Entries consumed during the cycle.
    pub updated: usize,
    /// Lowest priority that consumed an entry.
    pub priority: Option<Priority>,
    /// Number of batches the cycle took.
    pub batches: usize,
}

/// Emitted when a view is mounted, unmounted, or removed.
#[derive(Clone, Copy, Debug)]
pub struct ViewEvent {
    /// The affected view.
    pub view: ViewId,
    /// What happened.
    pub change: ViewChange,
}

/// Emitted when a view returns leftover bits.
#[derive(Clone, Copy, Debug)]
pub struct PostponeEvent {
    /// The postponed view.
    pub view: ViewId,
    /// Bits the view could not apply yet.
    pub leftover: Flags,
    /// Whether the postponement hook resolved it within the same batch.
    pub resolved: bool,
}

/// Emitted on freeze and unfreeze.
#[derive(Clone, Copy, Debug)]
pub struct FreezeEvent {
    /// New frozen state.
    pub frozen: bool,
    /// Whether a freeze key was involved.
    pub keyed: bool,
}

/// Emitted after an exact z-order pass.
#[derive(Clone, Copy, Debug)]
pub struct SortEvent {
    /// Mounted views that had to move.
    pub moved: usize,
    /// Mounted views considered.
    pub total: usize,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the scheduler.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a frame tick is processed.
    fn on_frame(&mut self, e: &FrameEvent) {
        _ = e;
    }

    /// Called after each batch.
    fn on_batch(&mut self, e: &BatchEvent) {
        _ = e;
    }

    /// Called when a render cycle starts.
    fn on_render_begin(&mut self) {}

    /// Called when a render cycle completes.
    fn on_render_done(&mut self, e: &RenderDoneEvent) {
        _ = e;
    }

    /// Called when a view is mounted, unmounted, or removed.
    fn on_view(&mut self, e: &ViewEvent) {
        _ = e;
    }

    /// Called when a view returns leftover bits.
    fn on_postpone(&mut self, e: &PostponeEvent) {
        _ = e;
    }

    /// Called on freeze and unfreeze.
    fn on_freeze(&mut self, e: &FreezeEvent) {
        _ = e;
    }

    /// Called after an exact z-order pass.
    fn on_sort(&mut self, e: &SortEvent) {
        _ = e;
    }

    /// Called when an auto-freezing scheduler goes idle.
    fn on_idle(&mut self) {}
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer around an optional sink.
    #[inline]
    #[must_use]
    pub fn new(sink: Option<&'a mut dyn TraceSink>) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self::new(None)
    }

    /// Emits a [`FrameEvent`].
    #[inline]
    pub fn frame(&mut self, e: &FrameEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_frame(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`BatchEvent`].
    #[inline]
    pub fn batch(&mut self, e: &BatchEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_batch(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits the start of a render cycle.
    #[inline]
    pub fn render_begin(&mut self) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_render_begin();
        }
    }

    /// Emits a [`RenderDoneEvent`].
    #[inline]
    pub fn render_done(&mut self, e: &RenderDoneEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_render_done(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`ViewEvent`].
    #[inline]
    pub fn view(&mut self, e: &ViewEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_view(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PostponeEvent`].
    #[inline]
    pub fn postpone(&mut self, e: &PostponeEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_postpone(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FreezeEvent`].
    #[inline]
    pub fn freeze(&mut self, e: &FreezeEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_freeze(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`SortEvent`].
    #[inline]
    pub fn sort(&mut self, e: &SortEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_sort(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits the idle notification.
    #[inline]
    pub fn idle(&mut self) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_idle();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counting {
        batches: usize,
        idles: usize,
    }

    impl TraceSink for Counting {
        fn on_batch(&mut self, e: &BatchEvent) {
            self.batches += e.updated;
        }

        fn on_idle(&mut self) {
            self.idles += 1;
        }
    }

    fn sample_batch() -> BatchEvent {
        BatchEvent {
            priority: Some(0),
            updated: 3,
            postponed: 0,
            mounted: 1,
            unmounted: 0,
            empty: true,
        }
    }

    #[test]
    fn noop_sink_accepts_everything() {
        let mut sink = NoopSink;
        let mut tracer = Tracer::new(Some(&mut sink));
        tracer.batch(&sample_batch());
        tracer.render_begin();
        tracer.idle();
    }

    #[test]
    fn tracer_none_is_silent() {
        let mut tracer = Tracer::none();
        tracer.batch(&sample_batch());
        tracer.sort(&SortEvent { moved: 0, total: 0 });
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_when_enabled() {
        let mut sink = Counting::default();
        {
            let mut tracer = Tracer::new(Some(&mut sink));
            tracer.batch(&sample_batch());
            tracer.idle();
        }
        assert_eq!(sink.batches, 3);
        assert_eq!(sink.idles, 1);
    }

    #[cfg(not(feature = "trace"))]
    #[test]
    fn tracer_compiles_out_when_disabled() {
        let mut sink = Counting::default();
        {
            let mut tracer = Tracer::new(Some(&mut sink));
            tracer.batch(&sample_batch());
            tracer.idle();
        }
        assert_eq!(sink.batches, 0, "events are dropped without the feature");
        assert_eq!(sink.idles, 0);
    }
}
