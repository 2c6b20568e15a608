// Copyright 2026 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame tick sources.
//!
//! In frame-paced mode the scheduler never loops on its own. It asks a
//! [`TickSource`] for the next frame opportunity and does one bounded slice of
//! work when the host delivers the matching [`FrameTick`] back to it.
//!
//! Production hosts use a platform source (for example the
//! `requestAnimationFrame` source in `vellum_backend_web`). Tests use
//! [`ManualTicks`], which only fires when asked to.

use core::fmt;

use crate::time::HostTime;

/// Identifies one requested frame.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickId(pub u64);

impl fmt::Debug for TickId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TickId({})", self.0)
    }
}

/// A frame opportunity delivered by a [`TickSource`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameTick {
    /// The request this tick answers.
    pub id: TickId,
    /// Monotonic frame counter of the source.
    pub frame_index: u64,
    /// Time at which the tick was generated.
    pub now: HostTime,
}

/// Produces frame opportunities for frame-paced scheduling.
pub trait TickSource {
    /// Requests one future frame and returns its id.
    fn request_tick(&mut self) -> TickId;

    /// Cancels a previously requested frame.
    ///
    /// Cancelling a tick that already fired or was already cancelled is a
    /// no-op.
    fn cancel_tick(&mut self, id: TickId);
}

/// A tick source that fires only when [`fire`](Self::fire) is called.
///
/// At most one frame is outstanding at a time, matching how
/// `requestAnimationFrame`-style loops are driven.
#[derive(Clone, Debug, Default)]
pub struct ManualTicks {
    next_id: u64,
    pending: Option<TickId>,
    frame_index: u64,
    requested: u64,
    cancelled: u64,
}

impl ManualTicks {
    /// Creates an idle tick source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers the outstanding frame, if any.
    pub fn fire(&mut self, now: HostTime) -> Option<FrameTick> {
        let id = self.pending.take()?;
        let frame_index = self.frame_index;
        self.frame_index += 1;
        Some(FrameTick {
            id,
            frame_index,
            now,
        })
    }

    /// Returns whether a frame is outstanding.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Total number of frames requested so far.
    #[must_use]
    pub const fn requested(&self) -> u64 {
        self.requested
    }

    /// Total number of outstanding frames that were cancelled.
    #[must_use]
    pub const fn cancelled(&self) -> u64 {
        self.cancelled
    }
}

impl TickSource for ManualTicks {
    fn request_tick(&mut self) -> TickId {
        let id = TickId(self.next_id);
        self.next_id += 1;
        self.requested += 1;
        self.pending = Some(id);
        id
    }

    fn cancel_tick(&mut self, id: TickId) {
        if self.pending == Some(id) {
            self.pending = None;
            self.cancelled += 1;
        }
    }
}
