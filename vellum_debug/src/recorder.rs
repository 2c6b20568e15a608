// Copyright 2026 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as little-endian records, each prefixed with a tag byte and a
//! timestamp. [`decode`] reads them back as an iterator of [`Record`].
//!
//! Scheduler events carry no timestamps of their own. A recorder built with
//! [`RecorderSink::with_clock`] stamps each record with the clock's reading;
//! otherwise records are stamped with the time of the most recent frame tick.

use vellum_core::flags::Flags;
use vellum_core::scheduler::Priority;
use vellum_core::time::{Duration, HostTime};
use vellum_core::trace::{
    BatchEvent, FrameEvent, FreezeEvent, PostponeEvent, RenderDoneEvent, SortEvent, TraceSink,
    ViewChange, ViewEvent,
};
use vellum_core::view::ViewId;

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_FRAME: u8 = 1;
const TAG_BATCH: u8 = 2;
const TAG_RENDER_BEGIN: u8 = 3;
const TAG_RENDER_DONE: u8 = 4;
const TAG_VIEW: u8 = 5;
const TAG_POSTPONE: u8 = 6;
const TAG_FREEZE: u8 = 7;
const TAG_SORT: u8 = 8;
const TAG_IDLE: u8 = 9;

const CHANGE_MOUNT: u8 = 0;
const CHANGE_MOUNT_INITIAL: u8 = 1;
const CHANGE_UNMOUNT: u8 = 2;
const CHANGE_REMOVE: u8 = 3;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
    clock: Option<fn() -> HostTime>,
    last_frame: HostTime,
}

impl RecorderSink {
    /// Creates an empty recorder that stamps records with frame times.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty recorder that stamps records with `clock`.
    #[must_use]
    pub fn with_clock(clock: fn() -> HostTime) -> Self {
        Self {
            clock: Some(clock),
            ..Self::default()
        }
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Discards everything recorded so far.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    // -- encoding helpers --------------------------------------------------

    fn begin(&mut self, tag: u8) {
        let at = self.clock.map_or(self.last_frame, |clock| clock());
        self.write_u8(tag);
        self.write_u64(at.ticks());
    }

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "counts capped at u32::MAX for recording"
    )]
    fn write_count(&mut self, v: usize) {
        self.write_u32(v.min(u32::MAX as usize) as u32);
    }

    fn write_option_u64(&mut self, v: Option<u64>) {
        match v {
            Some(val) => {
                self.write_u8(1);
                self.write_u64(val);
            }
            None => {
                self.write_u8(0);
                self.write_u64(0);
            }
        }
    }

    fn write_priority(&mut self, v: Option<Priority>) {
        self.write_option_u64(v.map(u64::from));
    }

    fn write_view(&mut self, view: ViewId) {
        self.write_u32(view.index());
        self.write_u32(view.generation());
    }
}

impl TraceSink for RecorderSink {
    fn on_frame(&mut self, e: &FrameEvent) {
        self.last_frame = e.now;
        self.begin(TAG_FRAME);
        self.write_u64(e.frame_index);
        self.write_u64(e.now.ticks());
        self.write_option_u64(e.interval.map(Duration::ticks));
    }

    fn on_batch(&mut self, e: &BatchEvent) {
        self.begin(TAG_BATCH);
        self.write_priority(e.priority);
        self.write_count(e.updated);
        self.write_count(e.postponed);
        self.write_count(e.mounted);
        self.write_count(e.unmounted);
        self.write_bool(e.empty);
    }

    fn on_render_begin(&mut self) {
        self.begin(TAG_RENDER_BEGIN);
    }

    fn on_render_done(&mut self, e: &RenderDoneEvent) {
        self.begin(TAG_RENDER_DONE);
        self.write_count(e.updated);
        self.write_priority(e.priority);
        self.write_count(e.batches);
    }

    fn on_view(&mut self, e: &ViewEvent) {
        self.begin(TAG_VIEW);
        self.write_view(e.view);
        self.write_u8(match e.change {
            ViewChange::Mount { initial: false } => CHANGE_MOUNT,
            ViewChange::Mount { initial: true } => CHANGE_MOUNT_INITIAL,
            ViewChange::Unmount => CHANGE_UNMOUNT,
            ViewChange::Remove => CHANGE_REMOVE,
        });
    }

    fn on_postpone(&mut self, e: &PostponeEvent) {
        self.begin(TAG_POSTPONE);
        self.write_view(e.view);
        self.write_u32(e.leftover);
        self.write_bool(e.resolved);
    }

    fn on_freeze(&mut self, e: &FreezeEvent) {
        self.begin(TAG_FREEZE);
        self.write_bool(e.frozen);
        self.write_bool(e.keyed);
    }

    fn on_sort(&mut self, e: &SortEvent) {
        self.begin(TAG_SORT);
        self.write_count(e.moved);
        self.write_count(e.total);
    }

    fn on_idle(&mut self) {
        self.begin(TAG_IDLE);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A view handle as it appears in a recording.
///
/// Recordings outlive the registry that issued the handles, so only the raw
/// parts are kept.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RecordedView {
    /// Slot index.
    pub index: u32,
    /// Generation counter.
    pub generation: u32,
}

impl RecordedView {
    /// Returns whether this is the recording of `view`.
    #[must_use]
    pub fn is(self, view: ViewId) -> bool {
        self.index == view.index() && self.generation == view.generation()
    }
}

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`FrameEvent`].
    Frame(FrameEvent),
    /// A [`BatchEvent`].
    Batch(BatchEvent),
    /// The start of a render cycle.
    RenderBegin,
    /// A [`RenderDoneEvent`].
    RenderDone(RenderDoneEvent),
    /// A [`ViewEvent`].
    View {
        /// The affected view.
        view: RecordedView,
        /// What happened.
        change: ViewChange,
    },
    /// A [`PostponeEvent`].
    Postpone {
        /// The postponed view.
        view: RecordedView,
        /// Bits the view could not apply.
        leftover: Flags,
        /// Whether the postponement hook resolved it.
        resolved: bool,
    },
    /// A [`FreezeEvent`].
    Freeze(FreezeEvent),
    /// A [`SortEvent`].
    Sort(SortEvent),
    /// The scheduler went idle.
    Idle,
}

/// One decoded record: an event and the time it was stamped with.
#[derive(Clone, Debug)]
pub struct Record {
    /// Timestamp of the record.
    pub at: HostTime,
    /// The event.
    pub event: RecordedEvent,
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`Record`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded records.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?;
        self.pos += N;
        bytes.try_into().ok()
    }

    fn read_u8(&mut self) -> Option<u8> {
        Some(self.take::<1>()?[0])
    }

    fn read_bool(&mut self) -> Option<bool> {
        Some(self.read_u8()? != 0)
    }

    fn read_u32(&mut self) -> Option<u32> {
        Some(u32::from_le_bytes(self.take()?))
    }

    fn read_u64(&mut self) -> Option<u64> {
        Some(u64::from_le_bytes(self.take()?))
    }

    fn read_count(&mut self) -> Option<usize> {
        usize::try_from(self.read_u32()?).ok()
    }

    fn read_option_u64(&mut self) -> Option<Option<u64>> {
        let present = self.read_u8()?;
        let val = self.read_u64()?;
        Some((present != 0).then_some(val))
    }

    fn read_priority(&mut self) -> Option<Option<Priority>> {
        match self.read_option_u64()? {
            Some(p) => Some(Some(Priority::try_from(p).ok()?)),
            None => Some(None),
        }
    }

    fn read_view(&mut self) -> Option<RecordedView> {
        Some(RecordedView {
            index: self.read_u32()?,
            generation: self.read_u32()?,
        })
    }

    fn decode_frame(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Frame(FrameEvent {
            frame_index: self.read_u64()?,
            now: HostTime(self.read_u64()?),
            interval: self.read_option_u64()?.map(Duration),
        }))
    }

    fn decode_batch(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Batch(BatchEvent {
            priority: self.read_priority()?,
            updated: self.read_count()?,
            postponed: self.read_count()?,
            mounted: self.read_count()?,
            unmounted: self.read_count()?,
            empty: self.read_bool()?,
        }))
    }

    fn decode_render_done(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::RenderDone(RenderDoneEvent {
            updated: self.read_count()?,
            priority: self.read_priority()?,
            batches: self.read_count()?,
        }))
    }

    fn decode_view(&mut self) -> Option<RecordedEvent> {
        let view = self.read_view()?;
        let change = match self.read_u8()? {
            CHANGE_MOUNT => ViewChange::Mount { initial: false },
            CHANGE_MOUNT_INITIAL => ViewChange::Mount { initial: true },
            CHANGE_UNMOUNT => ViewChange::Unmount,
            CHANGE_REMOVE => ViewChange::Remove,
            _ => return None,
        };
        Some(RecordedEvent::View { view, change })
    }

    fn decode_postpone(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Postpone {
            view: self.read_view()?,
            leftover: self.read_u32()?,
            resolved: self.read_bool()?,
        })
    }

    fn decode_freeze(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Freeze(FreezeEvent {
            frozen: self.read_bool()?,
            keyed: self.read_bool()?,
        }))
    }

    fn decode_sort(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Sort(SortEvent {
            moved: self.read_count()?,
            total: self.read_count()?,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = Record;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        let at = HostTime(self.read_u64()?);
        let event = match tag {
            TAG_FRAME => self.decode_frame(),
            TAG_BATCH => self.decode_batch(),
            TAG_RENDER_BEGIN => Some(RecordedEvent::RenderBegin),
            TAG_RENDER_DONE => self.decode_render_done(),
            TAG_VIEW => self.decode_view(),
            TAG_POSTPONE => self.decode_postpone(),
            TAG_FREEZE => self.decode_freeze(),
            TAG_SORT => self.decode_sort(),
            TAG_IDLE => Some(RecordedEvent::Idle),
            _ => None, // unknown tag → stop iteration
        }?;
        Some(Record { at, event })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
