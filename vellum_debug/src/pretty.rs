// Copyright 2026 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Frame
//! timestamps are converted to microseconds using a [`Timebase`].

use std::io::Write;

use vellum_core::scheduler::Priority;
use vellum_core::time::{HostTime, Timebase};
use vellum_core::trace::{
    BatchEvent, FrameEvent, FreezeEvent, PostponeEvent, RenderDoneEvent, SortEvent, TraceSink,
    ViewChange, ViewEvent,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    timebase: Timebase,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("timebase", &self.timebase)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr(timebase: Timebase) -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
            timebase,
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>, timebase: Timebase) -> Self {
        Self { writer, timebase }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W, timebase: Timebase) -> Self {
        Self { writer, timebase }
    }

    /// Returns the destination.
    #[must_use]
    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Consumes the sink and returns the destination.
    #[must_use]
    pub fn into_writer(self) -> W {
        self.writer
    }

    fn ticks_to_us(&self, ticks: u64) -> f64 {
        self.timebase.ticks_to_nanos(ticks) as f64 / 1000.0
    }

    fn host_us(&self, t: HostTime) -> f64 {
        self.ticks_to_us(t.ticks())
    }
}

struct Prio(Option<Priority>);

impl std::fmt::Display for Prio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(p) => write!(f, "{p}"),
            None => f.write_str("-"),
        }
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_frame(&mut self, e: &FrameEvent) {
        let interval = match e.interval {
            Some(d) => format!("{:.1}µs", self.ticks_to_us(d.ticks())),
            None => "-".into(),
        };
        let _ = writeln!(
            self.writer,
            "[frame] frame={} now={:.1}µs interval={interval}",
            e.frame_index,
            self.host_us(e.now),
        );
    }

    fn on_batch(&mut self, e: &BatchEvent) {
        let _ = writeln!(
            self.writer,
            "[batch] prio={} updated={} postponed={} mounted={} unmounted={} empty={}",
            Prio(e.priority),
            e.updated,
            e.postponed,
            e.mounted,
            e.unmounted,
            e.empty,
        );
    }

    fn on_render_begin(&mut self) {
        let _ = writeln!(self.writer, "[render:begin]");
    }

    fn on_render_done(&mut self, e: &RenderDoneEvent) {
        let _ = writeln!(
            self.writer,
            "[render:done] updated={} prio={} batches={}",
            e.updated,
            Prio(e.priority),
            e.batches,
        );
    }

    fn on_view(&mut self, e: &ViewEvent) {
        let change = match e.change {
            ViewChange::Mount { initial: true } => "mount (initial)",
            ViewChange::Mount { initial: false } => "mount",
            ViewChange::Unmount => "unmount",
            ViewChange::Remove => "remove",
        };
        let _ = writeln!(self.writer, "[view] {:?} {change}", e.view);
    }

    fn on_postpone(&mut self, e: &PostponeEvent) {
        let state = if e.resolved { "resolved" } else { "deferred" };
        let _ = writeln!(
            self.writer,
            "[postpone] {:?} leftover={:#x} {state}",
            e.view, e.leftover,
        );
    }

    fn on_freeze(&mut self, e: &FreezeEvent) {
        let what = if e.frozen { "freeze" } else { "unfreeze" };
        let keyed = if e.keyed { " keyed" } else { "" };
        let _ = writeln!(self.writer, "[{what}]{keyed}");
    }

    fn on_sort(&mut self, e: &SortEvent) {
        let _ = writeln!(self.writer, "[sort] moved={}/{}", e.moved, e.total);
    }

    fn on_idle(&mut self) {
        let _ = writeln!(self.writer, "[idle]");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_core::time::Duration;

    fn output(sink: PrettyPrintSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_writer()).unwrap()
    }

    #[test]
    fn pretty_print_frame() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new(), Timebase::MICROS);
        sink.on_frame(&FrameEvent {
            frame_index: 3,
            now: HostTime(48_000),
            interval: Some(Duration(16_000)),
        });
        let output = output(sink);
        assert!(output.contains("[frame]"), "got: {output}");
        assert!(output.contains("frame=3"), "got: {output}");
        assert!(output.contains("interval=16000.0µs"), "got: {output}");
    }

    #[test]
    fn pretty_print_batch_without_priority() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new(), Timebase::NANOS);
        sink.on_batch(&BatchEvent {
            priority: None,
            updated: 0,
            postponed: 0,
            mounted: 0,
            unmounted: 0,
            empty: true,
        });
        sink.on_idle();
        let output = output(sink);
        assert_eq!(
            output,
            "[batch] prio=- updated=0 postponed=0 mounted=0 unmounted=0 empty=true\n[idle]\n"
        );
    }

    #[test]
    fn pretty_print_freeze() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new(), Timebase::NANOS);
        sink.on_freeze(&FreezeEvent {
            frozen: true,
            keyed: true,
        });
        sink.on_freeze(&FreezeEvent {
            frozen: false,
            keyed: false,
        });
        assert_eq!(output(sink), "[freeze] keyed\n[unfreeze]\n");
    }
}
