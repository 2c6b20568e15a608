// Copyright 2026 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][spec] JSON to the given writer.
//! Render cycles become duration slices; everything else is an instant event.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use vellum_core::time::Timebase;
use vellum_core::trace::ViewChange;

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
///
/// Timestamps are converted to microseconds using the provided [`Timebase`].
pub fn export(bytes: &[u8], timebase: Timebase, writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();

    for record in decode(bytes) {
        let ts = ticks_to_us(record.at.ticks(), timebase);
        let event = match record.event {
            RecordedEvent::Frame(e) => json!({
                "ph": "i",
                "name": "Frame",
                "cat": "Scheduler",
                "ts": ts,
                "pid": 0,
                "tid": 0,
                "s": "g",
                "args": {
                    "frame_index": e.frame_index,
                    "interval_us": e.interval.map(|d| ticks_to_us(d.ticks(), timebase)),
                }
            }),
            RecordedEvent::Batch(e) => json!({
                "ph": "i",
                "name": "Batch",
                "cat": "Scheduler",
                "ts": ts,
                "pid": 0,
                "tid": 0,
                "s": "t",
                "args": {
                    "priority": e.priority,
                    "updated": e.updated,
                    "postponed": e.postponed,
                    "mounted": e.mounted,
                    "unmounted": e.unmounted,
                    "empty": e.empty,
                }
            }),
            RecordedEvent::RenderBegin => json!({
                "ph": "B",
                "name": "Render",
                "cat": "Render",
                "ts": ts,
                "pid": 0,
                "tid": 0,
            }),
            RecordedEvent::RenderDone(e) => json!({
                "ph": "E",
                "name": "Render",
                "cat": "Render",
                "ts": ts,
                "pid": 0,
                "tid": 0,
                "args": {
                    "updated": e.updated,
                    "priority": e.priority,
                    "batches": e.batches,
                }
            }),
            RecordedEvent::View { view, change } => {
                let (name, initial) = match change {
                    ViewChange::Mount { initial } => ("Mount", initial),
                    ViewChange::Unmount => ("Unmount", false),
                    ViewChange::Remove => ("Remove", false),
                };
                json!({
                    "ph": "i",
                    "name": name,
                    "cat": "View",
                    "ts": ts,
                    "pid": 0,
                    "tid": 1,
                    "s": "t",
                    "args": {
                        "view": view.index,
                        "generation": view.generation,
                        "initial": initial,
                    }
                })
            }
            RecordedEvent::Postpone {
                view,
                leftover,
                resolved,
            } => json!({
                "ph": "i",
                "name": "Postpone",
                "cat": "View",
                "ts": ts,
                "pid": 0,
                "tid": 1,
                "s": "t",
                "args": {
                    "view": view.index,
                    "generation": view.generation,
                    "leftover": format!("{leftover:#x}"),
                    "resolved": resolved,
                }
            }),
            RecordedEvent::Freeze(e) => {
                let name = if e.frozen { "Freeze" } else { "Unfreeze" };
                json!({
                    "ph": "i",
                    "name": name,
                    "cat": "Scheduler",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "keyed": e.keyed,
                    }
                })
            }
            RecordedEvent::Sort(e) => json!({
                "ph": "i",
                "name": "Sort",
                "cat": "Render",
                "ts": ts,
                "pid": 0,
                "tid": 0,
                "s": "t",
                "args": {
                    "moved": e.moved,
                    "total": e.total,
                }
            }),
            RecordedEvent::Idle => json!({
                "ph": "i",
                "name": "Idle",
                "cat": "Scheduler",
                "ts": ts,
                "pid": 0,
                "tid": 0,
                "s": "g",
            }),
        };
        events.push(event);
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn ticks_to_us(ticks: u64, timebase: Timebase) -> f64 {
    timebase.ticks_to_nanos(ticks) as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecorderSink;
    use vellum_core::time::HostTime;
    use vellum_core::trace::{BatchEvent, FrameEvent, RenderDoneEvent, TraceSink};

    #[test]
    fn export_produces_valid_json() {
        let mut rec = RecorderSink::new();
        rec.on_frame(&FrameEvent {
            frame_index: 0,
            now: HostTime(1_000),
            interval: None,
        });
        rec.on_render_begin();
        rec.on_batch(&BatchEvent {
            priority: Some(0),
            updated: 2,
            postponed: 0,
            mounted: 2,
            unmounted: 0,
            empty: true,
        });
        rec.on_render_done(&RenderDoneEvent {
            updated: 2,
            priority: Some(0),
            batches: 1,
        });

        let mut out = Vec::new();
        export(rec.as_bytes(), Timebase::MICROS, &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();

        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert_eq!(parsed.len(), 4);

        assert_eq!(parsed[0]["ph"], "i");
        assert_eq!(parsed[0]["name"], "Frame");
        assert_eq!(parsed[0]["ts"], 1_000.0);

        // The render slice brackets the batch.
        assert_eq!(parsed[1]["ph"], "B");
        assert_eq!(parsed[2]["name"], "Batch");
        assert_eq!(parsed[2]["args"]["updated"], 2);
        assert_eq!(parsed[3]["ph"], "E");
        assert_eq!(parsed[3]["args"]["batches"], 1);
    }

    #[test]
    fn export_empty_recording() {
        let mut out = Vec::new();
        export(&[], Timebase::NANOS, &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert!(parsed.is_empty());
    }
}
