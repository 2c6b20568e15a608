// Copyright 2026 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording a real paper session end to end.

use vellum_core::graph::{Attributes, CellKind, Value, attr};
use vellum_core::paper::{Paper, PaperOptions};
use vellum_core::scheduler::{SchedulerOptions, Sorting};
use vellum_core::tick::ManualTicks;
use vellum_core::time::Timebase;
use vellum_core::trace::{FreezeEvent, SortEvent, ViewChange};
use vellum_debug::chrome;
use vellum_debug::recorder::{RecordedEvent, RecorderSink, decode};
use vellum_debug::shared::SharedSink;

fn recorded_paper() -> (Paper<ManualTicks>, SharedSink<RecorderSink>) {
    let recorder = SharedSink::new(RecorderSink::new());
    let mut paper = Paper::new(PaperOptions::sync(), ManualTicks::new());
    paper.set_trace_sink(recorder.boxed());
    (paper, recorder)
}

#[test]
fn unfreeze_flush_is_recorded_in_order() {
    let (mut paper, recorder) = recorded_paper();
    paper.freeze(None);
    paper.edit(|g| {
        g.add_element("a", Attributes::new()).unwrap();
        g.add_element("b", Attributes::new()).unwrap();
    });
    paper.unfreeze(None).unwrap();

    let events: Vec<_> = decode(recorder.borrow().as_bytes())
        .map(|r| r.event)
        .collect();

    assert!(matches!(
        events.first(),
        Some(RecordedEvent::Freeze(FreezeEvent { frozen: true, .. }))
    ));
    assert!(matches!(
        events.last(),
        Some(RecordedEvent::Freeze(FreezeEvent { frozen: false, .. }))
    ));

    let begin = events
        .iter()
        .position(|e| matches!(e, RecordedEvent::RenderBegin))
        .expect("render cycle started");
    let done = events
        .iter()
        .position(|e| matches!(e, RecordedEvent::RenderDone(_)))
        .expect("render cycle finished");
    let mounts: Vec<_> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| {
            matches!(
                e,
                RecordedEvent::View {
                    change: ViewChange::Mount { initial: true },
                    ..
                }
            )
        })
        .map(|(i, _)| i)
        .collect();
    assert_eq!(mounts.len(), 2);
    assert!(mounts.iter().all(|&i| begin < i && i < done));
}

#[test]
fn recorded_session_exports_to_chrome_json() {
    let (mut paper, recorder) = recorded_paper();
    paper.edit(|g| {
        g.add_element("a", Attributes::new()).unwrap();
    });
    let cell = paper.graph().find("a").unwrap();
    let view = paper.view_id(cell).unwrap();
    paper.remove_all();

    let recorded = recorder.borrow();
    let removed = decode(recorded.as_bytes()).any(|r| {
        matches!(
            r.event,
            RecordedEvent::View {
                view: v,
                change: ViewChange::Remove,
            } if v.is(view)
        )
    });
    assert!(removed);

    let mut out = Vec::new();
    chrome::export(recorded.as_bytes(), Timebase::MICROS, &mut out).unwrap();
    let parsed: Vec<serde_json::Value> = serde_json::from_slice(&out).unwrap();
    assert_eq!(parsed.len(), decode(recorded.as_bytes()).count());
}

#[test]
fn bulk_add_sorts_once_when_the_batch_closes() {
    let recorder = SharedSink::new(RecorderSink::new());
    let options = PaperOptions::new(SchedulerOptions::sync().with_sorting(Sorting::Exact));
    let mut paper = Paper::new(options, ManualTicks::new());
    paper.set_trace_sink(recorder.boxed());

    let stacked = |z: f64| {
        let mut attrs = Attributes::new();
        attrs.insert(attr::Z.into(), Value::Number(z));
        attrs
    };
    paper
        .edit(|g| {
            g.add_cells([
                (CellKind::Element, "a", stacked(3.0)),
                (CellKind::Element, "b", stacked(2.0)),
                (CellKind::Element, "c", stacked(1.0)),
            ])
        })
        .unwrap();

    let sorts: Vec<SortEvent> = decode(recorder.borrow().as_bytes())
        .filter_map(|r| match r.event {
            RecordedEvent::Sort(e) => Some(e),
            _ => None,
        })
        .collect();
    assert_eq!(sorts.len(), 1);
    assert_eq!((sorts[0].moved, sorts[0].total), (2, 3));
}
