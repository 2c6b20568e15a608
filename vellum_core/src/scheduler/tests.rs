// Copyright 2026 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::rc::Rc;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::RefCell;

use super::*;
use crate::flags::{FLAG_INSERT, FLAG_REMOVE, Flags};
use crate::tick::{FrameTick, ManualTicks, TickId};
use crate::time::HostTime;
use crate::view::{UpdateCx, View, ViewId};
use crate::viewport::Viewport;

const NOTIFIED: Flags = 1 << 8;

#[derive(Debug, Default)]
struct TestView {
    tag: u32,
    priority: Priority,
    z: f64,
    hidden: bool,
    waits_for: Option<ViewId>,
    notify: Option<ViewId>,
    log: Option<Rc<RefCell<Vec<u32>>>>,
    applied: Flags,
    confirms: u32,
    mounts: u32,
    unmounts: u32,
}

impl TestView {
    fn tagged(tag: u32) -> Self {
        Self {
            tag,
            ..Self::default()
        }
    }
}

impl View for TestView {
    fn update_priority(&self) -> Priority {
        self.priority
    }

    fn z(&self) -> f64 {
        self.z
    }

    fn confirm_update(&mut self, flags: Flags, cx: &mut UpdateCx<'_, Self>) -> Flags {
        self.confirms += 1;
        if let Some(log) = &self.log {
            log.borrow_mut().push(self.tag);
        }
        if let Some(dep) = self.waits_for
            && !cx.is_mounted(dep)
        {
            return flags;
        }
        self.applied |= flags;
        if let Some(target) = self.notify {
            cx.request_update(target, NOTIFIED, None);
        }
        0
    }

    fn on_mount(&mut self, _initial: bool) {
        self.mounts += 1;
    }

    fn unmount(&mut self) {
        self.unmounts += 1;
    }

    fn remove(&mut self) {}
}

type Sched = Scheduler<TestView, ManualTicks>;

fn visible_unless_hidden(view: &TestView, _was_mounted: bool) -> bool {
    !view.hidden
}

#[derive(Default)]
struct TestHooks {
    viewport: Option<fn(&TestView, bool) -> bool>,
    dump_on_postpone: Option<ViewId>,
    updates: usize,
    before: usize,
    after: Vec<RenderStats>,
    progress: Vec<Progress>,
    idle: usize,
}

impl TestHooks {
    fn culling() -> Self {
        Self {
            viewport: Some(visible_unless_hidden),
            ..Self::default()
        }
    }
}

impl SchedulerHooks<TestView, ManualTicks> for TestHooks {
    fn viewport(&mut self) -> Option<&mut dyn Viewport<TestView>> {
        self.viewport
            .as_mut()
            .map(|f| f as &mut dyn Viewport<TestView>)
    }

    fn on_view_update(
        &mut self,
        _scheduler: &mut Sched,
        _view: ViewId,
        _flags: Flags,
        _priority: Priority,
        _opt: &UpdateOptions,
    ) {
        self.updates += 1;
    }

    fn on_view_postponed(
        &mut self,
        scheduler: &mut Sched,
        view: ViewId,
        _leftover: Flags,
        opt: &UpdateOptions,
    ) -> bool {
        let Some(target) = self.dump_on_postpone else {
            return false;
        };
        scheduler.dump_view(self, target, opt);
        scheduler.dump_view(self, view, opt) == 0
    }

    fn before_render(&mut self, _opt: &UpdateOptions) {
        self.before += 1;
    }

    fn after_render(&mut self, stats: &RenderStats, _opt: &UpdateOptions) {
        self.after.push(*stats);
    }

    fn on_progress(&mut self, progress: &Progress) {
        self.progress.push(*progress);
    }

    fn on_idle(&mut self) {
        self.idle += 1;
    }
}

fn sync() -> Sched {
    Scheduler::new(SchedulerOptions::sync(), ManualTicks::new())
}

fn frozen() -> Sched {
    Scheduler::new(SchedulerOptions::sync().frozen(), ManualTicks::new())
}

fn fire(s: &mut Sched, hooks: &mut TestHooks, now: u64) {
    let tick = s.ticks_mut().fire(HostTime(now)).expect("a frame is outstanding");
    s.on_frame(hooks, tick).expect("scheduler is live");
}

const DEFAULT: UpdateOptions = UpdateOptions::silent();

fn loud() -> UpdateOptions {
    UpdateOptions::default()
}

// -- Pending table semantics --

#[test]
fn scheduling_merges_bits_and_ignores_repeats() {
    let mut s = frozen();
    let mut hooks = TestHooks::default();
    let v = s.add_view(TestView::default());

    s.schedule_view_update(&mut hooks, v, 0b01, 0, &DEFAULT);
    s.schedule_view_update(&mut hooks, v, 0b10, 0, &DEFAULT);
    assert_eq!(s.pending_flags(v, 0), 0b11);
    assert_eq!(hooks.updates, 2);

    s.schedule_view_update(&mut hooks, v, 0b01, 0, &DEFAULT);
    assert_eq!(s.pending_flags(v, 0), 0b11);
    assert_eq!(hooks.updates, 2, "a subset of pending bits is a no-op");
}

#[test]
fn insert_and_remove_cancel_each_other() {
    let mut s = frozen();
    let mut hooks = TestHooks::default();
    let v = s.add_view(TestView::default());

    s.schedule_view_update(&mut hooks, v, FLAG_INSERT | 0b1, 0, &DEFAULT);
    s.schedule_view_update(&mut hooks, v, FLAG_REMOVE, 0, &DEFAULT);
    assert_eq!(s.pending_flags(v, 0), FLAG_REMOVE | 0b1);

    s.schedule_view_update(&mut hooks, v, FLAG_INSERT, 0, &DEFAULT);
    assert_eq!(s.pending_flags(v, 0), FLAG_INSERT | 0b1);
}

#[test]
fn higher_priority_absorbs_lower_entries() {
    let mut s = frozen();
    let mut hooks = TestHooks::default();
    let a = s.add_view(TestView::default());
    let b = s.add_view(TestView::default());

    s.schedule_view_update(&mut hooks, a, 0b01, 0, &DEFAULT);
    s.schedule_view_update(&mut hooks, a, 0b10, 2, &DEFAULT);
    assert_eq!(s.pending_flags(a, 0), 0);
    assert_eq!(s.pending_flags(a, 2), 0b11);

    s.schedule_view_update(&mut hooks, b, 0b01, 0, &DEFAULT);
    s.schedule_view_update(&mut hooks, b, 0b01, 1, &DEFAULT);
    assert_eq!(s.pending_flags(b, 0), 0);
    assert_eq!(
        s.pending_flags(b, 1),
        0b01,
        "migrated bits survive the early return"
    );
}

#[test]
fn stale_views_are_ignored() {
    let mut s = sync();
    let mut hooks = TestHooks::default();
    let v = s.add_view(TestView::default());
    s.request_view_update(&mut hooks, v, FLAG_REMOVE, 0, &DEFAULT);
    assert!(s.view(v).is_none());

    s.schedule_view_update(&mut hooks, v, 0b1, 0, &DEFAULT);
    assert!(!s.has_scheduled_updates());
    assert_eq!(s.mounts().state(v), MountState::Unevaluated);
}

// -- Flushing --

#[test]
fn sync_flush_runs_bounded_batches() {
    let mut s = Scheduler::new(
        SchedulerOptions::sync().with_batch_size(Some(2)).frozen(),
        ManualTicks::new(),
    );
    let mut hooks = TestHooks::default();
    let ids: Vec<ViewId> = (0..5).map(|_| s.add_view(TestView::default())).collect();
    for &id in &ids {
        assert!(s.request_view_update(&mut hooks, id, 0b1, 0, &loud()).is_none());
    }

    let stats = s
        .unfreeze(&mut hooks, None, &loud())
        .expect("not torn down")
        .expect("sync mode flushes");
    assert_eq!(stats.updated, 5);
    assert_eq!(stats.batches, 3);
    assert_eq!(stats.priority, 0);
    assert_eq!(hooks.before, 1);
    assert_eq!(hooks.after, vec![stats]);
    for id in ids {
        assert_eq!(s.view(id).map(|v| v.applied), Some(0b1));
    }
}

#[test]
fn batches_walk_priorities_in_ascending_order() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut s = frozen();
    let mut hooks = TestHooks::default();
    let add = |s: &mut Sched, tag, priority| {
        s.add_view(TestView {
            priority,
            log: Some(log.clone()),
            ..TestView::tagged(tag)
        })
    };
    let late = add(&mut s, 0, 2);
    let first = add(&mut s, 1, 0);
    let second = add(&mut s, 2, 0);
    s.schedule_view_update(&mut hooks, late, 0b1, 2, &DEFAULT);
    s.schedule_view_update(&mut hooks, first, 0b1, 0, &DEFAULT);
    s.schedule_view_update(&mut hooks, second, 0b1, 0, &DEFAULT);

    s.unfreeze(&mut hooks, None, &DEFAULT).expect("not torn down");
    assert_eq!(*log.borrow(), [1, 2, 0]);
}

#[test]
fn requests_made_during_an_update_run_in_the_same_flush() {
    let mut s = frozen();
    let mut hooks = TestHooks::default();
    let b = s.add_view(TestView::default());
    let a = s.add_view(TestView {
        notify: Some(b),
        ..TestView::default()
    });
    s.schedule_view_update(&mut hooks, a, 0b1, 0, &DEFAULT);

    let stats = s
        .unfreeze(&mut hooks, None, &DEFAULT)
        .expect("not torn down")
        .expect("sync mode flushes");
    assert_eq!(stats.updated, 2);
    assert_eq!(s.view(b).map(|v| v.applied), Some(NOTIFIED));
}

#[test]
fn dependent_view_waits_for_its_dependency_to_mount() {
    let mut s = frozen();
    let mut hooks = TestHooks::culling();
    let end = s.add_view(TestView {
        hidden: true,
        ..TestView::default()
    });
    let link = s.add_view(TestView {
        priority: 1,
        waits_for: Some(end),
        ..TestView::default()
    });
    s.schedule_view_update(&mut hooks, end, 0b1, 0, &DEFAULT);
    s.schedule_view_update(&mut hooks, link, 0b1, 1, &DEFAULT);

    let stats = s
        .unfreeze(&mut hooks, None, &DEFAULT)
        .expect("not torn down")
        .expect("sync mode flushes");
    assert_eq!(stats.updated, 0);
    assert_eq!(stats.unmounted, 1);
    assert_eq!(stats.postponed, 1);
    assert_eq!(stats.batches, 2, "stops once a batch makes no progress");
    assert_eq!(s.pending_flags(link, 1), 0b1);
    assert_eq!(s.mounts().retained(end), Some(0b1 | FLAG_INSERT));
    assert_eq!(s.view(link).map(|v| v.applied), Some(0));

    if let Some(view) = s.view_mut(end) {
        view.hidden = false;
    }
    assert_eq!(
        s.check_unmounted_views(&mut hooks, usize::MAX, Visibility::Hooks),
        1
    );
    s.update_views(&mut hooks, &DEFAULT);
    assert!(!s.has_scheduled_updates());
    assert_eq!(s.view(end).map(|v| (v.applied, v.mounts)), Some((0b1, 1)));
    assert_eq!(s.view(link).map(|v| v.applied), Some(0b1));
}

#[test]
fn postponed_view_resolved_by_hook_counts_as_updated() {
    let mut s = frozen();
    let end = s.add_view(TestView {
        priority: 2,
        ..TestView::default()
    });
    let link = s.add_view(TestView {
        priority: 1,
        waits_for: Some(end),
        ..TestView::default()
    });
    let mut hooks = TestHooks {
        dump_on_postpone: Some(end),
        ..TestHooks::default()
    };
    s.schedule_view_update(&mut hooks, end, 0b1, 2, &DEFAULT);
    s.schedule_view_update(&mut hooks, link, 0b1, 1, &DEFAULT);

    let stats = s
        .unfreeze(&mut hooks, None, &DEFAULT)
        .expect("not torn down")
        .expect("sync mode flushes");
    assert_eq!(stats.postponed, 0);
    assert_eq!(stats.updated, 1);
    assert!(!s.has_scheduled_updates());
    assert_eq!(s.view(end).map(|v| v.confirms), Some(1));
    assert_eq!(s.view(link).map(|v| (v.applied, v.confirms)), Some((0b1, 2)));
}

#[test]
fn dump_view_keeps_the_leftover_pending() {
    let mut s = frozen();
    let mut hooks = TestHooks::default();
    let end = s.add_view(TestView::default());
    let link = s.add_view(TestView {
        waits_for: Some(end),
        ..TestView::default()
    });
    s.schedule_view_update(&mut hooks, link, 0b110, 0, &DEFAULT);

    assert_eq!(s.dump_view(&mut hooks, link, &loud()), 0b110);
    assert_eq!(s.pending_flags(link, 0), 0b110);
    assert_eq!(s.view(link).map(|v| v.confirms), Some(1));

    assert!(!s.require_view(&mut hooks, ViewId { idx: 99, generation: 0 }, &DEFAULT));
}

#[test]
fn dump_view_is_not_a_render_cycle() {
    let mut s = frozen();
    let mut hooks = TestHooks::default();
    let v = s.add_view(TestView::default());
    s.schedule_view_update(&mut hooks, v, 0b1, 0, &loud());

    assert_eq!(s.dump_view(&mut hooks, v, &loud()), 0);
    assert_eq!(s.view(v).map(|v| v.applied), Some(0b1));
    assert_eq!(hooks.before, 0);
    assert!(hooks.after.is_empty());
    assert!(!s.has_scheduled_updates());
}

#[test]
fn remove_destroys_the_view() {
    let mut s = sync();
    let mut hooks = TestHooks::default();
    let v = s.add_view(TestView::default());
    s.request_view_update(&mut hooks, v, FLAG_INSERT | 0b1, 0, &DEFAULT);
    assert!(s.z_order().contains(v));

    s.request_view_update(&mut hooks, v, FLAG_REMOVE, 0, &DEFAULT);
    assert!(s.view(v).is_none());
    assert!(!s.z_order().contains(v));
    assert!(!s.is_view_mounted(v));
    assert!(s.views().is_empty());
}

// -- Freezing --

#[test]
fn frozen_scheduler_flushes_once_on_unfreeze() {
    let mut s = frozen();
    let mut hooks = TestHooks::default();
    let ids: Vec<ViewId> = (0..3).map(|_| s.add_view(TestView::default())).collect();
    for &id in &ids {
        assert!(s.request_view_update(&mut hooks, id, 0b1, 0, &loud()).is_none());
    }
    assert!(s.is_frozen());
    assert_eq!(hooks.before, 0);

    let stats = s
        .unfreeze(&mut hooks, None, &loud())
        .expect("not torn down")
        .expect("sync mode flushes");
    assert_eq!(stats.updated, 3);
    assert_eq!((hooks.before, hooks.after.len()), (1, 1));
    assert!(!s.is_frozen());
}

#[test]
fn keyed_freezes_ignore_foreign_keys() {
    let mut s = sync();
    let mut hooks = TestHooks::default();

    s.freeze(Some("a"));
    s.freeze(Some("b"));
    assert_eq!(s.unfreeze(&mut hooks, Some("b"), &DEFAULT), Ok(None));
    assert!(s.is_frozen(), "foreign key does nothing");

    assert!(matches!(s.unfreeze(&mut hooks, Some("a"), &DEFAULT), Ok(Some(_))));
    assert!(!s.is_frozen());
}

#[test]
fn keyed_freeze_over_a_freeze_restores_it() {
    let mut s = sync();
    let mut hooks = TestHooks::default();

    s.freeze(None);
    s.freeze(Some("drag"));
    assert_eq!(s.unfreeze(&mut hooks, Some("drag"), &DEFAULT), Ok(None));
    assert!(s.is_frozen(), "the outer freeze is still in effect");

    assert!(matches!(s.unfreeze(&mut hooks, None, &DEFAULT), Ok(Some(_))));
    assert!(!s.is_frozen());
}

#[test]
fn exact_sort_is_deferred_until_unfreeze() {
    let mut s = Scheduler::new(
        SchedulerOptions::sync().with_sorting(Sorting::Exact),
        ManualTicks::new(),
    );
    let mut hooks = TestHooks::default();
    let ids: Vec<ViewId> = [3.0, 1.0, 2.0]
        .into_iter()
        .map(|z| s.add_view(TestView { z, ..TestView::default() }))
        .collect();
    for &id in &ids {
        s.request_view_update(&mut hooks, id, FLAG_INSERT, 0, &DEFAULT);
    }
    assert_eq!(s.z_order().views().collect::<Vec<_>>(), ids);

    s.freeze(None);
    s.sort_views();
    assert_eq!(s.z_order().views().collect::<Vec<_>>(), ids);

    s.unfreeze(&mut hooks, None, &DEFAULT).expect("not torn down");
    assert_eq!(
        s.z_order().views().collect::<Vec<_>>(),
        [ids[1], ids[2], ids[0]]
    );
}

#[test]
fn remove_all_disables_the_scheduler() {
    let mut s = sync();
    let mut hooks = TestHooks::default();
    let v = s.add_view(TestView::default());
    s.request_view_update(&mut hooks, v, FLAG_INSERT, 0, &DEFAULT);

    s.remove_all();
    assert!(s.is_disabled());
    assert!(s.views().is_empty());
    assert!(s.z_order().is_empty());
    assert_eq!(
        s.unfreeze(&mut hooks, None, &DEFAULT),
        Err(SchedulerError::Disabled)
    );
}

// -- Frame-paced mode --

#[test]
fn frame_paced_spreads_work_over_frames() {
    let mut s = Scheduler::new(
        SchedulerOptions::frame_paced().with_batch_size(Some(2)),
        ManualTicks::new(),
    );
    let mut hooks = TestHooks::default();
    assert_eq!(s.ticks().requested(), 1);

    let ids: Vec<ViewId> = (0..3).map(|_| s.add_view(TestView::default())).collect();
    for &id in &ids {
        assert!(s.request_view_update(&mut hooks, id, 0b1, 0, &loud()).is_none());
    }

    fire(&mut s, &mut hooks, 16);
    assert_eq!(hooks.before, 1);
    assert!(hooks.after.is_empty());
    assert_eq!(
        hooks.progress.last().map(|p| (p.processed, p.total)),
        Some((2, 3))
    );

    fire(&mut s, &mut hooks, 32);
    assert_eq!(hooks.after.len(), 1);
    assert_eq!(hooks.after[0].updated, 3);
    assert_eq!(
        hooks.progress.last().map(|p| (p.processed, p.total)),
        Some((3, 3))
    );

    fire(&mut s, &mut hooks, 48);
    assert_eq!(hooks.progress.len(), 2, "no progress without work");
    assert!(s.ticks().is_pending(), "the loop keeps running");
    for id in ids {
        assert_eq!(s.view(id).map(|v| v.applied), Some(0b1));
    }
}

#[test]
fn stale_ticks_are_ignored() {
    let mut s = Scheduler::new(SchedulerOptions::frame_paced(), ManualTicks::new());
    let mut hooks = TestHooks::default();
    let v = s.add_view(TestView::default());
    s.schedule_view_update(&mut hooks, v, 0b1, 0, &DEFAULT);

    let stale = FrameTick {
        id: TickId(99),
        frame_index: 0,
        now: HostTime(0),
    };
    assert_eq!(s.on_frame(&mut hooks, stale), Ok(()));
    assert!(s.has_scheduled_updates());
}

#[test]
fn force_sync_flushes_in_frame_paced_mode() {
    let mut s = Scheduler::new(SchedulerOptions::frame_paced(), ManualTicks::new());
    let mut hooks = TestHooks::default();
    let v = s.add_view(TestView::default());
    let opt = UpdateOptions {
        force_sync: true,
        ..UpdateOptions::default()
    };
    assert!(s.flushes_immediately(&opt));
    assert!(s.request_view_update(&mut hooks, v, 0b1, 0, &opt).is_some());
    assert_eq!(s.view(v).map(|v| v.applied), Some(0b1));
}

#[test]
fn auto_freeze_idles_and_wakes_on_demand() {
    let mut s = Scheduler::new(
        SchedulerOptions::frame_paced().auto_freeze(),
        ManualTicks::new(),
    );
    let mut hooks = TestHooks::default();

    fire(&mut s, &mut hooks, 16);
    assert!(s.is_idle());
    assert!(!s.is_frozen(), "idle is not frozen");
    assert_eq!(hooks.idle, 1);
    assert!(!s.ticks().is_pending());

    let v = s.add_view(TestView::default());
    s.schedule_view_update(&mut hooks, v, 0b1, 0, &DEFAULT);
    assert!(!s.is_idle());
    assert!(s.ticks().is_pending(), "waking restarts the loop");

    fire(&mut s, &mut hooks, 32);
    assert_eq!(s.view(v).map(|v| v.applied), Some(0b1));
}

// -- Culling --

#[test]
fn invisible_views_keep_their_bits_until_admitted() {
    let mut s = sync();
    let mut hooks = TestHooks::culling();
    let a = s.add_view(TestView::default());
    let b = s.add_view(TestView {
        hidden: true,
        ..TestView::default()
    });
    s.schedule_view_update(&mut hooks, a, FLAG_INSERT | 0b1, 0, &DEFAULT);
    s.schedule_view_update(&mut hooks, b, FLAG_INSERT | 0b1, 0, &DEFAULT);

    let stats = s.update_views(&mut hooks, &DEFAULT);
    assert_eq!((stats.updated, stats.unmounted), (1, 1));
    assert_eq!(s.view(a).map(|v| v.mounts), Some(1));
    assert_eq!(s.view(b).map(|v| v.mounts), Some(0));
    assert_eq!(s.mounts().state(b), MountState::Unmounted);
    assert_eq!(s.mounts().retained(b), Some(FLAG_INSERT | 0b1));

    if let Some(view) = s.view_mut(a) {
        view.hidden = true;
    }
    if let Some(view) = s.view_mut(b) {
        view.hidden = false;
    }
    s.update_views_visibility(&mut hooks, &DEFAULT);

    assert_eq!(s.mounts().state(a), MountState::Unmounted);
    assert_eq!(s.view(a).map(|v| v.unmounts), Some(1));
    assert_eq!(s.view(b).map(|v| (v.mounts, v.applied)), Some((1, 0b1)));
    assert_eq!(s.z_order().views().collect::<Vec<_>>(), [b]);
}

#[test]
fn prioritized_views_are_swept_first() {
    let mut s = sync();
    let mut hooks = TestHooks::culling();
    let ids: Vec<ViewId> = (0..3)
        .map(|_| {
            s.add_view(TestView {
                hidden: true,
                ..TestView::default()
            })
        })
        .collect();
    for &id in &ids {
        s.schedule_view_update(&mut hooks, id, FLAG_INSERT, 0, &DEFAULT);
    }
    s.update_views(&mut hooks, &DEFAULT);
    assert_eq!(s.unmounted_views().collect::<Vec<_>>(), ids);

    assert!(s.prioritize_mount(ids[2]));
    for &id in &ids {
        if let Some(view) = s.view_mut(id) {
            view.hidden = false;
        }
    }
    assert_eq!(s.check_unmounted_views(&mut hooks, 1, Visibility::Hooks), 1);
    assert_eq!(s.mounts().state(ids[2]), MountState::Mounted);
    assert_eq!(s.pending_flags(ids[2], 0), FLAG_INSERT);
}

#[test]
fn single_view_visibility_mounts_right_away() {
    let mut s = sync();
    let mut hooks = TestHooks::culling();
    let v = s.add_view(TestView {
        hidden: true,
        ..TestView::default()
    });
    s.request_view_update(&mut hooks, v, FLAG_INSERT | 0b1, 0, &DEFAULT);
    assert_eq!(s.mounts().state(v), MountState::Unmounted);

    if let Some(view) = s.view_mut(v) {
        view.hidden = false;
    }
    s.update_view_visibility(&mut hooks, v, &DEFAULT);
    assert!(s.is_view_mounted(v));
    assert_eq!(s.view(v).map(|v| (v.mounts, v.applied)), Some((1, 0b1)));
    assert!(!s.has_scheduled_updates());
}
