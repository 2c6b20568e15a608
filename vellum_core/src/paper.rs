// Copyright 2026 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The diagram engine: a model graph kept in sync with its cell views.
//!
//! [`Paper`] owns a [`Graph`] and a [`Scheduler`] of [`CellView`]s. Every
//! mutation goes through [`Paper::edit`]; afterwards the graph's change log is
//! replayed in order:
//!
//! - an added cell gets a view, scheduled with its insert and init bits;
//! - a removed cell has its view scheduled for removal;
//! - changed attributes are resolved to bits by the view's flag table;
//! - an add or a `z` change restores exact stacking order, unless a
//!   sort-delaying batch (`add`, `to-front`, `to-back`) is open, in which case
//!   closing the last of them does;
//! - closing a delaying batch (`translate`) flushes in synchronous mode.
//!
//! A synchronous paper holds a keyed freeze while an `add` batch (see
//! [`Graph::add_cells`]) is open, so a bulk add renders in one flush.
//!
//! While a view updates, the links attached to its cell are scheduled right
//! behind it, so a route is always computed from up-to-date end views. A link
//! that still waits for a culled end view mounts that end view on the spot.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use hashbrown::HashMap;

use crate::flags::{FLAG_INIT, FLAG_INSERT, FLAG_REMOVE, Flags};
use crate::graph::{CellId, CellKind, Graph, GraphEvent, attr};
use crate::scheduler::{
    Priority, Progress, RenderStats, Scheduler, SchedulerError, SchedulerHooks, SchedulerOptions,
    Sorting, UpdateOptions, Visibility, VisibilityStats,
};
use crate::tick::{FrameTick, TickSource};
use crate::trace::TraceSink;
use crate::view::{CellView, ElementKind, ElementView, LinkKind, LinkView, View, ViewId};
use crate::viewport::Viewport;

/// Batches that hold back synchronous flushing until they close.
pub const UPDATE_DELAYING_BATCHES: &[&str] = &["translate"];

/// Batches that hold back exact z-sorting until they close.
pub const SORT_DELAYING_BATCHES: &[&str] = &[ADD_BATCH, "to-front", "to-back"];

/// Batch opened by [`Graph::add_cells`].
const ADD_BATCH: &str = "add";

/// Freeze key held by a synchronous paper while an `add` batch is open.
const ADD_FREEZE_KEY: &str = "add-cells";

/// Configuration for a [`Paper`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaperOptions {
    /// Scheduler configuration.
    pub scheduler: SchedulerOptions,
    /// Batches that hold back synchronous flushing.
    pub delaying_batches: &'static [&'static str],
    /// Batches that hold back exact z-sorting.
    pub sort_delaying_batches: &'static [&'static str],
}

impl PaperOptions {
    /// Default batch names around the given scheduler configuration.
    #[must_use]
    pub const fn new(scheduler: SchedulerOptions) -> Self {
        Self {
            scheduler,
            delaying_batches: UPDATE_DELAYING_BATCHES,
            sort_delaying_batches: SORT_DELAYING_BATCHES,
        }
    }

    /// A synchronous paper.
    #[must_use]
    pub const fn sync() -> Self {
        Self::new(SchedulerOptions::sync())
    }

    /// A frame-paced paper.
    #[must_use]
    pub const fn frame_paced() -> Self {
        Self::new(SchedulerOptions::frame_paced())
    }
}

impl Default for PaperOptions {
    fn default() -> Self {
        Self::sync()
    }
}

type RenderCallback = Box<dyn FnMut(&RenderStats, &UpdateOptions)>;

/// User callbacks, lent to the scheduler as hooks.
#[derive(Default)]
struct Callbacks {
    viewport: Option<Box<dyn Viewport<CellView>>>,
    before_render: Option<Box<dyn FnMut(&UpdateOptions)>>,
    after_render: Option<RenderCallback>,
    progress: Option<Box<dyn FnMut(&Progress)>>,
    idle: Option<Box<dyn FnMut()>>,
}

/// Scheduler hooks borrowing the parts of a [`Paper`] the scheduler does not
/// own.
struct PaperHooks<'a> {
    graph: &'a mut Graph,
    cell_views: &'a HashMap<CellId, ViewId>,
    link_kind: &'a LinkKind,
    callbacks: &'a mut Callbacks,
}

impl<T: TickSource> SchedulerHooks<CellView, T> for PaperHooks<'_> {
    fn viewport(&mut self) -> Option<&mut dyn Viewport<CellView>> {
        self.callbacks
            .viewport
            .as_mut()
            .map(|viewport| &mut **viewport as &mut dyn Viewport<CellView>)
    }

    /// Schedules every link attached to the updated cell one priority behind
    /// it, with the bits for the end(s) it is attached by.
    fn on_view_update(
        &mut self,
        scheduler: &mut Scheduler<CellView, T>,
        view: ViewId,
        flags: Flags,
        priority: Priority,
        opt: &UpdateOptions,
    ) {
        if flags & (FLAG_INSERT | FLAG_REMOVE) != 0 || opt.mounting || opt.isolate {
            return;
        }
        let Some(cell) = scheduler.view(view).map(CellView::cell) else {
            return;
        };
        for link in self.graph.connected_links(cell) {
            let Some(&link_view) = self.cell_views.get(&link) else {
                continue;
            };
            let Some(link_priority) = scheduler.view(link_view).map(View::update_priority) else {
                continue;
            };
            let Some(model) = self.graph.get(link) else {
                continue;
            };
            let mut mask = self.link_kind.table().get_flag("UPDATE");
            if model.target() == Some(cell) {
                mask |= self.link_kind.target_changed();
            }
            if model.source() == Some(cell) {
                mask |= self.link_kind.source_changed();
            }
            let next = link_priority.max(priority.saturating_add(1));
            scheduler.schedule_view_update(self, link_view, mask, next, opt);
        }
    }

    /// Mounts the end views a link waits for, then applies the link.
    fn on_view_postponed(
        &mut self,
        scheduler: &mut Scheduler<CellView, T>,
        view: ViewId,
        _leftover: Flags,
        _opt: &UpdateOptions,
    ) -> bool {
        let Some(link) = scheduler.view(view).and_then(CellView::as_link) else {
            return false;
        };
        let ends = [link.source_view(), link.target_view()];
        let silent = UpdateOptions::silent();
        let mut left = 0;
        for end in ends.into_iter().flatten() {
            if !scheduler.is_view_mounted(end) {
                left |= scheduler.dump_view(self, end, &silent);
            }
        }
        if left != 0 {
            return false;
        }
        scheduler.dump_view(self, view, &silent) == 0
    }

    fn before_render(&mut self, opt: &UpdateOptions) {
        if let Some(f) = &mut self.callbacks.before_render {
            f(opt);
        }
    }

    fn after_render(&mut self, stats: &RenderStats, opt: &UpdateOptions) {
        if let Some(f) = &mut self.callbacks.after_render {
            f(stats, opt);
        }
    }

    fn on_progress(&mut self, progress: &Progress) {
        if let Some(f) = &mut self.callbacks.progress {
            f(progress);
        }
    }

    fn on_idle(&mut self) {
        if let Some(f) = &mut self.callbacks.idle {
            f();
        }
    }
}

/// A model graph and the views that render it.
pub struct Paper<T: TickSource> {
    options: PaperOptions,
    graph: Graph,
    scheduler: Scheduler<CellView, T>,
    cell_views: HashMap<CellId, ViewId>,
    element_kind: Rc<ElementKind>,
    link_kind: Rc<LinkKind>,
    callbacks: Callbacks,
    /// Batches open at the point of the change log being replayed.
    batches: HashMap<String, u32>,
}

impl<T: TickSource + fmt::Debug> fmt::Debug for Paper<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Paper")
            .field("options", &self.options)
            .field("cells", &self.graph.len())
            .field("views", &self.cell_views.len())
            .field("scheduler", &self.scheduler)
            .field("batches", &self.batches)
            .finish_non_exhaustive()
    }
}

impl<T: TickSource> Paper<T> {
    /// Creates an empty paper.
    pub fn new(options: PaperOptions, ticks: T) -> Self {
        Self {
            options,
            graph: Graph::new(),
            scheduler: Scheduler::new(options.scheduler, ticks),
            cell_views: HashMap::new(),
            element_kind: Rc::new(ElementKind::new()),
            link_kind: Rc::new(LinkKind::new()),
            callbacks: Callbacks::default(),
            batches: HashMap::new(),
        }
    }

    // -- Accessors --

    /// The configuration.
    #[must_use]
    pub fn options(&self) -> &PaperOptions {
        &self.options
    }

    /// The model.
    #[must_use]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// The scheduler, read-only.
    #[must_use]
    pub fn scheduler(&self) -> &Scheduler<CellView, T> {
        &self.scheduler
    }

    /// The tick source, to pump frames in frame-paced mode.
    pub fn ticks_mut(&mut self) -> &mut T {
        self.scheduler.ticks_mut()
    }

    /// The view of `cell`.
    #[must_use]
    pub fn find_view(&self, cell: CellId) -> Option<&CellView> {
        self.scheduler.view(*self.cell_views.get(&cell)?)
    }

    /// The view handle of `cell`.
    #[must_use]
    pub fn view_id(&self, cell: CellId) -> Option<ViewId> {
        self.cell_views.get(&cell).copied()
    }

    /// Returns whether the view of `cell` is attached.
    #[must_use]
    pub fn is_view_mounted(&self, cell: CellId) -> bool {
        self.view_id(cell)
            .is_some_and(|view| self.scheduler.is_view_mounted(view))
    }

    /// Cells of the mounted views, back to front.
    #[must_use]
    pub fn stacking_order(&self) -> Vec<CellId> {
        self.scheduler
            .z_order()
            .views()
            .filter_map(|view| self.scheduler.view(view).map(CellView::cell))
            .collect()
    }

    /// Returns whether updates are held back.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.scheduler.is_frozen()
    }

    /// Returns whether the paper is frame-paced.
    #[must_use]
    pub fn is_async(&self) -> bool {
        self.scheduler.is_async()
    }

    /// Returns whether an auto-freezing paper went idle.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    /// Returns whether any view update is pending.
    #[must_use]
    pub fn has_scheduled_updates(&self) -> bool {
        self.scheduler.has_scheduled_updates()
    }

    // -- Callbacks --

    /// Culls views with `viewport`.
    pub fn set_viewport(&mut self, viewport: impl Viewport<CellView> + 'static) {
        self.callbacks.viewport = Some(Box::new(viewport));
    }

    /// Stops culling.
    pub fn clear_viewport(&mut self) {
        self.callbacks.viewport = None;
    }

    /// Called before each render cycle.
    pub fn on_before_render(&mut self, f: impl FnMut(&UpdateOptions) + 'static) {
        self.callbacks.before_render = Some(Box::new(f));
    }

    /// Called after each render cycle.
    pub fn on_after_render(&mut self, f: impl FnMut(&RenderStats, &UpdateOptions) + 'static) {
        self.callbacks.after_render = Some(Box::new(f));
    }

    /// Called once per frame with work in frame-paced mode.
    pub fn on_progress(&mut self, f: impl FnMut(&Progress) + 'static) {
        self.callbacks.progress = Some(Box::new(f));
    }

    /// Called when an auto-freezing paper goes idle.
    pub fn on_idle(&mut self, f: impl FnMut() + 'static) {
        self.callbacks.idle = Some(Box::new(f));
    }

    /// Installs a scheduler trace sink.
    pub fn set_trace_sink(&mut self, sink: Box<dyn TraceSink>) {
        self.scheduler.set_trace_sink(sink);
    }

    // -- Editing --

    /// Mutates the model, then brings the views up to date with it.
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut Graph) -> R) -> R {
        let result = f(&mut self.graph);
        self.replay();
        result
    }

    /// Raises `cell` above every other cell.
    pub fn to_front(&mut self, cell: CellId) {
        self.edit(|graph| {
            if !graph.is_alive(cell) {
                return;
            }
            graph.start_batch("to-front");
            let z = graph.max_z() + 1.0;
            graph.set(cell, attr::Z, z);
            graph.stop_batch("to-front");
        });
    }

    /// Lowers `cell` below every other cell.
    pub fn to_back(&mut self, cell: CellId) {
        self.edit(|graph| {
            if !graph.is_alive(cell) {
                return;
            }
            graph.start_batch("to-back");
            let z = graph.cells().map(|c| c.z()).fold(f64::INFINITY, f64::min) - 1.0;
            graph.set(cell, attr::Z, z);
            graph.stop_batch("to-back");
        });
    }

    fn replay(&mut self) {
        for event in self.graph.drain_events() {
            match event {
                GraphEvent::Added(cell) => self.on_cell_added(cell),
                GraphEvent::Removed { cell, .. } => self.on_cell_removed(cell),
                GraphEvent::Changed { cell, changed } => self.on_cell_changed(cell, &changed),
                GraphEvent::BatchStart(name) => self.on_batch_start(name),
                GraphEvent::BatchStop(name) => self.on_batch_stop(&name),
            }
        }
    }

    fn on_cell_added(&mut self, cell: CellId) {
        let Some(c) = self.graph.get(cell) else {
            // Removed again within the same edit.
            return;
        };
        let model = c.attrs().clone();
        let view = match c.kind() {
            CellKind::Element => {
                CellView::Element(ElementView::new(cell, model, Rc::clone(&self.element_kind)))
            }
            CellKind::Link => {
                let mut link = LinkView::new(cell, model, Rc::clone(&self.link_kind));
                link.set_end_views(self.view_of(c.source()), self.view_of(c.target()));
                CellView::Link(link)
            }
        };
        let flags = FLAG_INSERT | FLAG_INIT | view.table().init_flag();
        let priority = view.update_priority();
        let id = self.scheduler.add_view(view);
        self.cell_views.insert(cell, id);
        self.request(id, flags, priority, &UpdateOptions::default());
        if !self.batch_active(self.options.sort_delaying_batches) {
            self.scheduler.sort_views();
        }
    }

    fn on_cell_removed(&mut self, cell: CellId) {
        let Some(id) = self.cell_views.remove(&cell) else {
            return;
        };
        let Some(priority) = self.scheduler.view(id).map(View::update_priority) else {
            return;
        };
        self.request(id, FLAG_REMOVE, priority, &UpdateOptions::default());
    }

    fn on_cell_changed(&mut self, cell: CellId, changed: &[String]) {
        let Some(&id) = self.cell_views.get(&cell) else {
            return;
        };
        let Some(c) = self.graph.get(cell) else {
            return;
        };
        let source = self.view_of(c.source());
        let target = self.view_of(c.target());
        let Some(view) = self.scheduler.view_mut(id) else {
            return;
        };
        view.base_mut().sync_model(c.attrs());
        if changed.iter().any(|n| n == attr::SOURCE || n == attr::TARGET)
            && let Some(link) = view.as_link_mut()
        {
            link.set_end_views(source, target);
        }
        let flags = view.table().change_flag(changed.iter().map(String::as_str));
        let priority = view.update_priority();

        let opt = UpdateOptions::default();
        let restack = changed.iter().any(|n| n == attr::Z);
        if restack && self.options.scheduler.sorting == Sorting::Approximate {
            self.request(id, FLAG_INSERT, priority, &opt);
        }
        if flags != 0 {
            self.request(id, flags, priority, &opt);
        }
        if restack && !self.batch_active(self.options.sort_delaying_batches) {
            self.scheduler.sort_views();
        }
    }

    fn on_batch_start(&mut self, name: String) {
        // A synchronous paper renders a bulk add in one flush.
        if name == ADD_BATCH && !self.batches.contains_key(ADD_BATCH) && !self.scheduler.is_async()
        {
            self.scheduler.freeze(Some(ADD_FREEZE_KEY));
        }
        *self.batches.entry(name).or_insert(0) += 1;
    }

    fn on_batch_stop(&mut self, name: &str) {
        if let Some(count) = self.batches.get_mut(name) {
            *count -= 1;
            if *count == 0 {
                self.batches.remove(name);
            }
        }
        if name == ADD_BATCH && !self.batches.contains_key(ADD_BATCH) && !self.scheduler.is_async()
        {
            let (scheduler, mut hooks) = self.parts();
            if scheduler
                .unfreeze(&mut hooks, Some(ADD_FREEZE_KEY), &UpdateOptions::default())
                .is_err()
            {
                return;
            }
        }
        let delaying = self.options.delaying_batches;
        if !self.scheduler.is_frozen()
            && !self.scheduler.is_idle()
            && !self.scheduler.is_async()
            && delaying.contains(&name)
            && !self.batch_active(delaying)
        {
            self.update_views(&UpdateOptions::default());
        }
        // A frozen scheduler keeps the sort for its unfreeze.
        let sort_delaying = self.options.sort_delaying_batches;
        if sort_delaying.contains(&name) && !self.batch_active(sort_delaying) {
            self.scheduler.sort_views();
        }
    }

    fn batch_active(&self, names: &[&str]) -> bool {
        names.iter().any(|name| self.batches.contains_key(*name))
    }

    fn view_of(&self, cell: Option<CellId>) -> Option<ViewId> {
        self.cell_views.get(&cell?).copied()
    }

    /// Schedules an update and flushes it unless frozen, frame-paced, or
    /// inside a delaying batch.
    fn request(&mut self, view: ViewId, flags: Flags, priority: Priority, opt: &UpdateOptions) {
        let delayed = self.batch_active(self.options.delaying_batches);
        let (scheduler, mut hooks) = self.parts();
        scheduler.schedule_view_update(&mut hooks, view, flags, priority, opt);
        if delayed || !scheduler.flushes_immediately(opt) {
            return;
        }
        scheduler.update_views(&mut hooks, opt);
    }

    fn parts(&mut self) -> (&mut Scheduler<CellView, T>, PaperHooks<'_>) {
        let hooks = PaperHooks {
            graph: &mut self.graph,
            cell_views: &self.cell_views,
            link_kind: &self.link_kind,
            callbacks: &mut self.callbacks,
        };
        (&mut self.scheduler, hooks)
    }

    // -- Flushing --

    /// Drains every pending update synchronously.
    pub fn update_views(&mut self, opt: &UpdateOptions) -> RenderStats {
        let (scheduler, mut hooks) = self.parts();
        scheduler.update_views(&mut hooks, opt)
    }

    /// Runs one frame of work for a tick delivered by the tick source.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Disabled`] after [`remove_all`](Self::remove_all).
    pub fn run_frame(&mut self, tick: FrameTick) -> Result<(), SchedulerError> {
        let (scheduler, mut hooks) = self.parts();
        scheduler.on_frame(&mut hooks, tick)
    }

    /// Applies the pending bits of `cell`'s view right away. Returns the
    /// bits it could not apply.
    pub fn dump_view(&mut self, cell: CellId) -> Flags {
        let Some(id) = self.view_id(cell) else {
            return 0;
        };
        let (scheduler, mut hooks) = self.parts();
        scheduler.dump_view(&mut hooks, id, &UpdateOptions::default())
    }

    /// Brings `cell`'s view up to date and returns it.
    pub fn require_view(&mut self, cell: CellId) -> Option<&CellView> {
        let id = self.view_id(cell)?;
        let (scheduler, mut hooks) = self.parts();
        scheduler.require_view(&mut hooks, id, &UpdateOptions::default());
        self.scheduler.view(id)
    }

    /// Mounts and updates every view, ignoring the viewport.
    pub fn dump_views(&mut self) -> RenderStats {
        let opt = UpdateOptions {
            visibility: Visibility::All,
            ..UpdateOptions::default()
        };
        let (scheduler, mut hooks) = self.parts();
        scheduler.schedule_cells_visibility_update(&mut hooks, &opt);
        scheduler.update_views(&mut hooks, &opt)
    }

    // -- Freezing --

    /// Holds back every update. See [`Scheduler::freeze`].
    pub fn freeze(&mut self, key: Option<&str>) {
        self.scheduler.freeze(key);
    }

    /// Resumes updates. See [`Scheduler::unfreeze`].
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Disabled`] after [`remove_all`](Self::remove_all).
    pub fn unfreeze(&mut self, key: Option<&str>) -> Result<Option<RenderStats>, SchedulerError> {
        let (scheduler, mut hooks) = self.parts();
        scheduler.unfreeze(&mut hooks, key, &UpdateOptions::default())
    }

    // -- Visibility --

    /// Sweeps mounted and culled views against the viewport without limits
    /// and schedules the views that changed sides.
    pub fn check_viewport(&mut self) -> VisibilityStats {
        let (scheduler, mut hooks) = self.parts();
        scheduler.schedule_cells_visibility_update(&mut hooks, &UpdateOptions::default())
    }

    /// Sweeps every view against the viewport, then flushes.
    pub fn update_views_visibility(&mut self) -> RenderStats {
        let (scheduler, mut hooks) = self.parts();
        scheduler.update_views_visibility(&mut hooks, &UpdateOptions::default())
    }

    /// Re-evaluates the view of `cell` against the viewport, mounting and
    /// applying it right away if it came into view.
    pub fn update_cell_visibility(&mut self, cell: CellId) {
        let Some(id) = self.view_id(cell) else {
            return;
        };
        let (scheduler, mut hooks) = self.parts();
        scheduler.update_view_visibility(&mut hooks, id, &UpdateOptions::default());
    }

    // -- Teardown --

    /// Destroys every view. The model is kept; the paper stops updating.
    pub fn remove_all(&mut self) {
        self.scheduler.remove_all();
        self.cell_views.clear();
    }
}
