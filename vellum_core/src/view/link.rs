// Copyright 2026 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Headless view for edge cells.
//!
//! A link can only be drawn once both of its end views are on screen. Until
//! then [`LinkView::confirm_update`] hands its flags back unchanged and the
//! scheduler keeps them pending.

use alloc::rc::Rc;

use kurbo::{Line, Point, Rect, Shape};

use super::UpdateCx;
use super::base::CellViewBase;
use super::cell::CellView;
use super::id::ViewId;
use crate::flags::{FlagTable, Flags};
use crate::graph::{Attributes, CellId, Value, attr};

const ATTRIBUTES: &[(&str, &[&str])] = &[
    (attr::MARKUP, &["RENDER"]),
    (attr::ATTRS, &["UPDATE"]),
    (attr::ROUTER, &["UPDATE"]),
    (attr::VERTICES, &["UPDATE"]),
    (attr::CONNECTOR, &["CONNECTOR"]),
    (attr::LABELS, &["LABELS"]),
    (attr::LABEL_MARKUP, &["LABELS"]),
    (attr::SOURCE, &["SOURCE", "UPDATE"]),
    (attr::TARGET, &["TARGET", "UPDATE"]),
];

const INIT: &[&str] = &["RENDER", "SOURCE", "TARGET", "TOOLS"];

/// Flag table and resolved bits of the link view kind.
#[derive(Clone, Debug)]
pub struct LinkKind {
    table: FlagTable,
    render: Flags,
    update: Flags,
    connector: Flags,
    labels: Flags,
    source: Flags,
    target: Flags,
    tools: Flags,
}

impl Default for LinkKind {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkKind {
    /// Builds the link flag table.
    #[must_use]
    pub fn new() -> Self {
        // Seven labels, well within the limit.
        let table =
            FlagTable::new(ATTRIBUTES, INIT).unwrap_or_else(|err| panic!("link flag table: {err}"));
        Self {
            render: table.get_flag("RENDER"),
            update: table.get_flag("UPDATE"),
            connector: table.get_flag("CONNECTOR"),
            labels: table.get_flag("LABELS"),
            source: table.get_flag("SOURCE"),
            target: table.get_flag("TARGET"),
            tools: table.get_flag("TOOLS"),
            table,
        }
    }

    /// The flag table.
    #[must_use]
    pub fn table(&self) -> &FlagTable {
        &self.table
    }

    /// Bits a link gets when the view at its source end changes.
    #[must_use]
    pub fn source_changed(&self) -> Flags {
        self.update | self.source
    }

    /// Bits a link gets when the view at its target end changes.
    #[must_use]
    pub fn target_changed(&self) -> Flags {
        self.update | self.target
    }
}

/// An edge view.
#[derive(Clone, Debug)]
pub struct LinkView {
    base: CellViewBase,
    kind: Rc<LinkKind>,
    source_view: Option<ViewId>,
    target_view: Option<ViewId>,
    route: Option<Line>,
}

impl LinkView {
    /// Creates an unrendered view of `cell`.
    #[must_use]
    pub fn new(cell: CellId, model: Attributes, kind: Rc<LinkKind>) -> Self {
        Self {
            base: CellViewBase::new(cell, model),
            kind,
            source_view: None,
            target_view: None,
            route: None,
        }
    }

    /// Shared state.
    #[must_use]
    pub fn base(&self) -> &CellViewBase {
        &self.base
    }

    /// Shared state, mutably.
    pub fn base_mut(&mut self) -> &mut CellViewBase {
        &mut self.base
    }

    /// The kind's flag table.
    #[must_use]
    pub fn table(&self) -> &FlagTable {
        &self.kind.table
    }

    /// Source cell of the model snapshot.
    #[must_use]
    pub fn source_cell(&self) -> Option<CellId> {
        self.base.model().get(attr::SOURCE).and_then(Value::as_cell)
    }

    /// Target cell of the model snapshot.
    #[must_use]
    pub fn target_cell(&self) -> Option<CellId> {
        self.base.model().get(attr::TARGET).and_then(Value::as_cell)
    }

    /// View at the source end, once resolved.
    #[must_use]
    pub fn source_view(&self) -> Option<ViewId> {
        self.source_view
    }

    /// View at the target end, once resolved.
    #[must_use]
    pub fn target_view(&self) -> Option<ViewId> {
        self.target_view
    }

    /// Sets the resolved end views.
    pub fn set_end_views(&mut self, source: Option<ViewId>, target: Option<ViewId>) {
        self.source_view = source;
        self.target_view = target;
    }

    /// The drawn route, `None` before the first render.
    #[must_use]
    pub fn route(&self) -> Option<Line> {
        self.route
    }

    /// Bounds of the drawn route.
    #[must_use]
    pub fn rendered_bbox(&self) -> Option<Rect> {
        self.route.map(|line| line.bounding_box())
    }

    /// Applies `flags` and returns what is left.
    ///
    /// Everything is handed back while an end cell has no view yet or an end
    /// view is not mounted.
    pub fn confirm_update(&mut self, mut flags: Flags, cx: &mut UpdateCx<'_, CellView>) -> Flags {
        let kind = Rc::clone(&self.kind);

        if flags & kind.source != 0 {
            if self.source_cell().is_some() && self.source_view.is_none() {
                return flags;
            }
            flags &= !kind.source;
        }
        if flags & kind.target != 0 {
            if self.target_cell().is_some() && self.target_view.is_none() {
                return flags;
            }
            flags &= !kind.target;
        }
        let waiting = [self.source_view, self.target_view]
            .into_iter()
            .flatten()
            .any(|end| !cx.is_mounted(end));
        if waiting {
            return flags;
        }

        if flags & kind.render != 0 {
            self.base.render();
            self.base.effects_mut().tools += 1;
            self.reroute(cx);
            return flags & !(kind.render | kind.update | kind.labels | kind.tools | kind.connector);
        }

        if flags & kind.labels != 0 {
            if self.base.apply(&[attr::LABELS, attr::LABEL_MARKUP]) {
                self.base.effects_mut().labels += 1;
            }
            flags &= !kind.labels;
        }
        let update = flags & kind.update != 0;
        let connector = flags & kind.connector != 0;
        if update || connector {
            if update && self.base.apply(&[attr::ATTRS, attr::ROUTER, attr::VERTICES]) {
                self.base.effects_mut().updates += 1;
            }
            if self.base.apply(&[attr::CONNECTOR]) {
                self.base.effects_mut().connectors += 1;
            }
            // End references are part of the route.
            self.base.apply(&[attr::SOURCE, attr::TARGET]);
            if self.reroute(cx) {
                self.base.effects_mut().tools += 1;
            }
            flags &= !(kind.update | kind.tools | kind.connector);
        }
        flags & !kind.tools
    }

    /// Recomputes the route between the end anchors. Returns whether it
    /// changed.
    fn reroute(&mut self, cx: &UpdateCx<'_, CellView>) -> bool {
        let source = self.anchor(attr::SOURCE, self.source_view, cx);
        let target = self.anchor(attr::TARGET, self.target_view, cx);
        let route = match (source, target) {
            (Some(p0), Some(p1)) => Some(Line::new(p0, p1)),
            (Some(p), None) | (None, Some(p)) => Some(Line::new(p, p)),
            (None, None) => None,
        };
        if route == self.route {
            return false;
        }
        self.route = route;
        self.base.effects_mut().routes += 1;
        true
    }

    /// Center of the end view, or a fixed point stored on the model.
    fn anchor(
        &self,
        end: &str,
        view: Option<ViewId>,
        cx: &UpdateCx<'_, CellView>,
    ) -> Option<Point> {
        match view {
            Some(view) => cx
                .view(view)
                .and_then(CellView::rendered_bbox)
                .map(|bbox| bbox.center()),
            None => self.base.model().get(end).and_then(Value::as_point),
        }
    }
}
