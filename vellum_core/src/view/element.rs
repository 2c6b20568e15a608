// Copyright 2026 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Headless view for node cells.

use alloc::rc::Rc;

use kurbo::{Point, Rect, Size};

use super::base::CellViewBase;
use crate::flags::{FlagTable, Flags};
use crate::graph::{Attributes, CellId, Value, attr};

const ATTRIBUTES: &[(&str, &[&str])] = &[
    (attr::ATTRS, &["UPDATE"]),
    (attr::POSITION, &["TRANSLATE", "TOOLS"]),
    (attr::SIZE, &["RESIZE", "PORTS", "TOOLS"]),
    (attr::ANGLE, &["ROTATE", "TOOLS"]),
    (attr::MARKUP, &["RENDER"]),
    (attr::PORTS, &["PORTS"]),
];

const INIT: &[&str] = &["RENDER"];

/// Flag table and resolved bits of the element view kind.
///
/// Built once and shared by every element view.
#[derive(Clone, Debug)]
pub struct ElementKind {
    table: FlagTable,
    render: Flags,
    update: Flags,
    resize: Flags,
    translate: Flags,
    rotate: Flags,
    ports: Flags,
    tools: Flags,
}

impl Default for ElementKind {
    fn default() -> Self {
        Self::new()
    }
}

impl ElementKind {
    /// Builds the element flag table.
    #[must_use]
    pub fn new() -> Self {
        // Seven labels, well within the limit.
        let table = FlagTable::new(ATTRIBUTES, INIT)
            .unwrap_or_else(|err| panic!("element flag table: {err}"));
        Self {
            render: table.get_flag("RENDER"),
            update: table.get_flag("UPDATE"),
            resize: table.get_flag("RESIZE"),
            translate: table.get_flag("TRANSLATE"),
            rotate: table.get_flag("ROTATE"),
            ports: table.get_flag("PORTS"),
            tools: table.get_flag("TOOLS"),
            table,
        }
    }

    /// The flag table.
    #[must_use]
    pub fn table(&self) -> &FlagTable {
        &self.table
    }
}

/// A node view.
///
/// A full render rebuilds everything; otherwise each category is applied on
/// its own and only counts as an effect when the rendered value changes.
#[derive(Clone, Debug)]
pub struct ElementView {
    base: CellViewBase,
    kind: Rc<ElementKind>,
}

impl ElementView {
    /// Creates an unrendered view of `cell`.
    #[must_use]
    pub fn new(cell: CellId, model: Attributes, kind: Rc<ElementKind>) -> Self {
        Self {
            base: CellViewBase::new(cell, model),
            kind,
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

    /// Bounds of the model snapshot.
    #[must_use]
    pub fn model_bbox(&self) -> Rect {
        let model = self.base.model();
        bounds(model.get(attr::POSITION), model.get(attr::SIZE))
    }

    /// Bounds of what is on screen, `None` before the first render.
    #[must_use]
    pub fn rendered_bbox(&self) -> Option<Rect> {
        let rendered = self.base.rendered()?;
        Some(bounds(rendered.get(attr::POSITION), rendered.get(attr::SIZE)))
    }

    /// Applies `flags` and returns what is left. Elements never wait.
    pub fn confirm_update(&mut self, mut flags: Flags) -> Flags {
        let kind = &*self.kind;
        let base = &mut self.base;

        if flags & kind.render != 0 {
            base.render();
            base.effects_mut().tools += 1;
            return flags
                & !(kind.render
                    | kind.update
                    | kind.resize
                    | kind.translate
                    | kind.rotate
                    | kind.ports
                    | kind.tools);
        }

        let mut geometry = false;
        if flags & kind.resize != 0 {
            if base.apply(&[attr::SIZE]) {
                base.effects_mut().resizes += 1;
                geometry = true;
            }
            // Resizing re-applies presentation attributes.
            if base.apply(&[attr::ATTRS]) {
                base.effects_mut().updates += 1;
            }
            flags &= !(kind.resize | kind.update);
        }
        if flags & kind.update != 0 {
            if base.apply(&[attr::ATTRS]) {
                base.effects_mut().updates += 1;
            }
            flags &= !kind.update;
        }
        if flags & kind.translate != 0 {
            if base.apply(&[attr::POSITION]) {
                base.effects_mut().translates += 1;
                geometry = true;
            }
            flags &= !kind.translate;
        }
        if flags & kind.rotate != 0 {
            if base.apply(&[attr::ANGLE]) {
                base.effects_mut().rotates += 1;
                geometry = true;
            }
            flags &= !kind.rotate;
        }
        if flags & kind.ports != 0 {
            if base.apply(&[attr::PORTS]) || geometry {
                base.effects_mut().ports += 1;
            }
            flags &= !kind.ports;
        }
        if flags & kind.tools != 0 {
            if geometry {
                base.effects_mut().tools += 1;
            }
            flags &= !kind.tools;
        }
        flags
    }
}

fn bounds(position: Option<&Value>, size: Option<&Value>) -> Rect {
    let origin = position.and_then(Value::as_point).unwrap_or(Point::ZERO);
    let size = size.and_then(Value::as_size).unwrap_or(Size::ZERO);
    Rect::from_origin_size(origin, size)
}
