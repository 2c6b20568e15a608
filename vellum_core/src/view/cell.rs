// Copyright 2026 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The view type scheduled by the [`Paper`](crate::paper::Paper).

use kurbo::Rect;

use super::base::CellViewBase;
use super::element::ElementView;
use super::link::LinkView;
use super::{UpdateCx, View};
use crate::flags::{FlagTable, Flags};
use crate::graph::CellId;
use crate::scheduler::Priority;

/// Either kind of reference view.
#[derive(Clone, Debug)]
pub enum CellView {
    /// A node view.
    Element(ElementView),
    /// An edge view.
    Link(LinkView),
}

impl CellView {
    /// Shared state.
    #[must_use]
    pub fn base(&self) -> &CellViewBase {
        match self {
            Self::Element(view) => view.base(),
            Self::Link(view) => view.base(),
        }
    }

    /// Shared state, mutably.
    pub fn base_mut(&mut self) -> &mut CellViewBase {
        match self {
            Self::Element(view) => view.base_mut(),
            Self::Link(view) => view.base_mut(),
        }
    }

    /// The presented cell.
    #[must_use]
    pub fn cell(&self) -> CellId {
        self.base().cell()
    }

    /// The flag table of this view's kind.
    #[must_use]
    pub fn table(&self) -> &FlagTable {
        match self {
            Self::Element(view) => view.table(),
            Self::Link(view) => view.table(),
        }
    }

    /// Bounds of what is on screen.
    #[must_use]
    pub fn rendered_bbox(&self) -> Option<Rect> {
        match self {
            Self::Element(view) => view.rendered_bbox(),
            Self::Link(view) => view.rendered_bbox(),
        }
    }

    /// Returns the link view, if this is one.
    #[must_use]
    pub fn as_link(&self) -> Option<&LinkView> {
        match self {
            Self::Link(view) => Some(view),
            Self::Element(_) => None,
        }
    }

    /// Returns the link view mutably, if this is one.
    pub fn as_link_mut(&mut self) -> Option<&mut LinkView> {
        match self {
            Self::Link(view) => Some(view),
            Self::Element(_) => None,
        }
    }

    /// Returns the element view, if this is one.
    #[must_use]
    pub fn as_element(&self) -> Option<&ElementView> {
        match self {
            Self::Element(view) => Some(view),
            Self::Link(_) => None,
        }
    }

    /// Returns whether this is a link view.
    #[must_use]
    pub fn is_link(&self) -> bool {
        matches!(self, Self::Link(_))
    }
}

impl View for CellView {
    fn update_priority(&self) -> Priority {
        match self {
            Self::Element(_) => 0,
            Self::Link(_) => 1,
        }
    }

    fn z(&self) -> f64 {
        self.base()
            .model()
            .get(crate::graph::attr::Z)
            .and_then(crate::graph::Value::as_number)
            .unwrap_or(0.0)
    }

    fn bbox(&self) -> Option<Rect> {
        match self {
            Self::Element(view) => Some(view.model_bbox()),
            Self::Link(view) => view.rendered_bbox(),
        }
    }

    fn confirm_update(&mut self, flags: Flags, cx: &mut UpdateCx<'_, Self>) -> Flags {
        match self {
            Self::Element(view) => view.confirm_update(flags),
            Self::Link(view) => view.confirm_update(flags, cx),
        }
    }

    fn on_mount(&mut self, initial: bool) {
        _ = initial;
        self.base_mut().mark_mounted();
    }

    fn unmount(&mut self) {
        self.base_mut().mark_unmounted();
    }

    fn remove(&mut self) {
        self.base_mut().mark_removed();
    }
}
