// Copyright 2026 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Viewport culling predicates.
//!
//! The scheduler asks a [`Viewport`] whether a detachable view should be on
//! screen whenever it processes that view's pending entry and during the
//! bounded visibility sweeps of frame-paced mode. Culled views are detached
//! from the layer container but keep their pending bits.

use kurbo::Rect;

use crate::view::View;

/// Decides which views are on screen.
pub trait Viewport<V> {
    /// Returns whether `view` should be mounted. `was_mounted` tells whether
    /// it currently is.
    fn is_visible(&mut self, view: &V, was_mounted: bool) -> bool;
}

impl<V, F> Viewport<V> for F
where
    F: FnMut(&V, bool) -> bool,
{
    fn is_visible(&mut self, view: &V, was_mounted: bool) -> bool {
        self(view, was_mounted)
    }
}

/// Culls views whose bounds do not touch a visible area.
///
/// Views without bounds are always visible.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RectViewport {
    /// Visible area in model coordinates.
    pub area: Rect,
    /// Extra margin around `area`, so views just outside stay mounted.
    pub padding: f64,
}

impl RectViewport {
    /// Creates a viewport over `area` without padding.
    #[must_use]
    pub const fn new(area: Rect) -> Self {
        Self { area, padding: 0.0 }
    }

    /// Returns a copy with `padding` set.
    #[must_use]
    pub const fn with_padding(mut self, padding: f64) -> Self {
        self.padding = padding;
        self
    }

    /// Returns whether `bbox` overlaps the padded area.
    #[must_use]
    pub fn overlaps(&self, bbox: Rect) -> bool {
        let area = self.area.inflate(self.padding, self.padding);
        bbox.x0 <= area.x1 && bbox.x1 >= area.x0 && bbox.y0 <= area.y1 && bbox.y1 >= area.y0
    }
}

impl<V: View> Viewport<V> for RectViewport {
    fn is_visible(&mut self, view: &V, was_mounted: bool) -> bool {
        _ = was_mounted;
        view.bbox().is_none_or(|bbox| self.overlaps(bbox))
    }
}
