// Copyright 2026 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! State shared by the reference cell views.

use alloc::string::ToString;

use crate::graph::{Attributes, CellId, Value};

/// Counters of the side effects a view actually performed.
///
/// A counter only moves when the rendered state changed, so applying the same
/// flags twice against an unchanged model leaves every counter where it was.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ViewEffects {
    /// Full renders.
    pub renders: u32,
    /// Presentation attribute updates.
    pub updates: u32,
    /// Size changes.
    pub resizes: u32,
    /// Position changes.
    pub translates: u32,
    /// Rotation changes.
    pub rotates: u32,
    /// Port layouts.
    pub ports: u32,
    /// Label layouts.
    pub labels: u32,
    /// Path generator changes.
    pub connectors: u32,
    /// Route recomputations that produced a different route.
    pub routes: u32,
    /// Tool refreshes.
    pub tools: u32,
    /// Attachments to the layer container.
    pub mounts: u32,
    /// Detachments from the layer container.
    pub unmounts: u32,
    /// Whether the view was destroyed.
    pub removed: bool,
}

/// Model snapshot, rendered state and mount state of one cell view.
///
/// The owner keeps `model` in sync with the graph. Rendering copies attributes
/// from `model` into the rendered state; views only ever read the latter.
#[derive(Clone, Debug)]
pub struct CellViewBase {
    cell: CellId,
    model: Attributes,
    rendered: Option<Attributes>,
    mounted: bool,
    effects: ViewEffects,
}

impl CellViewBase {
    /// Creates the state for a view of `cell`.
    #[must_use]
    pub fn new(cell: CellId, model: Attributes) -> Self {
        Self {
            cell,
            model,
            rendered: None,
            mounted: false,
            effects: ViewEffects::default(),
        }
    }

    /// The cell this view presents.
    #[must_use]
    pub fn cell(&self) -> CellId {
        self.cell
    }

    /// The latest model snapshot.
    #[must_use]
    pub fn model(&self) -> &Attributes {
        &self.model
    }

    /// Replaces the model snapshot. Nothing is rendered until the view is
    /// updated.
    pub fn sync_model(&mut self, model: &Attributes) {
        model.clone_into(&mut self.model);
    }

    /// What is currently on screen, `None` before the first render.
    #[must_use]
    pub fn rendered(&self) -> Option<&Attributes> {
        self.rendered.as_ref()
    }

    /// A single rendered attribute.
    #[must_use]
    pub fn rendered_attr(&self, name: &str) -> Option<&Value> {
        self.rendered.as_ref()?.get(name)
    }

    /// Returns whether the view was rendered at least once.
    #[must_use]
    pub fn is_rendered(&self) -> bool {
        self.rendered.is_some()
    }

    /// Rebuilds the rendered state from the model snapshot.
    pub fn render(&mut self) {
        self.rendered = Some(self.model.clone());
        self.effects.renders += 1;
    }

    /// Copies the named attributes from the model into the rendered state.
    ///
    /// Returns whether any rendered value changed. Does nothing before the
    /// first render.
    pub fn apply(&mut self, names: &[&str]) -> bool {
        let Some(rendered) = &mut self.rendered else {
            return false;
        };
        let mut changed = false;
        for &name in names {
            match self.model.get(name) {
                Some(value) if rendered.get(name) != Some(value) => {
                    rendered.insert(name.to_string(), value.clone());
                    changed = true;
                }
                None if rendered.remove(name).is_some() => changed = true,
                _ => {}
            }
        }
        changed
    }

    /// Returns whether the view is attached to the layer container.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Records an attachment.
    pub fn mark_mounted(&mut self) {
        self.mounted = true;
        self.effects.mounts += 1;
    }

    /// Records a detachment. Idempotent.
    pub fn mark_unmounted(&mut self) {
        if self.mounted {
            self.mounted = false;
            self.effects.unmounts += 1;
        }
    }

    /// Records destruction. Idempotent.
    pub fn mark_removed(&mut self) {
        self.mark_unmounted();
        self.effects.removed = true;
    }

    /// Side effects performed so far.
    #[must_use]
    pub fn effects(&self) -> &ViewEffects {
        &self.effects
    }

    pub(crate) fn effects_mut(&mut self) -> &mut ViewEffects {
        &mut self.effects
    }
}
