// Copyright 2026 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The diagram model: cells, their attributes, and their relationships.
//!
//! Cells live in a generational arena addressed by [`CellId`]. Every mutation
//! appends a [`GraphEvent`]; the [`Paper`](crate::paper::Paper) drains those
//! events to decide which views need which updates. Attribute writes that do
//! not change a value produce no event.
//!
//! Relationships (link endpoints, embedding) are mirrored as dependency edges
//! in an [`understory_dirty`] tracker, see [`dirty`](crate::dirty).

mod id;
mod value;

pub use id::CellId;
pub use value::{Attributes, Value};

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use hashbrown::HashMap;
use kurbo::{Point, Rect, Size};
use understory_dirty::{CycleHandling, DirtyTracker, EagerPolicy};

use crate::dirty;

/// Well-known attribute names.
pub mod attr {
    /// Top-left corner of an element ([`Value::Point`](super::Value::Point)).
    pub const POSITION: &str = "position";
    /// Element size ([`Value::Size`](super::Value::Size)).
    pub const SIZE: &str = "size";
    /// Rotation in degrees.
    pub const ANGLE: &str = "angle";
    /// Stacking order.
    pub const Z: &str = "z";
    /// Presentation attributes.
    pub const ATTRS: &str = "attrs";
    /// Markup the view is built from.
    pub const MARKUP: &str = "markup";
    /// Element ports.
    pub const PORTS: &str = "ports";
    /// Link source cell.
    pub const SOURCE: &str = "source";
    /// Link target cell.
    pub const TARGET: &str = "target";
    /// Link route waypoints.
    pub const VERTICES: &str = "vertices";
    /// Link routing algorithm.
    pub const ROUTER: &str = "router";
    /// Link path generator.
    pub const CONNECTOR: &str = "connector";
    /// Link labels.
    pub const LABELS: &str = "labels";
    /// Markup of link labels.
    pub const LABEL_MARKUP: &str = "labelMarkup";
    /// Embedding parent.
    pub const PARENT: &str = "parent";
}

/// Whether a cell is a node or an edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CellKind {
    /// A node.
    Element,
    /// An edge between two cells.
    Link,
}

/// A model object in the diagram.
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    id: CellId,
    key: String,
    kind: CellKind,
    attrs: Attributes,
}

impl Cell {
    /// The cell's handle.
    #[must_use]
    pub fn id(&self) -> CellId {
        self.id
    }

    /// The cell's unique external key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Node or edge.
    #[must_use]
    pub fn kind(&self) -> CellKind {
        self.kind
    }

    /// Returns whether this is a link.
    #[must_use]
    pub fn is_link(&self) -> bool {
        self.kind == CellKind::Link
    }

    /// All attributes.
    #[must_use]
    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    /// A single attribute.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    /// Element position, or the origin.
    #[must_use]
    pub fn position(&self) -> Point {
        self.get(attr::POSITION)
            .and_then(Value::as_point)
            .unwrap_or(Point::ZERO)
    }

    /// Element size, or zero.
    #[must_use]
    pub fn size(&self) -> Size {
        self.get(attr::SIZE)
            .and_then(Value::as_size)
            .unwrap_or(Size::ZERO)
    }

    /// Rotation in degrees.
    #[must_use]
    pub fn angle(&self) -> f64 {
        self.get(attr::ANGLE)
            .and_then(Value::as_number)
            .unwrap_or(0.0)
    }

    /// Stacking order.
    #[must_use]
    pub fn z(&self) -> f64 {
        self.get(attr::Z).and_then(Value::as_number).unwrap_or(0.0)
    }

    /// Link source.
    #[must_use]
    pub fn source(&self) -> Option<CellId> {
        self.get(attr::SOURCE).and_then(Value::as_cell)
    }

    /// Link target.
    #[must_use]
    pub fn target(&self) -> Option<CellId> {
        self.get(attr::TARGET).and_then(Value::as_cell)
    }

    /// Embedding parent.
    #[must_use]
    pub fn parent(&self) -> Option<CellId> {
        self.get(attr::PARENT).and_then(Value::as_cell)
    }

    /// Axis-aligned model bounds of an element. Links have none.
    #[must_use]
    pub fn bbox(&self) -> Option<Rect> {
        match self.kind {
            CellKind::Element => Some(Rect::from_origin_size(self.position(), self.size())),
            CellKind::Link => None,
        }
    }

    /// Returns whether this link is attached to `cell`.
    #[must_use]
    pub fn is_connected_to(&self, cell: CellId) -> bool {
        self.source() == Some(cell) || self.target() == Some(cell)
    }
}

/// A change to the graph, in the order it happened.
#[derive(Clone, Debug, PartialEq)]
pub enum GraphEvent {
    /// A cell was added.
    Added(CellId),
    /// A cell was removed.
    Removed {
        /// The removed cell's (now stale) handle.
        cell: CellId,
        /// What it was.
        kind: CellKind,
    },
    /// Attributes of a cell changed value.
    Changed {
        /// The changed cell.
        cell: CellId,
        /// Names of the attributes whose value actually changed.
        changed: Vec<String>,
    },
    /// A named batch was opened.
    BatchStart(String),
    /// A named batch was closed.
    BatchStop(String),
}

/// Errors reported by graph mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GraphError {
    /// Another live cell already uses this key.
    DuplicateKey(String),
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateKey(key) => write!(f, "a cell with key {key:?} already exists"),
        }
    }
}

impl core::error::Error for GraphError {}

/// The diagram model.
#[derive(Debug)]
pub struct Graph {
    // -- Storage --
    cells: Vec<Option<Cell>>,
    generation: Vec<u32>,
    free_list: Vec<u32>,
    keys: HashMap<String, CellId>,

    // -- Relationships --
    dirty: DirtyTracker<u32>,
    /// Link-to-link connections the tracker refused because they close a
    /// cycle, as `(link, end)`.
    looped: Vec<(CellId, CellId)>,

    // -- Change log --
    events: Vec<GraphEvent>,
    batches: HashMap<String, u32>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cells: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            keys: HashMap::new(),
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            looped: Vec::new(),
            events: Vec::new(),
            batches: HashMap::new(),
        }
    }

    // -- Cells --

    /// Adds an element.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateKey`] if `key` is taken.
    pub fn add_element(&mut self, key: &str, attrs: Attributes) -> Result<CellId, GraphError> {
        self.add_cell(CellKind::Element, key, attrs)
    }

    /// Adds a link between two (optional) endpoint cells.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateKey`] if `key` is taken.
    pub fn add_link(
        &mut self,
        key: &str,
        source: Option<CellId>,
        target: Option<CellId>,
        mut attrs: Attributes,
    ) -> Result<CellId, GraphError> {
        if let Some(source) = source {
            attrs.insert(attr::SOURCE.to_string(), Value::Cell(source));
        }
        if let Some(target) = target {
            attrs.insert(attr::TARGET.to_string(), Value::Cell(target));
        }
        self.add_cell(CellKind::Link, key, attrs)
    }

    /// Adds a cell. Cells without a `z` attribute are stacked on top.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateKey`] if `key` is taken.
    pub fn add_cell(
        &mut self,
        kind: CellKind,
        key: &str,
        mut attrs: Attributes,
    ) -> Result<CellId, GraphError> {
        if self.keys.contains_key(key) {
            return Err(GraphError::DuplicateKey(key.to_string()));
        }
        if !attrs.contains_key(attr::Z) {
            attrs.insert(attr::Z.to_string(), Value::Number(self.max_z() + 1.0));
        }

        let idx = if let Some(idx) = self.free_list.pop() {
            self.generation[idx as usize] += 1;
            idx
        } else {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "cell count stays far below u32::MAX"
            )]
            let idx = self.cells.len() as u32;
            self.cells.push(None);
            self.generation.push(0);
            idx
        };
        let id = CellId {
            idx,
            generation: self.generation[idx as usize],
        };
        self.cells[idx as usize] = Some(Cell {
            id,
            key: key.to_string(),
            kind,
            attrs,
        });
        self.keys.insert(key.to_string(), id);
        self.relate(id);
        self.events.push(GraphEvent::Added(id));
        Ok(id)
    }

    /// Adds several cells inside one `add` batch, so a paper restacks them
    /// once when the batch closes.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateKey`] at the first taken key. Cells
    /// added before it stay in the graph and the batch is still closed.
    pub fn add_cells<'a, I>(&mut self, cells: I) -> Result<Vec<CellId>, GraphError>
    where
        I: IntoIterator<Item = (CellKind, &'a str, Attributes)>,
    {
        self.start_batch("add");
        let added = cells
            .into_iter()
            .map(|(kind, key, attrs)| self.add_cell(kind, key, attrs))
            .collect();
        self.stop_batch("add");
        added
    }

    /// Removes a cell together with its embedded cells and every link
    /// attached to any of them.
    ///
    /// Returns `false` if the handle is stale.
    pub fn remove(&mut self, cell: CellId) -> bool {
        if !self.is_alive(cell) {
            return false;
        }
        self.start_batch("remove");
        let mut order = Vec::new();
        let mut seen = Vec::new();
        self.doom(cell, &mut order, &mut seen);
        for c in order {
            self.remove_one(c);
        }
        self.stop_batch("remove");
        true
    }

    /// Collects `cell`, its embedded cells and, first, every link attached to
    /// any of them (recursively, links of links included) in removal order.
    fn doom(&mut self, cell: CellId, order: &mut Vec<CellId>, seen: &mut Vec<CellId>) {
        if seen.contains(&cell) {
            return;
        }
        let mut group = Vec::from([cell]);
        group.extend(self.embedded_cells(cell));
        group.retain(|c| !seen.contains(c));
        seen.extend_from_slice(&group);
        for &c in &group {
            for link in self.connected_links(c) {
                self.doom(link, order, seen);
            }
        }
        order.extend(group.into_iter().rev());
    }

    fn remove_one(&mut self, cell: CellId) {
        if !self.is_alive(cell) {
            return;
        }
        let idx = cell.idx as usize;
        let Some(removed) = self.cells[idx].take() else {
            return;
        };
        self.keys.remove(&removed.key);
        self.dirty.remove_key(cell.idx);
        self.looped.retain(|&(link, end)| link != cell && end != cell);
        self.generation[idx] += 1;
        self.free_list.push(cell.idx);
        self.events.push(GraphEvent::Removed {
            cell,
            kind: removed.kind,
        });
    }

    /// Sets one attribute. Returns whether the value changed.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn set(&mut self, cell: CellId, name: &str, value: impl Into<Value>) -> bool {
        self.set_attrs(cell, [(name, value.into())])
    }

    /// Sets several attributes at once, producing a single change event.
    /// Returns whether any value changed.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale, or if a new `parent` would embed the
    /// cell in itself.
    pub fn set_attrs<'a, I>(&mut self, cell: CellId, updates: I) -> bool
    where
        I: IntoIterator<Item = (&'a str, Value)>,
    {
        self.validate(cell);
        let idx = cell.idx as usize;

        let mut changed: Vec<String> = Vec::new();
        let mut pending: Vec<(&'a str, Value)> = Vec::new();
        if let Some(current) = &self.cells[idx] {
            for (name, value) in updates {
                if current.attrs.get(name) != Some(&value) {
                    pending.push((name, value));
                }
            }
        }
        if pending.is_empty() {
            return false;
        }
        for (name, value) in &pending {
            if *name == attr::PARENT
                && let Some(parent) = value.as_cell()
            {
                assert!(
                    parent != cell && !self.embedded_cells(cell).contains(&parent),
                    "embedding cycle"
                );
            }
        }

        let relational = pending
            .iter()
            .any(|(name, _)| matches!(*name, attr::SOURCE | attr::TARGET | attr::PARENT));
        if relational {
            self.unrelate(cell);
        }
        if let Some(current) = &mut self.cells[idx] {
            for (name, value) in pending {
                current.attrs.insert(name.to_string(), value);
                changed.push(name.to_string());
            }
        }
        if relational {
            self.relate(cell);
        }

        self.events.push(GraphEvent::Changed { cell, changed });
        true
    }

    /// Embeds `child` into `parent`.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale.
    pub fn embed(&mut self, parent: CellId, child: CellId) -> bool {
        self.validate(parent);
        self.set(child, attr::PARENT, parent)
    }

    /// Returns the cell behind a handle.
    #[must_use]
    pub fn get(&self, cell: CellId) -> Option<&Cell> {
        if !self.is_alive(cell) {
            return None;
        }
        self.cells[cell.idx as usize].as_ref()
    }

    /// Looks a cell up by its external key.
    #[must_use]
    pub fn find(&self, key: &str) -> Option<CellId> {
        self.keys.get(key).copied()
    }

    /// Returns whether the handle refers to a live cell.
    #[must_use]
    pub fn is_alive(&self, cell: CellId) -> bool {
        (cell.idx as usize) < self.cells.len()
            && self.generation[cell.idx as usize] == cell.generation
            && self.cells[cell.idx as usize].is_some()
    }

    /// Iterates over live cells in slot order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.cells.iter().flatten()
    }

    /// Number of live cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns whether the graph has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Highest `z` in the graph, or `0` when empty.
    #[must_use]
    pub fn max_z(&self) -> f64 {
        self.cells().map(Cell::z).fold(0.0, f64::max)
    }

    // -- Relationships --

    /// Links whose source or target is `cell`, in slot order.
    ///
    /// Takes `&mut self` because the query drains the connection channel.
    pub fn connected_links(&mut self, cell: CellId) -> Vec<CellId> {
        let mut links = self.dependents(cell, dirty::CONNECTIONS);
        for &(link, end) in &self.looped {
            if end == cell && !links.contains(&link) {
                links.push(link);
            }
        }
        links.retain(|&link| {
            self.get(link)
                .is_some_and(|l| l.is_link() && l.is_connected_to(cell))
        });
        links.sort_by_key(|link| link.idx);
        links
    }

    /// Every cell embedded in `cell`, transitively.
    pub fn embedded_cells(&mut self, cell: CellId) -> Vec<CellId> {
        self.dependents(cell, dirty::EMBEDDING)
    }

    fn dependents(&mut self, cell: CellId, channel: understory_dirty::Channel) -> Vec<CellId> {
        if !self.is_alive(cell) {
            return Vec::new();
        }
        self.dirty.mark_with(cell.idx, channel, &EagerPolicy);
        let affected: Vec<u32> = self
            .dirty
            .drain(channel)
            .affected()
            .deterministic()
            .run()
            .collect();
        affected
            .into_iter()
            .filter(|&idx| idx != cell.idx)
            .filter_map(|idx| self.cells.get(idx as usize)?.as_ref().map(Cell::id))
            .collect()
    }

    /// Mirrors a cell's references as dependency edges.
    fn relate(&mut self, cell: CellId) {
        let Some(c) = self.get(cell) else {
            return;
        };
        let ends = [c.source(), c.target()];
        let parent = c.parent();
        for end in ends.into_iter().flatten() {
            if self.is_alive(end)
                && self
                    .dirty
                    .add_dependency(cell.idx, end.idx, dirty::CONNECTIONS)
                    .is_err()
            {
                self.looped.push((cell, end));
            }
        }
        if let Some(parent) = parent
            && self.is_alive(parent)
        {
            // `set_attrs` refuses embedding cycles up front.
            let _ = self.dirty.add_dependency(cell.idx, parent.idx, dirty::EMBEDDING);
        }
    }

    fn unrelate(&mut self, cell: CellId) {
        let Some(c) = self.get(cell) else {
            return;
        };
        let ends = [c.source(), c.target()];
        let parent = c.parent();
        for end in ends.into_iter().flatten() {
            self.dirty
                .remove_dependency(cell.idx, end.idx, dirty::CONNECTIONS);
        }
        self.looped.retain(|&(link, _)| link != cell);
        if let Some(parent) = parent {
            self.dirty
                .remove_dependency(cell.idx, parent.idx, dirty::EMBEDDING);
        }
    }

    // -- Batches --

    /// Opens a named batch. Batches of the same name nest.
    pub fn start_batch(&mut self, name: &str) {
        *self.batches.entry(name.to_string()).or_insert(0) += 1;
        self.events.push(GraphEvent::BatchStart(name.to_string()));
    }

    /// Closes a named batch.
    pub fn stop_batch(&mut self, name: &str) {
        if let Some(count) = self.batches.get_mut(name) {
            *count -= 1;
            if *count == 0 {
                self.batches.remove(name);
            }
        }
        self.events.push(GraphEvent::BatchStop(name.to_string()));
    }

    /// Returns whether any of the named batches is open.
    #[must_use]
    pub fn has_active_batch(&self, names: &[&str]) -> bool {
        names.iter().any(|name| self.batches.contains_key(*name))
    }

    /// Returns whether any batch is open.
    #[must_use]
    pub fn has_any_batch(&self) -> bool {
        !self.batches.is_empty()
    }

    // -- Change log --

    /// Takes every event recorded since the last drain.
    pub fn drain_events(&mut self) -> Vec<GraphEvent> {
        core::mem::take(&mut self.events)
    }

    /// Panics if the handle is stale.
    fn validate(&self, cell: CellId) {
        assert!(self.is_alive(cell), "stale CellId");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element_at(x: f64, y: f64) -> Attributes {
        let mut attrs = Attributes::new();
        attrs.insert(attr::POSITION.into(), Value::Point(Point::new(x, y)));
        attrs.insert(attr::SIZE.into(), Value::Size(Size::new(10.0, 10.0)));
        attrs
    }

    #[test]
    fn add_and_find() {
        let mut graph = Graph::new();
        let a = graph.add_element("a", element_at(0.0, 0.0)).unwrap();
        assert_eq!(graph.find("a"), Some(a));
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.drain_events(), [GraphEvent::Added(a)]);
        assert!(graph.drain_events().is_empty(), "drain empties the log");
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let mut graph = Graph::new();
        graph.add_element("a", Attributes::new()).unwrap();
        let err = graph.add_element("a", Attributes::new()).unwrap_err();
        assert_eq!(err, GraphError::DuplicateKey("a".into()));
    }

    #[test]
    fn cells_without_z_stack_on_top() {
        let mut graph = Graph::new();
        let a = graph.add_element("a", Attributes::new()).unwrap();
        let b = graph.add_element("b", Attributes::new()).unwrap();
        assert_eq!(graph.get(a).unwrap().z(), 1.0);
        assert_eq!(graph.get(b).unwrap().z(), 2.0);
    }

    #[test]
    fn only_real_changes_are_reported() {
        let mut graph = Graph::new();
        let a = graph.add_element("a", element_at(0.0, 0.0)).unwrap();
        graph.drain_events();

        assert!(!graph.set(a, attr::POSITION, Point::new(0.0, 0.0)));
        assert!(graph.drain_events().is_empty());

        let changed = graph.set_attrs(
            a,
            [
                (attr::POSITION, Value::Point(Point::new(5.0, 0.0))),
                (attr::SIZE, Value::Size(Size::new(10.0, 10.0))),
            ],
        );
        assert!(changed);
        assert_eq!(
            graph.drain_events(),
            [GraphEvent::Changed {
                cell: a,
                changed: Vec::from([String::from(attr::POSITION)]),
            }]
        );
    }

    #[test]
    fn connected_links_follow_endpoint_changes() {
        let mut graph = Graph::new();
        let a = graph.add_element("a", element_at(0.0, 0.0)).unwrap();
        let b = graph.add_element("b", element_at(50.0, 0.0)).unwrap();
        let c = graph.add_element("c", element_at(90.0, 0.0)).unwrap();
        let l = graph.add_link("l", Some(a), Some(b), Attributes::new()).unwrap();

        assert_eq!(graph.connected_links(a), [l]);
        assert_eq!(graph.connected_links(b), [l]);
        assert!(graph.connected_links(c).is_empty());

        graph.set(l, attr::TARGET, c);
        assert!(graph.connected_links(b).is_empty(), "old target detached");
        assert_eq!(graph.connected_links(c), [l]);
        assert_eq!(graph.connected_links(a), [l], "queries are repeatable");
    }

    #[test]
    fn remove_cascades_to_links_and_embeds() {
        let mut graph = Graph::new();
        let parent = graph.add_element("p", element_at(0.0, 0.0)).unwrap();
        let child = graph.add_element("c", element_at(1.0, 1.0)).unwrap();
        let other = graph.add_element("o", element_at(50.0, 0.0)).unwrap();
        graph.embed(parent, child);
        let l = graph
            .add_link("l", Some(child), Some(other), Attributes::new())
            .unwrap();
        graph.drain_events();

        assert!(graph.remove(parent));
        assert!(!graph.is_alive(parent));
        assert!(!graph.is_alive(child));
        assert!(!graph.is_alive(l));
        assert!(graph.is_alive(other));
        assert_eq!(graph.find("l"), None);

        let removed: Vec<CellId> = graph
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                GraphEvent::Removed { cell, .. } => Some(cell),
                _ => None,
            })
            .collect();
        assert_eq!(removed, [l, child, parent]);
        assert!(!graph.remove(parent), "second removal is a no-op");
    }

    #[test]
    fn links_pointing_at_each_other_are_removed_together() {
        let mut graph = Graph::new();
        let a = graph.add_element("a", element_at(0.0, 0.0)).unwrap();
        let b = graph.add_element("b", element_at(50.0, 0.0)).unwrap();
        let l1 = graph.add_link("l1", Some(a), Some(b), Attributes::new()).unwrap();
        let l2 = graph.add_link("l2", Some(l1), None, Attributes::new()).unwrap();
        graph.set(l1, attr::TARGET, l2);

        assert_eq!(graph.connected_links(l1), [l2]);
        assert_eq!(graph.connected_links(l2), [l1]);
        graph.drain_events();

        assert!(graph.remove(l2));
        assert!(!graph.is_alive(l1));
        assert!(!graph.is_alive(l2));
        assert!(graph.is_alive(a));
        assert!(graph.is_alive(b));
        let removed = graph
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GraphEvent::Removed { .. }))
            .count();
        assert_eq!(removed, 2);
        assert!(graph.connected_links(a).is_empty());
    }

    #[test]
    fn retargeting_a_looped_link_detaches_it() {
        let mut graph = Graph::new();
        let a = graph.add_element("a", element_at(0.0, 0.0)).unwrap();
        let l1 = graph.add_link("l1", Some(a), None, Attributes::new()).unwrap();
        let l2 = graph.add_link("l2", Some(l1), None, Attributes::new()).unwrap();
        graph.set(l1, attr::TARGET, l2);
        assert_eq!(graph.connected_links(l2), [l1]);

        graph.set(l1, attr::TARGET, a);
        assert!(graph.connected_links(l2).is_empty());
        assert_eq!(graph.connected_links(a), [l1]);
    }

    #[test]
    #[should_panic(expected = "embedding cycle")]
    fn embedding_an_ancestor_panics() {
        let mut graph = Graph::new();
        let outer = graph.add_element("outer", Attributes::new()).unwrap();
        let inner = graph.add_element("inner", Attributes::new()).unwrap();
        graph.embed(outer, inner);
        graph.embed(inner, outer);
    }

    #[test]
    fn add_cells_runs_inside_an_add_batch() {
        let mut graph = Graph::new();
        let ids = graph
            .add_cells([
                (CellKind::Element, "a", Attributes::new()),
                (CellKind::Element, "b", Attributes::new()),
            ])
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert!(!graph.has_any_batch());
        assert_eq!(
            graph.drain_events(),
            [
                GraphEvent::BatchStart("add".into()),
                GraphEvent::Added(ids[0]),
                GraphEvent::Added(ids[1]),
                GraphEvent::BatchStop("add".into()),
            ]
        );

        let err = graph
            .add_cells([
                (CellKind::Element, "c", Attributes::new()),
                (CellKind::Element, "a", Attributes::new()),
            ])
            .unwrap_err();
        assert_eq!(err, GraphError::DuplicateKey("a".into()));
        assert!(!graph.has_any_batch(), "batch closed on error");
        assert!(graph.find("c").is_some());
    }

    #[test]
    fn batches_nest_by_name() {
        let mut graph = Graph::new();
        graph.start_batch("translate");
        graph.start_batch("translate");
        graph.stop_batch("translate");
        assert!(graph.has_active_batch(&["add", "translate"]));
        graph.stop_batch("translate");
        assert!(!graph.has_active_batch(&["translate"]));
        assert!(!graph.has_any_batch());
    }

    #[test]
    fn element_bbox_from_position_and_size() {
        let mut graph = Graph::new();
        let a = graph.add_element("a", element_at(10.0, 20.0)).unwrap();
        let l = graph.add_link("l", Some(a), None, Attributes::new()).unwrap();
        assert_eq!(
            graph.get(a).unwrap().bbox(),
            Some(Rect::new(10.0, 20.0, 20.0, 30.0))
        );
        assert_eq!(graph.get(l).unwrap().bbox(), None);
    }

    #[test]
    #[should_panic(expected = "stale CellId")]
    fn set_on_removed_cell_panics() {
        let mut graph = Graph::new();
        let a = graph.add_element("a", Attributes::new()).unwrap();
        graph.remove(a);
        graph.set(a, attr::Z, 3.0);
    }
}
