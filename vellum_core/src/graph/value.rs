// Copyright 2026 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Attribute values.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use kurbo::{Point, Size};

use super::id::CellId;

/// An attribute map, ordered by name.
pub type Attributes = BTreeMap<String, Value>;

/// A cell attribute value.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// No value.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// A number.
    Number(f64),
    /// A string.
    Text(String),
    /// A position.
    Point(Point),
    /// A size.
    Size(Size),
    /// A reference to another cell.
    Cell(CellId),
    /// A list of values.
    List(Vec<Self>),
}

impl Value {
    /// Returns the number, if this is one.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the point, if this is one.
    #[must_use]
    pub fn as_point(&self) -> Option<Point> {
        match self {
            Self::Point(p) => Some(*p),
            _ => None,
        }
    }

    /// Returns the size, if this is one.
    #[must_use]
    pub fn as_size(&self) -> Option<Size> {
        match self {
            Self::Size(s) => Some(*s),
            _ => None,
        }
    }

    /// Returns the referenced cell, if this is a reference.
    #[must_use]
    pub fn as_cell(&self) -> Option<CellId> {
        match self {
            Self::Cell(c) => Some(*c),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.into())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Point> for Value {
    fn from(v: Point) -> Self {
        Self::Point(v)
    }
}

impl From<Size> for Value {
    fn from(v: Size) -> Self {
        Self::Size(v)
    }
}

impl From<CellId> for Value {
    fn from(v: CellId) -> Self {
        Self::Cell(v)
    }
}
