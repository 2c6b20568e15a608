// Copyright 2026 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Change-category bitmasks and per-kind flag tables.
//!
//! Every view kind declares which model attributes feed which change
//! categories ("labels"). A [`FlagTable`] assigns each distinct label its own
//! bit, in declaration order, and maps each attribute to the OR of its labels'
//! bits. The scheduler only ever sees the resulting [`Flags`] bitmasks.
//!
//! Bits 28 to 30 are reserved for the scheduler itself ([`FLAG_INIT`],
//! [`FLAG_REMOVE`], [`FLAG_INSERT`]), which leaves room for at most
//! [`MAX_LABELS`] labels per kind.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use hashbrown::HashMap;

/// A bitmask of pending change categories.
pub type Flags = u32;

/// The view has to be (re)attached to the layer container.
pub const FLAG_INSERT: Flags = 1 << 30;

/// The view has to be destroyed.
pub const FLAG_REMOVE: Flags = 1 << 29;

/// The pending insert is the first one for this view.
pub const FLAG_INIT: Flags = 1 << 28;

/// Mask of all scheduler-reserved bits.
pub const RESERVED_FLAGS: Flags = FLAG_INSERT | FLAG_REMOVE | FLAG_INIT;

/// Maximum number of distinct labels a single view kind may declare.
pub const MAX_LABELS: usize = 25;

/// Error returned when a flag table cannot be built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FlagError {
    /// More than [`MAX_LABELS`] distinct labels were declared.
    TooManyLabels {
        /// Number of distinct labels in the declaration.
        count: usize,
    },
}

impl fmt::Display for FlagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyLabels { count } => write!(
                f,
                "view kind declares {count} change labels, at most {MAX_LABELS} are supported"
            ),
        }
    }
}

impl core::error::Error for FlagError {}

/// Resolved label and attribute bits for one view kind.
///
/// Built once per kind with [`FlagTable::new`]. Identical declarations always
/// produce identical bit assignments.
#[derive(Clone, Debug)]
pub struct FlagTable {
    labels: Vec<(String, Flags)>,
    by_label: HashMap<String, Flags>,
    by_attribute: HashMap<String, Flags>,
    init: Flags,
}

impl FlagTable {
    /// Builds a table from `(attribute, labels)` pairs and the labels that
    /// make up the kind's initial update.
    ///
    /// Labels receive bits in first-seen order; labels that only appear in
    /// `init` are assigned after every attribute label.
    ///
    /// # Errors
    ///
    /// Returns [`FlagError::TooManyLabels`] when more than [`MAX_LABELS`]
    /// distinct labels are declared.
    pub fn new(attributes: &[(&str, &[&str])], init: &[&str]) -> Result<Self, FlagError> {
        let mut table = Self {
            labels: Vec::new(),
            by_label: HashMap::new(),
            by_attribute: HashMap::new(),
            init: 0,
        };

        for &(attribute, labels) in attributes {
            let mut mask = 0;
            for label in labels {
                mask |= table.assign(label);
            }
            *table.by_attribute.entry(attribute.to_string()).or_insert(0) |= mask;
        }
        for label in init {
            let bit = table.assign(label);
            table.init |= bit;
        }

        if table.labels.len() > MAX_LABELS {
            return Err(FlagError::TooManyLabels {
                count: table.labels.len(),
            });
        }
        Ok(table)
    }

    fn assign(&mut self, label: &str) -> Flags {
        if let Some(&bit) = self.by_label.get(label) {
            return bit;
        }
        let shift = self.labels.len();
        // Bits past the limit are never handed out; `new` rejects the table.
        let bit = if shift < MAX_LABELS { 1 << shift } else { 0 };
        self.labels.push((label.to_string(), bit));
        self.by_label.insert(label.to_string(), bit);
        bit
    }

    /// Returns the bit of a single label, or `0` for an unknown label.
    #[must_use]
    pub fn get_flag(&self, label: &str) -> Flags {
        self.by_label.get(label).copied().unwrap_or(0)
    }

    /// Returns the OR of the bits of several labels.
    #[must_use]
    pub fn get_flags(&self, labels: &[&str]) -> Flags {
        labels.iter().fold(0, |mask, label| mask | self.get_flag(label))
    }

    /// Returns the bits mapped to a model attribute, or `0` if none are.
    #[must_use]
    pub fn attribute_flag(&self, attribute: &str) -> Flags {
        self.by_attribute.get(attribute).copied().unwrap_or(0)
    }

    /// Returns the bits of the kind's initial update.
    #[must_use]
    pub const fn init_flag(&self) -> Flags {
        self.init
    }

    /// Returns the OR of the bits of every attribute that actually changed.
    pub fn change_flag<'a, I>(&self, changed: I) -> Flags
    where
        I: IntoIterator<Item = &'a str>,
    {
        changed
            .into_iter()
            .fold(0, |mask, attribute| mask | self.attribute_flag(attribute))
    }

    /// Returns whether `mask` contains the bit of `label`.
    #[must_use]
    pub fn has_flag(&self, mask: Flags, label: &str) -> bool {
        mask & self.get_flag(label) != 0
    }

    /// Clears the bits of `labels` from `mask`.
    #[must_use]
    pub fn remove_flag(&self, mask: Flags, labels: &[&str]) -> Flags {
        mask & !self.get_flags(labels)
    }

    /// Iterates over `(label, bit)` pairs in assignment order.
    pub fn labels(&self) -> impl Iterator<Item = (&str, Flags)> + '_ {
        self.labels.iter().map(|(label, bit)| (label.as_str(), *bit))
    }

    /// Returns the number of distinct labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Returns whether no labels were declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
