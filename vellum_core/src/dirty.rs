// Copyright 2026 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dependency channels of the model graph.
//!
//! The [`Graph`](crate::graph::Graph) records cell relationships as
//! dependency edges in an [`understory_dirty`] tracker and answers
//! relationship queries by marking a cell eagerly and draining the channel.
//!
//! - [`CONNECTIONS`]: a link depends on its source and target cells. Marking
//!   a cell yields every link attached to it, which is how connected link
//!   views are found when an element view changes.
//! - [`EMBEDDING`]: an embedded cell depends on its parent. Marking a cell
//!   yields its whole embedded subtree, which is removed along with it.
//!
//! Both channels are marked with
//! [`EagerPolicy`](understory_dirty::EagerPolicy) and drained immediately, so
//! no dirty state survives between graph operations.

use understory_dirty::Channel;

/// Link to endpoint cell.
pub const CONNECTIONS: Channel = Channel::new(0);

/// Embedded cell to parent cell.
pub const EMBEDDING: Channel = Channel::new(1);
