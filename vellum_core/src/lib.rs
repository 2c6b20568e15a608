// Copyright 2026 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Incremental view-update scheduling for diagram engines.
//!
//! `vellum_core` keeps the renderable views of a diagram model in sync with
//! the model under a continuous stream of mutations. It decides when, in
//! what order, and whether at all each view is synchronized, honoring
//! cross-view dependencies (a link view needs its end views mounted), a
//! viewport of visible content, and both synchronous and frame-paced
//! execution. It is `no_std` compatible (with `alloc`).
//!
//! # Architecture
//!
//! ```text
//!   Graph::set() ──► GraphEvent::Changed ──► FlagTable::change_flag()
//!                                                   │
//!                 ┌─────────────────────────────────┘
//!                 ▼
//!   Scheduler::schedule_view_update() ──► pending table
//!                                             │
//!       sync: update_views()  /  frame-paced: on_frame(FrameTick)
//!                                             │
//!                 ┌───────────────────────────┘
//!                 ▼
//!   Viewport::is_visible() ──► mount / unmount ──► View::confirm_update()
//!                                                       │
//!                             leftover bits ◄───────────┘
//! ```
//!
//! **[`flags`]**: per-kind flag tables mapping attribute names to bits.
//!
//! **[`view`]**: the [`View`](view::View) contract and headless reference
//! element and link views.
//!
//! **[`scheduler`]**: the pending-update table, batches, freezing, the
//! frame loop, and the mounted/unmounted sets.
//!
//! **[`viewport`]**: culling predicates.
//!
//! **[`zorder`]**: stacking order of mounted views in a struct-of-arrays
//! layer container.
//!
//! **[`graph`]**: the diagram model, with relationships tracked via
//! `understory_dirty` (see [`dirty`]).
//!
//! **[`paper`]**: the engine tying a graph to its views.
//!
//! **[`tick`]** and **[`time`]**: frame tick sources and timestamps.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! scheduler instrumentation, with zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod dirty;
pub mod flags;
pub mod graph;
pub mod paper;
pub mod scheduler;
pub mod tick;
pub mod time;
pub mod trace;
pub mod view;
pub mod viewport;
pub mod zorder;
