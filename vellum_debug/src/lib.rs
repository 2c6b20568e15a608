// Copyright 2026 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording, pretty-printing, and Chrome trace export for vellum scheduler
//! diagnostics.
//!
//! This crate provides [`TraceSink`](vellum_core::trace::TraceSink)
//! implementations for development and post-mortem analysis:
//!
//! - [`pretty::PrettyPrintSink`]: human-readable one-line-per-event output.
//! - [`recorder::RecorderSink`]: compact binary recording with
//!   [`recorder::decode`] for playback.
//! - [`chrome::export`]: writes Chrome Trace Event Format JSON from recorded
//!   bytes.
//! - [`shared::SharedSink`]: a cloneable handle, so a sink installed on a
//!   scheduler can still be read from outside it.

pub mod chrome;
pub mod pretty;
pub mod recorder;
pub mod shared;
