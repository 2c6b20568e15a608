// Copyright 2026 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared ownership of a trace sink.
//!
//! A scheduler takes its sink by `Box<dyn TraceSink>`, which leaves no way to
//! get a concrete sink back out. [`SharedSink`] keeps the sink behind an
//! `Rc<RefCell<_>>`: install one clone on the scheduler and keep the other to
//! inspect what was recorded.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use vellum_core::trace::{
    BatchEvent, FrameEvent, FreezeEvent, PostponeEvent, RenderDoneEvent, SortEvent, TraceSink,
    ViewEvent,
};

/// A cloneable [`TraceSink`] handle around an inner sink.
#[derive(Debug, Default)]
pub struct SharedSink<S> {
    inner: Rc<RefCell<S>>,
}

impl<S> Clone for SharedSink<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S: TraceSink> SharedSink<S> {
    /// Wraps `sink`.
    #[must_use]
    pub fn new(sink: S) -> Self {
        Self {
            inner: Rc::new(RefCell::new(sink)),
        }
    }

    /// Borrows the inner sink.
    ///
    /// # Panics
    ///
    /// Panics if the sink is being written to.
    #[must_use]
    pub fn borrow(&self) -> Ref<'_, S> {
        self.inner.borrow()
    }

    /// Mutably borrows the inner sink.
    ///
    /// # Panics
    ///
    /// Panics if the sink is already borrowed.
    #[must_use]
    pub fn borrow_mut(&self) -> RefMut<'_, S> {
        self.inner.borrow_mut()
    }

    /// Returns a boxed clone, ready for
    /// [`Scheduler::set_trace_sink`](vellum_core::scheduler::Scheduler::set_trace_sink).
    #[must_use]
    pub fn boxed(&self) -> Box<dyn TraceSink>
    where
        S: 'static,
    {
        Box::new(self.clone())
    }
}

impl<S: TraceSink> TraceSink for SharedSink<S> {
    fn on_frame(&mut self, e: &FrameEvent) {
        self.inner.borrow_mut().on_frame(e);
    }

    fn on_batch(&mut self, e: &BatchEvent) {
        self.inner.borrow_mut().on_batch(e);
    }

    fn on_render_begin(&mut self) {
        self.inner.borrow_mut().on_render_begin();
    }

    fn on_render_done(&mut self, e: &RenderDoneEvent) {
        self.inner.borrow_mut().on_render_done(e);
    }

    fn on_view(&mut self, e: &ViewEvent) {
        self.inner.borrow_mut().on_view(e);
    }

    fn on_postpone(&mut self, e: &PostponeEvent) {
        self.inner.borrow_mut().on_postpone(e);
    }

    fn on_freeze(&mut self, e: &FreezeEvent) {
        self.inner.borrow_mut().on_freeze(e);
    }

    fn on_sort(&mut self, e: &SortEvent) {
        self.inner.borrow_mut().on_sort(e);
    }

    fn on_idle(&mut self) {
        self.inner.borrow_mut().on_idle();
    }
}
