// Copyright 2026 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `requestAnimationFrame` tick source.
//!
//! [`RafTicks`] implements [`TickSource`] on top of the browser's
//! `requestAnimationFrame` API. Each requested tick registers one callback;
//! when it runs, the [`DOMHighResTimeStamp`][mdn] (milliseconds) is converted
//! to microsecond [`HostTime`] ticks and the resulting [`FrameTick`] is handed
//! to the user callback, which forwards it to the scheduler.
//!
//! [mdn]: https://developer.mozilla.org/en-US/docs/Web/API/DOMHighResTimeStamp
//! [`HostTime`]: vellum_core::time::HostTime

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::{Cell, RefCell};

use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;

use vellum_core::tick::{FrameTick, TickId, TickSource};
use vellum_core::time::HostTime;

// Direct global bindings instead of `web_sys::Window` methods, so no Window
// object has to be fetched on every frame.
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = performance, js_name = "now")]
    pub(crate) fn performance_now() -> f64;

    #[wasm_bindgen(js_name = "requestAnimationFrame")]
    fn request_animation_frame(callback: &JsValue) -> i32;

    #[wasm_bindgen(js_name = "cancelAnimationFrame")]
    fn cancel_animation_frame(id: i32);
}

/// Converts a millisecond `DOMHighResTimeStamp` to microsecond ticks.
pub(crate) fn ms_to_host_time(ms: f64) -> HostTime {
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "timestamps are small positive f64; µs fits in u64"
    )]
    let us = (ms * 1000.0) as u64;
    HostTime(us)
}

/// A [`TickSource`] backed by `requestAnimationFrame`.
///
/// At most one frame is outstanding. Requesting a tick while one is pending
/// replaces it.
///
/// ```ignore
/// let paper = Rc::new(RefCell::new(None::<Paper<RafTicks>>));
/// let target = Rc::clone(&paper);
/// let ticks = RafTicks::new(move |tick| {
///     if let Some(paper) = target.borrow_mut().as_mut() {
///         _ = paper.run_frame(tick);
///     }
/// });
/// *paper.borrow_mut() = Some(Paper::new(PaperOptions::frame_paced(), ticks));
/// ```
pub struct RafTicks {
    inner: Rc<RafInner>,
}

type RafClosure = Closure<dyn FnMut(f64)>;

struct RafInner {
    /// The JS closure registered with `requestAnimationFrame`.
    closure: RefCell<Option<RafClosure>>,

    /// Receives each delivered tick.
    callback: RefCell<Box<dyn FnMut(FrameTick)>>,

    /// Next [`TickId`] to hand out.
    next_id: Cell<u64>,

    /// Monotonically increasing frame counter (becomes `FrameTick::frame_index`).
    frame_counter: Cell<u64>,

    /// The outstanding request and the browser's handle for it.
    pending: Cell<Option<(TickId, i32)>>,
}

impl RafTicks {
    /// Creates a tick source with nothing requested yet.
    ///
    /// `callback` runs inside the animation frame with the [`FrameTick`] for
    /// the request it answers.
    pub fn new(callback: impl FnMut(FrameTick) + 'static) -> Self {
        let inner = Rc::new(RafInner {
            closure: RefCell::new(None),
            callback: RefCell::new(Box::new(callback)),
            next_id: Cell::new(0),
            frame_counter: Cell::new(0),
            pending: Cell::new(None),
        });

        let weak = Rc::downgrade(&inner);
        let closure = Closure::wrap(Box::new(move |timestamp_ms: f64| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            // Cancelled or replaced after the browser queued us.
            let Some((id, _)) = inner.pending.take() else {
                return;
            };

            let frame_index = inner.frame_counter.get();
            inner.frame_counter.set(frame_index + 1);

            let tick = FrameTick {
                id,
                frame_index,
                now: ms_to_host_time(timestamp_ms),
            };
            inner.callback.borrow_mut()(tick);
        }) as Box<dyn FnMut(f64)>);
        *inner.closure.borrow_mut() = Some(closure);

        Self { inner }
    }

    /// Returns whether a frame is outstanding.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.inner.pending.get().is_some()
    }

    /// Number of frames delivered so far.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.inner.frame_counter.get()
    }
}

impl TickSource for RafTicks {
    fn request_tick(&mut self) -> TickId {
        if let Some((_, handle)) = self.inner.pending.take() {
            cancel_animation_frame(handle);
        }
        let id = TickId(self.inner.next_id.get());
        self.inner.next_id.set(id.0 + 1);
        if let Some(ref closure) = *self.inner.closure.borrow() {
            let handle = request_animation_frame(closure.as_ref().unchecked_ref());
            self.inner.pending.set(Some((id, handle)));
        }
        id
    }

    fn cancel_tick(&mut self, id: TickId) {
        if let Some((pending, handle)) = self.inner.pending.get()
            && pending == id
        {
            self.inner.pending.set(None);
            cancel_animation_frame(handle);
        }
    }
}

impl Drop for RafTicks {
    fn drop(&mut self) {
        if let Some((_, handle)) = self.inner.pending.take() {
            cancel_animation_frame(handle);
        }
        // Drop the JS closure so it doesn't leak.
        self.inner.closure.borrow_mut().take();
    }
}

impl core::fmt::Debug for RafTicks {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RafTicks")
            .field("pending", &self.inner.pending.get())
            .field("frame_counter", &self.inner.frame_counter.get())
            .finish_non_exhaustive()
    }
}
