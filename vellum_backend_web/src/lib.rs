// Copyright 2026 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Web backend for vellum.
//!
//! This crate provides integration with browser APIs:
//!
//! - [`RafTicks`]: `requestAnimationFrame` tick source for frame-paced
//!   scheduling
//! - [`window_viewport`]: the visible part of the page as a culling viewport

#![no_std]

extern crate alloc;

mod raf;

pub use raf::RafTicks;

use kurbo::Rect;
use vellum_core::time::{HostTime, Timebase};
use vellum_core::viewport::RectViewport;

/// Returns the current host time from `performance.now()`.
///
/// The returned [`HostTime`] is in microsecond ticks, the same units as the
/// ticks delivered by [`RafTicks`]. Use [`timebase`] to convert to
/// nanoseconds.
#[must_use]
pub fn now() -> HostTime {
    raf::ms_to_host_time(raf::performance_now())
}

/// Returns the web [`Timebase`]: 1 tick = 1 µs = 1000 ns.
#[must_use]
pub fn timebase() -> Timebase {
    Timebase::MICROS
}

/// Returns the scrolled window area in page coordinates as a viewport.
///
/// Returns `None` outside a browser window context.
#[must_use]
pub fn window_viewport(padding: f64) -> Option<RectViewport> {
    let window = web_sys::window()?;
    let width = window.inner_width().ok()?.as_f64()?;
    let height = window.inner_height().ok()?.as_f64()?;
    let x = window.scroll_x().ok()?;
    let y = window.scroll_y().ok()?;
    Some(RectViewport::new(Rect::new(x, y, x + width, y + height)).with_padding(padding))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timebase_is_microsecond() {
        let tb = timebase();
        // 1 tick = 1 µs = 1000 ns
        assert_eq!(tb.ticks_to_nanos(1), 1000);
        assert_eq!(tb.ticks_to_nanos(1_000_000), 1_000_000_000);
    }

    #[test]
    fn timestamps_convert_to_microseconds() {
        assert_eq!(raf::ms_to_host_time(16.5), HostTime(16_500));
        assert_eq!(raf::ms_to_host_time(0.0), HostTime(0));
    }
}
