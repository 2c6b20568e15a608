// Copyright 2026 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scheduler configuration and per-call options.

use super::MOUNT_BATCH_SIZE;

/// How mounted views are kept in stacking order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Sorting {
    /// Views are appended as they mount. `z` is ignored.
    None,
    /// Each view is inserted in front of a placeholder for its `z` value.
    ///
    /// Inserting is O(log n) and the order is exact by `z`, but views that
    /// share a `z` stay in mount order.
    #[default]
    Approximate,
    /// Views are appended and a full stable sort by `z` runs after
    /// z-affecting batches.
    Exact,
}

/// Configuration for the [`Scheduler`](super::Scheduler).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerOptions {
    /// Stacking policy.
    pub sorting: Sorting,
    /// Start frozen.
    pub frozen: bool,
    /// Frame-paced (asynchronous) mode.
    pub async_mode: bool,
    /// Maximum entries consumed per batch. `None` means unbounded.
    pub batch_size: Option<usize>,
    /// Maximum views moved between the mounted and unmounted sets per frame.
    pub mount_batch_size: usize,
    /// Freeze automatically once a frame finds nothing to do.
    pub auto_freeze: bool,
}

impl SchedulerOptions {
    /// Synchronous flushing: every request is applied before it returns.
    #[must_use]
    pub const fn sync() -> Self {
        Self {
            sorting: Sorting::Approximate,
            frozen: false,
            async_mode: false,
            batch_size: None,
            mount_batch_size: MOUNT_BATCH_SIZE,
            auto_freeze: false,
        }
    }

    /// Frame-paced flushing: one bounded batch per frame tick.
    #[must_use]
    pub const fn frame_paced() -> Self {
        Self {
            sorting: Sorting::Approximate,
            frozen: false,
            async_mode: true,
            batch_size: Some(1000),
            mount_batch_size: MOUNT_BATCH_SIZE,
            auto_freeze: false,
        }
    }

    /// Returns a copy with `sorting` replaced.
    #[must_use]
    pub const fn with_sorting(mut self, sorting: Sorting) -> Self {
        self.sorting = sorting;
        self
    }

    /// Returns a copy that starts frozen.
    #[must_use]
    pub const fn frozen(mut self) -> Self {
        self.frozen = true;
        self
    }

    /// Returns a copy with `batch_size` replaced.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: Option<usize>) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Returns a copy with auto-freezing enabled.
    #[must_use]
    pub const fn auto_freeze(mut self) -> Self {
        self.auto_freeze = true;
        self
    }
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self::sync()
    }
}

/// Which viewport decision a flush applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    /// Ask the viewport hook.
    #[default]
    Hooks,
    /// Reuse the last decision: views in the unmounted set stay culled,
    /// every other view counts as visible.
    KeepCurrent,
    /// Treat every view as visible.
    All,
}

/// Options for one scheduling or flushing call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct UpdateOptions {
    /// Suppress render callbacks.
    pub silent: bool,
    /// Override the configured batch size.
    pub batch_size: Option<usize>,
    /// The update comes from admitting a culled view.
    pub mounting: bool,
    /// Do not propagate the update to dependent views.
    pub isolate: bool,
    /// Flush synchronously even in frame-paced mode.
    pub force_sync: bool,
    /// Override the per-frame admission budget.
    pub mount_batch_size: Option<usize>,
    /// Override the per-frame eviction budget.
    pub unmount_batch_size: Option<usize>,
    /// Viewport decision to apply.
    pub visibility: Visibility,
}

impl UpdateOptions {
    /// Options that suppress render callbacks.
    #[must_use]
    pub const fn silent() -> Self {
        Self {
            silent: true,
            batch_size: None,
            mounting: false,
            isolate: false,
            force_sync: false,
            mount_batch_size: None,
            unmount_batch_size: None,
            visibility: Visibility::Hooks,
        }
    }

    /// Options that do not propagate to dependent views.
    #[must_use]
    pub const fn isolated() -> Self {
        let mut opt = Self::silent();
        opt.silent = false;
        opt.isolate = true;
        opt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_differ_only_in_pacing() {
        let sync = SchedulerOptions::sync();
        let paced = SchedulerOptions::frame_paced();
        assert!(!sync.async_mode);
        assert!(paced.async_mode);
        assert_eq!(sync.batch_size, None);
        assert_eq!(paced.mount_batch_size, MOUNT_BATCH_SIZE);
        assert_eq!(SchedulerOptions::default(), sync);
    }

    #[test]
    fn builders_compose() {
        let opts = SchedulerOptions::sync()
            .with_sorting(Sorting::Exact)
            .with_batch_size(Some(2))
            .frozen()
            .auto_freeze();
        assert_eq!(opts.sorting, Sorting::Exact);
        assert_eq!(opts.batch_size, Some(2));
        assert!(opts.frozen && opts.auto_freeze);
    }
}
