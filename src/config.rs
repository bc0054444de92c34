// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Overlay Timeline Authors

//! Timeline-level configuration.
//!
//! [`TimelineConfig`] is the single entry point for tuning the timeline at
//! construction time. All fields have sensible defaults so that
//! `TimelineConfig::default()` is always a valid starting point.

use serde::{Deserialize, Serialize};

/// Top-level configuration for [`crate::timeline::Timeline`].
///
/// # Examples
///
/// ```rust
/// use overlay_timeline::config::TimelineConfig;
///
/// let config = TimelineConfig {
///     dedupe_triplets: false,
///     ..TimelineConfig::default()
/// };
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineConfig {
    /// When `true` (the default), `authorize`/`revoke` containers dedupe
    /// identical `(member, meta, permission)` triplets before applying —
    /// first occurrence wins. Set `false` only to reproduce the un-deduped
    /// source behaviour for conformance testing.
    pub dedupe_triplets: bool,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self { dedupe_triplets: true }
    }
}
