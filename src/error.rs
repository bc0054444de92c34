// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Overlay Timeline Authors

//! The typed, fatal-programmer-error surface (see spec §7 / §12).
//!
//! Ordinary allow/deny verdicts are never an `Err` — they are carried as the
//! `bool` in a `(bool, Vec<Proof>)` / `Ok` result. `TimelineError` exists only
//! for the closed set of cases that indicate a caller or data-model bug: two
//! mutations fighting over the same `(member, key, global_time)`, or a
//! non-positive `global_time`.

use alloc::string::String;

/// Fatal, unrecoverable-to-the-current-operation errors raised by the
/// timeline. None of these represent a normal "not allowed" outcome.
///
/// # Examples
///
/// ```rust
/// use overlay_timeline::error::TimelineError;
///
/// let err = TimelineError::NonPositiveGlobalTime { global_time: 0 };
/// assert_eq!(err.to_string(), "global_time must be > 0, got 0");
/// ```
#[cfg_attr(feature = "std", derive(thiserror::Error))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineError {
    /// Two mutations at the same `global_time` set opposite `allowed`
    /// values for the same `(member, key)`. The timeline refuses the
    /// mutation and leaves the ledger unchanged; resolving the conflict
    /// requires packet-byte-ordering input this layer does not have.
    #[cfg_attr(
        feature = "std",
        error(
            "conflicting grant/revoke for member {member_id} key \"{key}\" at time {global_time}"
        )
    )]
    ConflictingGrantRevoke {
        member_id: u64,
        key: String,
        global_time: u64,
    },

    /// `global_time` must be strictly positive; the caller supplied zero.
    #[cfg_attr(feature = "std", error("global_time must be > 0, got {global_time}"))]
    NonPositiveGlobalTime { global_time: u64 },
}

#[cfg(not(feature = "std"))]
impl core::fmt::Display for TimelineError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TimelineError::ConflictingGrantRevoke { member_id, key, global_time } => write!(
                f,
                "conflicting grant/revoke for member {member_id} key \"{key}\" at time {global_time}"
            ),
            TimelineError::NonPositiveGlobalTime { global_time } => {
                write!(f, "global_time must be > 0, got {global_time}")
            }
        }
    }
}
