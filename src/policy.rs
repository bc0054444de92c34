// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Overlay Timeline Authors

//! Dynamic-resolution policy log.
//!
//! [`PolicyLog`] exposes two operations only:
//!
//! * [`get_resolution_policy`](PolicyLog::get_resolution_policy) — read the
//!   effective policy for a message type at a logical time
//! * [`change_resolution_policy`](PolicyLog::change_resolution_policy) —
//!   record a new policy, effective strictly after its own `global_time`
//!
//! The log never deletes entries and never reorders existing buckets other
//! than to keep them sorted by `global_time` as new ones are inserted.

use alloc::string::String;
use alloc::vec::Vec;
use hashbrown::HashMap;

use crate::types::{MessageMeta, Policy, PolicyEntry, Proof, Resolution};

/// Community-wide ordered log of dynamic-resolution policy changes.
///
/// # Examples
///
/// ```rust
/// # use overlay_timeline::policy::PolicyLog;
/// let log = PolicyLog::new();
/// assert!(log.buckets().is_empty());
/// ```
#[derive(Debug, Default, Clone)]
pub struct PolicyLog {
    /// Sorted ascending by `global_time`; one bucket per distinct time.
    buckets: Vec<(u64, HashMap<String, PolicyEntry>)>,
}

impl PolicyLog {
    /// Create an empty policy log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow the raw bucket list (debugging / `printer`-style dumps).
    pub fn buckets(&self) -> &[(u64, HashMap<String, PolicyEntry>)] {
        &self.buckets
    }

    /// Return the effective policy (and its proofs) for `message_meta` at
    /// `global_time`.
    ///
    /// Scans buckets in reverse chronological order and returns the first
    /// bucket whose `policy_time < global_time` (strict) and that carries a
    /// key for `message_meta.name`. Falls back to `message_meta.resolution`'s
    /// declared default with no proofs when nothing qualifies.
    ///
    /// The strict inequality means a policy change recorded *at* `global_time`
    /// does not apply to governance recorded at that same time — this is
    /// what prevents a policy-change record from retroactively validating
    /// itself.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use overlay_timeline::policy::PolicyLog;
    /// use overlay_timeline::types::{MessageMeta, Resolution, AuthenticationKind, Policy};
    ///
    /// let log = PolicyLog::new();
    /// let meta = MessageMeta::new("msg-y", Resolution::Dynamic { default: Policy::Public }, AuthenticationKind::Single);
    ///
    /// let (policy, proofs) = log.get_resolution_policy(&meta, 50);
    /// assert_eq!(policy, Policy::Public);
    /// assert!(proofs.is_empty());
    /// ```
    pub fn get_resolution_policy(&self, message_meta: &MessageMeta, global_time: u64) -> (Policy, Vec<Proof>) {
        let key = crate::types::permission_key("resolution", &message_meta.name);

        for (policy_time, policies) in self.buckets.iter().rev() {
            if *policy_time < global_time {
                if let Some(entry) = policies.get(&key) {
                    tracing_debug_policy_hit(*policy_time, global_time, &key);
                    return (entry.policy, entry.proofs.clone());
                }
            }
        }

        let default = match message_meta.resolution {
            Resolution::Dynamic { default } => default,
            Resolution::Public => Policy::Public,
            Resolution::Linear => Policy::Linear,
        };
        tracing_debug_policy_default(global_time, &key);
        (default, Vec::new())
    }

    /// Record that `policy` governs `message_meta` from `global_time`
    /// onward (exclusive of `global_time` itself — see
    /// [`get_resolution_policy`](Self::get_resolution_policy)).
    ///
    /// If a bucket already exists for `global_time`, the field is
    /// overwritten; the source tags concurrent policy changes at one time as
    /// an unresolved ordering question, inherited here unchanged.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use overlay_timeline::policy::PolicyLog;
    /// use overlay_timeline::types::{MessageMeta, Resolution, AuthenticationKind, Policy, MessageImpl, Authentication, Member, ResolutionInstance, Payload};
    ///
    /// let mut log = PolicyLog::new();
    /// let meta = MessageMeta::new("msg-y", Resolution::Dynamic { default: Policy::Public }, AuthenticationKind::Single);
    /// let member = Member::new([1u8; 20], 1);
    /// let proof: Arc<MessageImpl> = Arc::new(MessageImpl {
    ///     name: "dispersy-dynamic-settings".into(),
    ///     meta: meta.clone(),
    ///     authentication: Authentication::Single { member },
    ///     global_time: 50,
    ///     resolution: ResolutionInstance::Public,
    ///     payload: Payload::Application,
    /// });
    ///
    /// log.change_resolution_policy(&meta, 50, Policy::Linear, proof);
    /// assert_eq!(log.get_resolution_policy(&meta, 50).0, Policy::Public);
    /// assert_eq!(log.get_resolution_policy(&meta, 51).0, Policy::Linear);
    /// ```
    pub fn change_resolution_policy(&mut self, message_meta: &MessageMeta, global_time: u64, policy: Policy, proof: Proof) {
        let key = crate::types::permission_key("resolution", &message_meta.name);

        let index = match self.buckets.binary_search_by_key(&global_time, |(time, _)| *time) {
            Ok(index) => index,
            Err(index) => {
                self.buckets.insert(index, (global_time, HashMap::new()));
                index
            }
        };

        let mut proofs = Vec::with_capacity(1);
        proofs.push(proof);
        self.buckets[index].1.insert(key, PolicyEntry { policy, proofs });
    }
}

#[cfg(feature = "std")]
fn tracing_debug_policy_hit(policy_time: u64, global_time: u64, key: &str) {
    tracing::debug!(policy_time, global_time, key, "using configured resolution policy");
}

#[cfg(not(feature = "std"))]
fn tracing_debug_policy_hit(_policy_time: u64, _global_time: u64, _key: &str) {}

#[cfg(feature = "std")]
fn tracing_debug_policy_default(global_time: u64, key: &str) {
    tracing::debug!(global_time, key, "using default resolution policy");
}

#[cfg(not(feature = "std"))]
fn tracing_debug_policy_default(_global_time: u64, _key: &str) {}
