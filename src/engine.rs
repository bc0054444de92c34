// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Overlay Timeline Authors

//! The check engine: the kernel that answers every allowance question.
//!
//! [`CheckEngine`] borrows a [`PolicyLog`] and a [`MemberLedger`] and exposes
//! two read-only operations, [`check`](CheckEngine::check) and
//! [`allowed`](CheckEngine::allowed). Both route through the same private
//! kernel, [`check_pairs`], which never mutates either store.

use alloc::vec::Vec;

use crate::error::TimelineError;
use crate::ledger::{LedgerLookup, MemberLedger};
use crate::policy::PolicyLog;
use crate::types::{
    Authentication, Member, MessageImpl, MessageMeta, Payload, Permission, Policy, Proof,
    Resolution, ResolutionInstance, permission_key,
};

/// The resolution a kernel call should use, in one of the two shapes the
/// source conflates under "resolution": a bare type descriptor (used for the
/// fixed-`Linear` authorize/revoke authority check, and for `allowed()`
/// queries that have no concrete message instance) or a message-attached
/// instance (used when checking a specific `MessageImpl`, which for
/// `Dynamic` descriptors carries the policy the author believed was
/// in effect).
#[derive(Debug, Clone, Copy)]
pub enum ResolutionView {
    Descriptor(Resolution),
    Instance(ResolutionInstance),
}

/// Borrowed view over the timeline's two stores, answering allowance
/// queries without mutating either.
pub struct CheckEngine<'a> {
    ledger: &'a MemberLedger,
    policy: &'a PolicyLog,
    master_member: Member,
}

impl<'a> CheckEngine<'a> {
    /// Construct a check engine over the given stores, bound to the
    /// community's master member (who bypasses every ledger lookup).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use overlay_timeline::engine::CheckEngine;
    /// use overlay_timeline::ledger::MemberLedger;
    /// use overlay_timeline::policy::PolicyLog;
    /// use overlay_timeline::types::Member;
    ///
    /// let ledger = MemberLedger::new();
    /// let policy = PolicyLog::new();
    /// let master = Member::new([0u8; 20], 0);
    /// let _engine = CheckEngine::new(&ledger, &policy, master);
    /// ```
    pub fn new(ledger: &'a MemberLedger, policy: &'a PolicyLog, master_member: Member) -> Self {
        Self { ledger, policy, master_member }
    }

    /// Check whether `message` is allowed, under `permission` (default
    /// `Permit` for ordinary application traffic).
    ///
    /// Dispatches on `message.authentication`:
    ///
    /// * **Single-signer governance containers** (`dispersy-authorize`,
    ///   `dispersy-revoke`): grouped by target message type; the container
    ///   is accepted if **any** group's authority check passes.
    /// * **Single-signer `dispersy-undo-other`**: checked as `undo` on the
    ///   undone message's meta, under the container's own (always `Linear`)
    ///   resolution.
    /// * **Single-signer, anything else**: checked as `(message.meta,
    ///   permission)` under the message's own resolution instance.
    /// * **Co-signed**: every co-signer must independently pass; the first
    ///   denial short-circuits, returning the proofs collected so far.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use overlay_timeline::engine::CheckEngine;
    /// use overlay_timeline::ledger::MemberLedger;
    /// use overlay_timeline::policy::PolicyLog;
    /// use overlay_timeline::types::{
    ///     Authentication, AuthenticationKind, Member, MessageImpl, MessageMeta,
    ///     Payload, Permission, Resolution, ResolutionInstance,
    /// };
    ///
    /// let ledger = MemberLedger::new();
    /// let policy = PolicyLog::new();
    /// let master = Member::new([0u8; 20], 0);
    /// let engine = CheckEngine::new(&ledger, &policy, master);
    ///
    /// let meta = MessageMeta::new("vote", Resolution::Public, AuthenticationKind::Single);
    /// let message = MessageImpl {
    ///     name: "app".into(),
    ///     meta,
    ///     authentication: Authentication::Single { member: master },
    ///     global_time: 1,
    ///     resolution: ResolutionInstance::Public,
    ///     payload: Payload::Application,
    /// };
    /// let (allowed, _proofs) = engine.check(&message, Permission::Permit).unwrap();
    /// assert!(allowed, "Public resolution accepts anyone");
    /// ```
    pub fn check(&self, message: &MessageImpl, permission: Permission) -> Result<(bool, Vec<Proof>), TimelineError> {
        match message.authentication {
            Authentication::Single { member } => self.check_single(member, message, permission),
            Authentication::Double { members } => self.check_double(members, message, permission),
        }
    }

    fn check_single(&self, signer: Member, message: &MessageImpl, permission: Permission) -> Result<(bool, Vec<Proof>), TimelineError> {
        match (&message.payload, message.name.as_str()) {
            (Payload::AuthorizeRevoke { triplets }, "dispersy-authorize") => {
                self.check_container(signer, message.global_time, triplets, Permission::Authorize)
            }
            (Payload::AuthorizeRevoke { triplets }, "dispersy-revoke") => {
                self.check_container(signer, message.global_time, triplets, Permission::Revoke)
            }
            (Payload::UndoOther { undone_meta, .. }, _) => {
                let pairs = [(undone_meta, Permission::Undo)];
                check_pairs(
                    self.ledger,
                    self.policy,
                    self.master_member,
                    signer,
                    message.global_time,
                    ResolutionView::Instance(message.resolution),
                    &pairs,
                )
            }
            _ => {
                let pairs = [(&message.meta, permission)];
                check_pairs(
                    self.ledger,
                    self.policy,
                    self.master_member,
                    signer,
                    message.global_time,
                    ResolutionView::Instance(message.resolution),
                    &pairs,
                )
            }
        }
    }

    /// Group `triplets` by target message type; accept the container if any
    /// group's signer-holds-`tag` check passes. All groups' proofs are
    /// returned regardless of their individual verdict — a denied group's
    /// (possibly empty) proofs still explain why that half of the container
    /// was refused.
    fn check_container(&self, signer: Member, global_time: u64, triplets: &[crate::types::PermissionTriplet], tag: Permission) -> Result<(bool, Vec<Proof>), TimelineError> {
        let groups = group_triplets_by_target(triplets);

        let mut any_allowed = false;
        let mut all_proofs: Vec<Proof> = Vec::new();

        for (target_meta, _members) in &groups {
            let pairs = [(*target_meta, tag)];
            let (allowed, proofs) = check_pairs(
                self.ledger,
                self.policy,
                self.master_member,
                signer,
                global_time,
                ResolutionView::Descriptor(target_meta.resolution),
                &pairs,
            )?;
            any_allowed |= allowed;
            dedup_extend(&mut all_proofs, proofs);
        }

        Ok((any_allowed, all_proofs))
    }

    fn check_double(&self, members: [Member; 2], message: &MessageImpl, permission: Permission) -> Result<(bool, Vec<Proof>), TimelineError> {
        let mut all_proofs: Vec<Proof> = Vec::new();
        for member in members {
            let pairs = [(&message.meta, permission)];
            let (allowed, proofs) = check_pairs(
                self.ledger,
                self.policy,
                self.master_member,
                member,
                message.global_time,
                ResolutionView::Instance(message.resolution),
                &pairs,
            )?;
            all_proofs.extend(proofs);
            if !allowed {
                return Ok((false, all_proofs));
            }
        }
        Ok((true, all_proofs))
    }

    /// Check whether `member` holds `permission` on `meta` at `global_time`.
    ///
    /// Thin wrapper around the kernel, used when the caller has no concrete
    /// `MessageImpl` instance (e.g. deciding locally whether it is worth
    /// constructing one).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use overlay_timeline::engine::CheckEngine;
    /// use overlay_timeline::ledger::MemberLedger;
    /// use overlay_timeline::policy::PolicyLog;
    /// use overlay_timeline::types::{AuthenticationKind, Member, MessageMeta, Permission, Resolution};
    ///
    /// let ledger = MemberLedger::new();
    /// let policy = PolicyLog::new();
    /// let master = Member::new([0u8; 20], 0);
    /// let engine = CheckEngine::new(&ledger, &policy, master);
    /// let meta = MessageMeta::new("vote", Resolution::Linear, AuthenticationKind::Single);
    ///
    /// // Nobody but the master has standing yet.
    /// let outsider = Member::new([9u8; 20], 9);
    /// let (allowed, _) = engine.allowed(outsider, &meta, 1, Permission::Permit).unwrap();
    /// assert!(!allowed);
    /// ```
    pub fn allowed(&self, member: Member, meta: &MessageMeta, global_time: u64, permission: Permission) -> Result<(bool, Vec<Proof>), TimelineError> {
        let pairs = [(meta, permission)];
        check_pairs(
            self.ledger,
            self.policy,
            self.master_member,
            member,
            global_time,
            ResolutionView::Descriptor(meta.resolution),
            &pairs,
        )
    }
}

/// The shared kernel: does `member` hold every `(meta, permission)` pair in
/// `pairs`, at `global_time`, under `resolution`?
///
/// All pairs must succeed for an overall accept; the first denied pair
/// short-circuits with only that pair's (possibly empty) proofs.
pub(crate) fn check_pairs(
    ledger: &MemberLedger,
    policy_log: &PolicyLog,
    master_member: Member,
    member: Member,
    global_time: u64,
    resolution: ResolutionView,
    pairs: &[(&MessageMeta, Permission)],
) -> Result<(bool, Vec<Proof>), TimelineError> {
    if global_time == 0 {
        return Err(TimelineError::NonPositiveGlobalTime { global_time });
    }

    let mut accumulated: Vec<Proof> = Vec::new();

    for (target_meta, permission) in pairs {
        if member == master_member {
            tracing_master_override(global_time, member.database_id, permission.as_str(), &target_meta.name);
            continue;
        }

        let resolved = match resolve(resolution, target_meta, policy_log, global_time, &mut accumulated) {
            Resolved::Policy(policy) => policy,
            Resolved::Mismatch => {
                tracing_policy_mismatch(global_time, member.database_id, &target_meta.name);
                return Ok((false, accumulated));
            }
        };

        match resolved {
            Policy::Public => {
                tracing_public_accept(global_time, member.database_id, permission.as_str(), &target_meta.name);
            }
            Policy::Linear => {
                let key = permission_key(permission.as_str(), &target_meta.name);
                match ledger.lookup(&member, global_time, &key) {
                    LedgerLookup::Found { allowed: true, proofs } => {
                        tracing_linear_accept(global_time, member.database_id, &key);
                        accumulated.extend(proofs);
                    }
                    LedgerLookup::Found { allowed: false, proofs } => {
                        tracing_linear_deny(global_time, member.database_id, &key, "revoked");
                        return Ok((false, proofs));
                    }
                    LedgerLookup::NotFound => {
                        tracing_linear_deny(global_time, member.database_id, &key, "never authorized");
                        return Ok((false, Vec::new()));
                    }
                }
            }
        }
    }

    Ok((true, accumulated))
}

/// Group `triplets` by target message type, preserving first-seen order.
/// Shared between [`CheckEngine::check_container`] and
/// [`crate::timeline::Timeline`]'s combined check-and-apply ingestion path.
pub(crate) fn group_triplets_by_target(triplets: &[crate::types::PermissionTriplet]) -> Vec<(&MessageMeta, Vec<&crate::types::PermissionTriplet>)> {
    let mut groups: Vec<(&MessageMeta, Vec<&crate::types::PermissionTriplet>)> = Vec::new();
    for triplet in triplets {
        match groups.iter_mut().find(|(meta, _)| meta.name == triplet.meta.name) {
            Some((_, members)) => members.push(triplet),
            None => groups.push((&triplet.meta, alloc::vec![triplet])),
        }
    }
    groups
}

/// Append `more` to `into`, skipping proofs already present (by pointer
/// identity) so the same accepted message isn't listed twice when it backs
/// more than one group.
pub(crate) fn dedup_extend(into: &mut Vec<Proof>, more: Vec<Proof>) {
    for proof in more {
        if !into.iter().any(|existing| alloc::sync::Arc::ptr_eq(existing, &proof)) {
            into.push(proof);
        }
    }
}

enum Resolved {
    Policy(Policy),
    Mismatch,
}

fn resolve(resolution: ResolutionView, target_meta: &MessageMeta, policy_log: &PolicyLog, global_time: u64, accumulated: &mut Vec<Proof>) -> Resolved {
    match resolution {
        ResolutionView::Descriptor(Resolution::Public) => Resolved::Policy(Policy::Public),
        ResolutionView::Descriptor(Resolution::Linear) => Resolved::Policy(Policy::Linear),
        ResolutionView::Descriptor(Resolution::Dynamic { .. }) => {
            let (policy, proofs) = policy_log.get_resolution_policy(target_meta, global_time);
            accumulated.extend(proofs);
            Resolved::Policy(policy)
        }
        ResolutionView::Instance(ResolutionInstance::Public) => Resolved::Policy(Policy::Public),
        ResolutionView::Instance(ResolutionInstance::Linear) => Resolved::Policy(Policy::Linear),
        ResolutionView::Instance(ResolutionInstance::Dynamic { selected }) => {
            let (local_policy, proofs) = policy_log.get_resolution_policy(target_meta, global_time);
            accumulated.extend(proofs);
            if selected == local_policy {
                Resolved::Policy(local_policy)
            } else {
                Resolved::Mismatch
            }
        }
    }
}

#[cfg(feature = "std")]
fn tracing_master_override(global_time: u64, member_id: u64, permission: &str, message_name: &str) {
    tracing::debug!(global_time, member_id, permission, message_name, "kernel: master member override");
}
#[cfg(not(feature = "std"))]
fn tracing_master_override(_global_time: u64, _member_id: u64, _permission: &str, _message_name: &str) {}

#[cfg(feature = "std")]
fn tracing_policy_mismatch(global_time: u64, member_id: u64, message_name: &str) {
    tracing::debug!(global_time, member_id, message_name, "kernel: dynamic policy mismatch");
}
#[cfg(not(feature = "std"))]
fn tracing_policy_mismatch(_global_time: u64, _member_id: u64, _message_name: &str) {}

#[cfg(feature = "std")]
fn tracing_public_accept(global_time: u64, member_id: u64, permission: &str, message_name: &str) {
    tracing::debug!(global_time, member_id, permission, message_name, "kernel: public resolution accept");
}
#[cfg(not(feature = "std"))]
fn tracing_public_accept(_global_time: u64, _member_id: u64, _permission: &str, _message_name: &str) {}

#[cfg(feature = "std")]
fn tracing_linear_accept(global_time: u64, member_id: u64, key: &str) {
    tracing::debug!(global_time, member_id, key, "kernel: linear resolution accept (authorized)");
}
#[cfg(not(feature = "std"))]
fn tracing_linear_accept(_global_time: u64, _member_id: u64, _key: &str) {}

#[cfg(feature = "std")]
fn tracing_linear_deny(global_time: u64, member_id: u64, key: &str, reason: &str) {
    tracing::debug!(global_time, member_id, key, reason, "kernel: linear resolution deny");
}
#[cfg(not(feature = "std"))]
fn tracing_linear_deny(_global_time: u64, _member_id: u64, _key: &str, _reason: &str) {}
