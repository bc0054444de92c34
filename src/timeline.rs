// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Overlay Timeline Authors

//! The public façade: one [`Timeline`] per community, owning its
//! [`PolicyLog`] and [`MemberLedger`] and exposing the entire public API
//! over them.
//!
//! A `Timeline` is bound to a community for its whole lifetime: the
//! `master_member` (who bypasses every check) and `my_member` (the local
//! node's own identity, used as the default signer for
//! [`allowed`](Timeline::allowed)) are fixed at construction. `global_time`
//! is not — the surrounding event loop reports it as the community
//! progresses via [`observe_global_time`](Timeline::observe_global_time).

use alloc::vec::Vec;

use crate::config::TimelineConfig;
use crate::engine::{CheckEngine, ResolutionView, check_pairs, dedup_extend, group_triplets_by_target};
use crate::error::TimelineError;
use crate::ledger::MemberLedger;
use crate::mutation::MutationAPI;
use crate::policy::PolicyLog;
use crate::types::{Member, MessageImpl, MessageMeta, Permission, PermissionTriplet, Policy, Proof, permission_key};

/// The permission timeline for one community.
///
/// # Examples
///
/// ```rust
/// use overlay_timeline::timeline::Timeline;
/// use overlay_timeline::types::Member;
///
/// let master = Member::new([0u8; 20], 0);
/// let me = Member::new([1u8; 20], 1);
/// let timeline = Timeline::new(master, me, Default::default());
/// assert_eq!(timeline.global_time(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct Timeline {
    policy: PolicyLog,
    ledger: MemberLedger,
    master_member: Member,
    my_member: Member,
    global_time: u64,
    config: TimelineConfig,
}

impl Timeline {
    /// Construct an empty timeline bound to `master_member` and
    /// `my_member`, with `global_time` starting at zero (the first
    /// mutation the caller applies must use a strictly positive time).
    pub fn new(master_member: Member, my_member: Member, config: TimelineConfig) -> Self {
        Self {
            policy: PolicyLog::new(),
            ledger: MemberLedger::new(),
            master_member,
            my_member,
            global_time: 0,
            config,
        }
    }

    /// The community's master member, who bypasses every permission check.
    pub fn master_member(&self) -> Member {
        self.master_member
    }

    /// The local node's own member identity.
    pub fn my_member(&self) -> Member {
        self.my_member
    }

    /// The most recent `global_time` the surrounding event loop has
    /// reported via [`observe_global_time`](Self::observe_global_time).
    pub fn global_time(&self) -> u64 {
        self.global_time
    }

    /// Record that the community has progressed to `global_time`. Used as
    /// the default time for [`allowed`](Self::allowed) queries that don't
    /// name one explicitly. Never moves backward.
    pub fn observe_global_time(&mut self, global_time: u64) {
        if global_time > self.global_time {
            self.global_time = global_time;
        }
    }

    /// Check whether `message` is allowed under `permission`.
    pub fn check(&self, message: &MessageImpl, permission: Permission) -> Result<(bool, Vec<Proof>), TimelineError> {
        CheckEngine::new(&self.ledger, &self.policy, self.master_member).check(message, permission)
    }

    /// Check whether `member` holds `permission` on `meta`, at
    /// `global_time` (defaulting to [`global_time`](Self::global_time) when
    /// `None`).
    pub fn allowed(&self, member: Member, meta: &MessageMeta, global_time: Option<u64>, permission: Permission) -> Result<(bool, Vec<Proof>), TimelineError> {
        let at = global_time.unwrap_or(self.global_time);
        CheckEngine::new(&self.ledger, &self.policy, self.master_member).allowed(member, meta, at, permission)
    }

    /// Grant the permissions named in `triplets`, authored by `author`.
    pub fn authorize(&mut self, author: Member, global_time: u64, triplets: &[PermissionTriplet], proof: Proof) -> Result<(bool, Vec<Proof>), TimelineError> {
        MutationAPI::new(&mut self.ledger, &mut self.policy, self.master_member, self.config).authorize(author, global_time, triplets, proof)
    }

    /// Revoke the permissions named in `triplets`, authored by `author`.
    pub fn revoke(&mut self, author: Member, global_time: u64, triplets: &[PermissionTriplet], proof: Proof) -> Result<(bool, Vec<Proof>), TimelineError> {
        MutationAPI::new(&mut self.ledger, &mut self.policy, self.master_member, self.config).revoke(author, global_time, triplets, proof)
    }

    /// Accept an incoming `dispersy-authorize` container: group its
    /// triplets by target message type, any-group-accept to decide whether
    /// the container itself is well-formed, and commit only the triplets
    /// belonging to a group whose authority check actually passed — a
    /// denied group contributes no ledger entries, it is not a reason to
    /// refuse the whole container.
    ///
    /// This is the inbound-message counterpart to
    /// [`authorize`](Self::authorize)'s strict, all-or-nothing, locally
    /// authored path; the two differ because checking whether to accept
    /// someone else's container is a different question from whether the
    /// local node is allowed to author a new one.
    pub fn ingest_authorize(&mut self, signer: Member, global_time: u64, triplets: &[PermissionTriplet], proof: Proof) -> Result<(bool, Vec<Proof>), TimelineError> {
        self.ingest_container(signer, global_time, triplets, Permission::Authorize, true, proof)
    }

    /// Mirror of [`ingest_authorize`](Self::ingest_authorize), requiring
    /// `revoke^meta.name` per group and writing `allowed = false` entries
    /// for the groups that pass.
    pub fn ingest_revoke(&mut self, signer: Member, global_time: u64, triplets: &[PermissionTriplet], proof: Proof) -> Result<(bool, Vec<Proof>), TimelineError> {
        self.ingest_container(signer, global_time, triplets, Permission::Revoke, false, proof)
    }

    fn ingest_container(&mut self, signer: Member, global_time: u64, triplets: &[PermissionTriplet], tag: Permission, commit_value: bool, proof: Proof) -> Result<(bool, Vec<Proof>), TimelineError> {
        let groups = group_triplets_by_target(triplets);

        let mut any_allowed = false;
        let mut all_proofs: Vec<Proof> = Vec::new();
        let mut to_commit: Vec<&PermissionTriplet> = Vec::new();

        for (target_meta, members) in &groups {
            let pairs = [(*target_meta, tag)];
            let (allowed, proofs) = check_pairs(
                &self.ledger,
                &self.policy,
                self.master_member,
                signer,
                global_time,
                ResolutionView::Descriptor(target_meta.resolution),
                &pairs,
            )?;
            any_allowed |= allowed;
            dedup_extend(&mut all_proofs, proofs);
            if allowed {
                to_commit.extend(members.iter().copied());
            }
        }

        for triplet in to_commit {
            let key = permission_key(triplet.permission.as_str(), &triplet.meta.name);
            self.ledger.upsert(triplet.member, global_time, &key, commit_value, proof.clone())?;
        }

        Ok((any_allowed, all_proofs))
    }

    /// Record a new resolution policy for `message_meta`.
    pub fn change_resolution_policy(&mut self, message_meta: &MessageMeta, global_time: u64, policy: Policy, proof: Proof) {
        MutationAPI::new(&mut self.ledger, &mut self.policy, self.master_member, self.config).change_resolution_policy(message_meta, global_time, policy, proof);
    }

    /// Read the effective resolution policy for `message_meta` at
    /// `global_time`.
    pub fn get_resolution_policy(&self, message_meta: &MessageMeta, global_time: u64) -> (Policy, Vec<Proof>) {
        self.policy.get_resolution_policy(message_meta, global_time)
    }

    /// Borrow the underlying policy log (debugging / dumps).
    pub fn policy_log(&self) -> &PolicyLog {
        &self.policy
    }

    /// Borrow the underlying member ledger (debugging / dumps).
    pub fn member_ledger(&self) -> &MemberLedger {
        &self.ledger
    }
}
