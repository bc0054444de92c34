// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Overlay Timeline Authors

//! The mutation API: the only way new grants, revocations, and policy
//! changes enter the timeline.
//!
//! Unlike [`crate::engine::CheckEngine`], [`MutationAPI`] borrows the stores
//! mutably. `authorize` and `revoke` share one shape: check the author's own
//! standing under a fixed `Linear` resolution across every named triplet,
//! all-or-nothing, then commit. A denied call leaves both stores untouched.

use alloc::vec::Vec;
use hashbrown::HashSet;

use crate::config::TimelineConfig;
use crate::engine::{ResolutionView, check_pairs};
use crate::error::TimelineError;
use crate::ledger::MemberLedger;
use crate::policy::PolicyLog;
use crate::types::{Member, MessageMeta, Permission, PermissionTriplet, Policy, Proof, Resolution, permission_key};

/// Borrowed, mutable view over the timeline's two stores.
pub struct MutationAPI<'a> {
    ledger: &'a mut MemberLedger,
    policy: &'a mut PolicyLog,
    master_member: Member,
    config: TimelineConfig,
}

impl<'a> MutationAPI<'a> {
    /// # Examples
    ///
    /// ```rust
    /// use overlay_timeline::config::TimelineConfig;
    /// use overlay_timeline::ledger::MemberLedger;
    /// use overlay_timeline::mutation::MutationAPI;
    /// use overlay_timeline::policy::PolicyLog;
    /// use overlay_timeline::types::Member;
    ///
    /// let mut ledger = MemberLedger::new();
    /// let mut policy = PolicyLog::new();
    /// let master = Member::new([0u8; 20], 0);
    /// let _api = MutationAPI::new(&mut ledger, &mut policy, master, TimelineConfig::default());
    /// ```
    pub fn new(ledger: &'a mut MemberLedger, policy: &'a mut PolicyLog, master_member: Member, config: TimelineConfig) -> Self {
        Self { ledger, policy, master_member, config }
    }

    /// Grant every `(member, meta, permission)` in `triplets`, authored by
    /// `author` at `global_time`, justified by `proof`.
    ///
    /// `author` must hold `authorize^meta.name` under `Linear` resolution
    /// for **every** distinct `meta` named across `triplets` — a single
    /// missing authority denies the whole call and mutates nothing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use overlay_timeline::config::TimelineConfig;
    /// use overlay_timeline::ledger::MemberLedger;
    /// use overlay_timeline::mutation::MutationAPI;
    /// use overlay_timeline::policy::PolicyLog;
    /// use overlay_timeline::types::{
    ///     Authentication, AuthenticationKind, Member, MessageImpl, MessageMeta,
    ///     Payload, Permission, PermissionTriplet, Resolution, ResolutionInstance,
    /// };
    /// use std::sync::Arc;
    ///
    /// let mut ledger = MemberLedger::new();
    /// let mut policy = PolicyLog::new();
    /// let master = Member::new([0u8; 20], 0);
    /// let alice = Member::new([1u8; 20], 1);
    /// let mut api = MutationAPI::new(&mut ledger, &mut policy, master, TimelineConfig::default());
    ///
    /// let meta = MessageMeta::new("vote", Resolution::Linear, AuthenticationKind::Single);
    /// let proof = Arc::new(MessageImpl {
    ///     name: "dispersy-authorize".into(),
    ///     meta: meta.clone(),
    ///     authentication: Authentication::Single { member: master },
    ///     global_time: 10,
    ///     resolution: ResolutionInstance::Public,
    ///     payload: Payload::Application,
    /// });
    /// let triplets = vec![PermissionTriplet { member: alice, meta, permission: Permission::Permit }];
    /// let (granted, _proofs) = api.authorize(master, 10, &triplets, proof).unwrap();
    /// assert!(granted, "the master always has standing");
    /// ```
    pub fn authorize(&mut self, author: Member, global_time: u64, triplets: &[PermissionTriplet], proof: Proof) -> Result<(bool, Vec<Proof>), TimelineError> {
        self.apply(author, global_time, triplets, Permission::Authorize, true, proof)
    }

    /// Revoke every `(member, meta, permission)` in `triplets`, mirroring
    /// [`authorize`](Self::authorize) but requiring `revoke^meta.name` and
    /// writing `allowed = false` ledger entries.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use overlay_timeline::config::TimelineConfig;
    /// use overlay_timeline::ledger::MemberLedger;
    /// use overlay_timeline::mutation::MutationAPI;
    /// use overlay_timeline::policy::PolicyLog;
    /// use overlay_timeline::types::{
    ///     Authentication, AuthenticationKind, Member, MessageImpl, MessageMeta,
    ///     Payload, Permission, PermissionTriplet, Resolution, ResolutionInstance,
    /// };
    /// use std::sync::Arc;
    ///
    /// let mut ledger = MemberLedger::new();
    /// let mut policy = PolicyLog::new();
    /// let master = Member::new([0u8; 20], 0);
    /// let alice = Member::new([1u8; 20], 1);
    /// let meta = MessageMeta::new("vote", Resolution::Linear, AuthenticationKind::Single);
    /// let triplets = vec![PermissionTriplet { member: alice, meta: meta.clone(), permission: Permission::Permit }];
    ///
    /// {
    ///     let mut api = MutationAPI::new(&mut ledger, &mut policy, master, TimelineConfig::default());
    ///     let proof = Arc::new(MessageImpl {
    ///         name: "dispersy-authorize".into(), meta: meta.clone(),
    ///         authentication: Authentication::Single { member: master },
    ///         global_time: 10, resolution: ResolutionInstance::Public, payload: Payload::Application,
    ///     });
    ///     api.authorize(master, 10, &triplets, proof).unwrap();
    /// }
    /// let mut api = MutationAPI::new(&mut ledger, &mut policy, master, TimelineConfig::default());
    /// let proof = Arc::new(MessageImpl {
    ///     name: "dispersy-revoke".into(), meta,
    ///     authentication: Authentication::Single { member: master },
    ///     global_time: 20, resolution: ResolutionInstance::Public, payload: Payload::Application,
    /// });
    /// let (revoked, _) = api.revoke(master, 20, &triplets, proof).unwrap();
    /// assert!(revoked);
    /// ```
    pub fn revoke(&mut self, author: Member, global_time: u64, triplets: &[PermissionTriplet], proof: Proof) -> Result<(bool, Vec<Proof>), TimelineError> {
        self.apply(author, global_time, triplets, Permission::Revoke, false, proof)
    }

    fn apply(&mut self, author: Member, global_time: u64, triplets: &[PermissionTriplet], authority_tag: Permission, allowed: bool, proof: Proof) -> Result<(bool, Vec<Proof>), TimelineError> {
        let deduped = self.dedupe(triplets);

        let distinct_metas = distinct_metas(&deduped);
        let pairs: Vec<(&MessageMeta, Permission)> = distinct_metas.iter().map(|meta| (*meta, authority_tag)).collect();

        let (authorized, proofs) = check_pairs(
            self.ledger,
            self.policy,
            self.master_member,
            author,
            global_time,
            ResolutionView::Descriptor(Resolution::Linear),
            &pairs,
        )?;

        if !authorized {
            tracing_denied(global_time, author.database_id, authority_tag.as_str());
            return Ok((false, proofs));
        }

        for triplet in &deduped {
            let key = permission_key(triplet.permission.as_str(), &triplet.meta.name);
            self.ledger.upsert(triplet.member, global_time, &key, allowed, proof.clone())?;
        }

        tracing_applied(global_time, author.database_id, authority_tag.as_str(), deduped.len());
        Ok((true, proofs))
    }

    /// Deduplicate `triplets` when `config.dedupe_triplets` is set
    /// (first occurrence of an identical `(member, meta.name, permission)`
    /// wins); otherwise returns every triplet, duplicates included.
    fn dedupe<'t>(&self, triplets: &'t [PermissionTriplet]) -> Vec<&'t PermissionTriplet> {
        if !self.config.dedupe_triplets {
            return triplets.iter().collect();
        }
        let mut seen: HashSet<(Member, &str, Permission)> = HashSet::new();
        let mut result = Vec::with_capacity(triplets.len());
        for triplet in triplets {
            let key = (triplet.member, triplet.meta.name.as_str(), triplet.permission);
            if seen.insert(key) {
                result.push(triplet);
            }
        }
        result
    }

    /// Record a new resolution policy for `message_meta`, effective
    /// strictly after `global_time`. Delegates to
    /// [`PolicyLog::change_resolution_policy`]; callers are expected to have
    /// already verified the author's standing (there is no separate
    /// authority gate for policy changes in the source model — any member
    /// who can construct the governance record can submit it, and its
    /// acceptance is governed the same way any other message's is, via
    /// [`crate::engine::CheckEngine::check`]).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use overlay_timeline::config::TimelineConfig;
    /// use overlay_timeline::ledger::MemberLedger;
    /// use overlay_timeline::mutation::MutationAPI;
    /// use overlay_timeline::policy::PolicyLog;
    /// use overlay_timeline::types::{
    ///     Authentication, AuthenticationKind, Member, MessageImpl, MessageMeta,
    ///     Payload, Policy, Resolution, ResolutionInstance,
    /// };
    /// use std::sync::Arc;
    ///
    /// let mut ledger = MemberLedger::new();
    /// let mut policy = PolicyLog::new();
    /// let master = Member::new([0u8; 20], 0);
    /// let mut api = MutationAPI::new(&mut ledger, &mut policy, master, TimelineConfig::default());
    ///
    /// let meta = MessageMeta::new("vote", Resolution::Dynamic { default: Policy::Public }, AuthenticationKind::Single);
    /// let proof = Arc::new(MessageImpl {
    ///     name: "dispersy-dynamic-settings".into(),
    ///     meta: meta.clone(),
    ///     authentication: Authentication::Single { member: master },
    ///     global_time: 5,
    ///     resolution: ResolutionInstance::Public,
    ///     payload: Payload::Application,
    /// });
    /// api.change_resolution_policy(&meta, 5, Policy::Linear, proof);
    /// ```
    pub fn change_resolution_policy(&mut self, message_meta: &MessageMeta, global_time: u64, policy: Policy, proof: Proof) {
        self.policy.change_resolution_policy(message_meta, global_time, policy, proof);
    }
}

fn distinct_metas<'t>(triplets: &[&'t PermissionTriplet]) -> Vec<&'t MessageMeta> {
    let mut metas: Vec<&MessageMeta> = Vec::new();
    for triplet in triplets {
        if !metas.iter().any(|m| m.name == triplet.meta.name) {
            metas.push(&triplet.meta);
        }
    }
    metas
}

#[cfg(feature = "std")]
fn tracing_denied(global_time: u64, author_id: u64, tag: &str) {
    tracing::warn!(global_time, author_id, tag, "mutation: author lacks authority, call denied");
}
#[cfg(not(feature = "std"))]
fn tracing_denied(_global_time: u64, _author_id: u64, _tag: &str) {}

#[cfg(feature = "std")]
fn tracing_applied(global_time: u64, author_id: u64, tag: &str, count: usize) {
    tracing::debug!(global_time, author_id, tag, count, "mutation: triplets applied");
}
#[cfg(not(feature = "std"))]
fn tracing_applied(_global_time: u64, _author_id: u64, _tag: &str, _count: usize) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AuthenticationKind;
    use alloc::sync::Arc;
    use crate::types::{Authentication, MessageImpl, Payload, ResolutionInstance};

    fn member(id: u8) -> Member {
        Member::new([id; 20], id as u64)
    }

    fn linear_meta(name: &str) -> MessageMeta {
        MessageMeta::new(name, Resolution::Linear, AuthenticationKind::Single)
    }

    fn proof(name: &str, meta: &MessageMeta, global_time: u64, signer: Member) -> Proof {
        Arc::new(MessageImpl {
            name: name.into(),
            meta: meta.clone(),
            authentication: Authentication::Single { member: signer },
            global_time,
            resolution: ResolutionInstance::Linear,
            payload: Payload::Application,
        })
    }

    /// S1 — master grants linear permit (mutation half).
    #[test]
    fn s1_master_authorizes_then_ledger_reflects_it() {
        let mut ledger = MemberLedger::new();
        let mut policy = PolicyLog::new();
        let master = member(0);
        let a = member(1);
        let meta = linear_meta("msg-x");
        let mut api = MutationAPI::new(&mut ledger, &mut policy, master, TimelineConfig::default());

        let triplets = alloc::vec![PermissionTriplet { member: a, meta: meta.clone(), permission: Permission::Permit }];
        let (ok, _proofs) = api.authorize(master, 10, &triplets, proof("dispersy-authorize", &meta, 10, master)).unwrap();
        assert!(ok);

        let key = permission_key("permit", &meta.name);
        assert!(matches!(ledger.lookup(&a, 11, &key), crate::ledger::LedgerLookup::Found { allowed: true, .. }));
    }

    /// S3 — unauthorized signer is denied, ledger unchanged.
    #[test]
    fn s3_unauthorized_signer_denied_ledger_unchanged() {
        let mut ledger = MemberLedger::new();
        let mut policy = PolicyLog::new();
        let master = member(0);
        let outsider = member(99);
        let a = member(1);
        let meta = linear_meta("msg-x");
        let mut api = MutationAPI::new(&mut ledger, &mut policy, master, TimelineConfig::default());

        let triplets = alloc::vec![PermissionTriplet { member: a, meta: meta.clone(), permission: Permission::Permit }];
        let (ok, _proofs) = api.authorize(outsider, 10, &triplets, proof("dispersy-authorize", &meta, 10, outsider)).unwrap();
        assert!(!ok);

        let key = permission_key("permit", &meta.name);
        assert!(matches!(ledger.lookup(&a, 11, &key), crate::ledger::LedgerLookup::NotFound));
    }

    /// S6 — mutation half: only the group the author has standing for lands.
    #[test]
    fn s6_partial_authority_denies_whole_batch() {
        let mut ledger = MemberLedger::new();
        let mut policy = PolicyLog::new();
        let master = member(0);
        let signer = member(1);
        let msg1 = linear_meta("msg-1");
        let msg2 = linear_meta("msg-2");

        let key1 = permission_key("authorize", &msg1.name);
        ledger.upsert(signer, 5, &key1, true, proof("dispersy-authorize", &msg1, 5, master)).unwrap();

        let mut api = MutationAPI::new(&mut ledger, &mut policy, master, TimelineConfig::default());
        let a = member(10);
        let c = member(11);

        // Mixing both target metas into one batch is all-or-nothing: signer
        // lacks authorize^msg-2, so the entire batch is refused.
        let mixed = alloc::vec![
            PermissionTriplet { member: a, meta: msg1.clone(), permission: Permission::Permit },
            PermissionTriplet { member: c, meta: msg2.clone(), permission: Permission::Permit },
        ];
        let (ok, _) = api.authorize(signer, 30, &mixed, proof("dispersy-authorize", &msg1, 30, signer)).unwrap();
        assert!(!ok);
        assert!(matches!(
            ledger.lookup(&a, 31, &permission_key("permit", &msg1.name)),
            crate::ledger::LedgerLookup::NotFound
        ));

        // Submitted as its own batch, the msg-1 group succeeds.
        let only_msg1 = alloc::vec![PermissionTriplet { member: a, meta: msg1.clone(), permission: Permission::Permit }];
        let (ok, _) = api.authorize(signer, 30, &only_msg1, proof("dispersy-authorize", &msg1, 30, signer)).unwrap();
        assert!(ok);
        assert!(matches!(
            ledger.lookup(&a, 31, &permission_key("permit", &msg1.name)),
            crate::ledger::LedgerLookup::Found { allowed: true, .. }
        ));
    }

    #[test]
    fn dedupe_triplets_keeps_first_occurrence() {
        let mut ledger = MemberLedger::new();
        let mut policy = PolicyLog::new();
        let master = member(0);
        let a = member(1);
        let meta = linear_meta("msg-x");
        let mut api = MutationAPI::new(&mut ledger, &mut policy, master, TimelineConfig::default());

        let triplets = alloc::vec![
            PermissionTriplet { member: a, meta: meta.clone(), permission: Permission::Permit },
            PermissionTriplet { member: a, meta: meta.clone(), permission: Permission::Permit },
        ];
        let (ok, _) = api.authorize(master, 10, &triplets, proof("dispersy-authorize", &meta, 10, master)).unwrap();
        assert!(ok);

        let key = permission_key("permit", &meta.name);
        let bucket = ledger.buckets_for(&a).unwrap();
        let (_, permissions) = bucket.iter().find(|(t, _)| *t == 10).unwrap();
        assert_eq!(permissions.get(&key).unwrap().proofs.len(), 1);
    }

    /// Invariant 6 — revocation writes `allowed = false`, not a deletion.
    #[test]
    fn revoke_writes_false_not_a_deletion() {
        let mut ledger = MemberLedger::new();
        let mut policy = PolicyLog::new();
        let master = member(0);
        let a = member(1);
        let meta = linear_meta("msg-x");

        {
            let mut api = MutationAPI::new(&mut ledger, &mut policy, master, TimelineConfig::default());
            let triplets = alloc::vec![PermissionTriplet { member: a, meta: meta.clone(), permission: Permission::Permit }];
            api.authorize(master, 10, &triplets, proof("dispersy-authorize", &meta, 10, master)).unwrap();
        }
        {
            let mut api = MutationAPI::new(&mut ledger, &mut policy, master, TimelineConfig::default());
            let triplets = alloc::vec![PermissionTriplet { member: a, meta: meta.clone(), permission: Permission::Permit }];
            api.revoke(master, 20, &triplets, proof("dispersy-revoke", &meta, 20, master)).unwrap();
        }

        let key = permission_key("permit", &meta.name);
        assert!(matches!(ledger.lookup(&a, 25, &key), crate::ledger::LedgerLookup::Found { allowed: false, .. }));
        assert!(matches!(ledger.lookup(&a, 15, &key), crate::ledger::LedgerLookup::Found { allowed: true, .. }));
    }
}
