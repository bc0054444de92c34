// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Overlay Timeline Authors

//! Per-member permission ledger.
//!
//! [`MemberLedger`] is the append-only log of `authorize`/`revoke` deltas,
//! one ordered bucket list per member. It exposes a single mutating
//! operation, [`upsert`](MemberLedger::upsert), and a single read operation,
//! [`lookup`](MemberLedger::lookup); [`crate::engine`] is the only caller of
//! either.

use alloc::string::String;
use alloc::vec::Vec;
use hashbrown::HashMap;

use crate::error::TimelineError;
use crate::types::{Member, PermissionEntry, Proof};

/// Outcome of a [`MemberLedger::lookup`].
#[derive(Debug, Clone)]
pub enum LedgerLookup {
    /// The most recent matching entry at or before the queried time,
    /// together with its proofs.
    Found { allowed: bool, proofs: Vec<Proof> },
    /// No bucket at or before the queried time carries the key.
    NotFound,
}

/// Per-member ordered log of permission deltas keyed by logical time.
///
/// # Invariants
///
/// * For every member, the bucket list is sorted ascending by `global_time`
///   with at most one bucket per distinct time.
/// * Every [`PermissionEntry`] has a non-empty `proofs` list.
/// * Entries are never deleted; history only grows.
#[derive(Debug, Default, Clone)]
pub struct MemberLedger {
    members: HashMap<Member, Vec<(u64, HashMap<String, PermissionEntry>)>>,
}

impl MemberLedger {
    /// Create an empty ledger.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use overlay_timeline::ledger::MemberLedger;
    ///
    /// let ledger = MemberLedger::new();
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow a member's raw bucket list, if any (debugging / dumps).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use overlay_timeline::ledger::MemberLedger;
    /// use overlay_timeline::types::Member;
    ///
    /// let ledger = MemberLedger::new();
    /// let a = Member::new([1u8; 20], 1);
    /// assert!(ledger.buckets_for(&a).is_none());
    /// ```
    pub fn buckets_for(&self, member: &Member) -> Option<&[(u64, HashMap<String, PermissionEntry>)]> {
        self.members.get(member).map(Vec::as_slice)
    }

    /// Insert or extend a permission delta for `member` at `global_time`.
    ///
    /// * A bucket already exists at `global_time` with `key` set to the
    ///   same `allowed` value: the proof is appended (idempotent
    ///   coalescing of duplicate governance records).
    /// * A bucket exists at `global_time` with `key` set to the opposite
    ///   `allowed` value: refused with
    ///   [`TimelineError::ConflictingGrantRevoke`] — the ledger is left
    ///   unchanged.
    /// * A bucket exists at `global_time` without `key`: the key is
    ///   inserted.
    /// * No bucket exists at `global_time`: one is inserted in sorted
    ///   position (binary search over the member's bucket list).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use overlay_timeline::ledger::MemberLedger;
    /// use overlay_timeline::types::{
    ///     Authentication, AuthenticationKind, Member, MessageImpl, MessageMeta,
    ///     Payload, Resolution, ResolutionInstance, permission_key,
    /// };
    /// use std::sync::Arc;
    ///
    /// let mut ledger = MemberLedger::new();
    /// let a = Member::new([1u8; 20], 1);
    /// let owner = Member::new([0u8; 20], 0);
    /// let meta = MessageMeta::new("vote", Resolution::Linear, AuthenticationKind::Single);
    /// let key = permission_key("permit", &meta.name);
    /// let proof = Arc::new(MessageImpl {
    ///     name: "dispersy-authorize".into(),
    ///     meta,
    ///     authentication: Authentication::Single { member: owner },
    ///     global_time: 10,
    ///     resolution: ResolutionInstance::Public,
    ///     payload: Payload::Application,
    /// });
    ///
    /// ledger.upsert(a, 10, &key, true, proof).unwrap();
    /// ```
    pub fn upsert(&mut self, member: Member, global_time: u64, key: &str, allowed: bool, proof: Proof) -> Result<(), TimelineError> {
        let buckets = self.members.entry(member).or_insert_with(Vec::new);

        let index = match buckets.binary_search_by_key(&global_time, |(time, _)| *time) {
            Ok(index) => index,
            Err(index) => {
                buckets.insert(index, (global_time, HashMap::new()));
                index
            }
        };

        let permissions = &mut buckets[index].1;
        match permissions.get_mut(key) {
            Some(entry) if entry.allowed == allowed => {
                tracing_extend(global_time, member.database_id, key);
                entry.push_proof(proof);
                Ok(())
            }
            Some(entry) => {
                tracing_conflict(global_time, member.database_id, key, entry.allowed, allowed);
                Err(TimelineError::ConflictingGrantRevoke {
                    member_id: member.database_id,
                    key: key.into(),
                    global_time,
                })
            }
            None => {
                tracing_insert(global_time, member.database_id, key, allowed);
                permissions.insert(key.into(), PermissionEntry::new(allowed, proof));
                Ok(())
            }
        }
    }

    /// Look up the most recent entry for `(member, key)` at or before
    /// `global_time`.
    ///
    /// Scans the member's bucket list in reverse for the newest bucket with
    /// `time <= global_time`, then continues walking backward through older
    /// buckets until `key` is found (a member may hold many other keys at
    /// closer times that do not mention this one).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use overlay_timeline::ledger::{LedgerLookup, MemberLedger};
    /// use overlay_timeline::types::{
    ///     Authentication, AuthenticationKind, Member, MessageImpl, MessageMeta,
    ///     Payload, Resolution, ResolutionInstance, permission_key,
    /// };
    /// use std::sync::Arc;
    ///
    /// let mut ledger = MemberLedger::new();
    /// let a = Member::new([1u8; 20], 1);
    /// let owner = Member::new([0u8; 20], 0);
    /// let meta = MessageMeta::new("vote", Resolution::Linear, AuthenticationKind::Single);
    /// let key = permission_key("permit", &meta.name);
    /// let proof = Arc::new(MessageImpl {
    ///     name: "dispersy-authorize".into(),
    ///     meta,
    ///     authentication: Authentication::Single { member: owner },
    ///     global_time: 10,
    ///     resolution: ResolutionInstance::Public,
    ///     payload: Payload::Application,
    /// });
    /// ledger.upsert(a, 10, &key, true, proof).unwrap();
    ///
    /// assert!(matches!(ledger.lookup(&a, 15, &key), LedgerLookup::Found { allowed: true, .. }));
    /// assert!(matches!(ledger.lookup(&a, 5, &key), LedgerLookup::NotFound));
    /// ```
    pub fn lookup(&self, member: &Member, global_time: u64, key: &str) -> LedgerLookup {
        let Some(buckets) = self.members.get(member) else {
            return LedgerLookup::NotFound;
        };

        let start = match buckets.binary_search_by_key(&global_time, |(time, _)| *time) {
            Ok(index) => index,
            Err(index) => {
                if index == 0 {
                    return LedgerLookup::NotFound;
                }
                index - 1
            }
        };

        for (_, permissions) in buckets[..=start].iter().rev() {
            if let Some(entry) = permissions.get(key) {
                return LedgerLookup::Found { allowed: entry.allowed, proofs: entry.proofs.clone() };
            }
        }

        LedgerLookup::NotFound
    }
}

#[cfg(feature = "std")]
fn tracing_extend(global_time: u64, member_id: u64, key: &str) {
    tracing::debug!(global_time, member_id, key, "ledger: extending duplicate entry");
}
#[cfg(not(feature = "std"))]
fn tracing_extend(_global_time: u64, _member_id: u64, _key: &str) {}

#[cfg(feature = "std")]
fn tracing_insert(global_time: u64, member_id: u64, key: &str, allowed: bool) {
    tracing::debug!(global_time, member_id, key, allowed, "ledger: inserting new entry");
}
#[cfg(not(feature = "std"))]
fn tracing_insert(_global_time: u64, _member_id: u64, _key: &str, _allowed: bool) {}

#[cfg(feature = "std")]
fn tracing_conflict(global_time: u64, member_id: u64, key: &str, existing: bool, attempted: bool) {
    tracing::warn!(global_time, member_id, key, existing, attempted, "ledger: conflicting grant/revoke refused");
}
#[cfg(not(feature = "std"))]
fn tracing_conflict(_global_time: u64, _member_id: u64, _key: &str, _existing: bool, _attempted: bool) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Authentication, AuthenticationKind, MessageImpl, MessageMeta, Payload, Resolution, ResolutionInstance};
    use alloc::sync::Arc;
    use proptest::prelude::*;

    fn member(id: u8) -> Member {
        Member::new([id; 20], id as u64)
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

    fn msg_x() -> MessageMeta {
        MessageMeta::new("msg-x", Resolution::Linear, AuthenticationKind::Single)
    }

    #[test]
    fn not_found_when_member_unknown() {
        let ledger = MemberLedger::new();
        let a = member(1);
        assert!(matches!(ledger.lookup(&a, 10, "permit^msg-x"), LedgerLookup::NotFound));
    }

    /// S1 — master grants linear permit (ledger half: the upsert + lookup).
    #[test]
    fn s1_grant_then_lookup() {
        let mut ledger = MemberLedger::new();
        let a = member(1);
        let owner = member(0);
        let meta = msg_x();
        let key = crate::types::permission_key("permit", &meta.name);

        ledger.upsert(a, 10, &key, true, proof("dispersy-authorize", &meta, 10, owner)).unwrap();

        match ledger.lookup(&a, 11, &key) {
            LedgerLookup::Found { allowed, proofs } => {
                assert!(allowed);
                assert_eq!(proofs.len(), 1);
            }
            LedgerLookup::NotFound => panic!("expected a grant"),
        }

        // Lookups strictly before the grant see nothing.
        assert!(matches!(ledger.lookup(&a, 9, &key), LedgerLookup::NotFound));
        // Lookup exactly at the grant time also sees it (time <= global_time).
        assert!(matches!(ledger.lookup(&a, 10, &key), LedgerLookup::Found { allowed: true, .. }));
    }

    /// S2 — revoke wins.
    #[test]
    fn s2_revoke_wins() {
        let mut ledger = MemberLedger::new();
        let a = member(1);
        let owner = member(0);
        let meta = msg_x();
        let key = crate::types::permission_key("permit", &meta.name);

        ledger.upsert(a, 10, &key, true, proof("dispersy-authorize", &meta, 10, owner)).unwrap();
        ledger.upsert(a, 20, &key, false, proof("dispersy-revoke", &meta, 20, owner)).unwrap();

        assert!(matches!(ledger.lookup(&a, 25, &key), LedgerLookup::Found { allowed: false, .. }));
        assert!(matches!(ledger.lookup(&a, 15, &key), LedgerLookup::Found { allowed: true, .. }));
    }

    #[test]
    fn coalescing_idempotence() {
        let mut ledger = MemberLedger::new();
        let a = member(1);
        let owner = member(0);
        let meta = msg_x();
        let key = crate::types::permission_key("permit", &meta.name);
        let the_proof = proof("dispersy-authorize", &meta, 10, owner);

        ledger.upsert(a, 10, &key, true, the_proof.clone()).unwrap();
        ledger.upsert(a, 10, &key, true, the_proof).unwrap();

        match ledger.lookup(&a, 10, &key) {
            LedgerLookup::Found { proofs, .. } => assert_eq!(proofs.len(), 2),
            LedgerLookup::NotFound => panic!("expected a grant"),
        }
        // Still exactly one bucket at time 10.
        assert_eq!(ledger.buckets_for(&a).unwrap().len(), 1);
    }

    #[test]
    fn conflicting_grant_revoke_refused() {
        let mut ledger = MemberLedger::new();
        let a = member(1);
        let owner = member(0);
        let meta = msg_x();
        let key = crate::types::permission_key("permit", &meta.name);

        ledger.upsert(a, 10, &key, true, proof("dispersy-authorize", &meta, 10, owner)).unwrap();
        let result = ledger.upsert(a, 10, &key, false, proof("dispersy-revoke", &meta, 10, owner));

        assert!(matches!(result, Err(TimelineError::ConflictingGrantRevoke { .. })));
        // Unchanged: the prior grant still stands.
        assert!(matches!(ledger.lookup(&a, 10, &key), LedgerLookup::Found { allowed: true, .. }));
    }

    proptest::proptest! {
        /// Whatever order a strictly-increasing sequence of grant/revoke
        /// writes to the same key arrives in, a lookup at any queried time
        /// returns the value of the latest write at or before it.
        #[test]
        fn lookup_always_reflects_the_latest_write_at_or_before_the_query(
            deltas in proptest::collection::vec((1u64..500, proptest::bool::ANY), 1..20),
        ) {
            let mut times: Vec<u64> = deltas.iter().map(|(t, _)| *t).collect();
            times.sort_unstable();
            times.dedup();
            let written: Vec<(u64, bool)> = times
                .iter()
                .map(|t| (*t, deltas.iter().find(|(dt, _)| dt == t).unwrap().1))
                .collect();

            let mut ledger = MemberLedger::new();
            let a = member(1);
            let owner = member(0);
            let meta = msg_x();
            let key = crate::types::permission_key("permit", &meta.name);

            for (time, allowed) in &written {
                ledger.upsert(a, *time, &key, *allowed, proof("dispersy-authorize", &meta, *time, owner)).unwrap();
            }

            for &(time, allowed) in &written {
                match ledger.lookup(&a, time, &key) {
                    LedgerLookup::Found { allowed: found, .. } => prop_assert_eq!(found, allowed),
                    LedgerLookup::NotFound => prop_assert!(false, "a write at {time} must be visible to a lookup at {time}"),
                }
            }

            let before_first = written[0].0 - 1;
            prop_assert!(matches!(ledger.lookup(&a, before_first, &key), LedgerLookup::NotFound));
        }
    }

    #[test]
    fn buckets_inserted_out_of_order_stay_sorted() {
        let mut ledger = MemberLedger::new();
        let a = member(1);
        let owner = member(0);
        let meta = msg_x();
        let key = crate::types::permission_key("permit", &meta.name);

        ledger.upsert(a, 30, &key, true, proof("dispersy-authorize", &meta, 30, owner)).unwrap();
        ledger.upsert(a, 10, &key, true, proof("dispersy-authorize", &meta, 10, owner)).unwrap();
        ledger.upsert(a, 20, &key, false, proof("dispersy-revoke", &meta, 20, owner)).unwrap();

        let times: Vec<u64> = ledger.buckets_for(&a).unwrap().iter().map(|(t, _)| *t).collect();
        assert_eq!(times, alloc::vec![10, 20, 30]);
    }
}
