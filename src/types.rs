// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Overlay Timeline Authors

//! Shared data types for the permission timeline.
//!
//! Every type here implements [`Clone`], [`Debug`], [`serde::Serialize`], and
//! [`serde::Deserialize`] so that `MessageImpl` proofs, ledger snapshots, and
//! verdicts can cross a conversion boundary without bespoke glue.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Member
// ---------------------------------------------------------------------------

/// Stable-equality identity of a community member.
///
/// Equality and hashing are defined over `mid` only — `database_id` is
/// logging metadata, never part of identity. Two `Member` values that share
/// an `mid` are the same member even if constructed with different
/// `database_id`s.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Member {
    /// Public-key hash identifying this member (20 bytes, SHA-1-sized).
    pub mid: [u8; 20],
    /// Numeric id used only for logging and display.
    pub database_id: u64,
}

impl Member {
    /// Construct a member from its hash and a logging id.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use overlay_timeline::types::Member;
    ///
    /// let a = Member::new([1u8; 20], 7);
    /// let b = Member::new([1u8; 20], 99);
    /// assert_eq!(a, b, "equality is by mid alone, database_id is just logging metadata");
    /// ```
    pub fn new(mid: [u8; 20], database_id: u64) -> Self {
        Self { mid, database_id }
    }
}

impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        self.mid == other.mid
    }
}

impl Eq for Member {}

impl Hash for Member {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.mid.hash(state);
    }
}

// ---------------------------------------------------------------------------
// Resolution / Authentication
// ---------------------------------------------------------------------------

/// The policy gating a message type: who may exercise a permission on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Policy {
    /// Any member may exercise the permission.
    Public,
    /// Only members explicitly authorized via the ledger may exercise it.
    Linear,
}

/// The resolution descriptor carried by a [`MessageMeta`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    Public,
    Linear,
    /// Community-selectable between `Public` and `Linear`; `default` applies
    /// until a `change_resolution_policy` record says otherwise.
    Dynamic { default: Policy },
}

/// The resolution a concrete `MessageImpl` instance actually carries.
///
/// For `Dynamic` descriptors the instance embeds the policy the author
/// believed was in effect; the kernel verifies that belief against its own
/// view (see [`crate::engine`] step 2, `PolicyMismatch`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionInstance {
    Public,
    Linear,
    Dynamic { selected: Policy },
}

/// Who must have signed a message for it to be valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Authentication {
    /// A single signer: `member`.
    Single { member: Member },
    /// Co-signed: every member in `members` must individually hold the
    /// permission for the message to be accepted.
    Double { members: [Member; 2] },
}

// ---------------------------------------------------------------------------
// Permission
// ---------------------------------------------------------------------------

/// The four actions a permission key can gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    Permit,
    Authorize,
    Revoke,
    Undo,
}

impl Permission {
    /// Textual tag used inside a composite permission key (`"permit"`, …).
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::Permit => "permit",
            Permission::Authorize => "authorize",
            Permission::Revoke => "revoke",
            Permission::Undo => "undo",
        }
    }
}

/// Build the composite ledger/policy-log index key `"{tag}^{name}"`.
///
/// `^` is a literal separator, preserved from the source format so keys stay
/// human-debuggable; it is never interpreted as exponentiation.
///
/// # Examples
///
/// ```rust
/// use overlay_timeline::types::permission_key;
///
/// assert_eq!(permission_key("permit", "vote"), "permit^vote");
/// ```
pub fn permission_key(tag: &str, message_name: &str) -> String {
    let mut key = String::with_capacity(tag.len() + 1 + message_name.len());
    key.push_str(tag);
    key.push('^');
    key.push_str(message_name);
    key
}

// ---------------------------------------------------------------------------
// MessageMeta
// ---------------------------------------------------------------------------

/// Descriptor for a message *type* (as opposed to one concrete instance).
///
/// Compared and hashed by `name` alone — two metas with the same name are
/// the same message type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageMeta {
    pub name: String,
    pub resolution: Resolution,
    pub authentication_kind: AuthenticationKind,
}

/// Which authentication shape a [`MessageMeta`] requires of its instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthenticationKind {
    Single,
    Double,
}

impl MessageMeta {
    /// # Examples
    ///
    /// ```rust
    /// use overlay_timeline::types::{AuthenticationKind, MessageMeta, Resolution};
    ///
    /// let vote = MessageMeta::new("vote", Resolution::Linear, AuthenticationKind::Single);
    /// assert_eq!(vote.name, "vote");
    /// ```
    pub fn new(name: impl Into<String>, resolution: Resolution, authentication_kind: AuthenticationKind) -> Self {
        Self { name: name.into(), resolution, authentication_kind }
    }
}

impl PartialEq for MessageMeta {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for MessageMeta {}

impl Hash for MessageMeta {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

// ---------------------------------------------------------------------------
// Payload / MessageImpl
// ---------------------------------------------------------------------------

/// One `(member, message_meta, permission)` entry inside an authorize or
/// revoke container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionTriplet {
    pub member: Member,
    pub meta: MessageMeta,
    pub permission: Permission,
}

/// The governance- or application-specific content of a [`MessageImpl`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Payload {
    /// Ordinary application traffic gated under `permit`.
    Application,
    /// `dispersy-authorize` / `dispersy-revoke` container contents.
    AuthorizeRevoke { triplets: Vec<PermissionTriplet> },
    /// `dispersy-undo-other`: undoes a previously accepted message.
    UndoOther {
        undone_member: Member,
        undone_global_time: u64,
        undone_meta: MessageMeta,
    },
}

/// A concrete governance or application message instance.
///
/// This is the `MessageImpl` the timeline's collaborators (the conversion
/// layer, the message store) hand in; the timeline never constructs one on
/// its own, only threads `Arc` clones of messages it has already accepted
/// back out as proofs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageImpl {
    pub name: String,
    pub meta: MessageMeta,
    pub authentication: Authentication,
    pub global_time: u64,
    pub resolution: ResolutionInstance,
    pub payload: Payload,
}

/// A proof is a shared, immutable, previously accepted [`MessageImpl`].
pub type Proof = Arc<MessageImpl>;

// ---------------------------------------------------------------------------
// PermissionEntry
// ---------------------------------------------------------------------------

/// One ledger or policy-log cell: the verdict plus the proofs that justify
/// it. `proofs` is never empty — construction enforces at least one proof.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionEntry {
    pub allowed: bool,
    pub proofs: Vec<Proof>,
}

impl PermissionEntry {
    /// Construct a new entry with its first proof.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use overlay_timeline::types::{Authentication, Member, MessageImpl, MessageMeta, Payload, PermissionEntry, Resolution, ResolutionInstance, AuthenticationKind};
    /// use std::sync::Arc;
    ///
    /// let signer = Member::new([0u8; 20], 0);
    /// let meta = MessageMeta::new("vote", Resolution::Linear, AuthenticationKind::Single);
    /// let proof = Arc::new(MessageImpl {
    ///     name: "dispersy-authorize".into(),
    ///     meta,
    ///     authentication: Authentication::Single { member: signer },
    ///     global_time: 10,
    ///     resolution: ResolutionInstance::Public,
    ///     payload: Payload::Application,
    /// });
    ///
    /// let entry = PermissionEntry::new(true, proof);
    /// assert!(entry.allowed);
    /// assert_eq!(entry.proofs.len(), 1);
    /// ```
    pub fn new(allowed: bool, proof: Proof) -> Self {
        Self { allowed, proofs: alloc_vec_of(proof) }
    }

    /// Append a coalescing proof (same `allowed` value, later duplicate
    /// mutation at the same logical time).
    pub fn push_proof(&mut self, proof: Proof) {
        self.proofs.push(proof);
    }
}

fn alloc_vec_of(proof: Proof) -> Vec<Proof> {
    let mut v = Vec::with_capacity(1);
    v.push(proof);
    v
}

/// A `(policy, proofs)` cell inside the [`crate::policy::PolicyLog`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyEntry {
    pub policy: Policy,
    pub proofs: Vec<Proof>,
}
