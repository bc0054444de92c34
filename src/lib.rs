// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Overlay Timeline Authors

//! # overlay-timeline
//!
//! The trust kernel of a gossip overlay community: who may author, who may
//! authorize others, and when the rules themselves are allowed to change.
//!
//! This crate is `no_std`-compatible (requires `alloc`). Enable the `std`
//! feature (on by default) for `tracing`-based logging and
//! `std::error::Error` impls; enable `config-loader` (implies `std`) for
//! TOML file and environment-variable configuration loading.
//!
//! ## Architecture
//!
//! ```text
//! Timeline
//!   ├── PolicyLog      — dynamic-resolution policy changes over time
//!   ├── MemberLedger    — per-member authorize/revoke history
//!   ├── CheckEngine      — read-only allowance queries (borrows both stores)
//!   └── MutationAPI       — authorize / revoke / change_resolution_policy
//! ```
//!
//! A `Timeline` is created bound to one community (its `master_member` and
//! the local node's own `my_member`) and lives for that community's
//! lifetime. It never mints `global_time` itself — callers supply it on
//! every mutation, and report its advance via
//! [`Timeline::observe_global_time`].
//!
//! ## Quick Start
//!
//! ```rust
//! use overlay_timeline::{
//!     config::TimelineConfig,
//!     timeline::Timeline,
//!     types::{Authentication, Member, MessageImpl, MessageMeta, Payload,
//!             Permission, PermissionTriplet, Resolution, ResolutionInstance,
//!             AuthenticationKind},
//! };
//! use std::sync::Arc;
//!
//! let master = Member::new([0u8; 20], 0);
//! let alice = Member::new([1u8; 20], 1);
//! let mut timeline = Timeline::new(master, alice, TimelineConfig::default());
//!
//! let meta = MessageMeta::new("vote", Resolution::Linear, AuthenticationKind::Single);
//! let grant = Arc::new(MessageImpl {
//!     name: "dispersy-authorize".into(),
//!     meta: meta.clone(),
//!     authentication: Authentication::Single { member: master },
//!     global_time: 10,
//!     resolution: ResolutionInstance::Public,
//!     payload: Payload::Application,
//! });
//!
//! let triplets = vec![PermissionTriplet { member: alice, meta: meta.clone(), permission: Permission::Permit }];
//! let (ok, _proofs) = timeline.authorize(master, 10, &triplets, grant).unwrap();
//! assert!(ok);
//! assert!(timeline.allowed(alice, &meta, Some(11), Permission::Permit).unwrap().0);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod mutation;
pub mod policy;
pub mod timeline;
pub mod types;

// Config loader — TOML file and environment variable loading.
// Only compiled when the "config-loader" feature is enabled.
#[cfg(feature = "config-loader")]
pub mod config_loader;

// Re-export the most commonly used items at the crate root so consumers can
// write `use overlay_timeline::Timeline;` instead of the fully qualified
// path.
pub use config::TimelineConfig;
pub use engine::CheckEngine;
pub use error::TimelineError;
pub use ledger::MemberLedger;
pub use mutation::MutationAPI;
pub use policy::PolicyLog;
pub use timeline::Timeline;
