// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Overlay Timeline Authors

//! # Basic Timeline Example
//!
//! Demonstrates the master member granting a linear permission, a held
//! proof, and a later revocation. Run with:
//!
//! ```bash
//! cargo run --example basic
//! ```

use std::sync::Arc;

use overlay_timeline::config::TimelineConfig;
use overlay_timeline::timeline::Timeline;
use overlay_timeline::types::{
    Authentication, AuthenticationKind, Member, MessageImpl, MessageMeta, Payload, Permission,
    PermissionTriplet, Resolution, ResolutionInstance,
};

fn main() {
    println!("overlay-timeline — Basic Example\n");

    // -------------------------------------------------------------------
    // 1. Construct the timeline, bound to a master member and a local
    //    node identity.
    // -------------------------------------------------------------------
    let master = Member::new([0u8; 20], 0);
    let alice = Member::new([1u8; 20], 1);
    let mut timeline = Timeline::new(master, alice, TimelineConfig::default());

    // -------------------------------------------------------------------
    // 2. Describe the message type being gated: a `Linear`-resolution
    //    "vote" message, single-signer.
    // -------------------------------------------------------------------
    let vote = MessageMeta::new("vote", Resolution::Linear, AuthenticationKind::Single);

    println!("Before any grant, Alice may permit \"vote\"? {}", timeline.allowed(alice, &vote, Some(1), Permission::Permit).unwrap().0);

    // -------------------------------------------------------------------
    // 3. The master authorizes Alice to permit "vote" messages.
    // -------------------------------------------------------------------
    let grant_record = Arc::new(MessageImpl {
        name: "dispersy-authorize".into(),
        meta: vote.clone(),
        authentication: Authentication::Single { member: master },
        global_time: 10,
        resolution: ResolutionInstance::Public,
        payload: Payload::Application,
    });
    let triplets = vec![PermissionTriplet { member: alice, meta: vote.clone(), permission: Permission::Permit }];
    let (ok, _proofs) = timeline.authorize(master, 10, &triplets, grant_record).expect("grant should succeed");
    println!("Grant applied: {ok}");

    timeline.observe_global_time(15);
    let (allowed, proofs) = timeline.allowed(alice, &vote, None, Permission::Permit).unwrap();
    println!("After the grant, Alice may permit \"vote\"? {allowed} (justified by {} proof(s))", proofs.len());

    // -------------------------------------------------------------------
    // 4. The master later revokes it.
    // -------------------------------------------------------------------
    let revoke_record = Arc::new(MessageImpl {
        name: "dispersy-revoke".into(),
        meta: vote.clone(),
        authentication: Authentication::Single { member: master },
        global_time: 20,
        resolution: ResolutionInstance::Public,
        payload: Payload::Application,
    });
    timeline.revoke(master, 20, &triplets, revoke_record).expect("revoke should succeed");

    timeline.observe_global_time(25);
    let (allowed_after_revoke, _) = timeline.allowed(alice, &vote, None, Permission::Permit).unwrap();
    println!("After the revoke, Alice may permit \"vote\"? {allowed_after_revoke}");

    // History is never deleted: a query at time 15 still sees the grant.
    let (still_held_at_15, _) = timeline.allowed(alice, &vote, Some(15), Permission::Permit).unwrap();
    println!("...but at time 15 (before the revoke), she still did: {still_held_at_15}");
}
