// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Overlay Timeline Authors

//! Black-box integration coverage of the seed scenarios, exercised only
//! through the public `Timeline` façade (no access to internal stores).

use std::sync::Arc;

use overlay_timeline::config::TimelineConfig;
use overlay_timeline::timeline::Timeline;
use overlay_timeline::types::{
    Authentication, AuthenticationKind, Member, MessageImpl, MessageMeta, Payload, Permission,
    PermissionTriplet, Policy, Resolution, ResolutionInstance,
};

fn member(id: u8) -> Member {
    Member::new([id; 20], id as u64)
}

fn proof(name: &str, meta: &MessageMeta, global_time: u64, signer: Member) -> Arc<MessageImpl> {
    Arc::new(MessageImpl {
        name: name.into(),
        meta: meta.clone(),
        authentication: Authentication::Single { member: signer },
        global_time,
        resolution: ResolutionInstance::Linear,
        payload: Payload::Application,
    })
}

/// S1/S2 end-to-end through the façade: grant, observe, revoke, observe.
#[test]
fn grant_then_revoke_through_the_facade() {
    let master = member(0);
    let a = member(1);
    let meta = MessageMeta::new("msg-x", Resolution::Linear, AuthenticationKind::Single);
    let mut timeline = Timeline::new(master, member(9), TimelineConfig::default());

    let triplets = vec![PermissionTriplet { member: a, meta: meta.clone(), permission: Permission::Permit }];
    timeline.authorize(master, 10, &triplets, proof("dispersy-authorize", &meta, 10, master)).unwrap();

    assert!(!timeline.allowed(a, &meta, Some(9), Permission::Permit).unwrap().0);
    assert!(timeline.allowed(a, &meta, Some(10), Permission::Permit).unwrap().0);

    timeline.revoke(master, 20, &triplets, proof("dispersy-revoke", &meta, 20, master)).unwrap();

    assert!(timeline.allowed(a, &meta, Some(15), Permission::Permit).unwrap().0);
    assert!(!timeline.allowed(a, &meta, Some(25), Permission::Permit).unwrap().0);
}

/// S3 — a signer with no standing is denied, and the denial leaves no
/// trace in the ledger.
#[test]
fn unauthorized_signer_is_denied() {
    let master = member(0);
    let outsider = member(66);
    let a = member(1);
    let meta = MessageMeta::new("msg-x", Resolution::Linear, AuthenticationKind::Single);
    let mut timeline = Timeline::new(master, member(9), TimelineConfig::default());

    let triplets = vec![PermissionTriplet { member: a, meta: meta.clone(), permission: Permission::Permit }];
    let (ok, _) = timeline.authorize(outsider, 10, &triplets, proof("dispersy-authorize", &meta, 10, outsider)).unwrap();
    assert!(!ok);
    assert!(!timeline.allowed(a, &meta, Some(11), Permission::Permit).unwrap().0);
}

/// S4 — dynamic resolution policy switch, strict-less lookup semantics.
#[test]
fn dynamic_policy_switch() {
    let master = member(0);
    let meta = MessageMeta::new("msg-y", Resolution::Dynamic { default: Policy::Public }, AuthenticationKind::Single);
    let mut timeline = Timeline::new(master, member(9), TimelineConfig::default());

    timeline.change_resolution_policy(&meta, 50, Policy::Linear, proof("dispersy-dynamic-settings", &meta, 50, master));

    assert_eq!(timeline.get_resolution_policy(&meta, 50).0, Policy::Public);
    assert_eq!(timeline.get_resolution_policy(&meta, 51).0, Policy::Linear);

    timeline.change_resolution_policy(&meta, 100, Policy::Public, proof("dispersy-dynamic-settings", &meta, 100, master));

    assert_eq!(timeline.get_resolution_policy(&meta, 100).0, Policy::Linear);
    assert_eq!(timeline.get_resolution_policy(&meta, 101).0, Policy::Public);
}

/// S5 — co-signed messages require every signer to hold standing
/// independently; the first denial short-circuits.
#[test]
fn cosigned_message_requires_both_signers() {
    let master = member(0);
    let a = member(1);
    let b = member(2);
    let meta = MessageMeta::new("msg-double", Resolution::Linear, AuthenticationKind::Single);
    let mut timeline = Timeline::new(master, member(9), TimelineConfig::default());

    let triplets = vec![PermissionTriplet { member: a, meta: meta.clone(), permission: Permission::Permit }];
    timeline.authorize(master, 10, &triplets, proof("dispersy-authorize", &meta, 10, master)).unwrap();

    let message = MessageImpl {
        name: "app".into(),
        meta: meta.clone(),
        authentication: Authentication::Double { members: [a, b] },
        global_time: 20,
        resolution: ResolutionInstance::Linear,
        payload: Payload::Application,
    };
    let (allowed, _) = timeline.check(&message, Permission::Permit).unwrap();
    assert!(!allowed, "b never received standing, so the co-signed message must be denied");

    let triplets_b = vec![PermissionTriplet { member: b, meta: meta.clone(), permission: Permission::Permit }];
    timeline.authorize(master, 15, &triplets_b, proof("dispersy-authorize", &meta, 15, master)).unwrap();
    let (allowed, _) = timeline.check(&message, Permission::Permit).unwrap();
    assert!(allowed);
}

/// S6 — authorize container any-accept (check path) vs. all-or-nothing
/// commit (mutation path), exercised together.
#[test]
fn container_any_accept_vs_mutation_all_or_nothing() {
    let master = member(0);
    let signer = member(1);
    let msg1 = MessageMeta::new("msg-1", Resolution::Linear, AuthenticationKind::Single);
    let msg2 = MessageMeta::new("msg-2", Resolution::Linear, AuthenticationKind::Single);
    let mut timeline = Timeline::new(master, member(9), TimelineConfig::default());

    let authority_for_msg1 = vec![PermissionTriplet { member: signer, meta: msg1.clone(), permission: Permission::Permit }];
    timeline
        .authorize(master, 5, &authority_for_msg1, proof("dispersy-authorize", &msg1, 5, master))
        .unwrap();
    // Grant the signer authorize^msg-1 specifically (not permit).
    let authorize_grant = vec![PermissionTriplet { member: signer, meta: msg1.clone(), permission: Permission::Authorize }];
    timeline.authorize(master, 6, &authorize_grant, proof("dispersy-authorize", &msg1, 6, master)).unwrap();

    let a = member(10);
    let c = member(11);
    let container = MessageImpl {
        name: "dispersy-authorize".into(),
        meta: MessageMeta::new("dispersy-authorize", Resolution::Public, AuthenticationKind::Single),
        authentication: Authentication::Single { member: signer },
        global_time: 30,
        resolution: ResolutionInstance::Public,
        payload: Payload::AuthorizeRevoke {
            triplets: vec![
                PermissionTriplet { member: a, meta: msg1.clone(), permission: Permission::Permit },
                PermissionTriplet { member: c, meta: msg2.clone(), permission: Permission::Permit },
            ],
        },
    };
    let (accepted, _) = timeline.check(&container, Permission::Permit).unwrap();
    assert!(accepted, "signer has standing on msg-1, so the container as a whole is accepted");

    // Literal S6: ingesting that same container commits only the group
    // the signer actually had standing on.
    let (ingested, _) = timeline
        .ingest_authorize(signer, 30, &[
            PermissionTriplet { member: a, meta: msg1.clone(), permission: Permission::Permit },
            PermissionTriplet { member: c, meta: msg2.clone(), permission: Permission::Permit },
        ], proof("dispersy-authorize", &msg1, 30, signer))
        .unwrap();
    assert!(ingested);
    assert!(timeline.allowed(a, &msg1, Some(30), Permission::Permit).unwrap().0);
    assert!(!timeline.allowed(c, &msg2, Some(30), Permission::Permit).unwrap().0);

    // The mutation path is strict: submitting both target metas in one
    // batch denies the whole batch because the signer lacks authority on
    // msg-2.
    let mixed = vec![
        PermissionTriplet { member: a, meta: msg1.clone(), permission: Permission::Permit },
        PermissionTriplet { member: c, meta: msg2.clone(), permission: Permission::Permit },
    ];
    let (ok, _) = timeline.authorize(signer, 31, &mixed, proof("dispersy-authorize", &msg1, 31, signer)).unwrap();
    assert!(!ok);

    // Submitted as its own batch, the msg-1 grant succeeds.
    let only_msg1 = vec![PermissionTriplet { member: a, meta: msg1.clone(), permission: Permission::Permit }];
    let (ok, _) = timeline.authorize(signer, 31, &only_msg1, proof("dispersy-authorize", &msg1, 31, signer)).unwrap();
    assert!(ok);
    assert!(timeline.allowed(a, &msg1, Some(32), Permission::Permit).unwrap().0);
    assert!(!timeline.allowed(c, &msg2, Some(32), Permission::Permit).unwrap().0);
}

/// Non-positive `global_time` is a programmer error, not a deny.
#[test]
fn non_positive_global_time_is_an_error() {
    let master = member(0);
    let meta = MessageMeta::new("msg-x", Resolution::Linear, AuthenticationKind::Single);
    let timeline = Timeline::new(master, member(9), TimelineConfig::default());
    let result = timeline.allowed(member(1), &meta, Some(0), Permission::Permit);
    assert!(result.is_err());
}
