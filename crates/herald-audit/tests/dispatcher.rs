//! End-to-end tests for the dispatcher.
//!
//! Every test wires a dispatcher to an in-memory directory, a memory sink
//! and a manual clock, then drives it with notifications.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use herald_audit::{
    ActionKind, AuditEntry, Clock, DirectoryCall, DirectoryError, Dispatcher, Identity, Invite,
    ManualClock, Member, MemorySink, Message, Notification, RecordCategory, Role,
    StaticDirectory, VanityInvite,
};
use herald_core::{HeraldConfig, ToggleOverrides};

const SCOPE: u64 = 1000;

struct Harness {
    dir: Arc<StaticDirectory>,
    sink: Arc<MemorySink>,
    clock: Arc<ManualClock>,
    dispatcher: Dispatcher,
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 4, 18, 30, 0).unwrap()
}

fn harness_with(config: HeraldConfig) -> Harness {
    let dir = Arc::new(StaticDirectory::new());
    let sink = Arc::new(MemorySink::new());
    let clock = Arc::new(ManualClock::new(start()));
    let dispatcher = Dispatcher::new(&config, dir.clone(), sink.clone(), clock.clone());
    Harness {
        dir,
        sink,
        clock,
        dispatcher,
    }
}

fn harness() -> Harness {
    harness_with(HeraldConfig::default())
}

fn alice() -> Identity {
    Identity::new(1, "alice")
}

fn moderator() -> Identity {
    Identity::new(99, "mod")
}

fn entry(h: &Harness, action: ActionKind, target: u64, age_secs: i64) -> AuditEntry {
    AuditEntry {
        action,
        target_id: Some(target),
        actor: Some(moderator()),
        reason: Some("rule 3".to_string()),
        created_at: h.clock.now() - Duration::seconds(age_secs),
    }
}

fn message(id: u64, author: Identity, content: &str) -> Message {
    Message {
        id,
        scope_id: Some(SCOPE),
        channel_id: 55,
        author: Some(author),
        content: content.to_string(),
    }
}

// =============================================================================
// JOINS
// =============================================================================

#[tokio::test]
async fn join_with_new_invite_from_empty_snapshot() {
    let h = harness();
    h.dispatcher
        .dispatch(Notification::Ready { scopes: vec![SCOPE] })
        .await;
    h.dir.set_invites(
        SCOPE,
        vec![Invite::new("abc", 1).with_inviter(Identity::new(7, "carol"))],
    );

    let delivered = h
        .dispatcher
        .dispatch(Notification::MemberJoined {
            scope_id: SCOPE,
            member: Member::new(alice()),
        })
        .await;

    assert_eq!(delivered, 1);
    let records = h.sink.records();
    let record = &records[0];
    assert_eq!(record.category, RecordCategory::MemberJoined);
    assert_eq!(record.subject, Some(alice()));
    assert_eq!(record.field_str("invite"), Some("abc"));
    assert_eq!(record.field_str("inviter"), Some("carol (`7`)"));
    assert_eq!(record.field("uses").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(record.field_str("account_created"), Some("Unknown"));
    assert_eq!(record.emitted_at, start());
}

#[tokio::test]
async fn join_with_unchanged_counts_uses_vanity() {
    let h = harness();
    h.dir.set_invites(SCOPE, vec![Invite::new("abc", 5)]);
    h.dispatcher
        .dispatch(Notification::ScopeJoined { scope_id: SCOPE })
        .await;
    h.dir.set_vanity(
        SCOPE,
        Some(VanityInvite {
            code: Some("town".to_string()),
        }),
    );

    h.dispatcher
        .dispatch(Notification::MemberJoined {
            scope_id: SCOPE,
            member: Member::new(alice()),
        })
        .await;

    let records = h.sink.records();
    let record = &records[0];
    assert_eq!(record.field_str("vanity"), Some("town"));
    assert!(record.field("invite").is_none());
}

#[tokio::test]
async fn join_still_logged_when_invites_unreadable() {
    let h = harness();
    h.dir
        .fail(SCOPE, DirectoryCall::ListInvites, DirectoryError::PermissionDenied);

    h.dispatcher
        .dispatch(Notification::MemberJoined {
            scope_id: SCOPE,
            member: Member::new(alice()),
        })
        .await;

    let records = h.sink.records();
    let record = &records[0];
    assert_eq!(record.category, RecordCategory::MemberJoined);
    assert_eq!(record.field_str("invite"), Some("Unknown"));
    assert_eq!(
        record.field_str("invite_note"),
        Some("missing permission to read invites")
    );
}

#[tokio::test]
async fn invite_created_refreshes_snapshot_before_next_join() {
    let h = harness();
    h.dir.set_invites(SCOPE, vec![Invite::new("old", 3)]);
    h.dispatcher
        .dispatch(Notification::ScopeJoined { scope_id: SCOPE })
        .await;

    // a new invite shows up already used twice (joins we never saw)
    h.dir
        .set_invites(SCOPE, vec![Invite::new("old", 3), Invite::new("new", 2)]);
    h.dispatcher
        .dispatch(Notification::InviteCreated {
            scope_id: Some(SCOPE),
            code: "new".to_string(),
        })
        .await;
    assert_eq!(h.dispatcher.store().get(SCOPE).await.uses("new"), 2);

    h.dir
        .set_invites(SCOPE, vec![Invite::new("old", 4), Invite::new("new", 2)]);
    h.dispatcher
        .dispatch(Notification::MemberJoined {
            scope_id: SCOPE,
            member: Member::new(alice()),
        })
        .await;

    assert_eq!(h.sink.records()[0].field_str("invite"), Some("old"));
}

#[tokio::test]
async fn scope_left_discards_snapshot() {
    let h = harness();
    h.dir.set_invites(SCOPE, vec![Invite::new("abc", 5)]);
    h.dispatcher
        .dispatch(Notification::Ready {
            scopes: vec![SCOPE, SCOPE + 1],
        })
        .await;
    assert_eq!(h.dispatcher.store().tracked_scopes(), vec![SCOPE, SCOPE + 1]);

    h.dispatcher
        .dispatch(Notification::ScopeLeft { scope_id: SCOPE })
        .await;
    assert!(!h.dispatcher.store().is_tracked(SCOPE));
    assert!(h.dispatcher.store().get(SCOPE).await.is_empty());
    assert!(h.sink.is_empty());
}

#[tokio::test]
async fn invites_toggle_off_omits_attribution_but_keeps_snapshot_current() {
    let mut config = HeraldConfig::default();
    config.logging.defaults.invites = false;
    let h = harness_with(config);
    h.dir.set_invites(SCOPE, vec![Invite::new("abc", 2)]);

    h.dispatcher
        .dispatch(Notification::MemberJoined {
            scope_id: SCOPE,
            member: Member::new(alice()),
        })
        .await;

    let records = h.sink.records();
    let record = &records[0];
    assert_eq!(record.category, RecordCategory::MemberJoined);
    assert!(record.field("invite").is_none());
    assert!(record.field("vanity").is_none());
    assert_eq!(h.dispatcher.store().get(SCOPE).await.uses("abc"), 2);
}

// =============================================================================
// LEAVES, KICKS, BANS
// =============================================================================

#[tokio::test]
async fn leave_with_recent_kick_entry_is_a_kick() {
    let h = harness();
    h.dir
        .push_audit_entry(SCOPE, entry(&h, ActionKind::Kick, alice().id, 10));

    h.dispatcher
        .dispatch(Notification::MemberRemoved {
            scope_id: SCOPE,
            member: Member::new(alice()),
        })
        .await;

    let records = h.sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].category, RecordCategory::MemberKicked);
    assert_eq!(records[0].field_str("by"), Some("mod (`99`)"));
    assert_eq!(records[0].field_str("reason"), Some("rule 3"));
}

#[tokio::test]
async fn leave_with_stale_kick_entry_is_a_plain_leave() {
    let h = harness();
    h.dir
        .push_audit_entry(SCOPE, entry(&h, ActionKind::Kick, alice().id, 25));

    h.dispatcher
        .dispatch(Notification::MemberRemoved {
            scope_id: SCOPE,
            member: Member::new(alice()),
        })
        .await;

    let records = h.sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].category, RecordCategory::MemberLeft);
    assert!(records[0].field("by").is_none());
}

#[tokio::test]
async fn ban_is_always_logged() {
    let h = harness();
    h.dir
        .fail(SCOPE, DirectoryCall::AuditEntries, DirectoryError::Timeout);

    h.dispatcher
        .dispatch(Notification::MemberBanned {
            scope_id: SCOPE,
            user: alice(),
        })
        .await;

    let records = h.sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].category, RecordCategory::MemberBanned);
    assert_eq!(records[0].field_str("by"), Some("Unknown"));
    assert_eq!(records[0].field_str("reason"), Some("No reason"));
}

#[tokio::test]
async fn ban_with_entry_names_moderator() {
    let h = harness();
    h.dir
        .push_audit_entry(SCOPE, entry(&h, ActionKind::Ban, alice().id, 2));

    h.dispatcher
        .dispatch(Notification::MemberBanned {
            scope_id: SCOPE,
            user: alice(),
        })
        .await;

    let records = h.sink.records();
    let record = &records[0];
    assert_eq!(record.field_str("by"), Some("mod (`99`)"));
    assert_eq!(record.field_str("reason"), Some("rule 3"));
}

#[tokio::test]
async fn kick_toggle_off_suppresses_kick_but_not_leave() {
    let mut config = HeraldConfig::default();
    config.logging.scopes.insert(
        SCOPE,
        ToggleOverrides {
            kick: Some(false),
            ..Default::default()
        },
    );
    let h = harness_with(config);
    h.dir
        .push_audit_entry(SCOPE, entry(&h, ActionKind::Kick, alice().id, 1));

    h.dispatcher
        .dispatch(Notification::MemberRemoved {
            scope_id: SCOPE,
            member: Member::new(alice()),
        })
        .await;
    assert!(h.sink.is_empty());

    let bob = Identity::new(2, "bob");
    h.dispatcher
        .dispatch(Notification::MemberRemoved {
            scope_id: SCOPE,
            member: Member::new(bob),
        })
        .await;
    assert_eq!(h.sink.records()[0].category, RecordCategory::MemberLeft);
}

// =============================================================================
// MEMBER UPDATES
// =============================================================================

fn member_with_roles(roles: Vec<Role>) -> Member {
    Member {
        roles,
        ..Member::new(alice())
    }
}

#[tokio::test]
async fn equal_role_sets_produce_no_record() {
    let h = harness();
    let roles = vec![Role::new(SCOPE, "@everyone"), Role::new(2, "Mod")];
    let mut reordered = roles.clone();
    reordered.reverse();

    let delivered = h
        .dispatcher
        .dispatch(Notification::MemberUpdated {
            scope_id: SCOPE,
            before: member_with_roles(roles),
            after: member_with_roles(reordered),
        })
        .await;
    assert_eq!(delivered, 0);
}

#[tokio::test]
async fn one_added_one_removed_role_is_one_record() {
    let h = harness();
    h.dir.push_audit_entry(
        SCOPE,
        entry(&h, ActionKind::MemberRoleUpdate, alice().id, 24),
    );

    h.dispatcher
        .dispatch(Notification::MemberUpdated {
            scope_id: SCOPE,
            before: member_with_roles(vec![Role::new(SCOPE, "@everyone"), Role::new(2, "Mod")]),
            after: member_with_roles(vec![Role::new(SCOPE, "@everyone"), Role::new(3, "VIP")]),
        })
        .await;

    let records = h.sink.records();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.category, RecordCategory::RolesUpdated);
    assert_eq!(record.field_str("by"), Some("mod (`99`)"));
    assert_eq!(record.field("added"), Some(&serde_json::json!(["VIP"])));
    assert_eq!(record.field("removed"), Some(&serde_json::json!(["Mod"])));
}

#[tokio::test]
async fn nickname_change_falls_back_to_account_name() {
    let h = harness();
    let before = Member::new(alice());
    let after = Member {
        nick: Some("Ally".to_string()),
        ..Member::new(alice())
    };

    h.dispatcher
        .dispatch(Notification::MemberUpdated {
            scope_id: SCOPE,
            before,
            after,
        })
        .await;

    let records = h.sink.records();
    let record = &records[0];
    assert_eq!(record.category, RecordCategory::NicknameChanged);
    assert_eq!(record.field_str("before"), Some("alice"));
    assert_eq!(record.field_str("after"), Some("Ally"));
    assert_eq!(record.field_str("by"), Some("Unknown"));
}

#[tokio::test]
async fn timeout_applied_and_removed() {
    let h = harness();
    let until = start() + Duration::hours(1);
    h.dir
        .push_audit_entry(SCOPE, entry(&h, ActionKind::MemberUpdate, alice().id, 5));

    let free = Member::new(alice());
    let muted = Member {
        timed_out_until: Some(until),
        ..Member::new(alice())
    };

    h.dispatcher
        .dispatch(Notification::MemberUpdated {
            scope_id: SCOPE,
            before: free.clone(),
            after: muted.clone(),
        })
        .await;
    h.clock.advance(Duration::minutes(5));
    h.dispatcher
        .dispatch(Notification::MemberUpdated {
            scope_id: SCOPE,
            before: muted,
            after: free,
        })
        .await;

    let records = h.sink.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].category, RecordCategory::TimeoutApplied);
    assert_eq!(records[0].field_str("by"), Some("mod (`99`)"));
    assert_eq!(
        records[0].field_str("until"),
        Some(until.to_rfc3339().as_str())
    );
    assert_eq!(records[1].category, RecordCategory::TimeoutRemoved);
    // the entry is five minutes old by now
    assert_eq!(records[1].field_str("by"), Some("Unknown"));
}

#[tokio::test]
async fn one_update_can_emit_several_records() {
    let h = harness();
    let before = member_with_roles(vec![Role::new(2, "Mod")]);
    let after = Member {
        nick: Some("Ally".to_string()),
        timed_out_until: Some(start() + Duration::minutes(10)),
        ..member_with_roles(vec![])
    };

    let delivered = h
        .dispatcher
        .dispatch(Notification::MemberUpdated {
            scope_id: SCOPE,
            before,
            after,
        })
        .await;

    assert_eq!(delivered, 3);
    let categories: Vec<_> = h.sink.records().iter().map(|r| r.category).collect();
    assert_eq!(
        categories,
        vec![
            RecordCategory::RolesUpdated,
            RecordCategory::NicknameChanged,
            RecordCategory::TimeoutApplied
        ]
    );
}

// =============================================================================
// MESSAGES
// =============================================================================

#[tokio::test]
async fn unchanged_edit_emits_nothing() {
    let h = harness();
    let before = message(1, alice(), "hello");
    let after = message(1, alice(), "hello");

    let delivered = h
        .dispatcher
        .dispatch(Notification::MessageEdited { before, after })
        .await;
    assert_eq!(delivered, 0);
}

#[tokio::test]
async fn edit_truncates_both_copies() {
    let h = harness();
    let long = "x".repeat(2000);
    let before = message(1, alice(), &long);
    let after = message(1, alice(), "");

    h.dispatcher
        .dispatch(Notification::MessageEdited { before, after })
        .await;

    let records = h.sink.records();
    let record = &records[0];
    assert_eq!(record.category, RecordCategory::MessageEdited);
    assert_eq!(record.field_str("before").map(|s| s.chars().count()), Some(900));
    assert_eq!(record.field_str("after"), Some("*no text*"));
    assert_eq!(record.field_str("channel"), Some("<#55>"));
}

#[tokio::test]
async fn delete_truncates_content() {
    let h = harness();
    let long = "y".repeat(1600);

    h.dispatcher
        .dispatch(Notification::MessageDeleted {
            message: message(1, alice(), &long),
        })
        .await;

    let records = h.sink.records();
    let record = &records[0];
    assert_eq!(record.category, RecordCategory::MessageDeleted);
    assert_eq!(record.subject, Some(alice()));
    assert_eq!(record.field_str("content").map(|s| s.len()), Some(1500));
}

#[tokio::test]
async fn bot_and_direct_messages_are_suppressed() {
    let h = harness();
    let from_bot = message(1, Identity::bot(3, "helper"), "beep");
    let direct = Message {
        scope_id: None,
        ..message(2, alice(), "hi")
    };

    h.dispatcher
        .dispatch(Notification::MessageDeleted { message: from_bot.clone() })
        .await;
    h.dispatcher
        .dispatch(Notification::MessageDeleted {
            message: direct.clone(),
        })
        .await;
    h.dispatcher
        .dispatch(Notification::MessageEdited {
            before: Message {
                content: "boop".to_string(),
                ..from_bot.clone()
            },
            after: from_bot,
        })
        .await;
    h.dispatcher
        .dispatch(Notification::MessageEdited {
            before: Message {
                content: "hey".to_string(),
                ..direct.clone()
            },
            after: direct,
        })
        .await;

    assert!(h.sink.is_empty());
}

#[tokio::test]
async fn delete_with_unknown_author_is_logged_as_unknown() {
    let h = harness();
    let orphan = Message {
        author: None,
        ..message(1, alice(), "")
    };

    h.dispatcher
        .dispatch(Notification::MessageDeleted { message: orphan })
        .await;

    let records = h.sink.records();
    let record = &records[0];
    assert_eq!(record.subject, None);
    assert_eq!(record.field_str("content"), Some("*no text*"));
    assert!(record.to_log_line().contains("subject=\"Unknown\""));
}
