//! Event dispatcher.
//!
//! One handler per notification category. Each handler consults the
//! resolver or correlator as needed and maps the notification to zero or
//! more [`LogRecord`]s. Attribution always finishes before a record is
//! emitted; when it fails the record is still emitted with "Unknown" in
//! the attribution fields.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use herald_core::{CategoryToggles, HeraldConfig, LoggingConfig, RecordsConfig};

use crate::clock::Clock;
use crate::correlator::{ActorAttribution, AuditCorrelator};
use crate::directory::Directory;
use crate::model::{
    ActionKind, AuditEntry, Identity, Member, Message, Notification, Role, ScopeId,
};
use crate::record::{LogRecord, LogRecordBuilder, RecordCategory, excerpt};
use crate::resolver::{InviteAttribution, InviteResolver};
use crate::sink::LogSink;
use crate::snapshot::SnapshotStore;

/// Routes notifications through attribution and into the log sink.
pub struct Dispatcher {
    store: Arc<SnapshotStore>,
    resolver: InviteResolver,
    correlator: AuditCorrelator,
    sink: Arc<dyn LogSink>,
    clock: Arc<dyn Clock>,
    records: RecordsConfig,
    logging: LoggingConfig,
}

impl Dispatcher {
    pub fn new(
        config: &HeraldConfig,
        directory: Arc<dyn Directory>,
        sink: Arc<dyn LogSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let store = Arc::new(SnapshotStore::new(directory.clone()));
        let resolver = InviteResolver::new(directory.clone(), store.clone());
        let correlator = AuditCorrelator::new(
            directory,
            clock.clone(),
            config.attribution.audit_lookback,
            config.attribution.windows,
        );
        Self {
            store,
            resolver,
            correlator,
            sink,
            clock,
            records: config.records.clone(),
            logging: config.logging.clone(),
        }
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// Handle a notification and deliver its records to the sink.
    ///
    /// Returns the number of records delivered. Sink failures are logged and
    /// do not stop delivery of the remaining records.
    pub async fn dispatch(&self, notification: Notification) -> usize {
        let kind = notification.kind();
        let records = self.handle(notification).await;
        let mut delivered = 0;

        for record in records {
            let category = record.category;
            match self.sink.emit(record).await {
                Ok(()) => delivered += 1,
                Err(err) => {
                    tracing::warn!(notification = kind, %category, error = %err, "Failed to deliver log record")
                }
            }
        }

        delivered
    }

    /// Map a notification to the records it produces, without delivering them.
    pub async fn handle(&self, notification: Notification) -> Vec<LogRecord> {
        match notification {
            Notification::Ready { scopes } => {
                self.on_ready(&scopes).await;
                Vec::new()
            }
            Notification::ScopeJoined { scope_id } => {
                tracing::info!(scope = scope_id, "Tracking scope");
                self.store.refresh(scope_id).await;
                Vec::new()
            }
            Notification::ScopeLeft { scope_id } => {
                if self.store.forget(scope_id) {
                    tracing::info!(scope = scope_id, "Stopped tracking scope");
                }
                Vec::new()
            }
            Notification::InviteCreated { scope_id, code }
            | Notification::InviteDeleted { scope_id, code } => {
                match scope_id {
                    Some(scope) => {
                        tracing::debug!(scope, code = %code, "Invite changed, refreshing snapshot");
                        self.store.refresh(scope).await;
                    }
                    None => tracing::debug!(code = %code, "Invite change without scope ignored"),
                }
                Vec::new()
            }
            Notification::MemberJoined { scope_id, member } => {
                self.on_member_joined(scope_id, member).await
            }
            Notification::MemberRemoved { scope_id, member } => {
                self.on_member_removed(scope_id, member).await
            }
            Notification::MemberBanned { scope_id, user } => {
                self.on_member_banned(scope_id, user).await
            }
            Notification::MemberUpdated {
                scope_id,
                before,
                after,
            } => self.on_member_updated(scope_id, &before, &after).await,
            Notification::MessageDeleted { message } => self.on_message_deleted(message),
            Notification::MessageEdited { before, after } => {
                self.on_message_edited(&before, after)
            }
        }
    }

    async fn on_ready(&self, scopes: &[ScopeId]) {
        join_all(scopes.iter().map(|&scope| self.store.refresh(scope))).await;
        tracing::info!(scopes = scopes.len(), "Invite snapshots initialized");
    }

    async fn on_member_joined(&self, scope: ScopeId, member: Member) -> Vec<LogRecord> {
        let toggles = self.toggles(scope);
        if !toggles.member_join || !toggles.invites {
            // keep the snapshot current so later joins diff against fresh counts
            self.store.refresh(scope).await;
        }
        if !toggles.member_join {
            return Vec::new();
        }

        let account_created = member
            .account_created
            .map(|ts| ts.to_rfc3339())
            .unwrap_or_else(|| "Unknown".to_string());
        let mut builder = self
            .record(RecordCategory::MemberJoined, scope)
            .subject(Some(member.user))
            .field("account_created", account_created);

        if toggles.invites {
            builder = match self.resolver.resolve_join(scope).await {
                InviteAttribution::Invite {
                    code,
                    inviter,
                    uses,
                } => builder
                    .field("invite", code)
                    .field(
                        "inviter",
                        inviter
                            .map(|i| i.to_string())
                            .unwrap_or_else(|| "Unknown inviter".to_string()),
                    )
                    .field("uses", uses),
                InviteAttribution::Vanity { code } => builder.field("vanity", code),
                InviteAttribution::Unknown(reason) => builder
                    .field("invite", "Unknown")
                    .field("invite_note", reason.to_string()),
            };
        }

        vec![builder.build()]
    }

    async fn on_member_removed(&self, scope: ScopeId, member: Member) -> Vec<LogRecord> {
        let toggles = self.toggles(scope);
        if !toggles.member_join && !toggles.kick {
            return Vec::new();
        }

        let kick = self
            .correlator
            .find_actor(scope, ActionKind::Kick, member.user.id)
            .await;

        match kick {
            Some(entry) if toggles.kick => {
                vec![
                    self.moderated(RecordCategory::MemberKicked, scope, member.user, Some(&entry))
                        .build(),
                ]
            }
            Some(_) => Vec::new(),
            None if toggles.member_join => vec![
                self.record(RecordCategory::MemberLeft, scope)
                    .subject(Some(member.user))
                    .build(),
            ],
            None => Vec::new(),
        }
    }

    async fn on_member_banned(&self, scope: ScopeId, user: Identity) -> Vec<LogRecord> {
        if !self.toggles(scope).ban {
            return Vec::new();
        }
        let entry = self.correlator.find_actor(scope, ActionKind::Ban, user.id).await;
        vec![
            self.moderated(RecordCategory::MemberBanned, scope, user, entry.as_ref())
                .build(),
        ]
    }

    async fn on_member_updated(
        &self,
        scope: ScopeId,
        before: &Member,
        after: &Member,
    ) -> Vec<LogRecord> {
        let toggles = self.toggles(scope);
        let mut records = Vec::new();
        let subject = after.user.id;

        let (added, removed) = role_diff(&before.roles, &after.roles);
        if toggles.roles && (!added.is_empty() || !removed.is_empty()) {
            let attribution = self
                .correlator
                .attribute(scope, ActionKind::MemberRoleUpdate, subject)
                .await;
            records.push(
                self.record(RecordCategory::RolesUpdated, scope)
                    .subject(Some(after.user.clone()))
                    .field("by", attribution.actor_label())
                    .field("added", role_names(&added))
                    .field("removed", role_names(&removed))
                    .build(),
            );
        }

        if toggles.nickname && before.nick != after.nick {
            let attribution = self
                .correlator
                .attribute(scope, ActionKind::MemberUpdate, subject)
                .await;
            records.push(
                self.record(RecordCategory::NicknameChanged, scope)
                    .subject(Some(after.user.clone()))
                    .field("by", attribution.actor_label())
                    .field("before", before.display_name())
                    .field("after", after.display_name())
                    .build(),
            );
        }

        if toggles.timeout && before.timed_out_until != after.timed_out_until {
            let attribution = self
                .correlator
                .attribute(scope, ActionKind::MemberUpdate, subject)
                .await;
            let record = match after.timed_out_until {
                Some(until) => self
                    .record(RecordCategory::TimeoutApplied, scope)
                    .subject(Some(after.user.clone()))
                    .field("by", attribution.actor_label())
                    .field("until", until.to_rfc3339()),
                None => self
                    .record(RecordCategory::TimeoutRemoved, scope)
                    .subject(Some(after.user.clone()))
                    .field("by", attribution.actor_label()),
            };
            records.push(record.build());
        }

        records
    }

    fn on_message_deleted(&self, message: Message) -> Vec<LogRecord> {
        let Some(scope) = message.scope_id else {
            return Vec::new();
        };
        if message.from_automated_author() || !self.toggles(scope).message_delete {
            return Vec::new();
        }

        let content = excerpt(
            &message.content,
            self.records.delete_content_chars,
            &self.records.empty_content_placeholder,
        );
        vec![
            self.record(RecordCategory::MessageDeleted, scope)
                .subject(message.author)
                .field("channel", format!("<#{}>", message.channel_id))
                .field("content", content)
                .build(),
        ]
    }

    fn on_message_edited(&self, before: &Message, after: Message) -> Vec<LogRecord> {
        let Some(scope) = after.scope_id else {
            return Vec::new();
        };
        if after.from_automated_author()
            || before.content == after.content
            || !self.toggles(scope).message_edit
        {
            return Vec::new();
        }

        let budget = self.records.edit_content_chars;
        let placeholder = &self.records.empty_content_placeholder;
        vec![
            self.record(RecordCategory::MessageEdited, scope)
                .subject(after.author)
                .field("channel", format!("<#{}>", after.channel_id))
                .field("before", excerpt(&before.content, budget, placeholder))
                .field("after", excerpt(&after.content, budget, placeholder))
                .build(),
        ]
    }

    /// Kick and ban records: actor, or "Unknown", plus the audit reason.
    fn moderated(
        &self,
        category: RecordCategory,
        scope: ScopeId,
        user: Identity,
        entry: Option<&AuditEntry>,
    ) -> LogRecordBuilder {
        let attribution = ActorAttribution::from_entry(entry);
        let reason = entry
            .and_then(|e| e.reason.clone())
            .unwrap_or_else(|| "No reason".to_string());
        self.record(category, scope)
            .subject(Some(user))
            .field("by", attribution.actor_label())
            .field("reason", reason)
    }

    fn record(&self, category: RecordCategory, scope: ScopeId) -> LogRecordBuilder {
        LogRecord::builder(category, scope, self.clock.now())
    }

    fn toggles(&self, scope: ScopeId) -> CategoryToggles {
        self.logging.effective(scope)
    }
}

/// Roles gained and lost between two role lists, ignoring the everyone role.
///
/// Added roles keep the order of `after`, removed roles the order of `before`.
pub fn role_diff(before: &[Role], after: &[Role]) -> (Vec<Role>, Vec<Role>) {
    let before_ids: HashSet<u64> = before.iter().map(|r| r.id).collect();
    let after_ids: HashSet<u64> = after.iter().map(|r| r.id).collect();

    let added = after
        .iter()
        .filter(|r| !r.is_everyone() && !before_ids.contains(&r.id))
        .cloned()
        .collect();
    let removed = before
        .iter()
        .filter(|r| !r.is_everyone() && !after_ids.contains(&r.id))
        .cloned()
        .collect();
    (added, removed)
}

fn role_names(roles: &[Role]) -> Vec<String> {
    roles.iter().map(|r| r.name.clone()).collect()
}
