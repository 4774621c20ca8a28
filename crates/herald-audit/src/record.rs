//! Normalized log records.
//!
//! A record is what the dispatcher hands to the log sink: a category, the
//! subject the record is about, a set of free-form fields and the time it
//! was emitted. Records are immutable once built.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::model::{Identity, ScopeId};

/// Category of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordCategory {
    MemberJoined,
    MemberLeft,
    MemberKicked,
    MemberBanned,
    RolesUpdated,
    NicknameChanged,
    TimeoutApplied,
    TimeoutRemoved,
    MessageDeleted,
    MessageEdited,
}

impl RecordCategory {
    /// Human-readable title.
    pub fn title(&self) -> &'static str {
        match self {
            Self::MemberJoined => "Member Joined",
            Self::MemberLeft => "Member Left",
            Self::MemberKicked => "Member Kicked",
            Self::MemberBanned => "Member Banned",
            Self::RolesUpdated => "Roles Updated",
            Self::NicknameChanged => "Nickname Changed",
            Self::TimeoutApplied => "Timeout Applied/Updated",
            Self::TimeoutRemoved => "Timeout Removed",
            Self::MessageDeleted => "Message Deleted",
            Self::MessageEdited => "Message Edited",
        }
    }
}

impl std::fmt::Display for RecordCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MemberJoined => write!(f, "MEMBER_JOINED"),
            Self::MemberLeft => write!(f, "MEMBER_LEFT"),
            Self::MemberKicked => write!(f, "MEMBER_KICKED"),
            Self::MemberBanned => write!(f, "MEMBER_BANNED"),
            Self::RolesUpdated => write!(f, "ROLES_UPDATED"),
            Self::NicknameChanged => write!(f, "NICKNAME_CHANGED"),
            Self::TimeoutApplied => write!(f, "TIMEOUT_APPLIED"),
            Self::TimeoutRemoved => write!(f, "TIMEOUT_REMOVED"),
            Self::MessageDeleted => write!(f, "MESSAGE_DELETED"),
            Self::MessageEdited => write!(f, "MESSAGE_EDITED"),
        }
    }
}

/// A normalized log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Unique record ID.
    pub record_id: Uuid,

    /// When the record was emitted.
    pub emitted_at: DateTime<Utc>,

    pub category: RecordCategory,

    pub scope_id: ScopeId,

    /// Who the record is about. `None` when the directory did not say.
    pub subject: Option<Identity>,

    /// Category-specific fields, in insertion order.
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl LogRecord {
    /// Create a builder for a record.
    pub fn builder(
        category: RecordCategory,
        scope_id: ScopeId,
        emitted_at: DateTime<Utc>,
    ) -> LogRecordBuilder {
        LogRecordBuilder::new(category, scope_id, emitted_at)
    }

    /// Look up a field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// String value of a field, if it is a string.
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Format the record as a human-readable log line.
    ///
    /// Format: `[timestamp] CATEGORY scope=... subject=... key=value ...`
    pub fn to_log_line(&self) -> String {
        let subject = self
            .subject
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "Unknown".to_string());

        let mut line = format!(
            "[{}] {} scope={} subject=\"{}\"",
            self.emitted_at.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            self.category,
            self.scope_id,
            subject,
        );

        for (key, value) in &self.fields {
            line.push_str(&format!(" {}=\"{}\"", key, render_value(value)));
        }

        line
    }
}

fn render_value(value: &Value) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Array(items) if items.is_empty() => "None".to_string(),
        Value::Array(items) => items.iter().map(render_value).collect::<Vec<_>>().join(", "),
        Value::Null => "None".to_string(),
        other => other.to_string(),
    };
    text.replace('\n', " ").replace('"', "'")
}

/// Builder for log records.
#[derive(Debug)]
pub struct LogRecordBuilder {
    record: LogRecord,
}

impl LogRecordBuilder {
    pub fn new(category: RecordCategory, scope_id: ScopeId, emitted_at: DateTime<Utc>) -> Self {
        Self {
            record: LogRecord {
                record_id: Uuid::new_v4(),
                emitted_at,
                category,
                scope_id,
                subject: None,
                fields: Map::new(),
            },
        }
    }

    pub fn subject(mut self, subject: Option<Identity>) -> Self {
        self.record.subject = subject;
        self
    }

    /// Add a field.
    pub fn field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.record.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn build(self) -> LogRecord {
        self.record
    }
}

/// First `budget` characters of `content`, or of `placeholder` when the
/// content is empty.
pub fn excerpt(content: &str, budget: usize, placeholder: &str) -> String {
    let source = if content.is_empty() { placeholder } else { content };
    source.chars().take(budget).collect()
}
