//! # herald-audit
//!
//! Attribution engine for Herald.
//!
//! This crate answers "who did this, and how did they get in" for membership
//! and moderation events on a collaboration server:
//! - Tracking per-scope invite use counts and diffing them on every join
//! - Correlating departures, bans and member updates with the audit trail
//! - Mapping raw notifications to normalized log records and delivering them
//!
//! External state is eventually consistent and frequently unavailable. Every
//! failure to read it degrades to an "unknown" outcome; a record is still
//! emitted, with the attribution fields saying "Unknown".
//!
//! ## Record Categories
//!
//! | Category | Trigger |
//! |----------|---------|
//! | `MemberJoined` | Member joined, with invite attribution |
//! | `MemberLeft` | Member left with no matching kick entry |
//! | `MemberKicked` | Member left and a recent kick entry names them |
//! | `MemberBanned` | Member banned (always emitted) |
//! | `RolesUpdated` | Roles added or removed |
//! | `NicknameChanged` | Nickname changed |
//! | `TimeoutApplied` / `TimeoutRemoved` | Timeout set, changed or cleared |
//! | `MessageDeleted` / `MessageEdited` | Human-authored message deleted or edited |
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use herald_audit::{ConsoleSink, Dispatcher, Notification, StaticDirectory, SystemClock};
//! use herald_core::HeraldConfig;
//!
//! # async fn example() {
//! let config = HeraldConfig::default();
//! let directory = Arc::new(StaticDirectory::new());
//! let dispatcher = Dispatcher::new(&config, directory, Arc::new(ConsoleSink), Arc::new(SystemClock));
//!
//! dispatcher.dispatch(Notification::Ready { scopes: vec![1] }).await;
//! # }
//! ```

pub mod clock;
pub mod correlator;
pub mod directory;
pub mod dispatcher;
pub mod error;
pub mod model;
pub mod record;
pub mod resolver;
pub mod sink;
pub mod snapshot;

pub use clock::{Clock, ManualClock, SystemClock};
pub use correlator::{ActorAttribution, AuditCorrelator};
pub use directory::{Directory, DirectoryCall, StaticDirectory, TimeoutDirectory};
pub use dispatcher::Dispatcher;
pub use error::{DirectoryError, DirectoryErrorKind, SinkError};
pub use model::{
    ActionKind, AuditEntry, Identity, Invite, Member, Message, Notification, Role, ScopeId,
    UserId, VanityInvite,
};
pub use record::{LogRecord, LogRecordBuilder, RecordCategory};
pub use resolver::{InviteAttribution, InviteResolver, UnknownInvite};
pub use sink::{ConsoleSink, FileSink, LogSink, MemorySink, NullSink, create_sink};
pub use snapshot::{InviteSnapshot, SnapshotStore};
