//! Record store adapter: the external collaborator holding all records.
//!
//! The console never treats its own in-memory view as authoritative; the
//! [`RecordStore`] is the sole source of truth. It exposes CRUD per
//! entity kind plus one specialized operation, [`RecordStore::transition_request`],
//! a conditional update that moves a request out of `Pending` exactly
//! once. All settlement idempotence rests on that conditional write, not
//! on read-then-write checks in the services.
//!
//! Two implementations: [`postgres::PgRecordStore`] for production and
//! [`memory::MemoryStore`] for tests and persistence-disabled runs.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{
    AuthStatus, Notification, RequestId, RequestKind, RequestRecord, RequestStatus, User, UserId,
};
use crate::error::ConsoleError;

/// Saga step recorded in the settlement journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalStep {
    /// The status flip out of `Pending` was persisted.
    TransitionApplied,
    /// The ledger mutation was persisted.
    LedgerApplied,
    /// The user's KYC auth status was persisted.
    AuthStatusApplied,
    /// Persisted steps were reverted after a later step failed.
    Compensated,
}

impl JournalStep {
    /// Returns the step as its stored string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TransitionApplied => "transition_applied",
            Self::LedgerApplied => "ledger_applied",
            Self::AuthStatusApplied => "auth_status_applied",
            Self::Compensated => "compensated",
        }
    }
}

/// One completed saga step for one request.
///
/// The journal is the durable record of how far a settlement got, so a
/// partially applied transition can be reconciled instead of guessed at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Entry identifier.
    pub id: uuid::Uuid,
    /// Request the step belongs to.
    pub request_id: RequestId,
    /// Which step completed.
    pub step: JournalStep,
    /// Human-readable detail (e.g. the applied delta).
    pub note: String,
    /// When the step completed.
    pub at: DateTime<Utc>,
}

impl JournalEntry {
    /// Creates an entry stamped with the current time.
    #[must_use]
    pub fn now(request_id: RequestId, step: JournalStep, note: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            request_id,
            step,
            note: note.into(),
            at: Utc::now(),
        }
    }
}

/// CRUD + conditional-transition interface over the record store.
#[async_trait]
pub trait RecordStore: Send + Sync + std::fmt::Debug {
    /// Lists all requests of one kind.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::PersistenceError`] on store failure.
    async fn list_requests(&self, kind: RequestKind) -> Result<Vec<RequestRecord>, ConsoleError>;

    /// Fetches a single request by ID.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::RequestNotFound`] if absent.
    async fn get_request(&self, id: RequestId) -> Result<RequestRecord, ConsoleError>;

    /// Inserts a new request record.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::PersistenceError`] on store failure.
    async fn create_request(&self, record: RequestRecord) -> Result<(), ConsoleError>;

    /// Conditionally moves a request from `from` to `to`.
    ///
    /// The store applies the update only when the current stored status
    /// equals `from` (a conditional `UPDATE` in Postgres, a
    /// compare-and-set under the write lock in memory). Returns the
    /// updated record.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::InvalidTransition`] when the stored
    /// status differs from `from`, or [`ConsoleError::RequestNotFound`]
    /// when the request does not exist.
    async fn transition_request(
        &self,
        id: RequestId,
        from: RequestStatus,
        to: RequestStatus,
        decided_at: Option<DateTime<Utc>>,
    ) -> Result<RequestRecord, ConsoleError>;

    /// Records the rejection reason on a KYC request.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::RequestNotFound`] if absent, or
    /// [`ConsoleError::ValidationError`] if the request is not a KYC
    /// submission.
    async fn set_kyc_reason(&self, id: RequestId, reason: String) -> Result<(), ConsoleError>;

    /// Lists all users.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::PersistenceError`] on store failure.
    async fn list_users(&self) -> Result<Vec<User>, ConsoleError>;

    /// Fetches a single user by ID.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::UserNotFound`] if absent.
    async fn get_user(&self, id: UserId) -> Result<User, ConsoleError>;

    /// Inserts a new user.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::PersistenceError`] on store failure.
    async fn create_user(&self, user: User) -> Result<(), ConsoleError>;

    /// Writes a user's balance and bonus as one combined update.
    ///
    /// Callers compute the new values; a combined write keeps the
    /// bonus-to-balance conversion a single persisted mutation.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::UserNotFound`] if absent.
    async fn update_user_funds(
        &self,
        id: UserId,
        balance: Decimal,
        bonus: Decimal,
    ) -> Result<User, ConsoleError>;

    /// Sets a user's KYC outcome.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::UserNotFound`] if absent.
    async fn set_user_auth_status(
        &self,
        id: UserId,
        status: AuthStatus,
    ) -> Result<(), ConsoleError>;

    /// Hard-deletes a user. Requests referencing the user are kept;
    /// joined views degrade to the "Unknown User" fallback.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::UserNotFound`] if absent.
    async fn delete_user(&self, id: UserId) -> Result<(), ConsoleError>;

    /// Inserts an in-app notification.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::PersistenceError`] on store failure.
    async fn create_notification(&self, notification: Notification) -> Result<(), ConsoleError>;

    /// Lists a user's notifications, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::PersistenceError`] on store failure.
    async fn list_notifications(&self, user_id: UserId) -> Result<Vec<Notification>, ConsoleError>;

    /// Appends a saga step to the settlement journal.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::PersistenceError`] on store failure.
    async fn append_journal(&self, entry: JournalEntry) -> Result<(), ConsoleError>;

    /// Lists the journal for one request, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::PersistenceError`] on store failure.
    async fn list_journal(&self, request_id: RequestId) -> Result<Vec<JournalEntry>, ConsoleError>;
}
