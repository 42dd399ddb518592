//! PostgreSQL implementation of the record store.
//!
//! The settlement guard lives here as a conditional `UPDATE … WHERE
//! status = $from`: a request leaves `Pending` exactly once no matter
//! how many admin clicks or racing tasks reach the store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use super::{JournalEntry, JournalStep, RecordStore};
use crate::config::ConsoleConfig;
use crate::domain::{
    AuthStatus, Notification, RequestDetails, RequestId, RequestKind, RequestRecord,
    RequestStatus, Role, Severity, User, UserId,
};
use crate::error::ConsoleError;

/// PostgreSQL-backed [`RecordStore`] using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

type RequestRow = (
    Uuid,
    Uuid,
    Decimal,
    String,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
    serde_json::Value,
);

type UserRow = (
    Uuid,
    String,
    String,
    Decimal,
    Decimal,
    String,
    String,
    DateTime<Utc>,
);

const REQUEST_COLUMNS: &str = "id, user_id, amount, status, created_at, decided_at, details";
const USER_COLUMNS: &str = "id, name, email, balance, bonus, role, auth_status, created_at";

impl PgRecordStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects using the configured pool settings and runs migrations.
    ///
    /// # Errors
    ///
    /// Returns a [`ConsoleError::PersistenceError`] if the pool cannot
    /// be established or a migration fails.
    pub async fn connect(config: &ConsoleConfig) -> Result<Self, ConsoleError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(std::time::Duration::from_secs(
                config.database_connect_timeout_secs,
            ))
            .connect(&config.database_url)
            .await
            .map_err(|e| ConsoleError::PersistenceError(e.to_string()))?;

        sqlx::migrate!()
            .run(&pool)
            .await
            .map_err(|e| ConsoleError::PersistenceError(e.to_string()))?;

        Ok(Self::new(pool))
    }

    fn map_request(row: RequestRow) -> Result<RequestRecord, ConsoleError> {
        let (id, user_id, amount, status, created_at, decided_at, details) = row;
        let details: RequestDetails = serde_json::from_value(details)
            .map_err(|e| ConsoleError::PersistenceError(format!("bad details payload: {e}")))?;
        Ok(RequestRecord {
            id: RequestId::from_uuid(id),
            user_id: UserId::from_uuid(user_id),
            amount,
            status: parse_status(&status)?,
            created_at,
            decided_at,
            details,
        })
    }

    fn map_user(row: UserRow) -> Result<User, ConsoleError> {
        let (id, name, email, balance, bonus, role, auth_status, created_at) = row;
        Ok(User {
            id: UserId::from_uuid(id),
            name,
            email,
            balance,
            bonus,
            role: parse_role(&role)?,
            auth_status: parse_auth_status(&auth_status)?,
            created_at,
        })
    }
}

fn parse_status(s: &str) -> Result<RequestStatus, ConsoleError> {
    match s {
        "pending" => Ok(RequestStatus::Pending),
        "approved" => Ok(RequestStatus::Approved),
        "rejected" => Ok(RequestStatus::Rejected),
        other => Err(ConsoleError::PersistenceError(format!(
            "unknown request status: {other}"
        ))),
    }
}

fn parse_role(s: &str) -> Result<Role, ConsoleError> {
    match s {
        "user" => Ok(Role::User),
        "admin" => Ok(Role::Admin),
        "superadmin" => Ok(Role::Superadmin),
        other => Err(ConsoleError::PersistenceError(format!(
            "unknown role: {other}"
        ))),
    }
}

fn parse_auth_status(s: &str) -> Result<AuthStatus, ConsoleError> {
    match s {
        "pending" => Ok(AuthStatus::Pending),
        "approved" => Ok(AuthStatus::Approved),
        "rejected" => Ok(AuthStatus::Rejected),
        other => Err(ConsoleError::PersistenceError(format!(
            "unknown auth status: {other}"
        ))),
    }
}

fn parse_severity(s: &str) -> Result<Severity, ConsoleError> {
    match s {
        "info" => Ok(Severity::Info),
        "success" => Ok(Severity::Success),
        "warning" => Ok(Severity::Warning),
        "error" => Ok(Severity::Error),
        other => Err(ConsoleError::PersistenceError(format!(
            "unknown severity: {other}"
        ))),
    }
}

fn parse_step(s: &str) -> Result<JournalStep, ConsoleError> {
    match s {
        "transition_applied" => Ok(JournalStep::TransitionApplied),
        "ledger_applied" => Ok(JournalStep::LedgerApplied),
        "auth_status_applied" => Ok(JournalStep::AuthStatusApplied),
        "compensated" => Ok(JournalStep::Compensated),
        other => Err(ConsoleError::PersistenceError(format!(
            "unknown journal step: {other}"
        ))),
    }
}

fn severity_str(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "info",
        Severity::Success => "success",
        Severity::Warning => "warning",
        Severity::Error => "error",
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn list_requests(&self, kind: RequestKind) -> Result<Vec<RequestRecord>, ConsoleError> {
        let rows = sqlx::query_as::<_, RequestRow>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM requests WHERE kind = $1 ORDER BY created_at ASC"
        ))
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ConsoleError::PersistenceError(e.to_string()))?;

        rows.into_iter().map(Self::map_request).collect()
    }

    async fn get_request(&self, id: RequestId) -> Result<RequestRecord, ConsoleError> {
        let row = sqlx::query_as::<_, RequestRow>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM requests WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ConsoleError::PersistenceError(e.to_string()))?;

        row.map(Self::map_request)
            .transpose()?
            .ok_or(ConsoleError::RequestNotFound(id))
    }

    async fn create_request(&self, record: RequestRecord) -> Result<(), ConsoleError> {
        let details = serde_json::to_value(&record.details)
            .map_err(|e| ConsoleError::Internal(e.to_string()))?;
        sqlx::query(
            "INSERT INTO requests (id, user_id, amount, status, created_at, decided_at, kind, details) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(record.id.as_uuid())
        .bind(record.user_id.as_uuid())
        .bind(record.amount)
        .bind(record.status.as_str())
        .bind(record.created_at)
        .bind(record.decided_at)
        .bind(record.kind().as_str())
        .bind(details)
        .execute(&self.pool)
        .await
        .map_err(|e| ConsoleError::PersistenceError(e.to_string()))?;
        Ok(())
    }

    async fn transition_request(
        &self,
        id: RequestId,
        from: RequestStatus,
        to: RequestStatus,
        decided_at: Option<DateTime<Utc>>,
    ) -> Result<RequestRecord, ConsoleError> {
        // The WHERE clause is the idempotency guard: zero rows means the
        // record was either missing or already out of the `from` state.
        let row = sqlx::query_as::<_, RequestRow>(&format!(
            "UPDATE requests SET status = $3, decided_at = $4 \
             WHERE id = $1 AND status = $2 RETURNING {REQUEST_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(decided_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ConsoleError::PersistenceError(e.to_string()))?;

        if let Some(row) = row {
            return Self::map_request(row);
        }

        // Distinguish "gone" from "already settled".
        let current = self.get_request(id).await?;
        Err(ConsoleError::InvalidTransition {
            id,
            status: current.status,
        })
    }

    async fn set_kyc_reason(&self, id: RequestId, reason: String) -> Result<(), ConsoleError> {
        let result = sqlx::query(
            "UPDATE requests SET details = jsonb_set(details, '{reason}', to_jsonb($2::text)) \
             WHERE id = $1 AND kind = 'kyc'",
        )
        .bind(id.as_uuid())
        .bind(reason)
        .execute(&self.pool)
        .await
        .map_err(|e| ConsoleError::PersistenceError(e.to_string()))?;

        if result.rows_affected() == 0 {
            let record = self.get_request(id).await?;
            return Err(ConsoleError::ValidationError(format!(
                "request {id} is a {} request, not a KYC submission",
                record.kind()
            )));
        }
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, ConsoleError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ConsoleError::PersistenceError(e.to_string()))?;

        rows.into_iter().map(Self::map_user).collect()
    }

    async fn get_user(&self, id: UserId) -> Result<User, ConsoleError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ConsoleError::PersistenceError(e.to_string()))?;

        row.map(Self::map_user)
            .transpose()?
            .ok_or(ConsoleError::UserNotFound(id))
    }

    async fn create_user(&self, user: User) -> Result<(), ConsoleError> {
        sqlx::query(
            "INSERT INTO users (id, name, email, balance, bonus, role, auth_status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(user.id.as_uuid())
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.balance)
        .bind(user.bonus)
        .bind(user.role.as_str())
        .bind(user.auth_status.as_str())
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| ConsoleError::PersistenceError(e.to_string()))?;
        Ok(())
    }

    async fn update_user_funds(
        &self,
        id: UserId,
        balance: Decimal,
        bonus: Decimal,
    ) -> Result<User, ConsoleError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET balance = $2, bonus = $3 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(balance)
        .bind(bonus)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ConsoleError::PersistenceError(e.to_string()))?;

        row.map(Self::map_user)
            .transpose()?
            .ok_or(ConsoleError::UserNotFound(id))
    }

    async fn set_user_auth_status(
        &self,
        id: UserId,
        status: AuthStatus,
    ) -> Result<(), ConsoleError> {
        let result = sqlx::query("UPDATE users SET auth_status = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| ConsoleError::PersistenceError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(ConsoleError::UserNotFound(id));
        }
        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> Result<(), ConsoleError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| ConsoleError::PersistenceError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(ConsoleError::UserNotFound(id));
        }
        Ok(())
    }

    async fn create_notification(&self, notification: Notification) -> Result<(), ConsoleError> {
        sqlx::query(
            "INSERT INTO notifications (id, user_id, title, message, severity, read, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(notification.id)
        .bind(notification.user_id.as_uuid())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(severity_str(notification.severity))
        .bind(notification.read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| ConsoleError::PersistenceError(e.to_string()))?;
        Ok(())
    }

    async fn list_notifications(&self, user_id: UserId) -> Result<Vec<Notification>, ConsoleError> {
        let rows = sqlx::query_as::<_, (Uuid, Uuid, String, String, String, bool, DateTime<Utc>)>(
            "SELECT id, user_id, title, message, severity, read, created_at \
             FROM notifications WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ConsoleError::PersistenceError(e.to_string()))?;

        rows.into_iter()
            .map(|(id, user_id, title, message, severity, read, created_at)| {
                Ok(Notification {
                    id,
                    user_id: UserId::from_uuid(user_id),
                    title,
                    message,
                    severity: parse_severity(&severity)?,
                    read,
                    created_at,
                })
            })
            .collect()
    }

    async fn append_journal(&self, entry: JournalEntry) -> Result<(), ConsoleError> {
        sqlx::query(
            "INSERT INTO settlement_journal (id, request_id, step, note, at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(entry.id)
        .bind(entry.request_id.as_uuid())
        .bind(entry.step.as_str())
        .bind(&entry.note)
        .bind(entry.at)
        .execute(&self.pool)
        .await
        .map_err(|e| ConsoleError::PersistenceError(e.to_string()))?;
        Ok(())
    }

    async fn list_journal(&self, request_id: RequestId) -> Result<Vec<JournalEntry>, ConsoleError> {
        let rows = sqlx::query_as::<_, (Uuid, Uuid, String, String, DateTime<Utc>)>(
            "SELECT id, request_id, step, note, at FROM settlement_journal \
             WHERE request_id = $1 ORDER BY at ASC",
        )
        .bind(request_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ConsoleError::PersistenceError(e.to_string()))?;

        rows.into_iter()
            .map(|(id, request_id, step, note, at)| {
                Ok(JournalEntry {
                    id,
                    request_id: RequestId::from_uuid(request_id),
                    step: parse_step(&step)?,
                    note,
                    at,
                })
            })
            .collect()
    }
}
