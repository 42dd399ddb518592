//! In-memory record store.
//!
//! Backs tests and persistence-disabled runs. All collections live
//! behind one [`tokio::sync::RwLock`]; the conditional transition holds
//! the write lock across check and set, so it is a true compare-and-set
//! rather than a read-then-write race.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use super::{JournalEntry, RecordStore};
use crate::domain::{
    AuthStatus, Notification, RequestDetails, RequestId, RequestKind, RequestRecord,
    RequestStatus, User, UserId,
};
use crate::error::ConsoleError;

#[derive(Debug, Default)]
struct Inner {
    requests: HashMap<RequestId, RequestRecord>,
    users: HashMap<UserId, User>,
    notifications: Vec<Notification>,
    journal: Vec<JournalEntry>,
}

/// In-memory [`RecordStore`] implementation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn list_requests(&self, kind: RequestKind) -> Result<Vec<RequestRecord>, ConsoleError> {
        let inner = self.inner.read().await;
        let mut records: Vec<RequestRecord> = inner
            .requests
            .values()
            .filter(|r| r.kind() == kind)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    async fn get_request(&self, id: RequestId) -> Result<RequestRecord, ConsoleError> {
        let inner = self.inner.read().await;
        inner
            .requests
            .get(&id)
            .cloned()
            .ok_or(ConsoleError::RequestNotFound(id))
    }

    async fn create_request(&self, record: RequestRecord) -> Result<(), ConsoleError> {
        let mut inner = self.inner.write().await;
        inner.requests.insert(record.id, record);
        Ok(())
    }

    async fn transition_request(
        &self,
        id: RequestId,
        from: RequestStatus,
        to: RequestStatus,
        decided_at: Option<DateTime<Utc>>,
    ) -> Result<RequestRecord, ConsoleError> {
        let mut inner = self.inner.write().await;
        let record = inner
            .requests
            .get_mut(&id)
            .ok_or(ConsoleError::RequestNotFound(id))?;
        if record.status != from {
            return Err(ConsoleError::InvalidTransition {
                id,
                status: record.status,
            });
        }
        record.status = to;
        record.decided_at = decided_at;
        Ok(record.clone())
    }

    async fn set_kyc_reason(&self, id: RequestId, reason: String) -> Result<(), ConsoleError> {
        let mut inner = self.inner.write().await;
        let record = inner
            .requests
            .get_mut(&id)
            .ok_or(ConsoleError::RequestNotFound(id))?;
        match &mut record.details {
            RequestDetails::Kyc { reason: slot, .. } => {
                *slot = Some(reason);
                Ok(())
            }
            _ => Err(ConsoleError::ValidationError(format!(
                "request {id} is not a KYC submission"
            ))),
        }
    }

    async fn list_users(&self) -> Result<Vec<User>, ConsoleError> {
        let inner = self.inner.read().await;
        let mut users: Vec<User> = inner.users.values().cloned().collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn get_user(&self, id: UserId) -> Result<User, ConsoleError> {
        let inner = self.inner.read().await;
        inner
            .users
            .get(&id)
            .cloned()
            .ok_or(ConsoleError::UserNotFound(id))
    }

    async fn create_user(&self, user: User) -> Result<(), ConsoleError> {
        let mut inner = self.inner.write().await;
        inner.users.insert(user.id, user);
        Ok(())
    }

    async fn update_user_funds(
        &self,
        id: UserId,
        balance: Decimal,
        bonus: Decimal,
    ) -> Result<User, ConsoleError> {
        let mut inner = self.inner.write().await;
        let user = inner
            .users
            .get_mut(&id)
            .ok_or(ConsoleError::UserNotFound(id))?;
        user.balance = balance;
        user.bonus = bonus;
        Ok(user.clone())
    }

    async fn set_user_auth_status(
        &self,
        id: UserId,
        status: AuthStatus,
    ) -> Result<(), ConsoleError> {
        let mut inner = self.inner.write().await;
        let user = inner
            .users
            .get_mut(&id)
            .ok_or(ConsoleError::UserNotFound(id))?;
        user.auth_status = status;
        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> Result<(), ConsoleError> {
        let mut inner = self.inner.write().await;
        inner
            .users
            .remove(&id)
            .map(|_| ())
            .ok_or(ConsoleError::UserNotFound(id))
    }

    async fn create_notification(&self, notification: Notification) -> Result<(), ConsoleError> {
        let mut inner = self.inner.write().await;
        inner.notifications.push(notification);
        Ok(())
    }

    async fn list_notifications(&self, user_id: UserId) -> Result<Vec<Notification>, ConsoleError> {
        let inner = self.inner.read().await;
        let mut list: Vec<Notification> = inner
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn append_journal(&self, entry: JournalEntry) -> Result<(), ConsoleError> {
        let mut inner = self.inner.write().await;
        inner.journal.push(entry);
        Ok(())
    }

    async fn list_journal(&self, request_id: RequestId) -> Result<Vec<JournalEntry>, ConsoleError> {
        let inner = self.inner.read().await;
        Ok(inner
            .journal
            .iter()
            .filter(|e| e.request_id == request_id)
            .cloned()
            .collect())
    }
}
