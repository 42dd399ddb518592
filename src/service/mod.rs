//! Service layer: approval workflow, ledger mutation, and bounded fetches.
//!
//! Services orchestrate between the record store (source of truth), the
//! event bus (re-fetch signals), and the notification dispatcher. Every
//! store call a service makes is wrapped in the configured fetch bound
//! so a stalled backend surfaces as [`ConsoleError::Timeout`] instead of
//! hanging an admin action.

pub mod ledger;
pub mod workflow;

use std::time::Duration;

use crate::domain::{RequestKind, RequestRecord, User};
use crate::error::ConsoleError;
use crate::store::RecordStore;

pub use ledger::LedgerService;
pub use workflow::{ApprovalService, DecisionOutcome};

/// Awaits `fut` for at most `bound`, mapping elapse to
/// [`ConsoleError::Timeout`] tagged with `what`.
pub(crate) async fn bounded<T>(
    bound: Duration,
    what: &str,
    fut: impl Future<Output = Result<T, ConsoleError>>,
) -> Result<T, ConsoleError> {
    match tokio::time::timeout(bound, fut).await {
        Ok(result) => result,
        Err(_) => Err(ConsoleError::Timeout(what.to_string())),
    }
}

/// A consistent read of every collection the dashboard joins over.
#[derive(Debug, Default, Clone)]
pub struct Snapshot {
    /// Investment requests.
    pub investments: Vec<RequestRecord>,
    /// Deposit requests.
    pub deposits: Vec<RequestRecord>,
    /// Withdrawal requests.
    pub withdrawals: Vec<RequestRecord>,
    /// Loan requests.
    pub loans: Vec<RequestRecord>,
    /// KYC submissions.
    pub kyc: Vec<RequestRecord>,
    /// All users.
    pub users: Vec<User>,
}

impl Snapshot {
    /// Returns the request collection for one kind.
    #[must_use]
    pub fn requests_of(&self, kind: RequestKind) -> &[RequestRecord] {
        match kind {
            RequestKind::Investment => &self.investments,
            RequestKind::Deposit => &self.deposits,
            RequestKind::Withdrawal => &self.withdrawals,
            RequestKind::Loan => &self.loans,
            RequestKind::Kyc => &self.kyc,
        }
    }
}

/// Bulk-fetches all collections with a hard overall bound.
///
/// Initialization must never hang the console: when the bound elapses,
/// or a single collection fails, the missing pieces come back empty
/// (with a `warn`) and the caller proceeds with what it has. Admins can
/// re-trigger a refresh manually.
pub async fn load_snapshot(store: &dyn RecordStore, bound: Duration) -> Snapshot {
    let fetch = async {
        let mut snapshot = Snapshot::default();
        for kind in RequestKind::ALL {
            match store.list_requests(kind).await {
                Ok(records) => match kind {
                    RequestKind::Investment => snapshot.investments = records,
                    RequestKind::Deposit => snapshot.deposits = records,
                    RequestKind::Withdrawal => snapshot.withdrawals = records,
                    RequestKind::Loan => snapshot.loans = records,
                    RequestKind::Kyc => snapshot.kyc = records,
                },
                Err(error) => {
                    tracing::warn!(kind = %kind, %error, "collection fetch failed; showing empty");
                }
            }
        }
        match store.list_users().await {
            Ok(users) => snapshot.users = users,
            Err(error) => {
                tracing::warn!(%error, "user fetch failed; showing empty");
            }
        }
        snapshot
    };

    match tokio::time::timeout(bound, fetch).await {
        Ok(snapshot) => snapshot,
        Err(_) => {
            tracing::warn!(bound_secs = bound.as_secs(), "snapshot load timed out; showing empty");
            Snapshot::default()
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{
        AuthStatus, Notification, RequestDetails, RequestId, RequestStatus, UserId,
    };
    use crate::store::JournalEntry;
    use crate::store::memory::MemoryStore;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    /// A store whose every call suspends forever.
    #[derive(Debug)]
    struct StalledStore;

    #[async_trait]
    impl RecordStore for StalledStore {
        async fn list_requests(
            &self,
            _kind: RequestKind,
        ) -> Result<Vec<RequestRecord>, ConsoleError> {
            std::future::pending().await
        }

        async fn get_request(&self, _id: RequestId) -> Result<RequestRecord, ConsoleError> {
            std::future::pending().await
        }

        async fn create_request(&self, _record: RequestRecord) -> Result<(), ConsoleError> {
            std::future::pending().await
        }

        async fn transition_request(
            &self,
            _id: RequestId,
            _from: RequestStatus,
            _to: RequestStatus,
            _decided_at: Option<DateTime<Utc>>,
        ) -> Result<RequestRecord, ConsoleError> {
            std::future::pending().await
        }

        async fn set_kyc_reason(&self, _id: RequestId, _reason: String) -> Result<(), ConsoleError> {
            std::future::pending().await
        }

        async fn list_users(&self) -> Result<Vec<User>, ConsoleError> {
            std::future::pending().await
        }

        async fn get_user(&self, _id: UserId) -> Result<User, ConsoleError> {
            std::future::pending().await
        }

        async fn create_user(&self, _user: User) -> Result<(), ConsoleError> {
            std::future::pending().await
        }

        async fn update_user_funds(
            &self,
            _id: UserId,
            _balance: Decimal,
            _bonus: Decimal,
        ) -> Result<User, ConsoleError> {
            std::future::pending().await
        }

        async fn set_user_auth_status(
            &self,
            _id: UserId,
            _status: AuthStatus,
        ) -> Result<(), ConsoleError> {
            std::future::pending().await
        }

        async fn delete_user(&self, _id: UserId) -> Result<(), ConsoleError> {
            std::future::pending().await
        }

        async fn create_notification(
            &self,
            _notification: Notification,
        ) -> Result<(), ConsoleError> {
            std::future::pending().await
        }

        async fn list_notifications(
            &self,
            _user_id: UserId,
        ) -> Result<Vec<Notification>, ConsoleError> {
            std::future::pending().await
        }

        async fn append_journal(&self, _entry: JournalEntry) -> Result<(), ConsoleError> {
            std::future::pending().await
        }

        async fn list_journal(
            &self,
            _request_id: RequestId,
        ) -> Result<Vec<JournalEntry>, ConsoleError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn snapshot_load_times_out_with_empty_collections() {
        let store = StalledStore;
        let snapshot = load_snapshot(&store, Duration::from_millis(20)).await;
        assert!(snapshot.investments.is_empty());
        assert!(snapshot.users.is_empty());
    }

    #[tokio::test]
    async fn snapshot_load_collects_everything() {
        let store = MemoryStore::new();
        let user = User::new("Ada", "ada@example.com");
        let _ = store.create_user(user.clone()).await;
        let _ = store
            .create_request(RequestRecord::new(
                user.id,
                dec!(100),
                RequestDetails::Investment {
                    plan: "gold".to_string(),
                },
            ))
            .await;

        let snapshot = load_snapshot(&store, Duration::from_secs(5)).await;
        assert_eq!(snapshot.investments.len(), 1);
        assert_eq!(snapshot.users.len(), 1);
        assert_eq!(snapshot.requests_of(RequestKind::Investment).len(), 1);
        assert!(snapshot.requests_of(RequestKind::Loan).is_empty());
    }

    #[tokio::test]
    async fn bounded_maps_elapse_to_timeout() {
        let result: Result<(), ConsoleError> = bounded(
            Duration::from_millis(10),
            "stalled call",
            std::future::pending(),
        )
        .await;
        assert!(matches!(result, Err(ConsoleError::Timeout(_))));
    }
}
