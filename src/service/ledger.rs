//! Ledger mutator: the only code path that changes a user's funds.
//!
//! Reads the current balance/bonus, computes `current + delta`, and
//! refuses any mutation that would leave a negative value — uniformly,
//! whether the caller is a manual admin edit or an automatic refund.
//! Admin-initiated changes write a durable in-app audit notification
//! before the (fire-and-forget) email goes out; that stored message is
//! the lasting trail of *why* a balance changed.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;

use crate::domain::{
    ChangeEvent, EntityKind, EventBus, Notification, Severity, User, UserId,
};
use crate::error::ConsoleError;
use crate::notify::NotificationDispatcher;
use crate::store::RecordStore;

use super::bounded;

/// Which fund field a mutation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fund {
    Balance,
    Bonus,
}

impl Fund {
    const fn label(self) -> &'static str {
        match self {
            Self::Balance => "balance",
            Self::Bonus => "bonus",
        }
    }
}

/// Applies monetary deltas to user records.
#[derive(Debug, Clone)]
pub struct LedgerService {
    store: Arc<dyn RecordStore>,
    bus: EventBus,
    dispatcher: NotificationDispatcher,
    fetch_timeout: Duration,
}

impl LedgerService {
    /// Creates a new `LedgerService`.
    #[must_use]
    pub fn new(
        store: Arc<dyn RecordStore>,
        bus: EventBus,
        dispatcher: NotificationDispatcher,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            store,
            bus,
            dispatcher,
            fetch_timeout,
        }
    }

    /// Applies a settlement delta to a user's balance.
    ///
    /// Used by the approval workflow for credits and refunds; carries no
    /// admin audit message (the settlement journal covers those paths).
    /// Returns `(old_balance, new_balance)`.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::UserNotFound`] if the user is missing or
    /// [`ConsoleError::InsufficientFunds`] when the delta would leave a
    /// negative balance.
    pub async fn settle_delta(
        &self,
        user_id: UserId,
        delta: Decimal,
    ) -> Result<(Decimal, Decimal), ConsoleError> {
        let user = bounded(self.fetch_timeout, "get user", self.store.get_user(user_id)).await?;
        let new_balance = checked_apply(user.balance, delta)?;
        bounded(
            self.fetch_timeout,
            "update user funds",
            self.store.update_user_funds(user_id, new_balance, user.bonus),
        )
        .await?;
        let _ = self.bus.publish(ChangeEvent::now(EntityKind::Users));
        tracing::info!(%user_id, %delta, old = %user.balance, new = %new_balance, "balance settled");
        Ok((user.balance, new_balance))
    }

    /// Admin-initiated balance adjustment with audit trail.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::UserNotFound`] if the user is missing or
    /// [`ConsoleError::InsufficientFunds`] when the delta would leave a
    /// negative balance.
    pub async fn adjust_balance(
        &self,
        user_id: UserId,
        delta: Decimal,
        note: &str,
    ) -> Result<User, ConsoleError> {
        self.adjust(user_id, delta, Fund::Balance, note).await
    }

    /// Admin-initiated bonus adjustment with audit trail.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::UserNotFound`] if the user is missing or
    /// [`ConsoleError::InsufficientFunds`] when the delta would leave a
    /// negative bonus.
    pub async fn adjust_bonus(
        &self,
        user_id: UserId,
        delta: Decimal,
        note: &str,
    ) -> Result<User, ConsoleError> {
        self.adjust(user_id, delta, Fund::Bonus, note).await
    }

    async fn adjust(
        &self,
        user_id: UserId,
        delta: Decimal,
        fund: Fund,
        note: &str,
    ) -> Result<User, ConsoleError> {
        let user = bounded(self.fetch_timeout, "get user", self.store.get_user(user_id)).await?;

        let (old, new_balance, new_bonus) = match fund {
            Fund::Balance => {
                let new = checked_apply(user.balance, delta)?;
                (user.balance, new, user.bonus)
            }
            Fund::Bonus => {
                let new = checked_apply(user.bonus, delta)?;
                (user.bonus, user.balance, new)
            }
        };
        let new = match fund {
            Fund::Balance => new_balance,
            Fund::Bonus => new_bonus,
        };

        let updated = bounded(
            self.fetch_timeout,
            "update user funds",
            self.store.update_user_funds(user_id, new_balance, new_bonus),
        )
        .await?;

        // Durable audit record: this write is part of the mutation, not
        // fire-and-forget. A failed audit reverts the funds write so a
        // retry cannot double-apply the delta.
        if let Err(error) = self.audit(&updated, fund, old, new, note).await {
            return Err(self.revert_funds(&user, error).await);
        }

        self.dispatcher.balance_adjusted(&updated, old, new).await;
        let _ = self.bus.publish(ChangeEvent::now(EntityKind::Users));
        tracing::info!(
            %user_id,
            fund = fund.label(),
            %delta,
            %old,
            %new,
            "admin fund adjustment applied"
        );
        Ok(updated)
    }

    /// Converts a user's entire bonus into balance as one persisted
    /// mutation: `balance += bonus; bonus = 0`.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::NothingToConvert`] when the bonus is
    /// already zero, or [`ConsoleError::UserNotFound`] if the user is
    /// missing.
    pub async fn convert_bonus(&self, user_id: UserId) -> Result<User, ConsoleError> {
        let user = bounded(self.fetch_timeout, "get user", self.store.get_user(user_id)).await?;
        if user.bonus.is_zero() {
            return Err(ConsoleError::NothingToConvert);
        }

        let new_balance = user.balance + user.bonus;
        let updated = bounded(
            self.fetch_timeout,
            "update user funds",
            self.store
                .update_user_funds(user_id, new_balance, Decimal::ZERO),
        )
        .await?;

        if let Err(error) = self
            .audit(
                &updated,
                Fund::Balance,
                user.balance,
                new_balance,
                &format!("converted bonus of {}", user.bonus),
            )
            .await
        {
            return Err(self.revert_funds(&user, error).await);
        }

        self.dispatcher
            .balance_adjusted(&updated, user.balance, new_balance)
            .await;
        let _ = self.bus.publish(ChangeEvent::now(EntityKind::Users));
        tracing::info!(%user_id, bonus = %user.bonus, new_balance = %new_balance, "bonus converted");
        Ok(updated)
    }

    /// Restores the pre-mutation funds after a failed audit write.
    ///
    /// Returns the error to surface: the original `cause` when the
    /// revert succeeded, [`ConsoleError::PartialFailure`] when the
    /// funds are left mutated without their audit trail.
    async fn revert_funds(&self, user: &User, cause: ConsoleError) -> ConsoleError {
        tracing::warn!(user_id = %user.id, error = %cause, "audit write failed; reverting funds");
        let revert = bounded(
            self.fetch_timeout,
            "revert user funds",
            self.store
                .update_user_funds(user.id, user.balance, user.bonus),
        )
        .await;
        match revert {
            Ok(_) => cause,
            Err(revert_error) => {
                tracing::error!(
                    user_id = %user.id,
                    %revert_error,
                    "funds revert failed; adjustment applied without audit trail"
                );
                ConsoleError::PartialFailure {
                    completed: "funds update".to_string(),
                    failed: cause.to_string(),
                }
            }
        }
    }

    async fn audit(
        &self,
        user: &User,
        fund: Fund,
        old: Decimal,
        new: Decimal,
        note: &str,
    ) -> Result<(), ConsoleError> {
        let notification = Notification::new(
            user.id,
            format!("Your {} was updated", fund.label()),
            format!("{} changed from {old} to {new}: {note}", fund.label()),
            Severity::Info,
        );
        bounded(
            self.fetch_timeout,
            "write audit notification",
            self.store.create_notification(notification),
        )
        .await?;
        let _ = self.bus.publish(ChangeEvent::now(EntityKind::Notifications));
        Ok(())
    }
}

/// Computes `current + delta`, refusing a negative result.
fn checked_apply(current: Decimal, delta: Decimal) -> Result<Decimal, ConsoleError> {
    let new = current + delta;
    if new.is_sign_negative() && !new.is_zero() {
        return Err(ConsoleError::InsufficientFunds {
            available: current,
            requested: delta.abs(),
        });
    }
    Ok(new)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{
        AuthStatus, RequestId, RequestKind, RequestRecord, RequestStatus,
    };
    use crate::notify::tests::RecordingEmailSender;
    use crate::store::JournalEntry;
    use crate::store::memory::MemoryStore;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use rust_decimal_macros::dec;

    fn make_service() -> (LedgerService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let bus = EventBus::new(64);
        let email = Arc::new(RecordingEmailSender::default());
        let dispatcher = NotificationDispatcher::new(
            email,
            Arc::<MemoryStore>::clone(&store) as Arc<dyn RecordStore>,
            bus.clone(),
        );
        let service = LedgerService::new(
            Arc::<MemoryStore>::clone(&store) as Arc<dyn RecordStore>,
            bus,
            dispatcher,
            Duration::from_secs(10),
        );
        (service, store)
    }

    async fn seed_user(store: &MemoryStore, balance: Decimal, bonus: Decimal) -> User {
        let mut user = User::new("Ada", "ada@example.com");
        user.balance = balance;
        user.bonus = bonus;
        let _ = store.create_user(user.clone()).await;
        user
    }

    #[tokio::test]
    async fn adjust_balance_persists_and_audits() {
        let (service, store) = make_service();
        let user = seed_user(&store, dec!(100), dec!(0)).await;

        let updated = service
            .adjust_balance(user.id, dec!(25), "promo credit")
            .await;
        let Ok(updated) = updated else {
            panic!("adjustment failed");
        };
        assert_eq!(updated.balance, dec!(125));

        let audit = store.list_notifications(user.id).await.unwrap_or_default();
        assert_eq!(audit.len(), 1);
        assert!(audit.first().is_some_and(|n| n.message.contains("100")
            && n.message.contains("125")
            && n.message.contains("promo credit")));
    }

    #[tokio::test]
    async fn removal_exceeding_funds_is_rejected_before_persistence() {
        let (service, store) = make_service();
        let user = seed_user(&store, dec!(30), dec!(10)).await;

        let result = service.adjust_balance(user.id, dec!(-50), "clawback").await;
        assert!(matches!(
            result,
            Err(ConsoleError::InsufficientFunds { available, requested })
                if available == dec!(30) && requested == dec!(50)
        ));

        // Nothing persisted, no audit trail entry.
        let fresh = store.get_user(user.id).await;
        let Ok(fresh) = fresh else {
            panic!("user missing");
        };
        assert_eq!(fresh.balance, dec!(30));
        assert!(store.list_notifications(user.id).await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn bonus_removal_is_checked_uniformly() {
        let (service, store) = make_service();
        let user = seed_user(&store, dec!(0), dec!(5)).await;

        let result = service.adjust_bonus(user.id, dec!(-6), "correction").await;
        assert!(matches!(result, Err(ConsoleError::InsufficientFunds { .. })));

        let ok = service.adjust_bonus(user.id, dec!(-5), "correction").await;
        let Ok(ok) = ok else {
            panic!("exact removal should pass");
        };
        assert_eq!(ok.bonus, dec!(0));
    }

    #[tokio::test]
    async fn convert_bonus_moves_everything_once() {
        let (service, store) = make_service();
        let user = seed_user(&store, dec!(100), dec!(50)).await;

        let converted = service.convert_bonus(user.id).await;
        let Ok(converted) = converted else {
            panic!("conversion failed");
        };
        assert_eq!(converted.balance, dec!(150));
        assert_eq!(converted.bonus, dec!(0));

        // Second conversion has nothing to move.
        let again = service.convert_bonus(user.id).await;
        assert!(matches!(again, Err(ConsoleError::NothingToConvert)));

        let fresh = store.get_user(user.id).await;
        let Ok(fresh) = fresh else {
            panic!("user missing");
        };
        assert_eq!(fresh.balance, dec!(150));
    }

    #[tokio::test]
    async fn settle_delta_skips_audit_notification() {
        let (service, store) = make_service();
        let user = seed_user(&store, dec!(10), dec!(0)).await;

        let result = service.settle_delta(user.id, dec!(40)).await;
        let Ok((old, new)) = result else {
            panic!("settlement failed");
        };
        assert_eq!(old, dec!(10));
        assert_eq!(new, dec!(50));
        assert!(store.list_notifications(user.id).await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn settle_delta_rejects_negative_result() {
        let (service, store) = make_service();
        let user = seed_user(&store, dec!(10), dec!(0)).await;

        let result = service.settle_delta(user.id, dec!(-20)).await;
        assert!(matches!(result, Err(ConsoleError::InsufficientFunds { .. })));
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let (service, _store) = make_service();
        let result = service.adjust_balance(UserId::new(), dec!(5), "x").await;
        assert!(matches!(result, Err(ConsoleError::UserNotFound(_))));
    }

    /// Store wrapper that refuses audit notifications, forcing the
    /// funds revert.
    #[derive(Debug)]
    struct BrokenAuditStore {
        inner: Arc<MemoryStore>,
    }

    #[async_trait]
    impl RecordStore for BrokenAuditStore {
        async fn list_requests(
            &self,
            kind: RequestKind,
        ) -> Result<Vec<RequestRecord>, ConsoleError> {
            self.inner.list_requests(kind).await
        }

        async fn get_request(&self, id: RequestId) -> Result<RequestRecord, ConsoleError> {
            self.inner.get_request(id).await
        }

        async fn create_request(&self, record: RequestRecord) -> Result<(), ConsoleError> {
            self.inner.create_request(record).await
        }

        async fn transition_request(
            &self,
            id: RequestId,
            from: RequestStatus,
            to: RequestStatus,
            decided_at: Option<DateTime<Utc>>,
        ) -> Result<RequestRecord, ConsoleError> {
            self.inner.transition_request(id, from, to, decided_at).await
        }

        async fn set_kyc_reason(&self, id: RequestId, reason: String) -> Result<(), ConsoleError> {
            self.inner.set_kyc_reason(id, reason).await
        }

        async fn list_users(&self) -> Result<Vec<User>, ConsoleError> {
            self.inner.list_users().await
        }

        async fn get_user(&self, id: UserId) -> Result<User, ConsoleError> {
            self.inner.get_user(id).await
        }

        async fn create_user(&self, user: User) -> Result<(), ConsoleError> {
            self.inner.create_user(user).await
        }

        async fn update_user_funds(
            &self,
            id: UserId,
            balance: Decimal,
            bonus: Decimal,
        ) -> Result<User, ConsoleError> {
            self.inner.update_user_funds(id, balance, bonus).await
        }

        async fn set_user_auth_status(
            &self,
            id: UserId,
            status: AuthStatus,
        ) -> Result<(), ConsoleError> {
            self.inner.set_user_auth_status(id, status).await
        }

        async fn delete_user(&self, id: UserId) -> Result<(), ConsoleError> {
            self.inner.delete_user(id).await
        }

        async fn create_notification(
            &self,
            _notification: Notification,
        ) -> Result<(), ConsoleError> {
            Err(ConsoleError::PersistenceError(
                "notification write refused".to_string(),
            ))
        }

        async fn list_notifications(
            &self,
            user_id: UserId,
        ) -> Result<Vec<Notification>, ConsoleError> {
            self.inner.list_notifications(user_id).await
        }

        async fn append_journal(&self, entry: JournalEntry) -> Result<(), ConsoleError> {
            self.inner.append_journal(entry).await
        }

        async fn list_journal(
            &self,
            request_id: RequestId,
        ) -> Result<Vec<JournalEntry>, ConsoleError> {
            self.inner.list_journal(request_id).await
        }
    }

    fn make_service_over(store: Arc<dyn RecordStore>) -> LedgerService {
        let bus = EventBus::new(64);
        let email = Arc::new(RecordingEmailSender::default());
        let dispatcher = NotificationDispatcher::new(email, Arc::clone(&store), bus.clone());
        LedgerService::new(store, bus, dispatcher, Duration::from_secs(10))
    }

    #[tokio::test]
    async fn audit_failure_reverts_the_adjustment() {
        let memory = Arc::new(MemoryStore::new());
        let user = seed_user(&memory, dec!(100), dec!(0)).await;
        let broken = Arc::new(BrokenAuditStore {
            inner: Arc::<MemoryStore>::clone(&memory),
        });
        let service = make_service_over(broken as Arc<dyn RecordStore>);

        let result = service.adjust_balance(user.id, dec!(25), "promo credit").await;
        assert!(matches!(result, Err(ConsoleError::PersistenceError(_))));

        // Reverted: a retry starts from the original balance.
        let fresh = memory.get_user(user.id).await;
        let Ok(fresh) = fresh else {
            panic!("user missing");
        };
        assert_eq!(fresh.balance, dec!(100));
    }

    #[tokio::test]
    async fn audit_failure_reverts_the_conversion() {
        let memory = Arc::new(MemoryStore::new());
        let user = seed_user(&memory, dec!(100), dec!(50)).await;
        let broken = Arc::new(BrokenAuditStore {
            inner: Arc::<MemoryStore>::clone(&memory),
        });
        let service = make_service_over(broken as Arc<dyn RecordStore>);

        let result = service.convert_bonus(user.id).await;
        assert!(matches!(result, Err(ConsoleError::PersistenceError(_))));

        let fresh = memory.get_user(user.id).await;
        let Ok(fresh) = fresh else {
            panic!("user missing");
        };
        assert_eq!(fresh.balance, dec!(100));
        assert_eq!(fresh.bonus, dec!(50));
    }
}
