//! Notification dispatch: email + in-app messages for state transitions.
//!
//! Dispatch is fire-and-forget from the workflow's perspective: a failed
//! email or in-app write is logged at `warn` and never blocks or rolls
//! back the state transition it describes. The one durable audit message
//! (the ledger mutation trail) is written by the ledger service itself,
//! not here.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::domain::{ChangeEvent, EntityKind, EventBus, Notification, Severity, User};
use crate::error::ConsoleError;
use crate::store::RecordStore;

/// Outcome of an admin decision, as shown to the affected user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The request was approved.
    Approved,
    /// The request was rejected.
    Rejected,
}

impl Outcome {
    /// Returns the outcome as display text.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Severity an in-app notification about this outcome carries.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::Approved => Severity::Success,
            Self::Rejected => Severity::Error,
        }
    }
}

/// External email delivery seam.
///
/// Template content is owned by the external mail service; this trait
/// only carries the facts each template needs.
#[async_trait]
pub trait EmailSender: Send + Sync + std::fmt::Debug {
    /// Notifies a user about an investment decision.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::Internal`] when delivery fails.
    async fn send_investment_notification(
        &self,
        email: &str,
        name: &str,
        outcome: Outcome,
        amount: Decimal,
        plan: &str,
    ) -> Result<(), ConsoleError>;

    /// Notifies a user about a withdrawal decision.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::Internal`] when delivery fails.
    async fn send_withdrawal_notification(
        &self,
        email: &str,
        name: &str,
        outcome: Outcome,
        amount: Decimal,
    ) -> Result<(), ConsoleError>;

    /// Notifies a user about a KYC decision.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::Internal`] when delivery fails.
    async fn send_kyc_notification(
        &self,
        email: &str,
        name: &str,
        outcome: Outcome,
    ) -> Result<(), ConsoleError>;

    /// Notifies a user about a loan decision.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::Internal`] when delivery fails.
    async fn send_loan_notification(
        &self,
        email: &str,
        name: &str,
        outcome: Outcome,
        amount: Decimal,
        duration_days: u32,
    ) -> Result<(), ConsoleError>;

    /// Notifies a user that an admin changed their balance.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::Internal`] when delivery fails.
    async fn send_balance_update_notification(
        &self,
        email: &str,
        name: &str,
        new_balance: Decimal,
        old_balance: Decimal,
    ) -> Result<(), ConsoleError>;
}

/// [`EmailSender`] that hands messages to the operator log.
///
/// Stands in for the hosted mail relay; the console only ever needs the
/// send-and-forget contract, so in environments without a relay the
/// trace log is the delivery channel.
#[derive(Debug, Default, Clone)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send_investment_notification(
        &self,
        email: &str,
        name: &str,
        outcome: Outcome,
        amount: Decimal,
        plan: &str,
    ) -> Result<(), ConsoleError> {
        tracing::info!(email, name, outcome = outcome.as_str(), %amount, plan, "investment email");
        Ok(())
    }

    async fn send_withdrawal_notification(
        &self,
        email: &str,
        name: &str,
        outcome: Outcome,
        amount: Decimal,
    ) -> Result<(), ConsoleError> {
        tracing::info!(email, name, outcome = outcome.as_str(), %amount, "withdrawal email");
        Ok(())
    }

    async fn send_kyc_notification(
        &self,
        email: &str,
        name: &str,
        outcome: Outcome,
    ) -> Result<(), ConsoleError> {
        tracing::info!(email, name, outcome = outcome.as_str(), "kyc email");
        Ok(())
    }

    async fn send_loan_notification(
        &self,
        email: &str,
        name: &str,
        outcome: Outcome,
        amount: Decimal,
        duration_days: u32,
    ) -> Result<(), ConsoleError> {
        tracing::info!(
            email,
            name,
            outcome = outcome.as_str(),
            %amount,
            duration_days,
            "loan email"
        );
        Ok(())
    }

    async fn send_balance_update_notification(
        &self,
        email: &str,
        name: &str,
        new_balance: Decimal,
        old_balance: Decimal,
    ) -> Result<(), ConsoleError> {
        tracing::info!(email, name, %new_balance, %old_balance, "balance update email");
        Ok(())
    }
}

/// Combines email delivery with stored in-app notifications.
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    email: Arc<dyn EmailSender>,
    store: Arc<dyn RecordStore>,
    bus: EventBus,
}

impl NotificationDispatcher {
    /// Creates a dispatcher over the given email seam and store.
    #[must_use]
    pub fn new(email: Arc<dyn EmailSender>, store: Arc<dyn RecordStore>, bus: EventBus) -> Self {
        Self { email, store, bus }
    }

    /// Writes an in-app notification, logging instead of failing.
    async fn in_app(&self, notification: Notification) {
        let user_id = notification.user_id;
        if let Err(error) = self.store.create_notification(notification).await {
            tracing::warn!(%user_id, %error, "in-app notification write failed");
            return;
        }
        let _ = self.bus.publish(ChangeEvent::now(EntityKind::Notifications));
    }

    /// Investment decision: email only.
    pub async fn investment_decided(
        &self,
        user: &User,
        outcome: Outcome,
        amount: Decimal,
        plan: &str,
    ) {
        if let Err(error) = self
            .email
            .send_investment_notification(&user.email, &user.name, outcome, amount, plan)
            .await
        {
            tracing::warn!(user_id = %user.id, %error, "investment email failed");
        }
    }

    /// Deposit decision: in-app notification only.
    pub async fn deposit_decided(&self, user: &User, outcome: Outcome, amount: Decimal) {
        let message = match outcome {
            Outcome::Approved => format!("Your deposit of {amount} was approved and credited."),
            Outcome::Rejected => format!("Your deposit of {amount} was rejected."),
        };
        self.in_app(Notification::new(
            user.id,
            format!("Deposit {}", outcome.as_str()),
            message,
            outcome.severity(),
        ))
        .await;
    }

    /// Withdrawal decision: email and in-app.
    pub async fn withdrawal_decided(&self, user: &User, outcome: Outcome, amount: Decimal) {
        if let Err(error) = self
            .email
            .send_withdrawal_notification(&user.email, &user.name, outcome, amount)
            .await
        {
            tracing::warn!(user_id = %user.id, %error, "withdrawal email failed");
        }
        let message = match outcome {
            Outcome::Approved => format!("Your withdrawal of {amount} was approved."),
            Outcome::Rejected => {
                format!("Your withdrawal of {amount} was rejected; the amount was refunded.")
            }
        };
        self.in_app(Notification::new(
            user.id,
            format!("Withdrawal {}", outcome.as_str()),
            message,
            outcome.severity(),
        ))
        .await;
    }

    /// Loan decision: email only.
    pub async fn loan_decided(
        &self,
        user: &User,
        outcome: Outcome,
        amount: Decimal,
        duration_days: u32,
    ) {
        if let Err(error) = self
            .email
            .send_loan_notification(&user.email, &user.name, outcome, amount, duration_days)
            .await
        {
            tracing::warn!(user_id = %user.id, %error, "loan email failed");
        }
    }

    /// KYC decision: email and in-app, with the optional rejection reason.
    pub async fn kyc_decided(&self, user: &User, outcome: Outcome, reason: Option<&str>) {
        if let Err(error) = self
            .email
            .send_kyc_notification(&user.email, &user.name, outcome)
            .await
        {
            tracing::warn!(user_id = %user.id, %error, "kyc email failed");
        }
        let message = match (outcome, reason) {
            (Outcome::Approved, _) => "Your identity verification was approved.".to_string(),
            (Outcome::Rejected, Some(reason)) => {
                format!("Your identity verification was rejected: {reason}")
            }
            (Outcome::Rejected, None) => "Your identity verification was rejected.".to_string(),
        };
        self.in_app(Notification::new(
            user.id,
            format!("Verification {}", outcome.as_str()),
            message,
            outcome.severity(),
        ))
        .await;
    }

    /// Admin-initiated balance change: email only. The durable in-app
    /// audit record is written by the ledger service before this runs.
    pub async fn balance_adjusted(&self, user: &User, old_balance: Decimal, new_balance: Decimal) {
        if let Err(error) = self
            .email
            .send_balance_update_notification(&user.email, &user.name, new_balance, old_balance)
            .await
        {
            tracing::warn!(user_id = %user.id, %error, "balance update email failed");
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::UserId;
    use crate::store::memory::MemoryStore;
    use rust_decimal_macros::dec;
    use tokio::sync::Mutex;

    /// Records every email for assertions; can be switched to fail.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingEmailSender {
        pub sent: Mutex<Vec<String>>,
        pub fail: bool,
    }

    #[async_trait]
    impl EmailSender for RecordingEmailSender {
        async fn send_investment_notification(
            &self,
            email: &str,
            _name: &str,
            outcome: Outcome,
            amount: Decimal,
            plan: &str,
        ) -> Result<(), ConsoleError> {
            if self.fail {
                return Err(ConsoleError::Internal("relay down".to_string()));
            }
            self.sent
                .lock()
                .await
                .push(format!("investment:{email}:{}:{amount}:{plan}", outcome.as_str()));
            Ok(())
        }

        async fn send_withdrawal_notification(
            &self,
            email: &str,
            _name: &str,
            outcome: Outcome,
            amount: Decimal,
        ) -> Result<(), ConsoleError> {
            if self.fail {
                return Err(ConsoleError::Internal("relay down".to_string()));
            }
            self.sent
                .lock()
                .await
                .push(format!("withdrawal:{email}:{}:{amount}", outcome.as_str()));
            Ok(())
        }

        async fn send_kyc_notification(
            &self,
            email: &str,
            _name: &str,
            outcome: Outcome,
        ) -> Result<(), ConsoleError> {
            if self.fail {
                return Err(ConsoleError::Internal("relay down".to_string()));
            }
            self.sent
                .lock()
                .await
                .push(format!("kyc:{email}:{}", outcome.as_str()));
            Ok(())
        }

        async fn send_loan_notification(
            &self,
            email: &str,
            _name: &str,
            outcome: Outcome,
            amount: Decimal,
            duration_days: u32,
        ) -> Result<(), ConsoleError> {
            if self.fail {
                return Err(ConsoleError::Internal("relay down".to_string()));
            }
            self.sent.lock().await.push(format!(
                "loan:{email}:{}:{amount}:{duration_days}",
                outcome.as_str()
            ));
            Ok(())
        }

        async fn send_balance_update_notification(
            &self,
            email: &str,
            _name: &str,
            new_balance: Decimal,
            old_balance: Decimal,
        ) -> Result<(), ConsoleError> {
            if self.fail {
                return Err(ConsoleError::Internal("relay down".to_string()));
            }
            self.sent
                .lock()
                .await
                .push(format!("balance:{email}:{old_balance}->{new_balance}"));
            Ok(())
        }
    }

    fn make_dispatcher(
        fail_email: bool,
    ) -> (NotificationDispatcher, Arc<RecordingEmailSender>, Arc<MemoryStore>) {
        let email = Arc::new(RecordingEmailSender {
            fail: fail_email,
            ..RecordingEmailSender::default()
        });
        let store = Arc::new(MemoryStore::new());
        let bus = EventBus::new(16);
        let dispatcher = NotificationDispatcher::new(
            Arc::<RecordingEmailSender>::clone(&email),
            Arc::<MemoryStore>::clone(&store) as Arc<dyn RecordStore>,
            bus,
        );
        (dispatcher, email, store)
    }

    #[tokio::test]
    async fn withdrawal_sends_email_and_in_app() {
        let (dispatcher, email, store) = make_dispatcher(false);
        let user = User::new("Ada", "ada@example.com");
        let user_id = user.id;

        dispatcher
            .withdrawal_decided(&user, Outcome::Rejected, dec!(75))
            .await;

        let sent = email.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert!(sent.first().is_some_and(|s| s.contains("rejected")));
        drop(sent);

        let in_app = store.list_notifications(user_id).await.unwrap_or_default();
        assert_eq!(in_app.len(), 1);
        assert!(in_app.first().is_some_and(|n| n.message.contains("refunded")));
    }

    #[tokio::test]
    async fn email_failure_does_not_block_in_app() {
        let (dispatcher, _email, store) = make_dispatcher(true);
        let user = User::new("Ada", "ada@example.com");
        let user_id = user.id;

        dispatcher
            .kyc_decided(&user, Outcome::Rejected, Some("blurry document"))
            .await;

        let in_app = store.list_notifications(user_id).await.unwrap_or_default();
        assert_eq!(in_app.len(), 1);
        assert!(in_app.first().is_some_and(|n| n.message.contains("blurry document")));
    }

    #[tokio::test]
    async fn deposit_creates_in_app_only() {
        let (dispatcher, email, store) = make_dispatcher(false);
        let user = User::new("Ada", "ada@example.com");
        let user_id = user.id;

        dispatcher
            .deposit_decided(&user, Outcome::Approved, dec!(40))
            .await;

        assert!(email.sent.lock().await.is_empty());
        let in_app = store.list_notifications(user_id).await.unwrap_or_default();
        assert_eq!(in_app.len(), 1);
        assert_eq!(
            in_app.first().map(|n| n.severity),
            Some(Severity::Success)
        );
    }

    #[tokio::test]
    async fn unknown_user_id_write_is_swallowed() {
        // MemoryStore accepts any notification, so exercise the event
        // publication path instead: no receivers means publish drops it.
        let (dispatcher, _email, store) = make_dispatcher(false);
        let user = User {
            id: UserId::new(),
            ..User::new("Ghost", "ghost@example.com")
        };
        dispatcher
            .deposit_decided(&user, Outcome::Rejected, dec!(5))
            .await;
        let in_app = store.list_notifications(user.id).await.unwrap_or_default();
        assert_eq!(in_app.len(), 1);
    }
}
