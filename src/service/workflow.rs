//! Approval workflow engine: settles pending requests exactly once.
//!
//! [`ApprovalService::decide`] is the only path that moves a request out
//! of `Pending`. Each decision runs as a small saga:
//!
//! 1. conditional status flip (the store-level idempotency guard),
//! 2. ledger mutation and/or user update, journaled,
//! 3. notifications (fire-and-forget).
//!
//! A failure in step 2 compensates by reverting the status flip, so the
//! system never stays in a "settled but not credited" state. Amounts are
//! always re-read from the stored record inside the transition — callers
//! supply only the request identifier and the decision.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;

use crate::domain::{
    AuthStatus, ChangeEvent, Decision, EntityKind, EventBus, RequestDetails, RequestId,
    RequestRecord, RequestStatus, User,
};
use crate::error::ConsoleError;
use crate::notify::{NotificationDispatcher, Outcome};
use crate::store::{JournalEntry, JournalStep, RecordStore};

use super::{LedgerService, bounded};

/// Result of a settled decision, for updating the caller's local view
/// without a full reload.
#[derive(Debug, Clone)]
pub struct DecisionOutcome {
    /// The request in its terminal state.
    pub request: RequestRecord,
    /// The owning user's balance after settlement, when it changed.
    pub new_balance: Option<Decimal>,
}

/// Per-kind settlement state machine.
#[derive(Debug, Clone)]
pub struct ApprovalService {
    store: Arc<dyn RecordStore>,
    ledger: LedgerService,
    dispatcher: NotificationDispatcher,
    bus: EventBus,
    fetch_timeout: Duration,
}

impl ApprovalService {
    /// Creates a new `ApprovalService`.
    #[must_use]
    pub fn new(
        store: Arc<dyn RecordStore>,
        ledger: LedgerService,
        dispatcher: NotificationDispatcher,
        bus: EventBus,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            store,
            ledger,
            dispatcher,
            bus,
            fetch_timeout,
        }
    }

    /// Applies an admin decision to a pending request.
    ///
    /// # Errors
    ///
    /// - [`ConsoleError::RequestNotFound`] / [`ConsoleError::UserNotFound`]
    ///   before any state is touched;
    /// - [`ConsoleError::InvalidTransition`] when the request already
    ///   left `Pending` (duplicate click, racing admin);
    /// - the ledger error when settlement fails — the status flip has
    ///   been compensated by then;
    /// - [`ConsoleError::PartialFailure`] only when compensation itself
    ///   failed and manual reconciliation is needed.
    pub async fn decide(
        &self,
        id: RequestId,
        decision: Decision,
    ) -> Result<DecisionOutcome, ConsoleError> {
        let record = bounded(
            self.fetch_timeout,
            "get request",
            self.store.get_request(id),
        )
        .await?;

        // The owning user is required on every path (ledger target or
        // notification recipient), so a missing user aborts before the
        // status flip rather than settling without its side effects.
        let user = bounded(
            self.fetch_timeout,
            "get owning user",
            self.store.get_user(record.user_id),
        )
        .await?;

        let terminal = decision.terminal_status();
        let outcome = match decision {
            Decision::Approve => Outcome::Approved,
            Decision::Reject { .. } => Outcome::Rejected,
        };

        // Step 1: the guard. Anything but Pending-at-the-store refuses.
        let settled = bounded(
            self.fetch_timeout,
            "transition request",
            self.store
                .transition_request(id, RequestStatus::Pending, terminal, Some(Utc::now())),
        )
        .await?;
        self.journal(id, JournalStep::TransitionApplied, format!("pending -> {}", terminal.as_str()))
            .await;

        // Step 2: ledger / user mutation, compensated on failure.
        let new_balance = match self.apply_side_effects(&settled, &user, &decision).await {
            Ok(new_balance) => new_balance,
            Err(error) => return Err(self.compensate(id, terminal, error).await),
        };

        // Step 3: notifications, fire-and-forget.
        self.notify(&settled, &user, outcome, &decision).await;

        let _ = self
            .bus
            .publish(ChangeEvent::now(EntityKind::from(settled.kind())));

        tracing::info!(
            request_id = %id,
            kind = %settled.kind(),
            status = settled.status.as_str(),
            user_id = %user.id,
            "request settled"
        );

        Ok(DecisionOutcome {
            request: settled,
            new_balance,
        })
    }

    /// Ledger delta mandated by the settlement table, if any.
    fn settlement_delta(record: &RequestRecord, decision: &Decision) -> Option<Decimal> {
        match (&record.details, decision) {
            // Approving an investment credits the capital.
            (RequestDetails::Investment { .. }, Decision::Approve)
            // Approving a deposit credits the amount.
            | (RequestDetails::Deposit { .. }, Decision::Approve) => Some(record.amount),
            // Rejecting a withdrawal refunds the amount held at submission.
            (RequestDetails::Withdrawal { .. }, Decision::Reject { .. }) => Some(record.amount),
            _ => None,
        }
    }

    async fn apply_side_effects(
        &self,
        record: &RequestRecord,
        user: &User,
        decision: &Decision,
    ) -> Result<Option<Decimal>, ConsoleError> {
        let mut new_balance = None;
        if let Some(delta) = Self::settlement_delta(record, decision) {
            let (_, new) = self.ledger.settle_delta(user.id, delta).await?;
            self.journal(record.id, JournalStep::LedgerApplied, format!("delta {delta}"))
                .await;
            new_balance = Some(new);
        }

        if let RequestDetails::Kyc { .. } = record.details {
            let auth_status = match decision {
                Decision::Approve => AuthStatus::Approved,
                Decision::Reject { .. } => AuthStatus::Rejected,
            };
            bounded(
                self.fetch_timeout,
                "set user auth status",
                self.store.set_user_auth_status(user.id, auth_status),
            )
            .await?;
            self.journal(
                record.id,
                JournalStep::AuthStatusApplied,
                format!("{} -> {}", user.auth_status.as_str(), auth_status.as_str()),
            )
            .await;
            if let Decision::Reject {
                reason: Some(reason),
            } = decision
            {
                let wrote_reason = bounded(
                    self.fetch_timeout,
                    "set kyc reason",
                    self.store.set_kyc_reason(record.id, reason.clone()),
                )
                .await;
                if let Err(error) = wrote_reason {
                    return Err(self.revert_auth_status(record.id, user, error).await);
                }
            }
            let _ = self.bus.publish(ChangeEvent::now(EntityKind::Users));
        }

        Ok(new_balance)
    }

    /// Restores the user's prior KYC auth status after a later step in
    /// the same decision failed.
    ///
    /// Returns the error to surface: the original `cause` when the
    /// restore succeeded, [`ConsoleError::PartialFailure`] when the
    /// auth status is left flipped without its decision.
    async fn revert_auth_status(
        &self,
        id: RequestId,
        user: &User,
        cause: ConsoleError,
    ) -> ConsoleError {
        tracing::warn!(
            request_id = %id,
            user_id = %user.id,
            error = %cause,
            "kyc step failed; restoring prior auth status"
        );
        let revert = bounded(
            self.fetch_timeout,
            "restore auth status",
            self.store.set_user_auth_status(user.id, user.auth_status),
        )
        .await;
        match revert {
            Ok(()) => {
                self.journal(
                    id,
                    JournalStep::Compensated,
                    format!("auth status restored to {}", user.auth_status.as_str()),
                )
                .await;
                cause
            }
            Err(revert_error) => {
                tracing::error!(
                    request_id = %id,
                    user_id = %user.id,
                    %revert_error,
                    "auth status restore failed; user left decided without a stored reason"
                );
                ConsoleError::PartialFailure {
                    completed: "auth status update".to_string(),
                    failed: cause.to_string(),
                }
            }
        }
    }

    /// Reverts the status flip after a failed settlement step.
    ///
    /// Returns the error to surface: the original `cause` when the
    /// revert succeeded, a [`ConsoleError::PartialFailure`] when it did
    /// not.
    async fn compensate(
        &self,
        id: RequestId,
        from: RequestStatus,
        cause: ConsoleError,
    ) -> ConsoleError {
        tracing::warn!(request_id = %id, error = %cause, "settlement failed; reverting transition");
        let revert = bounded(
            self.fetch_timeout,
            "revert transition",
            self.store
                .transition_request(id, from, RequestStatus::Pending, None),
        )
        .await;
        match revert {
            Ok(_) => {
                self.journal(id, JournalStep::Compensated, cause.to_string()).await;
                cause
            }
            Err(revert_error) => {
                tracing::error!(
                    request_id = %id,
                    %revert_error,
                    "compensation failed; request left settled without its side effects"
                );
                ConsoleError::PartialFailure {
                    completed: format!("status flip to {}", from.as_str()),
                    failed: cause.to_string(),
                }
            }
        }
    }

    async fn notify(
        &self,
        record: &RequestRecord,
        user: &User,
        outcome: Outcome,
        decision: &Decision,
    ) {
        match &record.details {
            RequestDetails::Investment { plan } => {
                self.dispatcher
                    .investment_decided(user, outcome, record.amount, plan)
                    .await;
            }
            RequestDetails::Deposit { .. } => {
                self.dispatcher
                    .deposit_decided(user, outcome, record.amount)
                    .await;
            }
            RequestDetails::Withdrawal { .. } => {
                self.dispatcher
                    .withdrawal_decided(user, outcome, record.amount)
                    .await;
            }
            RequestDetails::Loan { duration_days, .. } => {
                self.dispatcher
                    .loan_decided(user, outcome, record.amount, *duration_days)
                    .await;
            }
            RequestDetails::Kyc { .. } => {
                let reason = match decision {
                    Decision::Reject { reason } => reason.as_deref(),
                    Decision::Approve => None,
                };
                self.dispatcher.kyc_decided(user, outcome, reason).await;
            }
        }
    }

    /// Journal writes are best-effort bookkeeping of completed steps;
    /// a failed append must not undo a settlement that already happened.
    async fn journal(&self, id: RequestId, step: JournalStep, note: String) {
        if let Err(error) = self
            .store
            .append_journal(JournalEntry::now(id, step, note))
            .await
        {
            tracing::warn!(request_id = %id, %error, "journal append failed");
        }
    }
}
