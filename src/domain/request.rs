//! Financial request records and their settlement state machine.
//!
//! A [`RequestRecord`] is the unit the approval workflow operates on.
//! Its lifecycle is `Pending → Approved | Rejected`, exactly once; the
//! store enforces the single transition with a conditional update so a
//! duplicate admin decision can never settle twice.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{RequestId, UserId};

/// Kind of financial request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// Capital placed into an investment plan.
    Investment,
    /// Incoming funds awaiting confirmation of payment proof.
    Deposit,
    /// Outgoing funds; the amount is held at submission time.
    Withdrawal,
    /// Loan application.
    Loan,
    /// Identity-verification submission.
    Kyc,
}

impl RequestKind {
    /// Returns the kind as its stored string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Investment => "investment",
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::Loan => "loan",
            Self::Kyc => "kyc",
        }
    }

    /// All request kinds, in dashboard display order.
    pub const ALL: [Self; 5] = [
        Self::Investment,
        Self::Deposit,
        Self::Withdrawal,
        Self::Loan,
        Self::Kyc,
    ];
}

impl std::str::FromStr for RequestKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "investment" | "investments" => Ok(Self::Investment),
            "deposit" | "deposits" => Ok(Self::Deposit),
            "withdrawal" | "withdrawals" => Ok(Self::Withdrawal),
            "loan" | "loans" => Ok(Self::Loan),
            "kyc" => Ok(Self::Kyc),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settlement state of a request.
///
/// The upstream data carried two casings of the same three states
/// (`Pending`/`pending`, `Active`/`approved`, ...); this is the single
/// canonical form, stored lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Awaiting an admin decision.
    Pending,
    /// Terminal: approved/settled.
    Approved,
    /// Terminal: rejected.
    Rejected,
}

impl RequestStatus {
    /// Returns the status as its stored string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Returns `true` for the two terminal states.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Kind-specific payload of a request record.
///
/// A tagged union replaces the upstream's loosely-typed record shapes,
/// so handlers never probe optional fields that belong to another kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestDetails {
    /// Investment into a named plan.
    Investment {
        /// Plan the capital is committed to.
        plan: String,
    },
    /// Deposit via some payment method, optionally with uploaded proof.
    Deposit {
        /// Payment method label (e.g. `"BTC"`, `"USDT (TRC20)"`).
        method: String,
        /// Storage key of the uploaded proof-of-payment, if any.
        proof_key: Option<String>,
        /// On-chain transaction hash, if provided by the user.
        tx_hash: Option<String>,
    },
    /// Withdrawal to an external destination.
    Withdrawal {
        /// Payment method label.
        method: String,
        /// Destination address or account.
        destination: String,
    },
    /// Loan application.
    Loan {
        /// Requested term in days.
        duration_days: u32,
        /// Interest rate in basis points.
        interest_bps: u32,
        /// Free-text purpose.
        purpose: String,
    },
    /// KYC submission.
    Kyc {
        /// Kind of identity document submitted.
        document_kind: String,
        /// Rejection reason, set when an admin rejects the submission.
        reason: Option<String>,
    },
}

impl RequestDetails {
    /// Returns the [`RequestKind`] this payload belongs to.
    #[must_use]
    pub const fn kind(&self) -> RequestKind {
        match self {
            Self::Investment { .. } => RequestKind::Investment,
            Self::Deposit { .. } => RequestKind::Deposit,
            Self::Withdrawal { .. } => RequestKind::Withdrawal,
            Self::Loan { .. } => RequestKind::Loan,
            Self::Kyc { .. } => RequestKind::Kyc,
        }
    }
}

/// A financial request as held by the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RequestRecord {
    /// Request identifier.
    pub id: RequestId,
    /// Owning user.
    pub user_id: UserId,
    /// Monetary amount of the request (zero for KYC).
    pub amount: Decimal,
    /// Settlement state.
    pub status: RequestStatus,
    /// Submission timestamp.
    pub created_at: DateTime<Utc>,
    /// When the admin decision was applied, if settled.
    pub decided_at: Option<DateTime<Utc>>,
    /// Kind-specific payload.
    pub details: RequestDetails,
}

impl RequestRecord {
    /// Creates a pending request.
    #[must_use]
    pub fn new(user_id: UserId, amount: Decimal, details: RequestDetails) -> Self {
        Self {
            id: RequestId::new(),
            user_id,
            amount,
            status: RequestStatus::Pending,
            created_at: Utc::now(),
            decided_at: None,
            details,
        }
    }

    /// Returns the request kind, derived from the payload.
    #[must_use]
    pub const fn kind(&self) -> RequestKind {
        self.details.kind()
    }

    /// Returns `true` while the request still awaits a decision.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self.status, RequestStatus::Pending)
    }
}

/// An admin decision on a pending request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// Approve and settle the request.
    Approve,
    /// Reject the request, optionally with a reason shown to the user.
    Reject {
        /// Free-text reason (required by the UI for KYC rejections).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl Decision {
    /// Terminal status this decision moves the request to.
    #[must_use]
    pub const fn terminal_status(&self) -> RequestStatus {
        match self {
            Self::Approve => RequestStatus::Approved,
            Self::Reject { .. } => RequestStatus::Rejected,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn kind_is_derived_from_details() {
        let record = RequestRecord::new(
            UserId::new(),
            dec!(250),
            RequestDetails::Investment {
                plan: "gold".to_string(),
            },
        );
        assert_eq!(record.kind(), RequestKind::Investment);
        assert!(record.is_pending());
        assert!(record.decided_at.is_none());
    }

    #[test]
    fn terminal_states() {
        assert!(!RequestStatus::Pending.is_terminal());
        assert!(RequestStatus::Approved.is_terminal());
        assert!(RequestStatus::Rejected.is_terminal());
    }

    #[test]
    fn decision_maps_to_terminal_status() {
        assert_eq!(Decision::Approve.terminal_status(), RequestStatus::Approved);
        assert_eq!(
            Decision::Reject { reason: None }.terminal_status(),
            RequestStatus::Rejected
        );
    }

    #[test]
    fn kind_parses_plural_forms() {
        assert_eq!("deposits".parse::<RequestKind>(), Ok(RequestKind::Deposit));
        assert_eq!("kyc".parse::<RequestKind>(), Ok(RequestKind::Kyc));
        assert!("transfers".parse::<RequestKind>().is_err());
    }

    #[test]
    fn details_tagged_serialization() {
        let details = RequestDetails::Withdrawal {
            method: "USDT (TRC20)".to_string(),
            destination: "T9yD...".to_string(),
        };
        let json = serde_json::to_string(&details).unwrap_or_default();
        assert!(json.contains("\"kind\":\"withdrawal\""));
    }

    #[test]
    fn decision_deserializes_with_and_without_reason() {
        let approve: Decision =
            serde_json::from_str("{\"decision\":\"approve\"}").ok().unwrap_or_else(|| {
                panic!("approve failed to parse");
            });
        assert_eq!(approve, Decision::Approve);

        let reject: Decision =
            serde_json::from_str("{\"decision\":\"reject\",\"reason\":\"blurry document\"}")
                .ok()
                .unwrap_or_else(|| {
                    panic!("reject failed to parse");
                });
        assert_eq!(
            reject,
            Decision::Reject {
                reason: Some("blurry document".to_string())
            }
        );
    }
}
