//! Realtime change events.
//!
//! A [`ChangeEvent`] deliberately carries no payload beyond the entity
//! kind and a timestamp: consumers must treat it as a signal to re-fetch
//! and re-join from the record store, never as a self-describing delta.
//! This keeps projections correct even when events race an optimistic
//! local update — re-applying the same snapshot twice is harmless.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RequestKind;

/// Entity kind a realtime subscription channel covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Investment requests.
    Investments,
    /// Deposit requests.
    Deposits,
    /// Withdrawal requests.
    Withdrawals,
    /// Loan requests.
    Loans,
    /// KYC submissions.
    Kyc,
    /// Users (balances, roles, auth status).
    Users,
    /// In-app notifications.
    Notifications,
}

impl EntityKind {
    /// Returns the channel name used over the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Investments => "investments",
            Self::Deposits => "deposits",
            Self::Withdrawals => "withdrawals",
            Self::Loans => "loans",
            Self::Kyc => "kyc",
            Self::Users => "users",
            Self::Notifications => "notifications",
        }
    }
}

impl std::str::FromStr for EntityKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "investments" => Ok(Self::Investments),
            "deposits" => Ok(Self::Deposits),
            "withdrawals" => Ok(Self::Withdrawals),
            "loans" => Ok(Self::Loans),
            "kyc" => Ok(Self::Kyc),
            "users" => Ok(Self::Users),
            "notifications" => Ok(Self::Notifications),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<RequestKind> for EntityKind {
    fn from(kind: RequestKind) -> Self {
        match kind {
            RequestKind::Investment => Self::Investments,
            RequestKind::Deposit => Self::Deposits,
            RequestKind::Withdrawal => Self::Withdrawals,
            RequestKind::Loan => Self::Loans,
            RequestKind::Kyc => Self::Kyc,
        }
    }
}

/// "Something changed" signal for one entity kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Entity kind whose collection changed.
    pub kind: EntityKind,
    /// When the change was published.
    pub timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    /// Creates a change event stamped with the current time.
    #[must_use]
    pub fn now(kind: EntityKind) -> Self {
        Self {
            kind,
            timestamp: Utc::now(),
        }
    }
}
