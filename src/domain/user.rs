//! Platform user: identity, role, KYC outcome, and monetary funds.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::UserId;

/// Access role of a platform user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular end user.
    User,
    /// Console administrator.
    Admin,
    /// Administrator with user-management powers.
    Superadmin,
}

impl Role {
    /// Returns the role as its stored string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
            Self::Superadmin => "superadmin",
        }
    }
}

/// KYC outcome recorded on the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    /// No decision yet.
    Pending,
    /// Identity verified by an admin.
    Approved,
    /// Verification rejected.
    Rejected,
}

impl AuthStatus {
    /// Returns the status as its stored string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

/// A platform user as held by the record store.
///
/// `balance` and `bonus` are decimal currency amounts. The ledger service
/// enforces that neither ever goes negative; the store itself only
/// persists what it is given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct User {
    /// Stable user identifier (foreign key on all request records).
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Contact email, target of workflow notifications.
    pub email: String,
    /// Available balance.
    pub balance: Decimal,
    /// Bonus funds, convertible into balance.
    pub bonus: Decimal,
    /// Access role.
    pub role: Role,
    /// KYC outcome.
    pub auth_status: AuthStatus,
    /// Signup timestamp.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Creates a user with zero funds, `user` role, and pending KYC.
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: UserId::new(),
            name: name.into(),
            email: email.into(),
            balance: Decimal::ZERO,
            bonus: Decimal::ZERO,
            role: Role::User,
            auth_status: AuthStatus::Pending,
            created_at: Utc::now(),
        }
    }
}
