//! DTOs for user management and ledger adjustment endpoints.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Notification, User};

use super::PaginationMeta;

/// Paginated user collection.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserListResponse {
    /// Users for the current page.
    pub data: Vec<User>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}

/// Admin-initiated fund adjustment.
///
/// `delta` is signed: positive credits, negative removes. The ledger
/// rejects any removal that would leave the fund negative.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AdjustFundsRequest {
    /// Signed amount to apply.
    pub delta: Decimal,
    /// Reason recorded in the audit trail.
    #[serde(default)]
    pub note: Option<String>,
}

/// A user's in-app notifications, newest first.
#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationListResponse {
    /// Stored notifications, including ledger audit messages.
    pub data: Vec<Notification>,
}
