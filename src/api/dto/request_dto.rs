//! DTOs for request collections, decisions, and the dashboard.

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{RequestKind, RequestRecord, User};
use crate::projection::{Aggregates, RequestRow};

use super::PaginationMeta;

/// Paginated, user-joined request collection.
#[derive(Debug, Serialize, ToSchema)]
pub struct RequestListResponse {
    /// Display-ready rows for the current page.
    pub data: Vec<RequestRow>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}

/// Aggregate statistics for one request kind.
#[derive(Debug, Serialize, ToSchema)]
pub struct RequestStatsResponse {
    /// Request kind the statistics cover.
    pub kind: RequestKind,
    /// Recomputed aggregates over the full collection.
    pub stats: Aggregates,
}

/// A single request with resolved display links.
#[derive(Debug, Serialize, ToSchema)]
pub struct RequestDetailResponse {
    /// Display-ready row.
    #[serde(flatten)]
    pub row: RequestRow,
    /// Public URL of the uploaded proof-of-payment, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof_url: Option<String>,
    /// Block explorer URL for the transaction hash, when resolvable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
}

/// Result of a settled admin decision.
#[derive(Debug, Serialize, ToSchema)]
pub struct DecisionResponse {
    /// The request in its terminal state.
    pub request: RequestRecord,
    /// Owner's balance after settlement, when it changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_balance: Option<Decimal>,
}

/// One request kind's panel on the dashboard.
#[derive(Debug, Serialize, ToSchema)]
pub struct KindPanel {
    /// Display-ready rows, newest first.
    pub rows: Vec<RequestRow>,
    /// Aggregates over the collection.
    pub stats: Aggregates,
}

/// Full dashboard payload: every collection joined and aggregated from
/// one snapshot.
#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardResponse {
    /// Investment requests.
    pub investments: KindPanel,
    /// Deposit requests.
    pub deposits: KindPanel,
    /// Withdrawal requests.
    pub withdrawals: KindPanel,
    /// Loan requests.
    pub loans: KindPanel,
    /// KYC submissions.
    pub kyc: KindPanel,
    /// All users.
    pub users: Vec<User>,
}
