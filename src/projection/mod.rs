//! Display projections: joins and aggregates over store snapshots.
//!
//! Everything here is a pure function of the collections passed in.
//! Consumers recompute from a fresh snapshot after every mutation or
//! change event, so applying the same state twice is harmless.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{RequestRecord, RequestStatus, User, UserId};

/// Display name used when a request's owning user is missing.
const UNKNOWN_USER: &str = "Unknown User";

/// A request denormalized with its owner's display fields.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RequestRow {
    /// The underlying request record.
    #[serde(flatten)]
    pub record: RequestRecord,
    /// Owner's display name, `"Unknown User"` when the user is gone.
    pub user_name: String,
    /// Owner's email, empty when the user is gone.
    pub user_email: String,
}

/// Joins request records with their owning users.
///
/// A missing owner never drops the row: deleted users leave their
/// requests visible with fallback display fields.
#[must_use]
pub fn join_requests(requests: &[RequestRecord], users: &[User]) -> Vec<RequestRow> {
    let by_id: HashMap<UserId, &User> = users.iter().map(|u| (u.id, u)).collect();
    requests
        .iter()
        .map(|record| match by_id.get(&record.user_id) {
            Some(user) => RequestRow {
                record: record.clone(),
                user_name: user.name.clone(),
                user_email: user.email.clone(),
            },
            None => RequestRow {
                record: record.clone(),
                user_name: UNKNOWN_USER.to_string(),
                user_email: String::new(),
            },
        })
        .collect()
}

/// Aggregate statistics over one request collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct Aggregates {
    /// Sum of amounts over every request, regardless of status.
    pub total: Decimal,
    /// Number of pending requests.
    pub pending: usize,
    /// Number of approved requests.
    pub approved: usize,
    /// Number of rejected requests.
    pub rejected: usize,
}

impl Aggregates {
    /// Recomputes the aggregates from the current collection.
    #[must_use]
    pub fn compute(requests: &[RequestRecord]) -> Self {
        let mut aggregates = Self::default();
        for record in requests {
            aggregates.total += record.amount;
            match record.status {
                RequestStatus::Pending => aggregates.pending += 1,
                RequestStatus::Approved => aggregates.approved += 1,
                RequestStatus::Rejected => aggregates.rejected += 1,
            }
        }
        aggregates
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::RequestDetails;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn investment(user_id: UserId, amount: Decimal, status: RequestStatus) -> RequestRecord {
        let mut record = RequestRecord::new(
            user_id,
            amount,
            RequestDetails::Investment {
                plan: "gold".to_string(),
            },
        );
        record.status = status;
        if status.is_terminal() {
            record.decided_at = Some(Utc::now());
        }
        record
    }

    #[test]
    fn join_uses_owner_display_fields() {
        let user = User::new("Ada", "ada@example.com");
        let requests = vec![investment(user.id, dec!(100), RequestStatus::Pending)];
        let rows = join_requests(&requests, std::slice::from_ref(&user));
        let Some(row) = rows.first() else {
            panic!("row missing");
        };
        assert_eq!(row.user_name, "Ada");
        assert_eq!(row.user_email, "ada@example.com");
    }

    #[test]
    fn join_falls_back_for_missing_user() {
        let requests = vec![investment(UserId::new(), dec!(100), RequestStatus::Pending)];
        let rows = join_requests(&requests, &[]);
        let Some(row) = rows.first() else {
            panic!("row missing");
        };
        assert_eq!(row.user_name, "Unknown User");
        assert_eq!(row.user_email, "");
    }

    #[test]
    fn aggregates_total_covers_every_status() {
        let user = UserId::new();
        let requests = vec![
            investment(user, dec!(100), RequestStatus::Approved),
            investment(user, dec!(200), RequestStatus::Pending),
            investment(user, dec!(50), RequestStatus::Approved),
        ];
        let aggregates = Aggregates::compute(&requests);
        assert_eq!(aggregates.total, dec!(350));
        assert_eq!(aggregates.pending, 1);
        assert_eq!(aggregates.approved, 2);
        assert_eq!(aggregates.rejected, 0);
    }

    #[test]
    fn aggregates_are_stable_under_recompute() {
        let user = UserId::new();
        let requests = vec![
            investment(user, dec!(10), RequestStatus::Rejected),
            investment(user, dec!(20), RequestStatus::Approved),
        ];
        let first = Aggregates::compute(&requests);
        let second = Aggregates::compute(&requests);
        assert_eq!(first, second);
        assert_eq!(first.total, dec!(30));
        assert_eq!(first.rejected, 1);
    }

    #[test]
    fn empty_collection_yields_zero_aggregates() {
        assert_eq!(Aggregates::compute(&[]), Aggregates::default());
    }
}
