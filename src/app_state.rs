//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::ConsoleConfig;
use crate::domain::EventBus;
use crate::service::{ApprovalService, LedgerService};
use crate::store::RecordStore;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Approval workflow engine for decision endpoints.
    pub approvals: ApprovalService,
    /// Ledger mutator for fund adjustment endpoints.
    pub ledger: LedgerService,
    /// Source of truth for all read endpoints.
    pub store: Arc<dyn RecordStore>,
    /// Event bus for WebSocket subscriptions.
    pub event_bus: EventBus,
    /// Runtime configuration (admin tokens, link bases, timeouts).
    pub config: Arc<ConsoleConfig>,
}
