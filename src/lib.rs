//! # ledger-console
//!
//! Administrative console backend for a financial platform: an
//! approval/settlement workflow engine over investments, deposits,
//! withdrawals, loans, and KYC submissions, with user fund management
//! and realtime change feeds.
//!
//! The record store is the sole source of truth. Every settlement runs
//! as a compensated saga behind a conditional status transition, so a
//! request settles exactly once no matter how many admins click.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler (ws/)
//!     │
//!     ├── ApprovalService + LedgerService (service/)
//!     ├── NotificationDispatcher (notify/)
//!     ├── Projections (projection/)
//!     ├── EventBus (domain/)
//!     │
//!     └── RecordStore (store/) — PostgreSQL or in-memory
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod links;
pub mod notify;
pub mod projection;
pub mod service;
pub mod store;
pub mod ws;
