//! Domain layer: entity types, settlement state machine, and event system.
//!
//! This module contains the console's domain model: user and request
//! records with their status enums, in-app notifications, typed entity
//! identifiers, and the broadcast bus that carries realtime re-fetch
//! signals to subscribers.

pub mod event;
pub mod event_bus;
pub mod ids;
pub mod notification;
pub mod request;
pub mod user;

pub use event::{ChangeEvent, EntityKind};
pub use event_bus::EventBus;
pub use ids::{RequestId, UserId};
pub use notification::{Notification, Severity};
pub use request::{Decision, RequestDetails, RequestKind, RequestRecord, RequestStatus};
pub use user::{AuthStatus, Role, User};
