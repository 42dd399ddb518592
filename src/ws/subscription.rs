//! Per-connection subscription manager.
//!
//! Tracks which entity-kind channels a WebSocket client is subscribed
//! to and provides server-side event filtering.

use std::collections::HashSet;

use crate::domain::EntityKind;

/// Manages the channel subscriptions for a single WebSocket connection.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    /// Subscribed channels. If `subscribe_all` is true, this set is ignored.
    kinds: HashSet<EntityKind>,
    /// Whether the client subscribes to all channels (wildcard `"*"`).
    subscribe_all: bool,
}

impl SubscriptionManager {
    /// Creates a new empty subscription manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds channels to the subscription set. `"*"` enables the wildcard.
    pub fn subscribe(&mut self, kinds: &[EntityKind], wildcard: bool) {
        if wildcard {
            self.subscribe_all = true;
        }
        for kind in kinds {
            self.kinds.insert(*kind);
        }
    }

    /// Removes channels from the subscription set.
    pub fn unsubscribe(&mut self, kinds: &[EntityKind]) {
        for kind in kinds {
            self.kinds.remove(kind);
        }
    }

    /// Returns `true` if the given channel matches the subscription filter.
    #[must_use]
    pub fn matches(&self, kind: EntityKind) -> bool {
        self.subscribe_all || self.kinds.contains(&kind)
    }

    /// Returns the number of explicitly subscribed channels.
    #[must_use]
    pub fn count(&self) -> usize {
        self.kinds.len()
    }

    /// Returns `true` if the wildcard subscription is active.
    #[must_use]
    pub fn is_subscribed_all(&self) -> bool {
        self.subscribe_all
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn empty_matches_nothing() {
        let mgr = SubscriptionManager::new();
        assert!(!mgr.matches(EntityKind::Deposits));
    }

    #[test]
    fn subscribe_specific_channel() {
        let mut mgr = SubscriptionManager::new();
        mgr.subscribe(&[EntityKind::Deposits], false);
        assert!(mgr.matches(EntityKind::Deposits));
        assert!(!mgr.matches(EntityKind::Withdrawals));
    }

    #[test]
    fn wildcard_matches_everything() {
        let mut mgr = SubscriptionManager::new();
        mgr.subscribe(&[], true);
        assert!(mgr.matches(EntityKind::Users));
        assert!(mgr.matches(EntityKind::Notifications));
    }

    #[test]
    fn unsubscribe_removes_channel() {
        let mut mgr = SubscriptionManager::new();
        mgr.subscribe(&[EntityKind::Kyc], false);
        assert!(mgr.matches(EntityKind::Kyc));
        mgr.unsubscribe(&[EntityKind::Kyc]);
        assert!(!mgr.matches(EntityKind::Kyc));
    }

    #[test]
    fn count_tracks_explicit() {
        let mut mgr = SubscriptionManager::new();
        assert_eq!(mgr.count(), 0);
        mgr.subscribe(&[EntityKind::Loans, EntityKind::Users], false);
        assert_eq!(mgr.count(), 2);
    }
}
