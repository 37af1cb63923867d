//! Change notification for committed mutations.
//!
//! The store publishes the address of each resource it changed, after the
//! owning write has committed. A notification carries no payload beyond
//! the address; subscribers re-query to learn the new state, comparing
//! received addresses against the address their query result was tagged
//! with.

use tokio::sync::broadcast;

use metra_types::Address;

/// Sender half of the change channel.
pub type ChangeSender = broadcast::Sender<Address>;

/// Receiver half of the change channel.
pub type ChangeReceiver = broadcast::Receiver<Address>;

/// Broadcast bus for post-commit change notifications.
///
/// Sends never block: if a subscriber falls behind and the buffer fills,
/// the oldest addresses are dropped for that subscriber. No ordering is
/// guaranteed between notifications for different addresses.
#[derive(Debug, Clone)]
pub struct ChangeBus {
    sender: ChangeSender,
}

impl ChangeBus {
    /// Create a bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> ChangeReceiver {
        self.sender.subscribe()
    }

    /// Publish a change for the given address.
    pub fn publish(&self, address: Address) {
        // Ignore error if no receivers
        let _ = self.sender.send(address);
    }

    /// Number of active subscribers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get the sender for direct use.
    pub fn sender(&self) -> ChangeSender {
        self.sender.clone()
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscriber_receives_published_address() {
        let bus = ChangeBus::default();
        let mut rx = bus.subscribe();

        bus.publish(Address::Monitor(3));
        bus.publish(Address::MonitorReadings(3));

        assert_eq!(rx.try_recv().unwrap(), Address::Monitor(3));
        assert_eq!(rx.try_recv().unwrap(), Address::MonitorReadings(3));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_publish_without_subscribers_is_a_no_op() {
        let bus = ChangeBus::new(4);
        assert_eq!(bus.receiver_count(), 0);
        bus.publish(Address::Readings);
    }

    #[test]
    fn test_subscription_starts_at_subscribe_time() {
        let bus = ChangeBus::default();
        bus.publish(Address::Group(1));

        let mut rx = bus.subscribe();
        assert!(rx.try_recv().is_err());

        bus.publish(Address::Group(2));
        assert_eq!(rx.try_recv().unwrap(), Address::Group(2));
    }
}
