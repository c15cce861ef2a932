//! Event bus for inter-service communication.
//!
//! Wraps a tokio broadcast channel carrying `MarketEvent`s. Transitions
//! publish after committing; observers subscribe for projections,
//! websocket fan-out, or test assertions. Publishing never fails a
//! transition: an empty subscriber set is normal.

use market_types::MarketEvent;
use tokio::sync::broadcast;

/// Broadcast bus for lifecycle events.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<MarketEvent>,
}

impl EventBus {
	/// Creates a new event bus with the given channel capacity.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Publishes an event to all current subscribers.
	///
	/// Returns an error only when there are no subscribers; callers
	/// ignore the result.
	pub fn publish(&self, event: MarketEvent) -> Result<(), Box<MarketEvent>> {
		self.sender
			.send(event)
			.map(|_| ())
			.map_err(|e| Box::new(e.0))
	}

	/// Subscribes to all future events.
	pub fn subscribe(&self) -> broadcast::Receiver<MarketEvent> {
		self.sender.subscribe()
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new(256)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use market_types::OrderEvent;

	#[tokio::test]
	async fn test_subscribers_receive_published_events() {
		let bus = EventBus::new(8);
		let mut rx = bus.subscribe();

		bus.publish(MarketEvent::Order(OrderEvent::Created {
			order_id: "o1".into(),
		}))
		.unwrap();

		match rx.recv().await.unwrap() {
			MarketEvent::Order(OrderEvent::Created { order_id }) => assert_eq!(order_id, "o1"),
			other => panic!("unexpected event: {other:?}"),
		}
	}

	#[tokio::test]
	async fn test_publish_without_subscribers_is_harmless() {
		let bus = EventBus::new(8);
		let result = bus.publish(MarketEvent::Order(OrderEvent::Created {
			order_id: "o1".into(),
		}));
		// No subscribers: the send fails, and callers ignore it.
		assert!(result.is_err());
	}
}
