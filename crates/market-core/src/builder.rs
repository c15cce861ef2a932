//! Builder wiring configuration into a running service stack.
//!
//! The builder is the composition root: it turns a validated `Config`
//! into the storage backend, collaborator defaults, and the four services
//! sharing one lock registry and one event bus. Transports embed the
//! resulting `MarketServices` and expose whatever surface they like.

use crate::dispute::DisputeService;
use crate::event_bus::EventBus;
use crate::lifecycle::LifecycleEngine;
use crate::locks::LockRegistry;
use crate::rating::ReviewService;
use crate::responses::ResponseRegistry;
use market_config::{Config, ConfigError, StorageBackend};
use market_dispatch::{
	implementations::log::LogNotifier, ChatInterface, InMemoryChat, NotificationInterface,
	NotificationService, OpenGate, SubscriptionGate,
};
use market_storage::{
	implementations::{file::FileStorage, memory::MemoryStorage},
	StorageInterface, StorageService,
};
use std::sync::Arc;

/// The assembled service stack.
pub struct MarketServices {
	/// The order lifecycle engine.
	pub lifecycle: Arc<LifecycleEngine>,
	/// The response registry.
	pub responses: Arc<ResponseRegistry>,
	/// The dispute sub-flow.
	pub disputes: Arc<DisputeService>,
	/// Review submission and rating aggregation.
	pub reviews: Arc<ReviewService>,
	/// The shared event bus.
	pub event_bus: EventBus,
}

/// Builds a `MarketServices` stack from configuration, with optional
/// collaborator overrides.
pub struct MarketBuilder {
	config: Config,
	storage: Option<Box<dyn StorageInterface>>,
	chat: Option<Arc<dyn ChatInterface>>,
	channel: Option<Box<dyn NotificationInterface>>,
	gate: Option<Arc<dyn SubscriptionGate>>,
}

impl MarketBuilder {
	/// Creates a builder over the given configuration.
	pub fn new(config: Config) -> Self {
		Self {
			config,
			storage: None,
			chat: None,
			channel: None,
			gate: None,
		}
	}

	/// Overrides the storage backend, ignoring the configured one.
	pub fn with_storage(mut self, storage: Box<dyn StorageInterface>) -> Self {
		self.storage = Some(storage);
		self
	}

	/// Overrides the chat collaborator.
	pub fn with_chat(mut self, chat: Arc<dyn ChatInterface>) -> Self {
		self.chat = Some(chat);
		self
	}

	/// Overrides the notification channel.
	pub fn with_notification_channel(mut self, channel: Box<dyn NotificationInterface>) -> Self {
		self.channel = Some(channel);
		self
	}

	/// Overrides the subscription gate.
	pub fn with_subscription_gate(mut self, gate: Arc<dyn SubscriptionGate>) -> Self {
		self.gate = Some(gate);
		self
	}

	/// Validates the configuration and assembles the service stack.
	pub fn build(self) -> Result<MarketServices, ConfigError> {
		self.config.validate()?;

		let backend: Box<dyn StorageInterface> = match self.storage {
			Some(backend) => backend,
			None => match self.config.storage.backend {
				StorageBackend::Memory => Box::new(MemoryStorage::new()),
				StorageBackend::File => {
					let path = self.config.storage.path.clone().ok_or_else(|| {
						ConfigError::Validation(
							"storage.path is required for the file backend".into(),
						)
					})?;
					Box::new(FileStorage::new(path))
				}
			},
		};
		let storage = Arc::new(StorageService::new(backend));

		let locks = Arc::new(LockRegistry::new());
		let profile_locks = Arc::new(LockRegistry::new());
		let event_bus = EventBus::default();
		let notifier = Arc::new(NotificationService::new(
			self.channel
				.unwrap_or_else(|| Box::new(LogNotifier::new())),
		));
		let chat: Arc<dyn ChatInterface> =
			self.chat.unwrap_or_else(|| Arc::new(InMemoryChat::new()));
		let gate: Arc<dyn SubscriptionGate> = self.gate.unwrap_or_else(|| Arc::new(OpenGate));

		let lifecycle = Arc::new(LifecycleEngine::new(
			storage.clone(),
			locks.clone(),
			profile_locks.clone(),
			chat.clone(),
			notifier.clone(),
			event_bus.clone(),
		));
		let responses = Arc::new(ResponseRegistry::new(
			storage.clone(),
			locks.clone(),
			gate,
			event_bus.clone(),
		));
		let disputes = Arc::new(DisputeService::new(
			storage.clone(),
			locks.clone(),
			lifecycle.clone(),
			chat,
			notifier,
			event_bus.clone(),
			self.config.dispute.min_reason_length,
		));
		let reviews = Arc::new(ReviewService::new(storage, locks, profile_locks, event_bus.clone()));

		Ok(MarketServices {
			lifecycle,
			responses,
			disputes,
			reviews,
			event_bus,
		})
	}
}
