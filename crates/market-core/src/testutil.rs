//! Shared fixtures for service tests.

use crate::builder::{MarketBuilder, MarketServices};
use crate::lifecycle::NewOrder;
use crate::responses::NewResponse;
use market_config::Config;
use market_types::{Actor, Order, OrderResponse, Role};

/// Builds a memory-backed service stack with default collaborators.
pub(crate) fn services() -> MarketServices {
	MarketBuilder::new(Config::default())
		.build()
		.expect("default stack must build")
}

pub(crate) fn client() -> Actor {
	Actor::new("client-1", Role::Client)
}

pub(crate) fn executor() -> Actor {
	Actor::new("executor-1", Role::Executor)
}

pub(crate) fn other_executor() -> Actor {
	Actor::new("executor-2", Role::Executor)
}

pub(crate) fn admin() -> Actor {
	Actor::new("admin-1", Role::Admin)
}

/// Posts a public order with a 50..150 budget.
pub(crate) async fn post_order(services: &MarketServices) -> Order {
	services
		.lifecycle
		.create_order(
			&client(),
			NewOrder {
				title: "Build a landing page".into(),
				description: "Single page, responsive".into(),
				budget_min: 50,
				budget_max: 150,
				deadline: None,
				is_public: true,
			},
		)
		.await
		.expect("order creation must succeed")
}

/// Responds to an order as the given executor.
pub(crate) async fn respond(
	services: &MarketServices,
	executor: &Actor,
	order_id: &str,
	price: u64,
) -> OrderResponse {
	services
		.responses
		.create_response(
			executor,
			order_id,
			NewResponse {
				cover_letter: "I can build this".into(),
				proposed_price: Some(price),
				proposed_days: Some(7),
			},
		)
		.await
		.expect("response creation must succeed")
}

/// Posts an order, files one response, and selects it: the order ends up
/// InProgress with `executor()` assigned.
pub(crate) async fn start_order(services: &MarketServices) -> Order {
	let order = post_order(services).await;
	let response = respond(services, &executor(), &order.id, 100).await;
	services
		.lifecycle
		.select_executor(&client(), &order.id, &response.id)
		.await
		.expect("selection must succeed")
}
