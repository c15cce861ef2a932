//! Storage-related types for the marketplace lifecycle core.

use std::str::FromStr;

/// Storage keys for different data collections.
///
/// This enum provides type safety for storage operations by replacing
/// string literals with strongly typed variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Key for storing order data
	Orders,
	/// Key for storing response data
	Responses,
	/// Key for the per-order list of response ids
	OrderResponses,
	/// Key for mapping (order, executor) pairs to a response id
	ResponseByPair,
	/// Key for storing dispute data, keyed by order id
	Disputes,
	/// Key for storing review data, keyed by order id
	Reviews,
	/// Key for the per-executor list of reviewed order ids
	ExecutorReviews,
	/// Key for storing executor reputation profiles
	Executors,
}

impl StorageKey {
	/// Returns the string representation of the storage key.
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Orders => "orders",
			StorageKey::Responses => "responses",
			StorageKey::OrderResponses => "order_responses",
			StorageKey::ResponseByPair => "response_by_pair",
			StorageKey::Disputes => "disputes",
			StorageKey::Reviews => "reviews",
			StorageKey::ExecutorReviews => "executor_reviews",
			StorageKey::Executors => "executors",
		}
	}

	/// Returns an iterator over all StorageKey variants.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Orders,
			Self::Responses,
			Self::OrderResponses,
			Self::ResponseByPair,
			Self::Disputes,
			Self::Reviews,
			Self::ExecutorReviews,
			Self::Executors,
		]
		.into_iter()
	}
}

impl FromStr for StorageKey {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"orders" => Ok(Self::Orders),
			"responses" => Ok(Self::Responses),
			"order_responses" => Ok(Self::OrderResponses),
			"response_by_pair" => Ok(Self::ResponseByPair),
			"disputes" => Ok(Self::Disputes),
			"reviews" => Ok(Self::Reviews),
			"executor_reviews" => Ok(Self::ExecutorReviews),
			"executors" => Ok(Self::Executors),
			_ => Err(()),
		}
	}
}

impl From<StorageKey> for &'static str {
	fn from(key: StorageKey) -> Self {
		key.as_str()
	}
}
