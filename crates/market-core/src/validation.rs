//! Centralized input validation.
//!
//! Malformed input is rejected here before any state is touched, so every
//! operation performs a single validation pass up front instead of
//! scattering checks across request handling.

use market_types::MarketError;

/// Validates an order's budget range: both bounds positive, min <= max.
pub fn validate_budget(budget_min: u64, budget_max: u64) -> Result<(), MarketError> {
	if budget_min == 0 || budget_max == 0 {
		return Err(MarketError::Validation(
			"Budget bounds must be positive".into(),
		));
	}
	if budget_min > budget_max {
		return Err(MarketError::Validation(
			"Budget minimum cannot exceed maximum".into(),
		));
	}
	Ok(())
}

/// Validates a non-empty title or cover letter.
pub fn validate_text(field: &str, value: &str) -> Result<(), MarketError> {
	if value.trim().is_empty() {
		return Err(MarketError::Validation(format!("{} must not be empty", field)));
	}
	Ok(())
}

/// Validates an optional proposed price: positive when present.
pub fn validate_price(price: Option<u64>) -> Result<(), MarketError> {
	if price == Some(0) {
		return Err(MarketError::Validation("Price must be positive".into()));
	}
	Ok(())
}

/// Validates a dispute reason against the configured minimum length.
///
/// Length is counted in characters, not bytes.
pub fn validate_reason(reason: &str, min_length: usize) -> Result<(), MarketError> {
	if reason.trim().chars().count() < min_length {
		return Err(MarketError::Validation(format!(
			"Dispute reason must be at least {} characters",
			min_length
		)));
	}
	Ok(())
}

/// Validates evidence fields: both file reference and description are
/// required.
pub fn validate_evidence(file_ref: &str, description: &str) -> Result<(), MarketError> {
	if file_ref.trim().is_empty() {
		return Err(MarketError::Validation(
			"Evidence file reference is required".into(),
		));
	}
	if description.trim().is_empty() {
		return Err(MarketError::Validation(
			"Evidence description is required".into(),
		));
	}
	Ok(())
}

/// Validates a review rating: 1 to 5 inclusive.
pub fn validate_rating(rating: u8) -> Result<(), MarketError> {
	if !(1..=5).contains(&rating) {
		return Err(MarketError::Validation(
			"Rating must be between 1 and 5".into(),
		));
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn budget_bounds() {
		assert!(validate_budget(50, 150).is_ok());
		assert!(validate_budget(100, 100).is_ok());
		assert!(validate_budget(0, 100).is_err());
		assert!(validate_budget(100, 0).is_err());
		assert!(validate_budget(200, 100).is_err());
	}

	#[test]
	fn reason_length_counts_characters() {
		assert!(validate_reason("work quality is unacceptable", 10).is_ok());
		assert!(validate_reason("too short", 10).is_err());
		// Trailing whitespace does not count toward the minimum.
		assert!(validate_reason("short     ", 10).is_err());
	}

	#[test]
	fn rating_range() {
		assert!(validate_rating(1).is_ok());
		assert!(validate_rating(5).is_ok());
		assert!(validate_rating(0).is_err());
		assert!(validate_rating(6).is_err());
	}

	#[test]
	fn evidence_requires_both_fields() {
		assert!(validate_evidence("s3://bucket/file", "screenshot of chat").is_ok());
		assert!(validate_evidence("", "screenshot").is_err());
		assert!(validate_evidence("s3://bucket/file", "  ").is_err());
	}

	#[test]
	fn prices_must_be_positive_when_present() {
		assert!(validate_price(None).is_ok());
		assert!(validate_price(Some(100)).is_ok());
		assert!(validate_price(Some(0)).is_err());
	}
}
