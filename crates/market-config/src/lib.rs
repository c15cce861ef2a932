//! Configuration module for the marketplace lifecycle core.
//!
//! This module provides structures and utilities for managing the core's
//! configuration. It supports loading configuration from TOML files and
//! provides validation to ensure all required configuration values are
//! properly set.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		let message = err.message().to_string();
		ConfigError::Parse(message)
	}
}

/// Main configuration structure for the lifecycle core.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Configuration for the storage backend.
	pub storage: StorageConfig,
	/// Configuration for the dispute sub-flow.
	#[serde(default)]
	pub dispute: DisputeConfig,
}

/// Which storage backend to run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
	/// In-memory storage, no persistence. Development and tests.
	Memory,
	/// File-backed storage under `storage.path`.
	File,
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub backend: StorageBackend,
	/// Directory for the file backend. Required when backend = "file".
	#[serde(default)]
	pub path: Option<PathBuf>,
}

/// Configuration for the dispute sub-flow.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DisputeConfig {
	/// Minimum length of a dispute reason, in characters.
	#[serde(default = "default_min_reason_length")]
	pub min_reason_length: usize,
}

impl Default for DisputeConfig {
	fn default() -> Self {
		Self {
			min_reason_length: default_min_reason_length(),
		}
	}
}

/// Returns the default minimum dispute-reason length.
fn default_min_reason_length() -> usize {
	10
}

impl Config {
	/// Loads configuration from a TOML file.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let content = std::fs::read_to_string(path)?;
		content.parse()
	}

	/// Validates cross-field constraints after parsing.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.storage.backend == StorageBackend::File && self.storage.path.is_none() {
			return Err(ConfigError::Validation(
				"storage.path is required when storage.backend = \"file\"".into(),
			));
		}
		if self.dispute.min_reason_length == 0 {
			return Err(ConfigError::Validation(
				"dispute.min_reason_length must be at least 1".into(),
			));
		}
		Ok(())
	}
}

impl Default for Config {
	fn default() -> Self {
		Self {
			storage: StorageConfig {
				backend: StorageBackend::Memory,
				path: None,
			},
			dispute: DisputeConfig::default(),
		}
	}
}

impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let config: Config = toml::from_str(s)?;
		config.validate()?;
		Ok(config)
	}
}
