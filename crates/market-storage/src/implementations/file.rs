//! File-based storage backend implementation.
//!
//! This module provides a concrete implementation of the StorageInterface
//! trait that persists each record as a JSON file under a configured
//! directory. Writes go through a temporary file and an atomic rename so a
//! crash never leaves a half-written record behind.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

/// File-based storage implementation.
///
/// Each key maps to one file inside the storage directory. Namespace
/// separators in keys are flattened into the file name.
pub struct FileStorage {
	/// Directory where all records are stored.
	storage_path: PathBuf,
}

impl FileStorage {
	/// Creates a new FileStorage rooted at the given directory.
	///
	/// The directory is created on first write if it does not exist.
	pub fn new(storage_path: impl AsRef<Path>) -> Self {
		Self {
			storage_path: storage_path.as_ref().to_path_buf(),
		}
	}

	/// Maps a storage key to its file path.
	fn file_path(&self, key: &str) -> PathBuf {
		let safe_key = key.replace(['/', ':'], "_");
		self.storage_path.join(safe_key)
	}

	/// Ensures the storage directory exists.
	async fn ensure_dir(&self) -> Result<(), StorageError> {
		fs::create_dir_all(&self.storage_path)
			.await
			.map_err(|e| StorageError::Backend(format!("Failed to create storage dir: {}", e)))
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let path = self.file_path(key);
		match fs::read(&path).await {
			Ok(bytes) => Ok(bytes),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		self.ensure_dir().await?;
		let path = self.file_path(key);

		// Write to a temp file first, then rename into place.
		let tmp_path = path.with_extension("tmp");
		fs::write(&tmp_path, &value)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		fs::rename(&tmp_path, &path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let path = self.file_path(key);
		match fs::remove_file(&path).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let path = self.file_path(key);
		match fs::try_exists(&path).await {
			Ok(exists) => Ok(exists),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}
}
