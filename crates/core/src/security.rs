//! ZIP hardening applied while reading a container: path traversal guards,
//! entry count, per-entry size and compression ratio limits.

use serde::{Deserialize, Serialize};
use std::path::{Component, Path};

use crate::error::SecurityError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityLimits {
    /// Maximum decompression ratio before flagging as ZIP bomb.
    pub max_compression_ratio: u64,
    /// Maximum number of entries allowed in a container.
    pub max_file_count: u64,
    /// Maximum uncompressed size of a single entry in bytes.
    pub max_entry_size_bytes: u64,
}

impl Default for SecurityLimits {
    fn default() -> Self {
        Self {
            max_compression_ratio: 100,
            max_file_count: 10_000,
            max_entry_size_bytes: 200 * 1024 * 1024, // 200 MB
        }
    }
}

/// Reject entry paths that are absolute or climb out of the container root.
pub fn check_path_traversal(entry_path: &str) -> Result<(), SecurityError> {
    let traversal = || SecurityError::PathTraversal {
        path: entry_path.to_string(),
    };

    if entry_path.starts_with('/') || entry_path.starts_with('\\') {
        return Err(traversal());
    }

    // C:\ and friends
    if entry_path.len() >= 2 && entry_path.as_bytes()[1] == b':' {
        return Err(traversal());
    }

    if Path::new(entry_path)
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(traversal());
    }

    Ok(())
}

pub fn check_compression_ratio(
    compressed_size: u64,
    uncompressed_size: u64,
    limits: &SecurityLimits,
) -> Result<(), SecurityError> {
    if compressed_size == 0 {
        if uncompressed_size > 0 {
            return Err(SecurityError::ZipBomb {
                ratio: u64::MAX,
                limit: limits.max_compression_ratio,
            });
        }
        return Ok(());
    }

    let ratio = uncompressed_size / compressed_size;
    if ratio > limits.max_compression_ratio {
        return Err(SecurityError::ZipBomb {
            ratio,
            limit: limits.max_compression_ratio,
        });
    }

    Ok(())
}

pub fn check_file_count(count: u64, limits: &SecurityLimits) -> Result<(), SecurityError> {
    if count > limits.max_file_count {
        return Err(SecurityError::TooManyFiles {
            count,
            limit: limits.max_file_count,
        });
    }
    Ok(())
}

pub fn check_entry_size(
    name: &str,
    size_bytes: u64,
    limits: &SecurityLimits,
) -> Result<(), SecurityError> {
    if size_bytes > limits.max_entry_size_bytes {
        return Err(SecurityError::OversizedEntry {
            name: name.to_string(),
            size_mb: size_bytes / (1024 * 1024),
            limit_mb: limits.max_entry_size_bytes / (1024 * 1024),
        });
    }
    Ok(())
}
