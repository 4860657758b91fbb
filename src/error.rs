//! Error types surfaced by the index and the cache

use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by the result cache
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("cache has been disposed")]
    Disposed,
    #[error("cache key must not be empty")]
    InvalidKey,
}

/// Errors returned by index builds and queries
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Index not built yet. Run a build before querying.")]
    NotIndexed,

    #[error("Source repository unavailable at {}: {reason}", root.display())]
    RepositoryUnavailable { root: PathBuf, reason: String },

    #[error("Unknown component '{name}'. Use the component listing to see available names.")]
    UnknownComponent { name: String },

    #[error("Unknown category '{name}'. Use the category listing to see available categories.")]
    UnknownCategory { name: String },

    #[error("Invalid argument '{argument}': {reason}")]
    InvalidArgument { argument: &'static str, reason: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("A build is already in progress")]
    BuildInProgress,

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IndexError {
    pub(crate) fn invalid(argument: &'static str, reason: impl Into<String>) -> Self {
        IndexError::InvalidArgument {
            argument,
            reason: reason.into(),
        }
    }
}

pub type IndexResult<T> = std::result::Result<T, IndexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_component_suggests_listing() {
        let err = IndexError::UnknownComponent {
            name: "MudFoo".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("MudFoo"));
        assert!(message.contains("listing"));
    }

    #[test]
    fn test_cache_error_converts() {
        let err: IndexError = CacheError::Disposed.into();
        assert!(matches!(err, IndexError::Cache(CacheError::Disposed)));
    }
}
