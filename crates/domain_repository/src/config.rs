//! Repository configuration

use std::time::Duration;

use serde::Deserialize;

use core_kernel::CoreError;

use crate::memory::DEFAULT_MAX_BATCH_OPERATIONS;

/// Tunables shared by all repositories built from one configuration
///
/// # Example
///
/// ```rust
/// use domain_repository::RepositoryConfig;
/// use std::time::Duration;
///
/// let config = RepositoryConfig::new()
///     .max_batch_operations(50)
///     .query_page_size(200)
///     .operation_timeout(Duration::from_secs(5));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Largest batch `create_many` / `update_many` will submit
    pub max_batch_operations: usize,
    /// Documents requested per query page
    pub query_page_size: usize,
    /// Deadline for a single store call, none by default
    pub operation_timeout_ms: Option<u64>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            max_batch_operations: DEFAULT_MAX_BATCH_OPERATIONS,
            query_page_size: 100,
            operation_timeout_ms: None,
        }
    }
}

impl RepositoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from `DOCREPO_*` environment variables
    ///
    /// * `DOCREPO_MAX_BATCH_OPERATIONS` - batch operation limit (default: 100)
    /// * `DOCREPO_QUERY_PAGE_SIZE` - documents per query page (default: 100)
    /// * `DOCREPO_OPERATION_TIMEOUT_MS` - per-call deadline (default: none)
    pub fn from_env() -> Result<Self, CoreError> {
        let config: Self = config::Config::builder()
            .add_source(config::Environment::with_prefix("DOCREPO").try_parsing(true))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| CoreError::configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn max_batch_operations(mut self, max: usize) -> Self {
        self.max_batch_operations = max;
        self
    }

    pub fn query_page_size(mut self, size: usize) -> Self {
        self.query_page_size = size;
        self
    }

    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.operation_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.max_batch_operations == 0 {
            return Err(CoreError::configuration("max_batch_operations must be positive"));
        }
        if self.query_page_size == 0 {
            return Err(CoreError::configuration("query_page_size must be positive"));
        }
        if self.operation_timeout_ms == Some(0) {
            return Err(CoreError::configuration("operation_timeout_ms must be positive"));
        }
        Ok(())
    }
}
