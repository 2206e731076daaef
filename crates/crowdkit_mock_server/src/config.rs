//! Backend configuration.

/// Configuration for the mock backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Page size when a search names no `limit`.
    pub default_limit: u32,
    /// Largest accepted `limit`.
    pub max_limit: u32,
    /// Largest accepted batch.
    pub max_batch_size: usize,
    /// Number of operation reads answered `RUNNING` before the final status.
    pub running_polls: u32,
}

impl BackendConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self {
            default_limit: 50,
            max_limit: 100_000,
            max_batch_size: 100_000,
            running_polls: 0,
        }
    }

    /// Sets the default page size.
    pub fn with_default_limit(mut self, limit: u32) -> Self {
        self.default_limit = limit;
        self
    }

    /// Sets the largest accepted page size.
    pub fn with_max_limit(mut self, limit: u32) -> Self {
        self.max_limit = limit;
        self
    }

    /// Sets the largest accepted batch.
    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size;
        self
    }

    /// Sets how many reads an operation stays `RUNNING`.
    pub fn with_running_polls(mut self, polls: u32) -> Self {
        self.running_polls = polls;
        self
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::new()
    }
}
