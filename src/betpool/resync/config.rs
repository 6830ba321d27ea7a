use crate::betpool::resync::error::{Result, ResyncError};

/// Number of records sent per upsert call.
pub const DEFAULT_BATCH_SIZE: usize = 100;
/// Config-sheet key whose value carries the identity records.
pub const DEFAULT_USERS_KEY: &str = "users_json";

/// Tunables for a single resync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResyncOptions {
    pub batch_size: usize,
    pub users_key: String,
}

impl Default for ResyncOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            users_key: DEFAULT_USERS_KEY.to_string(),
        }
    }
}

impl ResyncOptions {
    /// Returns a copy with the given batch size, rejecting zero.
    pub fn with_batch_size(mut self, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(ResyncError::InvalidConfig(
                "batch size must be at least 1".to_string(),
            ));
        }
        self.batch_size = batch_size;
        Ok(self)
    }
}

/// Location and credentials of the REST backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSettings {
    pub base_url: String,
    pub api_key: String,
}
