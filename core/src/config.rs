//! Client configuration read from the environment.

use std::path::PathBuf;
use std::sync::Arc;

use crate::client::EnvelopeClient;
use crate::credentials::{CredentialStore, FileStorage, MemoryStorage};
use crate::executor::Executor;
use crate::transport::UreqTransport;

/// Origin requests are resolved against. Empty keeps URLs relative.
pub const ENV_BASE_URL: &str = "API_BASE_URL";
/// File backing the credential store. Unset keeps the token in memory.
pub const ENV_STORAGE_PATH: &str = "API_STORAGE_PATH";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub storage_path: Option<PathBuf>,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            storage_path: None,
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            base_url: lookup(ENV_BASE_URL).unwrap_or_default(),
            storage_path: lookup(ENV_STORAGE_PATH)
                .filter(|path| !path.trim().is_empty())
                .map(PathBuf::from),
        }
    }

    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = Some(path.into());
        self
    }

    pub fn credential_store(&self) -> CredentialStore {
        match &self.storage_path {
            Some(path) => CredentialStore::new(Arc::new(FileStorage::new(path))),
            None => CredentialStore::new(Arc::new(MemoryStorage::new())),
        }
    }

    /// Executor over the blocking `ureq` transport.
    pub fn executor(&self) -> Executor<UreqTransport> {
        Executor::new(
            EnvelopeClient::new(&self.base_url),
            self.credential_store(),
            UreqTransport::new(),
        )
    }
}
