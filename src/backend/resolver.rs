use std::sync::Arc;

use super::{BackendFactory, StoryBackend};
use crate::error::CredentialError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientScope {
    /// Built for one request from a caller supplied key, dropped afterwards.
    Request,
    /// The operator's shared client, built once at startup.
    Process,
}

#[derive(Clone)]
pub struct ClientHandle {
    backend: Arc<dyn StoryBackend>,
    scope: ClientScope,
}

impl ClientHandle {
    pub fn backend(&self) -> &Arc<dyn StoryBackend> {
        &self.backend
    }

    pub fn scope(&self) -> ClientScope {
        self.scope
    }

    pub fn into_backend(self) -> Arc<dyn StoryBackend> {
        self.backend
    }
}

/// Picks the backend client for a request.
///
/// The default client is created once and never reconfigured; a caller supplied
/// key always gets its own client from the factory.
pub struct ClientResolver {
    factory: Arc<dyn BackendFactory>,
    default_client: Option<Arc<dyn StoryBackend>>,
}

impl ClientResolver {
    pub fn new(factory: Arc<dyn BackendFactory>, default_api_key: Option<&str>) -> Self {
        let default_client = default_api_key
            .filter(|key| !key.trim().is_empty())
            .map(|key| factory.create(key.trim()));

        if default_client.is_some() {
            log::info!("Default backend client initialized from operator credential");
        } else {
            log::warn!("No operator credential configured; requests must bring their own key");
        }

        Self {
            factory,
            default_client,
        }
    }

    pub fn has_default_client(&self) -> bool {
        self.default_client.is_some()
    }

    pub fn resolve(&self, api_key: Option<&str>) -> Result<ClientHandle, CredentialError> {
        if let Some(key) = api_key.map(str::trim).filter(|key| !key.is_empty()) {
            log::debug!("Using request scoped backend client");
            return Ok(ClientHandle {
                backend: self.factory.create(key),
                scope: ClientScope::Request,
            });
        }

        self.default_client
            .as_ref()
            .map(|backend| ClientHandle {
                backend: Arc::clone(backend),
                scope: ClientScope::Process,
            })
            .ok_or(CredentialError::NoCredentialAvailable)
    }
}
