//! The backend's list of actions this device may trigger.

use crate::error::{ServiceError, ServiceResult};
use bot_storage::ActionCache;
use bot_transport::{BackendTransport, Endpoint};
use bot_types::ActionDefinition;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Whether an action may be triggered right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogVerdict {
    Allowed,
    NotFound,
    TooFrequent,
}

/// Fetches the action list and keeps a local copy for offline use.
pub struct ActionCatalog {
    transport: Arc<dyn BackendTransport>,
    cache: ActionCache,
}

impl ActionCatalog {
    pub fn new(transport: Arc<dyn BackendTransport>, cache: ActionCache) -> Self {
        Self { transport, cache }
    }

    /// Fetches the current list, falling back to the cached copy.
    ///
    /// Trigger times recorded locally survive a refresh.
    pub async fn fetch_actions(&self) -> ServiceResult<Vec<ActionDefinition>> {
        let fetched = match self.transport.get(Endpoint::Actions).await {
            Ok(response) => serde_json::from_str::<Vec<ActionDefinition>>(&response)
                .map_err(ServiceError::from),
            Err(e) => Err(e.into()),
        };

        match fetched {
            Ok(mut actions) => {
                let cached = self.cache.load().await.ok().flatten().unwrap_or_default();
                for action in &mut actions {
                    if action.last_triggered.is_none() {
                        action.last_triggered = cached
                            .iter()
                            .find(|c| c.action_id == action.action_id)
                            .and_then(|c| c.last_triggered);
                    }
                }
                if let Err(e) = self.cache.store(&actions).await {
                    warn!("Failed to cache actions: {e}");
                }
                info!(count = actions.len(), "Fetched actions from backend");
                Ok(actions)
            }
            Err(e) => {
                warn!("Could not retrieve actions from backend: {e}");
                match self.cache.load().await? {
                    Some(actions) => {
                        info!(count = actions.len(), "Using locally stored actions");
                        Ok(actions)
                    }
                    None => Err(e),
                }
            }
        }
    }

    /// Checks `action_id` against the list and its trigger frequency.
    pub async fn check(&self, action_id: &str, now: u64) -> ServiceResult<CatalogVerdict> {
        let actions = self.fetch_actions().await?;
        let Some(action) = actions.iter().find(|a| a.action_id == action_id) else {
            debug!(action_id, "Action not in catalog");
            return Ok(CatalogVerdict::NotFound);
        };
        if action.frequency.is_due(action.last_triggered, now) {
            Ok(CatalogVerdict::Allowed)
        } else {
            Ok(CatalogVerdict::TooFrequent)
        }
    }

    /// Remembers when `action_id` was last delivered.
    pub async fn record_trigger(&self, action_id: &str, now: u64) -> ServiceResult<()> {
        let Some(mut actions) = self.cache.load().await? else {
            return Ok(());
        };
        let mut changed = false;
        for action in actions.iter_mut().filter(|a| a.action_id == action_id) {
            action.last_triggered = Some(now);
            changed = true;
        }
        if changed {
            self.cache.store(&actions).await?;
        }
        Ok(())
    }
}
