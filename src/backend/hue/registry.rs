use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::backend::hue::{Bridge, HueBridge};
use crate::config::AppConfig;
use crate::error::ApiResult;

/// A known bridge. Bridges without an api handle are configured, but not
/// (yet) paired.
#[derive(Clone)]
pub struct BridgeEntry {
    pub api: Option<Arc<dyn Bridge>>,
}

/// Shared map of every known bridge, keyed by name.
#[derive(Clone, Default)]
pub struct BridgeRegistry {
    entries: Arc<RwLock<BTreeMap<String, BridgeEntry>>>,
}

impl BridgeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &AppConfig) -> ApiResult<Self> {
        let mut entries = BTreeMap::new();

        for (name, server) in &config.bridges {
            let api: Option<Arc<dyn Bridge>> = match server.resolve_username() {
                Some(username) => Some(Arc::new(HueBridge::new(name, server, username)?)),
                None => {
                    log::warn!("[{name}] No username configured for bridge, it will be ignored");
                    None
                }
            };
            entries.insert(name.clone(), BridgeEntry { api });
        }

        Ok(Self {
            entries: Arc::new(RwLock::new(entries)),
        })
    }

    pub async fn insert(&self, name: &str, api: Option<Arc<dyn Bridge>>) {
        self.entries
            .write()
            .await
            .insert(name.to_string(), BridgeEntry { api });
    }

    /// Every paired bridge with a usable api handle.
    pub async fn available(&self) -> Vec<Arc<dyn Bridge>> {
        self.entries
            .read()
            .await
            .values()
            .filter_map(|entry| entry.api.clone())
            .collect()
    }

    /// Names of all known bridges, and whether each one is paired.
    pub async fn summary(&self) -> BTreeMap<String, bool> {
        self.entries
            .read()
            .await
            .iter()
            .map(|(name, entry)| (name.clone(), entry.api.is_some()))
            .collect()
    }
}
