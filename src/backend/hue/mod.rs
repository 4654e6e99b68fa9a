pub mod client;
pub mod registry;

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use hue::legacy_api::{
    ApiLight, ApiLightStateUpdate, ApiResourceType, ApiScene, ApiSceneUpdate,
};

use crate::config::BridgeServer;
use crate::error::{ApiError, ApiResult};

use self::client::HueClient;

/// A paired Hue bridge, with cached lights and scenes.
///
/// The caches are only changed by [`Bridge::refresh`]. Readers get a
/// snapshot, which may be stale until the next refresh.
#[async_trait]
pub trait Bridge: Send + Sync {
    fn name(&self) -> &str;

    /// Target light group configured for this bridge, if any.
    fn target_lights(&self) -> Option<&BTreeSet<String>>;

    /// Reload one resource cache from the bridge.
    async fn refresh(&self, resource: ApiResourceType) -> ApiResult<()>;

    async fn lights(&self) -> BTreeMap<String, ApiLight>;

    async fn scenes(&self) -> BTreeMap<String, ApiScene>;

    /// Fetch a single scene, including its stored `lightstates`.
    async fn get_scene(&self, id: &str) -> ApiResult<ApiScene>;

    async fn update_scene(&self, id: &str, upd: &ApiSceneUpdate) -> ApiResult<()>;

    async fn set_light_state(&self, id: &str, upd: &ApiLightStateUpdate) -> ApiResult<()>;
}

#[derive(Debug, Default)]
struct BridgeCache {
    lights: BTreeMap<String, ApiLight>,
    scenes: BTreeMap<String, ApiScene>,
}

pub struct HueBridge {
    name: String,
    client: HueClient,
    target: Option<BTreeSet<String>>,
    cache: Mutex<BridgeCache>,
}

impl HueBridge {
    pub fn new(name: &str, server: &BridgeServer, username: String) -> ApiResult<Self> {
        Ok(Self {
            name: name.to_string(),
            client: HueClient::new(name, server, username)?,
            target: server.lights.clone(),
            cache: Mutex::new(BridgeCache::default()),
        })
    }
}

#[async_trait]
impl Bridge for HueBridge {
    fn name(&self) -> &str {
        &self.name
    }

    fn target_lights(&self) -> Option<&BTreeSet<String>> {
        self.target.as_ref()
    }

    async fn refresh(&self, resource: ApiResourceType) -> ApiResult<()> {
        match resource {
            ApiResourceType::Lights => {
                let lights = self.client.get(resource.as_str()).await?;
                self.cache.lock().await.lights = lights;
            }
            ApiResourceType::Scenes => {
                let scenes = self.client.get(resource.as_str()).await?;
                self.cache.lock().await.scenes = scenes;
            }
            other => {
                return Err(ApiError::service_error(format!(
                    "[{}] Resource {other:?} is not cached",
                    self.name
                )));
            }
        }
        Ok(())
    }

    async fn lights(&self) -> BTreeMap<String, ApiLight> {
        self.cache.lock().await.lights.clone()
    }

    async fn scenes(&self) -> BTreeMap<String, ApiScene> {
        self.cache.lock().await.scenes.clone()
    }

    async fn get_scene(&self, id: &str) -> ApiResult<ApiScene> {
        self.client.get(&format!("scenes/{id}")).await
    }

    async fn update_scene(&self, id: &str, upd: &ApiSceneUpdate) -> ApiResult<()> {
        self.client.put(&format!("scenes/{id}"), upd).await
    }

    async fn set_light_state(&self, id: &str, upd: &ApiLightStateUpdate) -> ApiResult<()> {
        if !self.cache.lock().await.lights.contains_key(id) {
            return Err(ApiError::LightNotFound(id.to_string()));
        }
        self.client.put(&format!("lights/{id}/state"), upd).await
    }
}
