//! In-memory stand-ins for bridges, the color source and the state store.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use hue::error::{HueApiV1Error, HueError};
use hue::legacy_api::{
    ApiLight, ApiLightState, ApiLightStateUpdate, ApiResourceType, ApiScene, ApiSceneUpdate,
};

use crate::backend::hass::ColorSource;
use crate::backend::hue::Bridge;
use crate::error::{ApiError, ApiResult};
use crate::lightstate::CircadianReading;
use crate::model::state::{StateStore, StoredState};

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Refresh(ApiResourceType),
    GetScene(String),
    UpdateScene(String, ApiSceneUpdate),
    SetLightState(String, ApiLightStateUpdate),
}

#[must_use]
pub fn light(on: bool, bri: Option<u8>, xy: Option<[f64; 2]>) -> ApiLight {
    ApiLight {
        state: ApiLightState {
            on,
            bri,
            xy,
            ..ApiLightState::default()
        },
        light_type: "Extended color light".to_string(),
        name: String::new(),
        modelid: String::new(),
        manufacturername: String::new(),
        uniqueid: String::new(),
        swversion: String::new(),
    }
}

#[must_use]
pub fn stored(on: bool, bri: Option<u8>, xy: Option<[f64; 2]>) -> ApiLightStateUpdate {
    ApiLightStateUpdate::default()
        .with_on(on)
        .with_bri(bri)
        .with_xy(xy)
}

#[derive(Default)]
struct Remote {
    lights: BTreeMap<String, ApiLight>,
    scenes: BTreeMap<String, ApiScene>,
}

/// Bridge keeping its "remote" state in memory, and recording every call.
///
/// Like a real bridge, the cached views only change on refresh.
pub struct FakeBridge {
    name: String,
    target: Option<BTreeSet<String>>,
    remote: Mutex<Remote>,
    cache: Mutex<Remote>,
    failing: Mutex<Vec<ApiResourceType>>,
    fail_get_scene: Mutex<bool>,
    delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeBridge {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            target: None,
            remote: Mutex::default(),
            cache: Mutex::default(),
            failing: Mutex::default(),
            fail_get_scene: Mutex::new(false),
            delay: Mutex::new(None),
            calls: Mutex::default(),
        }
    }

    pub fn with_target(self, lights: &[&str]) -> Self {
        Self {
            target: Some(lights.iter().map(ToString::to_string).collect()),
            ..self
        }
    }

    pub fn set_lights(&self, lights: BTreeMap<String, ApiLight>) {
        self.remote.lock().unwrap().lights = lights;
    }

    pub fn add_scene(
        &self,
        id: &str,
        name: &str,
        lights: &[&str],
        lightstates: BTreeMap<String, ApiLightStateUpdate>,
    ) {
        let scene: ApiScene = serde_json::from_value(serde_json::json!({
            "name": name,
            "lights": lights,
        }))
        .unwrap();
        let scene = ApiScene {
            lightstates,
            ..scene
        };
        self.remote
            .lock()
            .unwrap()
            .scenes
            .insert(id.to_string(), scene);
    }

    pub fn fail_refresh(&self, resource: ApiResourceType) {
        self.failing.lock().unwrap().push(resource);
    }

    pub fn fail_get_scene(&self) {
        *self.fail_get_scene.lock().unwrap() = true;
    }

    pub fn delay_refresh(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn scene_updates(&self) -> Vec<(String, ApiSceneUpdate)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::UpdateScene(id, upd) => Some((id, upd)),
                _ => None,
            })
            .collect()
    }

    pub fn light_updates(&self) -> Vec<(String, ApiLightStateUpdate)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::SetLightState(id, upd) => Some((id, upd)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn bridge_error(&self, address: &str) -> ApiError {
        HueError::V1Error(HueApiV1Error {
            typ: 901,
            address: address.to_string(),
            description: format!("{} is unavailable", self.name),
        })
        .into()
    }
}

#[async_trait]
impl Bridge for FakeBridge {
    fn name(&self) -> &str {
        &self.name
    }

    fn target_lights(&self) -> Option<&BTreeSet<String>> {
        self.target.as_ref()
    }

    async fn refresh(&self, resource: ApiResourceType) -> ApiResult<()> {
        self.record(Call::Refresh(resource));

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.lock().unwrap().contains(&resource) {
            return Err(self.bridge_error(resource.as_str()));
        }

        let remote = self.remote.lock().unwrap();
        let mut cache = self.cache.lock().unwrap();
        match resource {
            ApiResourceType::Lights => cache.lights = remote.lights.clone(),
            ApiResourceType::Scenes => {
                // the scene list never carries lightstates
                cache.scenes = remote
                    .scenes
                    .iter()
                    .map(|(id, scene)| {
                        let scene = ApiScene {
                            lightstates: BTreeMap::new(),
                            ..scene.clone()
                        };
                        (id.clone(), scene)
                    })
                    .collect();
            }
            _ => {}
        }
        Ok(())
    }

    async fn lights(&self) -> BTreeMap<String, ApiLight> {
        self.cache.lock().unwrap().lights.clone()
    }

    async fn scenes(&self) -> BTreeMap<String, ApiScene> {
        self.cache.lock().unwrap().scenes.clone()
    }

    async fn get_scene(&self, id: &str) -> ApiResult<ApiScene> {
        self.record(Call::GetScene(id.to_string()));

        if *self.fail_get_scene.lock().unwrap() {
            return Err(self.bridge_error(&format!("/scenes/{id}")));
        }

        self.remote
            .lock()
            .unwrap()
            .scenes
            .get(id)
            .cloned()
            .ok_or_else(|| self.bridge_error(&format!("/scenes/{id}")))
    }

    async fn update_scene(&self, id: &str, upd: &ApiSceneUpdate) -> ApiResult<()> {
        self.record(Call::UpdateScene(id.to_string(), upd.clone()));
        Ok(())
    }

    async fn set_light_state(&self, id: &str, upd: &ApiLightStateUpdate) -> ApiResult<()> {
        self.record(Call::SetLightState(id.to_string(), upd.clone()));
        Ok(())
    }
}

/// Color source with a fixed reading.
pub struct FixedColor(pub Option<CircadianReading>);

impl ColorSource for FixedColor {
    fn current(&self) -> Option<CircadianReading> {
        self.0
    }
}

/// State store keeping everything in memory. Published updates are kept
/// in order, and are not visible through `last_state`.
#[derive(Default)]
pub struct MemoryStore {
    states: Mutex<BTreeMap<String, StoredState>>,
    published: Mutex<Vec<(String, String)>>,
}

impl MemoryStore {
    pub fn preload(&self, entity_id: &str, state: &str) {
        self.states.lock().unwrap().insert(
            entity_id.to_string(),
            StoredState {
                state: state.to_string(),
                last_changed: Utc::now(),
            },
        );
    }

    pub fn published(&self) -> Vec<(String, String)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn last_state(&self, entity_id: &str) -> Option<StoredState> {
        self.states.lock().unwrap().get(entity_id).cloned()
    }

    fn schedule_update(&self, entity_id: &str, state: &str) {
        self.published
            .lock()
            .unwrap()
            .push((entity_id.to_string(), state.to_string()));
    }
}
