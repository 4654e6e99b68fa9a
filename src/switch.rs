use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use itertools::Itertools;
use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tokio::time::{sleep, timeout};

use hue::legacy_api::{ApiLight, ApiLightStateUpdate, ApiResourceType, ApiSceneUpdate};

use crate::backend::hass::ColorSource;
use crate::backend::hue::Bridge;
use crate::backend::hue::registry::BridgeRegistry;
use crate::error::{ApiError, ApiResult};
use crate::lightstate::{self, check_scene, is_circadian_scene};
use crate::model::state::{STATE_OFF, STATE_ON, StateStore};

/// Period between scheduled poll cycles.
pub const SCAN_INTERVAL: Duration = Duration::from_secs(15);

/// Pause taken by a scheduled poll cycle when no bridge is available.
pub const NO_BRIDGE_BACKOFF: Duration = Duration::from_secs(5);

/// Upper bound for a single bridge cache refresh.
pub const REFRESH_TIMEOUT: Duration = Duration::from_secs(10);

const ENTITY_PREFIX: &str = "hue_circadian";

/// What a single call to [`CircadianSwitch::update_info`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    /// Another poll cycle was still running.
    Skipped,
    NoBridges,
    Updated(usize),
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct SwitchInfo {
    pub entity_id: String,
    pub name: String,
    pub state: Option<&'static str>,
}

#[must_use]
pub fn slugify(text: &str) -> String {
    let mut out = String::new();
    let mut last_sep = false;
    for ch in text.chars() {
        let low = ch.to_ascii_lowercase();
        if low.is_ascii_alphanumeric() {
            out.push(low);
            last_sep = false;
        } else if !last_sep {
            out.push('_');
            last_sep = true;
        }
    }
    out.trim_matches('_').to_string()
}

#[must_use]
pub fn entity_id_for(name: &str) -> String {
    format!("switch.{}", slugify(&format!("{ENTITY_PREFIX} {name}")))
}

/// Refresh one bridge cache, giving up after [`REFRESH_TIMEOUT`].
///
/// Failures are logged, and reported as `false`.
pub async fn refresh_cache(bridge: &dyn Bridge, resource: ApiResourceType) -> bool {
    let res = timeout(REFRESH_TIMEOUT, bridge.refresh(resource))
        .await
        .unwrap_or_else(|_| {
            Err(ApiError::BridgeTimeout(
                REFRESH_TIMEOUT.as_secs(),
                bridge.name().to_string(),
            ))
        });

    if let Err(err) = res {
        log::debug!("[{}] Failed to fetch {}: {err}", bridge.name(), resource.as_str());
        return false;
    }
    true
}

/// On/off switch controlling circadian updates of every "Circadian" scene
/// on every known bridge.
///
/// The state starts out unset, and is decided by [`Self::added_to_host`]
/// (restore), or by an explicit turn on/off.
pub struct CircadianSwitch {
    entity_id: String,
    name: String,
    state: watch::Sender<Option<bool>>,
    lock: Mutex<()>,
    bridges: BridgeRegistry,
    colors: Arc<dyn ColorSource>,
    store: Arc<dyn StateStore>,
}

impl CircadianSwitch {
    pub fn new(
        name: &str,
        bridges: BridgeRegistry,
        colors: Arc<dyn ColorSource>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        Self {
            entity_id: entity_id_for(name),
            name: name.to_string(),
            state: watch::Sender::new(None),
            lock: Mutex::new(()),
            bridges,
            colors,
            store,
        }
    }

    #[must_use]
    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `None` until the state has been restored or set.
    #[must_use]
    pub fn is_on(&self) -> Option<bool> {
        *self.state.borrow()
    }

    #[must_use]
    pub fn state_str(&self) -> Option<&'static str> {
        self.is_on().map(|on| if on { STATE_ON } else { STATE_OFF })
    }

    #[must_use]
    pub fn info(&self) -> SwitchInfo {
        SwitchInfo {
            entity_id: self.entity_id.clone(),
            name: self.name.clone(),
            state: self.state_str(),
        }
    }

    /// Enable circadian updates. Lights are not touched until the next poll.
    pub fn turn_on(&self) {
        self.state.send_replace(Some(true));
    }

    pub fn turn_off(&self) {
        self.state.send_replace(Some(false));
        self.schedule_update_state();
    }

    /// Ask the host to publish and persist the current state.
    pub fn schedule_update_state(&self) {
        if let Some(state) = self.state_str() {
            self.store.schedule_update(&self.entity_id, state);
        }
    }

    /// Restore the last known state, unless a state is already set.
    pub async fn added_to_host(&self) {
        if self.is_on().is_some() {
            return;
        }

        let last = self.store.last_state(&self.entity_id).await;
        let on = last.is_some_and(|st| st.state == STATE_ON);
        log::info!(
            "Restored {} as {}",
            self.entity_id,
            if on { STATE_ON } else { STATE_OFF }
        );

        // only fill in the state if nothing set it while waiting for the store
        self.state.send_if_modified(|state| {
            if state.is_some() {
                return false;
            }
            *state = Some(on);
            true
        });
    }

    /// Run one poll cycle across all available bridges.
    ///
    /// Returns immediately if a cycle is already running. `scheduled` is
    /// true for periodic calls, which back off for a while when no bridge
    /// is available.
    pub async fn update_info(&self, scheduled: bool) -> PollOutcome {
        let Ok(_guard) = self.lock.try_lock() else {
            log::trace!("{} poll still running, skipping", self.name);
            return PollOutcome::Skipped;
        };

        let bridges = self.bridges.available().await;
        if bridges.is_empty() {
            if scheduled {
                sleep(NO_BRIDGE_BACKOFF).await;
            }
            return PollOutcome::NoBridges;
        }

        let results = join_all(
            bridges
                .iter()
                .map(|bridge| self.update_bridge(bridge.as_ref())),
        )
        .await;

        for (bridge, res) in bridges.iter().zip(results) {
            if let Err(err) = res {
                log::warn!("[{}] Circadian update failed: {err}", bridge.name());
            }
        }

        PollOutcome::Updated(bridges.len())
    }

    /// Desired state of `members`, from the current circadian reading.
    ///
    /// Returns `None` if the color source has no reading yet. Members that
    /// are not in `lights` are left out.
    pub fn get_lightstate(
        &self,
        lights: &BTreeMap<String, ApiLight>,
        members: &[String],
        set_brightness: bool,
    ) -> Option<BTreeMap<String, ApiLightStateUpdate>> {
        let reading = self.colors.current()?;

        log::info!(
            "set brightness to {}",
            lightstate::brightness(reading.percent)
        );

        let states = members
            .iter()
            .filter_map(|id| lights.get_key_value(id))
            .map(|(id, light)| (id.as_str(), &light.state));

        Some(lightstate::desired_lightstates(
            &reading,
            states,
            set_brightness,
        ))
    }

    pub async fn update_bridge(&self, bridge: &dyn Bridge) -> ApiResult<()> {
        if self.is_on() != Some(true) {
            log::debug!("{} off - not adjusting", self.name);
            return Ok(());
        }

        refresh_cache(bridge, ApiResourceType::Scenes).await;
        if !refresh_cache(bridge, ApiResourceType::Lights).await {
            return Ok(());
        }

        let scenes = bridge.scenes().await;
        let lights = bridge.lights().await;

        for (scene_id, scene) in &scenes {
            if !is_circadian_scene(scene, bridge.target_lights()) {
                continue;
            }

            log::info!(
                "[{}] Found circadian scene {scene_id} for lights {}",
                bridge.name(),
                scene.lights.iter().join(", ")
            );

            let current = bridge.get_scene(scene_id).await?;
            let check = check_scene(&current.lightstates, &lights);

            let Some(lightstates) = self.get_lightstate(&lights, &scene.lights, true) else {
                log::debug!("No circadian reading available, skipping scene update");
                return Ok(());
            };

            bridge
                .update_scene(scene_id, &ApiSceneUpdate { lightstates })
                .await?;
            log::info!("[{}] Updated scene {scene_id}", bridge.name());

            if !check.is_active {
                continue;
            }

            log::info!("Circadian scene is currently active.");
            if check.brightness_changed {
                log::info!("Brightness was changed manually");
            }

            let Some(states) =
                self.get_lightstate(&lights, &scene.lights, !check.brightness_changed)
            else {
                return Ok(());
            };

            let results = join_all(
                states
                    .iter()
                    .map(|(id, upd)| bridge.set_light_state(id, upd)),
            )
            .await;

            let mut first_err = None;
            for (id, res) in states.keys().zip(results) {
                if let Err(err) = res {
                    log::warn!("[{}] Failed to set state of light {id}: {err}", bridge.name());
                    first_err.get_or_insert(err);
                }
            }
            if let Some(err) = first_err {
                return Err(err);
            }
        }

        Ok(())
    }
}
