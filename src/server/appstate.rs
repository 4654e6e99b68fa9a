use std::sync::Arc;

use crate::backend::hass::ColorSource;
use crate::backend::hue::registry::BridgeRegistry;
use crate::config::AppConfig;
use crate::model::state::StateStore;
use crate::switch::CircadianSwitch;

#[derive(Clone)]
pub struct AppState {
    conf: Arc<AppConfig>,
    bridges: BridgeRegistry,
    switch: Arc<CircadianSwitch>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        bridges: BridgeRegistry,
        colors: Arc<dyn ColorSource>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        let switch = CircadianSwitch::new(&config.circadian.name, bridges.clone(), colors, store);

        Self {
            conf: Arc::new(config),
            bridges,
            switch: Arc::new(switch),
        }
    }

    #[must_use]
    pub fn config(&self) -> Arc<AppConfig> {
        self.conf.clone()
    }

    #[must_use]
    pub const fn bridges(&self) -> &BridgeRegistry {
        &self.bridges
    }

    #[must_use]
    pub fn switch(&self) -> Arc<CircadianSwitch> {
        self.switch.clone()
    }
}
