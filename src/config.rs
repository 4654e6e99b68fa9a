use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;
use std::num::NonZeroU32;

use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigError};
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_NAME: &str = "Circadian Hue";
pub const DEFAULT_SENSOR: &str = "sensor.circadian_values";

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct CircadianConfig {
    pub name: String,
    pub state_file: Utf8PathBuf,
    pub listen: Ipv4Addr,
    pub http_port: u16,
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct BridgeServer {
    pub url: Url,
    #[serde(default, skip_serializing)]
    pub username: Option<String>,
    pub username_env: Option<String>,
    /// Target light group. When set, only scenes over exactly these lights
    /// are managed.
    pub lights: Option<BTreeSet<String>>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct HassServer {
    pub url: Url,
    pub token_env: Option<String>,
    #[serde(default = "HassServer::default_sensor")]
    pub sensor: String,
    #[serde(default = "HassServer::default_poll_interval")]
    pub poll_interval_secs: NonZeroU32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    pub circadian: CircadianConfig,
    #[serde(default)]
    pub bridges: BTreeMap<String, BridgeServer>,
    pub hass: Option<HassServer>,
}

impl AppConfig {
    #[must_use]
    pub fn has_bridges(&self) -> bool {
        !self.bridges.is_empty()
    }
}

impl HassServer {
    fn default_sensor() -> String {
        DEFAULT_SENSOR.to_string()
    }

    const fn default_poll_interval() -> NonZeroU32 {
        NonZeroU32::new(15).unwrap()
    }
}

impl BridgeServer {
    /// Resolve the api username, either given directly or read from the
    /// environment variable named by `username_env`.
    #[must_use]
    pub fn resolve_username(&self) -> Option<String> {
        self.username
            .clone()
            .or_else(|| {
                self.username_env
                    .as_deref()
                    .and_then(|var| std::env::var(var).ok())
            })
            .map(|x| x.trim().to_string())
            .filter(|x| !x.is_empty())
    }
}

pub fn parse(filename: &Utf8Path) -> Result<AppConfig, ConfigError> {
    let settings = Config::builder()
        .set_default("circadian.name", DEFAULT_NAME)?
        .set_default("circadian.state_file", "state.yaml")?
        .set_default("circadian.listen", "0.0.0.0")?
        .set_default("circadian.http_port", 8080)?
        .add_source(config::File::with_name(filename.as_str()))
        .build()?;

    settings.try_deserialize()
}
