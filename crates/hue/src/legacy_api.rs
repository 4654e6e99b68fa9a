use std::collections::{BTreeMap, BTreeSet};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{HueApiV1Error, HueError, HueResult};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApiResourceType {
    Config,
    Groups,
    Lights,
    Scenes,
    Sensors,
}

impl ApiResourceType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Groups => "groups",
            Self::Lights => "lights",
            Self::Scenes => "scenes",
            Self::Sensors => "sensors",
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LightColorMode {
    Ct,
    Xy,
    Hs,
}

/// Live state of a light, as reported by `GET /lights`.
///
/// Bridges omit `bri` on on/off lights, and `xy` on lights without color
/// support, so both are optional.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct ApiLightState {
    pub on: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub bri: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub hue: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sat: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub effect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub xy: Option<[f64; 2]>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ct: Option<u16>,
    #[serde(default)]
    pub alert: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub colormode: Option<LightColorMode>,
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub reachable: bool,
}

impl ApiLightState {
    #[must_use]
    pub const fn supports_xy(&self) -> bool {
        self.xy.is_some()
    }
}

/// Partial light state. Used both as the body of
/// `PUT /lights/<id>/state`, and as a per-light entry in scene
/// `lightstates`.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct ApiLightStateUpdate {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub on: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub bri: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub xy: Option<[f64; 2]>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ct: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub transitiontime: Option<u16>,
}

impl ApiLightStateUpdate {
    #[must_use]
    pub fn with_on(self, on: bool) -> Self {
        Self {
            on: Some(on),
            ..self
        }
    }

    #[must_use]
    pub fn with_bri(self, bri: Option<u8>) -> Self {
        Self { bri, ..self }
    }

    #[must_use]
    pub fn with_xy(self, xy: Option<[f64; 2]>) -> Self {
        Self { xy, ..self }
    }

    #[must_use]
    pub fn with_transitiontime(self, transitiontime: Option<u16>) -> Self {
        Self {
            transitiontime,
            ..self
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ApiLight {
    pub state: ApiLightState,
    #[serde(rename = "type", default)]
    pub light_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub modelid: String,
    #[serde(default)]
    pub manufacturername: String,
    #[serde(default)]
    pub uniqueid: String,
    #[serde(default)]
    pub swversion: String,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum ApiSceneType {
    #[default]
    LightScene,
    GroupScene,
}

/// A scene, as returned by `GET /scenes` (without `lightstates`) or
/// `GET /scenes/<id>` (with `lightstates`).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ApiScene {
    pub name: String,
    #[serde(rename = "type", default)]
    pub scene_type: ApiSceneType,
    #[serde(default)]
    pub lights: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub lightstates: BTreeMap<String, ApiLightStateUpdate>,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub recycle: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub lastupdated: Option<String>,
    #[serde(default)]
    pub version: u32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub group: Option<String>,
}

impl ApiScene {
    #[must_use]
    pub fn light_set(&self) -> BTreeSet<&str> {
        self.lights.iter().map(String::as_str).collect()
    }
}

/// Body of `PUT /scenes/<id>`, replacing stored per-light states.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct ApiSceneUpdate {
    pub lightstates: BTreeMap<String, ApiLightStateUpdate>,
}

/// Extract the error objects from a legacy api reply, if any.
///
/// The bridge reports failure with HTTP 200 and a body like
/// `[{"error": {...}}]`, so the body must be inspected.
#[must_use]
pub fn reply_errors(value: &Value) -> Vec<HueApiV1Error> {
    let Some(items) = value.as_array() else {
        return vec![];
    };

    items
        .iter()
        .filter_map(|item| item.get("error"))
        .filter_map(|err| serde_json::from_value(err.clone()).ok())
        .collect()
}

/// Parse the reply of a `GET` request, turning error envelopes into
/// [`HueError`].
pub fn parse_reply<T: DeserializeOwned>(value: Value) -> HueResult<T> {
    if let Some(err) = HueError::from_errors(reply_errors(&value)) {
        return Err(err);
    }
    Ok(serde_json::from_value(value)?)
}

/// Check the reply of a `PUT` request. Every entry must be a success.
pub fn check_update_reply(value: &Value) -> HueResult<()> {
    if let Some(err) = HueError::from_errors(reply_errors(value)) {
        return Err(err);
    }
    if value.is_array() {
        Ok(())
    } else {
        Err(HueError::UnexpectedReply(value.to_string()))
    }
}
