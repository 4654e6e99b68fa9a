//! Pure light state computations.
//!
//! Nothing in here talks to a bridge. Given a circadian reading and the
//! cached state of a set of lights, these functions compute the desired
//! state patches, and decide whether a scene is currently live.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use hue::legacy_api::{ApiLight, ApiLightState, ApiLightStateUpdate, ApiScene};
use hue::{CIRCADIAN_SCENE_NAME, CIRCADIAN_TRANSITION_TIME, MAX_BRIGHTNESS};

/// Largest brightness difference still considered "unchanged".
pub const BRIGHTNESS_TOLERANCE: u8 = 5;

/// Largest xy coordinate difference still considered "unchanged".
pub const XY_TOLERANCE: f64 = 0.02;

/// One reading of the circadian color source.
///
/// `percent` runs from -100 (night) to 100 (midday). Positive values mean
/// full brightness, negative values dim the lights proportionally.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct CircadianReading {
    pub percent: f64,
    pub xy: [f64; 2],
}

/// Result of comparing a scene's stored light states to the live lights.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SceneCheck {
    pub is_active: bool,
    pub brightness_changed: bool,
}

#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn brightness(percent: f64) -> u8 {
    let max = f64::from(MAX_BRIGHTNESS);
    if percent > 0.0 {
        MAX_BRIGHTNESS
    } else {
        (max * (100.0 + percent) / 100.0).clamp(0.0, max) as u8
    }
}

/// Compute the state patch for every light in `lights`.
///
/// Every patch turns the light on, with the standard transition time. The
/// xy color is only included for lights that already report xy, and the
/// brightness only if `set_brightness` is true.
pub fn desired_lightstates<'a>(
    reading: &CircadianReading,
    lights: impl IntoIterator<Item = (&'a str, &'a ApiLightState)>,
    set_brightness: bool,
) -> BTreeMap<String, ApiLightStateUpdate> {
    let bri = set_brightness.then(|| brightness(reading.percent));

    lights
        .into_iter()
        .map(|(id, state)| {
            let upd = ApiLightStateUpdate::default()
                .with_on(true)
                .with_xy(state.supports_xy().then_some(reading.xy))
                .with_bri(bri)
                .with_transitiontime(Some(CIRCADIAN_TRANSITION_TIME));
            (id.to_string(), upd)
        })
        .collect()
}

/// Decide whether the scene described by `stored` is what the lights are
/// showing right now.
///
/// A difference in on/off, or in xy color beyond [`XY_TOLERANCE`], means
/// the scene is not active. A brightness difference beyond
/// [`BRIGHTNESS_TOLERANCE`] only marks the brightness as manually changed.
///
/// Lights that are missing from `lights` are ignored, as are fields that
/// either side does not report.
#[must_use]
pub fn check_scene(
    stored: &BTreeMap<String, ApiLightStateUpdate>,
    lights: &BTreeMap<String, ApiLight>,
) -> SceneCheck {
    let mut res = SceneCheck {
        is_active: true,
        brightness_changed: false,
    };

    for (id, want) in stored {
        let Some(light) = lights.get(id) else {
            log::debug!("Scene light {id} not present on bridge, skipping");
            continue;
        };
        let have = &light.state;

        if want.on.is_some_and(|on| on != have.on) {
            res.is_active = false;
        }

        if let (Some(a), Some(b)) = (have.bri, want.bri) {
            if a.abs_diff(b) > BRIGHTNESS_TOLERANCE {
                res.brightness_changed = true;
            }
        }

        if let (Some(a), Some(b)) = (have.xy, want.xy) {
            log::info!("xy deltas {} {}", (a[0] - b[0]).abs(), (a[1] - b[1]).abs());
            if (a[0] - b[0]).abs() > XY_TOLERANCE || (a[1] - b[1]).abs() > XY_TOLERANCE {
                res.is_active = false;
            }
        }
    }

    res
}

/// A scene is managed if it carries the circadian name, and (when a target
/// light group is given) covers exactly that group.
#[must_use]
pub fn is_circadian_scene(scene: &ApiScene, target: Option<&BTreeSet<String>>) -> bool {
    if scene.name != CIRCADIAN_SCENE_NAME {
        return false;
    }

    target.is_none_or(|group| {
        let group: BTreeSet<&str> = group.iter().map(String::as_str).collect();
        group == scene.light_set()
    })
}
