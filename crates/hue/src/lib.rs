pub mod error;
pub mod legacy_api;

/// Scene name marking scenes that follow the circadian curve.
pub const CIRCADIAN_SCENE_NAME: &str = "Circadian";

/// Transition time (in deciseconds) used for every circadian update.
pub const CIRCADIAN_TRANSITION_TIME: u16 = 20;

/// Highest brightness value the legacy api accepts.
pub const MAX_BRIGHTNESS: u8 = 255;
