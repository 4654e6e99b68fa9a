pub mod hass;
pub mod hue;
