//! Concrete implementations of the [`crate::traits`] seams.
//!
//! - [`mock`]: in-memory buses, sensor arrays, LEDs and transports used by
//!   the unit and integration tests
//! - `esp32`: ADC, WS2812 strip, MAC lookup and pin map for the ESP32-C3
//!   board (feature `esp32`), plus station WiFi and UDP (feature `wifi`)

pub mod mock;

#[cfg(feature = "esp32")]
pub mod esp32;

pub use mock::*;

#[cfg(feature = "esp32")]
pub use esp32::*;
