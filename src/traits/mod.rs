//! Trait definitions for hardware abstraction, networking and change
//! notification.
//!
//! This module defines the core abstractions that allow the board core to:
//! - Run on different hardware (ESP32, desktop mock)
//! - Use different transports towards the game server
//! - Report changes without knowing about packets
//!
//! # Submodules
//!
//! - `hardware`: Port expander and analog input
//! - `pixels`: LED strip
//! - `network`: Datagram transport to the game server and rejoin pacing
//! - `observer`: Board change notification
//!
//! # Hardware Abstraction
//!
//! The key hardware traits are:
//!
//! - [`PortExpander`]: 16-bit I2C expander driving group and channel lines
//! - [`AnalogInput`]: ADC behind the sensor multiplexer
//! - [`PixelDriver`]: addressable LEDs, one per field

pub mod hardware;
pub mod network;
pub mod observer;
pub mod pixels;

pub use hardware::*;
pub use network::*;
pub use observer::*;
pub use pixels::*;
