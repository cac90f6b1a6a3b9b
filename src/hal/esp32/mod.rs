//! ESP32-C3 SuperMini hardware abstraction layer for the SmartBoard.
//!
//! This module provides hardware implementations for an ESP32-C3 SuperMini
//! driving an analog SmartBoard sensor board.
//!
//! # Hardware Configuration
//!
//! - **MCU**: ESP32-C3 SuperMini (RISC-V 160MHz, 4MB Flash)
//! - **Expander**: PCF8575 on I2C (group and multiplexer channel lines)
//! - **Sensors**: 4 HAL sensors per field, read through a CD74HC4067
//!   multiplexer into one ADC pin
//! - **LEDs**: WS2812 strip, one pixel per field
//!
//! # Pin Assignments
//!
//! See the [`pins`] module for GPIO assignments matching the SuperMini layout.

use esp_idf_sys::{esp, esp_mac_type_t_ESP_MAC_WIFI_STA, esp_read_mac, EspError};

mod analog;
mod pixels;

pub use analog::Esp32Analog;
pub use pixels::Esp32Pixels;

#[cfg(feature = "wifi")]
mod udp;
#[cfg(feature = "wifi")]
pub use udp::Esp32Udp;

#[cfg(feature = "wifi")]
mod wifi;
#[cfg(feature = "wifi")]
pub use wifi::Esp32Wifi;

/// Reads the station MAC address, the source of the board's device id.
pub fn read_mac() -> Result<[u8; 6], EspError> {
    let mut mac = [0u8; 6];
    // SAFETY: the buffer holds the six bytes the call writes
    esp!(unsafe { esp_read_mac(mac.as_mut_ptr(), esp_mac_type_t_ESP_MAC_WIFI_STA) })?;
    Ok(mac)
}

/// Pin assignments for SuperMini ESP32-C3.
pub mod pins {
    // =========================================================================
    // Sensor Input
    // =========================================================================

    /// Multiplexer output (ADC1 channel 4)
    pub const ANALOG_IN: i32 = 4;

    // =========================================================================
    // LEDs (WS2812)
    // =========================================================================

    /// Strip data line, driven by RMT
    pub const LED_DATA: i32 = 5;

    // =========================================================================
    // I2C Bus (expanders)
    // =========================================================================

    /// I2C data line (also has onboard blue LED - will flicker during I2C)
    pub const I2C_SDA: i32 = 8;

    /// I2C clock line (also shared with BOOT button - only affects programming)
    pub const I2C_SCL: i32 = 9;

    // =========================================================================
    // Module Boards
    // =========================================================================

    /// Interrupt lines of modules 0-3 (active low)
    pub const MODULE_IRQ: [i32; 4] = [0, 1, 2, 3];
}
