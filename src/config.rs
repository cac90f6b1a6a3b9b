//! Shared configuration system for desktop and ESP32.
//!
//! Uses `heapless::String` for `no_std` compatibility while remaining
//! ergonomic to use on desktop with `std`.
//!
//! # Example
//!
//! ```rust
//! use smartboard::config::{BoardConfig, Config, SensorConfig};
//! use smartboard::Rotation;
//!
//! // Use defaults
//! let config = Config::default();
//! assert_eq!(config.sensor.threshold_permille, 1035);
//!
//! // Or customize
//! let config = Config::default()
//!     .with_board(BoardConfig::default().with_rotation(Rotation::Deg180))
//!     .with_sensor(SensorConfig::default().with_absolute_floor(120));
//! ```

use heapless::String as HString;

use crate::rotation::Rotation;
use crate::sensor::Threshold;

/// Maximum length for short config strings (hostnames, service names)
pub const MAX_SHORT_STRING: usize = 64;

/// Type alias for short config strings
pub type ShortString = HString<MAX_SHORT_STRING>;

// ============================================================================
// Helper for creating heapless strings
// ============================================================================

/// Create a ShortString from a &str, truncating if too long
pub fn short_string(s: &str) -> ShortString {
    let mut hs = ShortString::new();
    // Cut at the last char boundary that still fits
    let mut end = s.len().min(MAX_SHORT_STRING);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    let _ = hs.push_str(&s[..end]);
    hs
}

// ============================================================================
// Main Config
// ============================================================================

/// Complete application configuration
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Board geometry and wiring
    pub board: BoardConfig,
    /// Sensor sampling and threshold tuning
    pub sensor: SensorConfig,
    /// Game server link
    pub network: NetworkConfig,
    /// WiFi connection configuration
    pub wifi: WifiConfig,
    /// Device identification
    pub device: DeviceConfig,
}

impl Config {
    /// Set board configuration
    pub fn with_board(mut self, board: BoardConfig) -> Self {
        self.board = board;
        self
    }

    /// Set sensor configuration
    pub fn with_sensor(mut self, sensor: SensorConfig) -> Self {
        self.sensor = sensor;
        self
    }

    /// Set network configuration
    pub fn with_network(mut self, network: NetworkConfig) -> Self {
        self.network = network;
        self
    }

    /// Set WiFi configuration
    pub fn with_wifi(mut self, wifi: WifiConfig) -> Self {
        self.wifi = wifi;
        self
    }

    /// Set device configuration
    pub fn with_device(mut self, device: DeviceConfig) -> Self {
        self.device = device;
        self
    }
}

// ============================================================================
// Board Config
// ============================================================================

/// Board geometry and wiring configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoardConfig {
    /// Mounting orientation, fixed for the device lifetime
    pub rotation: Rotation,
    /// I2C address of the group/channel expander
    pub expander_address: u8,
    /// I2C address of the upstream channel switch (module boards)
    pub switch_address: u8,
    /// LED brightness applied at start-up
    pub led_brightness: u8,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            rotation: Rotation::Deg0,
            expander_address: 0x20,
            switch_address: 0x70,
            led_brightness: 200,
        }
    }
}

impl BoardConfig {
    /// Set the mounting orientation
    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// Set the expander address
    pub fn with_expander_address(mut self, address: u8) -> Self {
        self.expander_address = address;
        self
    }

    /// Set the channel switch address
    pub fn with_switch_address(mut self, address: u8) -> Self {
        self.switch_address = address;
        self
    }

    /// Set the start-up LED brightness
    pub fn with_led_brightness(mut self, level: u8) -> Self {
        self.led_brightness = level;
        self
    }
}

// ============================================================================
// Sensor Config
// ============================================================================

/// Sensor sampling and threshold configuration
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorConfig {
    /// Reading must exceed `reference * threshold_permille / 1000`
    pub threshold_permille: u32,
    /// Reading must exceed this absolute value
    pub absolute_floor: u16,
    /// Conversions averaged per sensor while calibrating
    pub calibration_samples: u16,
    /// Conversions averaged per sensor while scanning
    pub scan_samples: u16,
    /// Delay after powering a sensor group in milliseconds
    pub group_settle_ms: u32,
    /// Calibration passes at start-up
    pub calibration_passes: u8,
    /// Delay after each start-up calibration pass in milliseconds
    pub calibration_settle_ms: u32,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            threshold_permille: Threshold::DEFAULT_RATIO_PERMILLE,
            absolute_floor: Threshold::DEFAULT_FLOOR,
            calibration_samples: 20,
            scan_samples: 10,
            group_settle_ms: 10,
            calibration_passes: 2,
            calibration_settle_ms: 500,
        }
    }
}

impl SensorConfig {
    /// Set the threshold ratio in permille
    pub fn with_threshold_permille(mut self, permille: u32) -> Self {
        self.threshold_permille = permille;
        self
    }

    /// Set the absolute floor
    pub fn with_absolute_floor(mut self, floor: u16) -> Self {
        self.absolute_floor = floor;
        self
    }

    /// Set the sample counts for calibration and scanning
    pub fn with_samples(mut self, calibration: u16, scan: u16) -> Self {
        self.calibration_samples = calibration;
        self.scan_samples = scan;
        self
    }

    /// Set the group settle delay
    pub fn with_group_settle_ms(mut self, ms: u32) -> Self {
        self.group_settle_ms = ms;
        self
    }

    /// Set the number of start-up calibration passes (at least one)
    pub fn with_calibration_passes(mut self, passes: u8) -> Self {
        self.calibration_passes = passes.max(1);
        self
    }

    /// Set the delay after each start-up calibration pass
    pub fn with_calibration_settle_ms(mut self, ms: u32) -> Self {
        self.calibration_settle_ms = ms;
        self
    }

    /// The threshold rule these settings describe
    pub fn threshold(&self) -> Threshold {
        Threshold::new(self.threshold_permille, self.absolute_floor)
    }
}

// ============================================================================
// Network Config
// ============================================================================

/// Game server link configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NetworkConfig {
    /// Local UDP port for commands
    pub udp_port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            udp_port: 4000,
        }
    }
}

impl NetworkConfig {
    /// Set the UDP port
    pub fn with_udp_port(mut self, port: u16) -> Self {
        self.udp_port = port;
        self
    }
}

// ============================================================================
// WiFi Config
// ============================================================================

/// WiFi connection configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WifiConfig {
    /// WiFi network SSID
    pub ssid: ShortString,
    /// WiFi password
    pub password: ShortString,
    /// Pause between connection attempts in milliseconds
    pub retry_delay_ms: u32,
    /// Maximum connection retry attempts (0 = unlimited)
    pub max_retries: u8,
    /// Minimum pause between rejoin rounds after the link dropped
    pub rejoin_interval_ms: u32,
}

impl Default for WifiConfig {
    fn default() -> Self {
        Self {
            ssid: ShortString::new(),
            password: ShortString::new(),
            retry_delay_ms: 2_000,
            max_retries: 5,
            rejoin_interval_ms: 30_000,
        }
    }
}

impl WifiConfig {
    /// Set the SSID
    pub fn with_ssid(mut self, ssid: &str) -> Self {
        self.ssid = short_string(ssid);
        self
    }

    /// Set the password
    pub fn with_password(mut self, password: &str) -> Self {
        self.password = short_string(password);
        self
    }

    /// Set the pause between connection attempts
    pub fn with_retry_delay_ms(mut self, ms: u32) -> Self {
        self.retry_delay_ms = ms;
        self
    }

    /// Set the maximum retry count
    pub fn with_max_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the pause between rejoin rounds
    pub fn with_rejoin_interval_ms(mut self, ms: u32) -> Self {
        self.rejoin_interval_ms = ms;
        self
    }

    /// Check if WiFi credentials are configured
    pub fn is_configured(&self) -> bool {
        !self.ssid.is_empty()
    }
}

// ============================================================================
// Device Config
// ============================================================================

/// Device identification configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceConfig {
    /// Human-readable device name
    pub name: ShortString,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: short_string("smartboard"),
        }
    }
}

impl DeviceConfig {
    /// Set the device name
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = short_string(name);
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
