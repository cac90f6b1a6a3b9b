//! # smartboard
//!
//! Sensor acquisition and change detection for the SmartBoard HAL game
//! board.
//!
//! A board is an N x N grid of fields. Every field carries four HAL sensors
//! (north, east, south, west) that detect a magnet in a figure's base. The
//! crate scans those sensors through I2C port expanders and an analog
//! multiplexer, decides per sensor whether a magnet is present relative to a
//! calibrated baseline, and reports the board in the player's orientation
//! as a packed status update whenever something changed.
//!
//! ## Features
//!
//! - **Calibration**: per-sensor baselines, re-taken on demand while keeping
//!   the baselines of occupied sensors
//! - **Rotation**: the board may be mounted in four orientations; all
//!   reports use logical coordinates
//! - **Change detection**: first difference against the previous cycle, in a
//!   fixed row-major order
//! - **Status encoding**: 13-byte header plus 3 bytes per field
//! - **Module boards**: digital HAL switches on PCA9555 expanders with
//!   interrupt-driven polling
//!
//! ## Architecture
//!
//! The crate is structured to allow testing on desktop without hardware:
//!
//! - `traits` - Hardware, LED, network and observer abstractions
//! - `expander` / `sector` - I2C expander drivers and group capture
//! - `grid` / `calibration` - Field state and baseline handling
//! - `scanner` - Scan cycle and change detection
//! - `status` / `commands` - Wire formats towards the game server
//! - `controller` - Ties scanner, LEDs and transport together
//! - `module` / `module_controller` - Module-variant boards and their command path
//! - `hal` - Concrete implementations (mock for testing, esp32 for hardware)
//!
//! ## Example
//!
//! ```rust
//! use smartboard::{BoardScanner, DeviceId, Rotation, SensorConfig, StatusUpdate};
//! use smartboard::hal::MockSectors;
//!
//! // Every sensor reads 50 at rest
//! let mut scanner: BoardScanner<_, 6> =
//!     BoardScanner::new(MockSectors::uniform(50), Rotation::Deg180, SensorConfig::default());
//! scanner.calibrate();
//!
//! // A figure lands on group (1, 1), sensor 6
//! scanner.source_mut().set(4, 6, 120);
//! let report = scanner.scan_cycle(&mut ());
//! assert!(report.changed());
//!
//! let id = DeviceId::from_mac([0xA0, 0xB1, 0xC2, 0xD3, 0xE4, 0xF5]);
//! let packet = smartboard::status::encode(scanner.grid(), &id);
//! let update = StatusUpdate::parse(&packet).unwrap();
//! assert_eq!(update.record_at(2, 3).map(|r| r.mask), Some(0b1000));
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

extern crate alloc;

/// Sensor baseline capture and threshold evaluation per field.
pub mod calibration;
/// Inbound command packets from the game server.
pub mod commands;
/// Shared configuration system for desktop and ESP32.
pub mod config;
/// Board controller tying scanner, LEDs and transport together.
pub mod controller;
/// PCF8575 / PCA9555 port expander drivers.
pub mod expander;
/// Field state and colour effects.
pub mod field;
/// Rotation-aware field grid with current and previous snapshots.
pub mod grid;
/// Hardware abstraction layer with mock implementations for testing.
pub mod hal;
/// Module-variant boards with digital HAL switches.
pub mod module;
/// Command handling and sensor updates for module-variant boards.
pub mod module_controller;
/// Board mounting orientation.
pub mod rotation;
/// Scan cycle and change detection.
pub mod scanner;
/// Sensor group capture through the expander and multiplexer.
pub mod sector;
/// Single HAL sensor state and threshold rule.
pub mod sensor;
/// Status update encoding and decoding.
pub mod status;
/// Core traits for hardware, LEDs, network and change notification.
pub mod traits;

// Re-exports for convenience
pub use calibration::{ReadMode, SkippedBaselines};
pub use commands::{BoardCommand, CommandError, CommandOutcome, CommandType, PixelRecord};
pub use controller::{BoardController, StatusPublisher, TickReport};
pub use field::{ColorEffect, Field};
pub use grid::{FieldGrid, GridSummary, DEFAULT_SIDE};
pub use module::{ModuleBoard, ModuleChanges, ModuleError, SensorEnable, SensorKind, SensorModule};
pub use module_controller::{ModuleCommand, ModuleCommandError, ModuleController, ModuleOutcome, ModuleTickReport};
pub use rotation::Rotation;
pub use scanner::{BoardScanner, CalibrationReport, FieldChange, ScanPhase, ScanReport};
pub use sector::{SectorReader, SectorReading, SectorSource};
pub use sensor::{Direction, Sensor, Threshold};
pub use status::{DeviceId, FieldRecord, StatusError, StatusPacket, StatusUpdate};
pub use traits::{
    // Hardware
    AnalogInput,
    // Observer
    BoardObserver,
    // LEDs
    PixelDriver,
    PortExpander,
    Rgb,
    // Network
    StatusTransport,
};

// Config re-exports
pub use config::{BoardConfig, Config, DeviceConfig, NetworkConfig, SensorConfig, WifiConfig};
