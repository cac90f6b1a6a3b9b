//! Hardware abstraction traits for sensor multiplexing and analog input.
//!
//! These traits let the scanner run against real expanders and ADCs on the
//! ESP32 as well as against desktop mocks.
//!
//! # Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`PortExpander`] | 16-bit output/input port behind I2C |
//! | [`AnalogInput`] | Raw HAL sensor reading through the analog multiplexer |
//!
//! I2C buses and blocking delays use the `embedded-hal` 1.0 traits directly
//! (`I2c`, `DelayNs`, `InputPin`), so they are not redefined here.
//!
//! # Implementation
//!
//! For testing and desktop development, use the mock implementations
//! from [`crate::hal::mock`]. For ESP32 hardware, use the
//! implementations from `hal::esp32` (requires `esp32` feature).
//!
//! # Example
//!
//! ```rust
//! use smartboard::traits::{AnalogInput, PortExpander};
//! use smartboard::hal::MockSensorArray;
//!
//! let array = MockSensorArray::new();
//! let (mut expander, mut analog) = array.split();
//!
//! expander.write16(0x0FFE).unwrap();
//! assert_eq!(expander.read16().unwrap(), 0x0FFE);
//! assert_eq!(analog.read_averaged(10).unwrap(), 0);
//! ```

/// A 16-bit I2C port expander (PCF8575 style).
///
/// The sector reader drives all 16 outputs at once: the low 12 bits select
/// a sensor group and the high 4 bits select the analog multiplexer channel.
///
/// # Implementation Notes
///
/// - If the expander sits behind an I2C channel switch, the switch must be
///   re-selected before every transaction
/// - A failed transaction is reported as an error, never as data
pub trait PortExpander {
    /// Error type for bus operations.
    type Error: core::fmt::Debug;

    /// Sets all 16 outputs.
    fn write16(&mut self, mask: u16) -> Result<(), Self::Error>;

    /// Latches and returns all 16 inputs.
    fn read16(&mut self) -> Result<u16, Self::Error>;
}

/// Analog input wired to the output of the sensor multiplexer.
///
/// # Implementation Notes
///
/// - `read_raw()` performs one conversion
/// - Values are raw ADC counts; only their ratio to the calibration baseline
///   matters
pub trait AnalogInput {
    /// Error type for conversions.
    type Error: core::fmt::Debug;

    /// Performs a single conversion.
    fn read_raw(&mut self) -> Result<u16, Self::Error>;

    /// Averages `samples` conversions (integer mean, truncated).
    ///
    /// A sample count of zero performs a single conversion.
    fn read_averaged(&mut self, samples: u16) -> Result<u16, Self::Error> {
        if samples == 0 {
            return self.read_raw();
        }
        let mut sum: u32 = 0;
        for _ in 0..samples {
            sum += u32::from(self.read_raw()?);
        }
        Ok((sum / u32::from(samples)) as u16)
    }
}
