//! HAL sensor input via the ESP32 ADC.
//!
//! All sensors share one analog line: the expander selects a group and a
//! multiplexer channel, and the multiplexer output sits on GPIO4.
//!
//! # Wiring
//!
//! - Multiplexer SIG → GPIO4 (ADC1)
//!
//! Note: On ESP32-C3, GPIO4 is on ADC1. ADC2 conflicts with WiFi, so the
//! sensor line must stay on ADC1.

use crate::traits::AnalogInput;
use esp_idf_hal::adc::attenuation::DB_11;
use esp_idf_hal::adc::oneshot::config::AdcChannelConfig;
use esp_idf_hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
use esp_idf_hal::adc::ADC1;
use esp_idf_hal::gpio::Gpio4;
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::sys::EspError;

/// ADC channel behind the sensor multiplexer.
///
/// # Example
///
/// ```ignore
/// use smartboard::hal::esp32::Esp32Analog;
/// use smartboard::traits::AnalogInput;
///
/// let peripherals = Peripherals::take()?;
/// let adc1 = AdcDriver::new(peripherals.adc1)?;
/// let mut analog = Esp32Analog::new(&adc1, peripherals.pins.gpio4)?;
///
/// let value = analog.read_averaged(10)?;
/// ```
pub struct Esp32Analog<'d> {
    channel: AdcChannelDriver<'d, Gpio4, &'d AdcDriver<'d, ADC1>>,
}

impl<'d> Esp32Analog<'d> {
    /// Creates the sensor input on GPIO4 with full-range attenuation.
    ///
    /// # Errors
    ///
    /// Returns an error if ADC channel initialization fails.
    pub fn new(
        adc: &'d AdcDriver<'d, ADC1>,
        pin: impl Peripheral<P = Gpio4> + 'd,
    ) -> Result<Self, EspError> {
        let config = AdcChannelConfig {
            attenuation: DB_11,
            ..Default::default()
        };
        let channel = AdcChannelDriver::new(adc, pin, &config)?;
        Ok(Self { channel })
    }
}

impl AnalogInput for Esp32Analog<'_> {
    type Error = EspError;

    fn read_raw(&mut self) -> Result<u16, Self::Error> {
        self.channel.read()
    }
}
