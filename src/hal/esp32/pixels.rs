//! WS2812 strip driver using the ESP32 RMT peripheral.
//!
//! One pixel sits under every field. Colours are buffered and sent as one
//! RMT frame on [`show`](crate::traits::PixelDriver::show), in GRB order and
//! scaled by the global brightness.

use crate::traits::{PixelDriver, Rgb};
use esp_idf_hal::gpio::OutputPin;
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::rmt::config::TransmitConfig;
use esp_idf_hal::rmt::{PinState, Pulse, RmtChannel, TxRmtDriver, VariableLengthSignal};
use esp_idf_hal::sys::EspError;
use std::time::Duration;

/// Bit timings for WS2812 at 800kHz.
const T0H_NS: u64 = 350;
const T0L_NS: u64 = 800;
const T1H_NS: u64 = 700;
const T1L_NS: u64 = 600;

/// WS2812 strip on an RMT channel.
pub struct Esp32Pixels {
    tx: TxRmtDriver<'static>,
    buffer: Vec<Rgb>,
    brightness: u8,
}

impl Esp32Pixels {
    /// Creates a strip of `len` pixels on `pin`.
    ///
    /// # Errors
    ///
    /// Returns an error if the RMT channel cannot be configured.
    pub fn new<C: RmtChannel, P: OutputPin>(
        channel: impl Peripheral<P = C> + 'static,
        pin: impl Peripheral<P = P> + 'static,
        len: usize,
    ) -> Result<Self, EspError> {
        let config = TransmitConfig::new().clock_divider(1);
        let tx = TxRmtDriver::new(channel, pin, &config)?;
        Ok(Self {
            tx,
            buffer: vec![Rgb::OFF; len],
            brightness: 255,
        })
    }

    /// Number of pixels on the strip.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if the strip has no pixels.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    #[inline]
    fn scale(&self, channel: u8) -> u8 {
        ((u16::from(channel) * (u16::from(self.brightness) + 1)) >> 8) as u8
    }
}

impl PixelDriver for Esp32Pixels {
    type Error = EspError;

    fn set_pixel(&mut self, index: u16, color: Rgb) -> Result<(), Self::Error> {
        if let Some(pixel) = self.buffer.get_mut(usize::from(index)) {
            *pixel = color;
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<(), Self::Error> {
        self.buffer.fill(Rgb::OFF);
        Ok(())
    }

    fn set_brightness(&mut self, level: u8) -> Result<(), Self::Error> {
        self.brightness = level;
        Ok(())
    }

    fn show(&mut self) -> Result<(), Self::Error> {
        let ticks_hz = self.tx.counter_clock()?;
        let t0h = Pulse::new_with_duration(ticks_hz, PinState::High, &Duration::from_nanos(T0H_NS))?;
        let t0l = Pulse::new_with_duration(ticks_hz, PinState::Low, &Duration::from_nanos(T0L_NS))?;
        let t1h = Pulse::new_with_duration(ticks_hz, PinState::High, &Duration::from_nanos(T1H_NS))?;
        let t1l = Pulse::new_with_duration(ticks_hz, PinState::Low, &Duration::from_nanos(T1L_NS))?;

        let mut signal = VariableLengthSignal::with_capacity(self.buffer.len() * 24);
        for pixel in &self.buffer {
            let grb = (u32::from(self.scale(pixel.g)) << 16)
                | (u32::from(self.scale(pixel.r)) << 8)
                | u32::from(self.scale(pixel.b));
            for bit in (0..24).rev() {
                if (grb >> bit) & 1 == 1 {
                    signal.push([&t1h, &t1l])?;
                } else {
                    signal.push([&t0h, &t0l])?;
                }
            }
        }

        self.tx.start_blocking(&signal)
    }
}
