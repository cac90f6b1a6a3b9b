//! I2C port expander drivers.
//!
//! Two chips are in use on SmartBoard hardware:
//!
//! - **PCF8575**: quasi-bidirectional 16-bit port without registers. The
//!   analog sensor boards drive their group select and multiplexer channel
//!   lines through it.
//! - **PCA9555**: 16-bit port with input/output/config registers. The module
//!   boards read digital HAL switches, buttons and interrupt lines through
//!   seven of them per module.
//!
//! Both may sit behind a TCA9548 I2C switch. [`ChannelSelect`] re-asserts the
//! switch channel before every single transaction, since another driver on
//! the same bus may have moved it in between.
//!
//! The drivers borrow the bus per call so several of them can share one
//! `embedded-hal` [`I2c`] instance. [`Attached`] binds a PCF8575 to an owned
//! bus and implements [`PortExpander`] for the sector reader.

use embedded_hal::i2c::I2c;

use crate::traits::PortExpander;

/// Out-of-range value returned by [`Pca9555::read_register`] when the chip
/// does not answer. Valid register contents are `0..=255`.
pub const BUS_FAULT: u16 = 256;

/// Default I2C address of a TCA9548 switch.
pub const TCA9548_ADDRESS: u8 = 0x70;

/// Default I2C address of the PCF8575 on analog sensor boards.
pub const PCF8575_ADDRESS: u8 = 0x20;

/// Upstream TCA9548 channel that must be selected before talking to a chip.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChannelSelect {
    /// Address of the switch.
    pub address: u8,
    /// Downstream channel, `0..=7`.
    pub channel: u8,
}

impl ChannelSelect {
    /// Creates a selector for `channel` on the switch at `address`.
    pub const fn new(address: u8, channel: u8) -> Self {
        Self { address, channel }
    }

    /// Control byte written to the switch (one bit per channel).
    #[inline]
    pub const fn control_byte(&self) -> u8 {
        1 << (self.channel & 0x07)
    }

    /// Routes the bus to the configured channel.
    pub fn select<I: I2c>(&self, i2c: &mut I) -> Result<(), I::Error> {
        i2c.write(self.address, &[self.control_byte()])
    }
}

#[inline]
fn reselect<I: I2c>(select: &Option<ChannelSelect>, i2c: &mut I) -> Result<(), I::Error> {
    match select {
        Some(switch) => switch.select(i2c),
        None => Ok(()),
    }
}

// ============================================================================
// PCF8575
// ============================================================================

/// PCF8575 16-bit quasi-bidirectional port.
///
/// Port 0 (P00..P07) is the low byte of every mask, port 1 the high byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pcf8575 {
    address: u8,
    select: Option<ChannelSelect>,
}

impl Pcf8575 {
    /// Chip at `address` directly on the bus.
    pub const fn new(address: u8) -> Self {
        Self {
            address,
            select: None,
        }
    }

    /// Chip at `address` behind a TCA9548 channel.
    pub const fn behind(address: u8, select: ChannelSelect) -> Self {
        Self {
            address,
            select: Some(select),
        }
    }

    /// I2C address of the chip.
    pub const fn address(&self) -> u8 {
        self.address
    }

    /// Drives all 16 lines.
    pub fn write16<I: I2c>(&self, i2c: &mut I, mask: u16) -> Result<(), I::Error> {
        reselect(&self.select, i2c)?;
        i2c.write(self.address, &mask.to_le_bytes())
    }

    /// Latches all 16 lines.
    pub fn read16<I: I2c>(&self, i2c: &mut I) -> Result<u16, I::Error> {
        reselect(&self.select, i2c)?;
        let mut buf = [0u8; 2];
        i2c.read(self.address, &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    /// Binds the chip to an owned bus.
    pub fn attach<I: I2c>(self, i2c: I) -> Attached<I> {
        Attached { i2c, chip: self }
    }
}

/// A [`Pcf8575`] that owns its bus.
#[derive(Debug)]
pub struct Attached<I> {
    i2c: I,
    chip: Pcf8575,
}

impl<I: I2c> Attached<I> {
    /// The underlying chip description.
    pub fn chip(&self) -> &Pcf8575 {
        &self.chip
    }

    /// Releases the bus.
    pub fn release(self) -> I {
        self.i2c
    }
}

impl<I: I2c> PortExpander for Attached<I> {
    type Error = I::Error;

    fn write16(&mut self, mask: u16) -> Result<(), Self::Error> {
        self.chip.write16(&mut self.i2c, mask)
    }

    fn read16(&mut self) -> Result<u16, Self::Error> {
        self.chip.read16(&mut self.i2c)
    }
}

// ============================================================================
// PCA9555
// ============================================================================

/// PCA9555 register map.
pub mod reg {
    /// Input port 0.
    pub const INPUT_0: u8 = 0x00;
    /// Input port 1.
    pub const INPUT_1: u8 = 0x01;
    /// Output port 0.
    pub const OUTPUT_0: u8 = 0x02;
    /// Output port 1.
    pub const OUTPUT_1: u8 = 0x03;
    /// Polarity inversion port 0.
    pub const POLARITY_0: u8 = 0x04;
    /// Polarity inversion port 1.
    pub const POLARITY_1: u8 = 0x05;
    /// Configuration port 0 (1 = input).
    pub const CONFIG_0: u8 = 0x06;
    /// Configuration port 1 (1 = input).
    pub const CONFIG_1: u8 = 0x07;
}

/// PCA9555 16-bit register-based port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pca9555 {
    address: u8,
    select: Option<ChannelSelect>,
}

impl Pca9555 {
    /// Chip at `address` directly on the bus.
    pub const fn new(address: u8) -> Self {
        Self {
            address,
            select: None,
        }
    }

    /// Chip at `address` behind a TCA9548 channel.
    pub const fn behind(address: u8, select: ChannelSelect) -> Self {
        Self {
            address,
            select: Some(select),
        }
    }

    /// I2C address of the chip.
    pub const fn address(&self) -> u8 {
        self.address
    }

    /// Checks that the chip acknowledges a register pointer write.
    pub fn responds<I: I2c>(&self, i2c: &mut I) -> bool {
        reselect(&self.select, i2c)
            .and_then(|_| i2c.write(self.address, &[reg::OUTPUT_0]))
            .is_ok()
    }

    /// Writes one register.
    pub fn write_register<I: I2c>(&self, i2c: &mut I, register: u8, value: u8) -> Result<(), I::Error> {
        reselect(&self.select, i2c)?;
        i2c.write(self.address, &[register, value])
    }

    /// Reads one register, returning [`BUS_FAULT`] if the chip does not
    /// answer.
    pub fn read_register<I: I2c>(&self, i2c: &mut I, register: u8) -> u16 {
        let mut buf = [0u8; 1];
        let result = reselect(&self.select, i2c)
            .and_then(|_| i2c.write_read(self.address, &[register], &mut buf));
        match result {
            Ok(()) => u16::from(buf[0]),
            Err(_) => BUS_FAULT,
        }
    }

    /// Sets the direction of both ports (1 = input).
    pub fn configure<I: I2c>(&self, i2c: &mut I, port0: u8, port1: u8) -> Result<(), I::Error> {
        self.write_register(i2c, reg::CONFIG_0, port0)?;
        self.write_register(i2c, reg::CONFIG_1, port1)
    }

    /// Reads both input ports as one 16-bit value, or `None` on a bus fault.
    pub fn read_inputs<I: I2c>(&self, i2c: &mut I) -> Option<u16> {
        let low = self.read_register(i2c, reg::INPUT_0);
        let high = self.read_register(i2c, reg::INPUT_1);
        if low == BUS_FAULT || high == BUS_FAULT {
            None
        } else {
            Some(low | (high << 8))
        }
    }
}
