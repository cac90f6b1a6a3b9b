//! Module-variant boards with digital HAL switches.
//!
//! A later board revision replaces the analog scan with digital switches.
//! Each 4x4-field module carries seven PCA9555 expanders behind one TCA9548
//! channel:
//!
//! | Address | Chip | Pins |
//! |---------|------|------|
//! | `0x20` | buttons | one per field, active high |
//! | `0x21..=0x24` | sectors 0-3 | 4 fields x 4 edges, active low |
//! | `0x25` | board sensors | one per field, active low |
//! | `0x26` | interrupt aggregator | active low |
//!
//! The interrupt aggregator collects the INT lines of the other chips. When
//! the module's GPIO interrupt line is low, [`SensorModule::poll`] reads the
//! aggregator and refreshes only the chips whose lines are asserted.
//!
//! A [`ModuleBoard`] combines four modules on channels 0-3 and builds the
//! 40-byte sensor update packet:
//!
//! ```text
//! bytes 0..6   MAC address
//! byte  6      device type, 1 = board
//! byte  7      event type: 0 button, 1 board, 2 edge
//! bytes 8..    state bytes: 2 per module (button/board) or 8 per module (edge)
//! ```

use core::fmt;

use embedded_hal::digital::InputPin;
use embedded_hal::i2c::I2c;
use log::{debug, info, warn};

use crate::expander::{ChannelSelect, Pca9555};

/// I2C addresses of the chips on one module.
pub mod address {
    /// Button chip.
    pub const BUTTONS: u8 = 0x20;
    /// Edge sensors of sector 0.
    pub const SECTOR_0: u8 = 0x21;
    /// Edge sensors of sector 1.
    pub const SECTOR_1: u8 = 0x22;
    /// Edge sensors of sector 2.
    pub const SECTOR_2: u8 = 0x23;
    /// Edge sensors of sector 3.
    pub const SECTOR_3: u8 = 0x24;
    /// Board (corner) sensors.
    pub const BOARD: u8 = 0x25;
    /// Interrupt aggregator.
    pub const IRQ: u8 = 0x26;

    /// All sector chips in sector order.
    pub const SECTORS: [u8; 4] = [SECTOR_0, SECTOR_1, SECTOR_2, SECTOR_3];
}

/// Pins of the interrupt aggregator.
pub mod irq_pin {
    /// INT line of the board sensor chip.
    pub const BOARD: u8 = 8;
    /// INT line of the button chip.
    pub const BUTTONS: u8 = 10;
    /// INT lines of the sector chips, in sector order.
    pub const SECTORS: [u8; 4] = [0, 7, 15, 9];
}

/// Configuration of the interrupt aggregator: unused pins become outputs.
pub const IRQ_CONFIG: (u8, u8) = (0x81, 0x87);

/// Chips per module.
pub const CHIPS: usize = 7;

/// Modules per board.
pub const MODULES: usize = 4;

/// Size of a sensor update packet.
pub const SENSOR_UPDATE_LEN: usize = 40;

/// Device type byte of a board.
pub const DEVICE_TYPE_BOARD: u8 = 1;

// ============================================================================
// Sensor kinds and enable flags
// ============================================================================

/// Kind of sensor on a module, also the event type on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SensorKind {
    /// Field push buttons.
    Button = 0,
    /// Corner sensors detecting a tile.
    Board = 1,
    /// Edge sensors detecting a figure's direction.
    Edge = 2,
}

impl SensorKind {
    /// All kinds in wire order.
    pub const ALL: [SensorKind; 3] = [SensorKind::Button, SensorKind::Board, SensorKind::Edge];

    /// Bytes one module contributes to a sensor update.
    pub const fn state_len(self) -> usize {
        match self {
            SensorKind::Button | SensorKind::Board => 2,
            SensorKind::Edge => 8,
        }
    }
}

/// Which sensor kinds are read and reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorEnable {
    /// Report button presses.
    pub button: bool,
    /// Report board sensor changes.
    pub board: bool,
    /// Report edge sensor changes.
    pub edge: bool,
}

impl Default for SensorEnable {
    fn default() -> Self {
        Self::ALL
    }
}

impl SensorEnable {
    /// Everything enabled.
    pub const ALL: SensorEnable = SensorEnable {
        button: true,
        board: true,
        edge: true,
    };

    /// Decodes the ENABLE_SENSOR flag byte (bit 0 edge, bit 1 button,
    /// bit 2 board).
    ///
    /// ```
    /// use smartboard::module::SensorEnable;
    ///
    /// let flags = SensorEnable::from_wire(0b010);
    /// assert!(flags.button && !flags.board && !flags.edge);
    /// ```
    pub const fn from_wire(flags: u8) -> Self {
        Self {
            edge: flags & 0b001 != 0,
            button: flags & 0b010 != 0,
            board: flags & 0b100 != 0,
        }
    }

    /// Returns whether `kind` is enabled.
    pub const fn is_enabled(&self, kind: SensorKind) -> bool {
        match kind {
            SensorKind::Button => self.button,
            SensorKind::Board => self.board,
            SensorKind::Edge => self.edge,
        }
    }
}

/// Sensor kinds that changed during a poll.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ModuleChanges {
    /// A button was pressed.
    pub button: bool,
    /// Board sensors changed.
    pub board: bool,
    /// Edge sensors changed.
    pub edge: bool,
}

impl ModuleChanges {
    /// Returns true if anything changed.
    pub fn any(&self) -> bool {
        self.button || self.board || self.edge
    }

    /// Returns whether `kind` changed.
    pub fn contains(&self, kind: SensorKind) -> bool {
        match kind {
            SensorKind::Button => self.button,
            SensorKind::Board => self.board,
            SensorKind::Edge => self.edge,
        }
    }

    /// Kinds that changed, in wire order.
    pub fn kinds(&self) -> impl Iterator<Item = SensorKind> + '_ {
        SensorKind::ALL.into_iter().filter(move |k| self.contains(*k))
    }

    fn merge(&mut self, other: ModuleChanges) {
        self.button |= other.button;
        self.board |= other.board;
        self.edge |= other.edge;
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Errors from module set-up and state export.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModuleError {
    /// A chip did not acknowledge during set-up.
    NotResponding {
        /// Switch channel of the module.
        channel: u8,
        /// Chip address.
        address: u8,
    },
    /// Destination buffer too small for the sensor state.
    BufferTooSmall {
        /// Bytes required.
        needed: usize,
        /// Bytes available.
        available: usize,
    },
}

impl fmt::Display for ModuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleError::NotResponding { channel, address } => {
                write!(f, "chip 0x{:02X} on channel {} not responding", address, channel)
            }
            ModuleError::BufferTooSmall { needed, available } => {
                write!(f, "state buffer too small: need {} bytes, have {}", needed, available)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ModuleError {}

// ============================================================================
// Sensor Module
// ============================================================================

#[inline]
const fn slot(address: u8) -> usize {
    (address - address::BUTTONS) as usize
}

#[inline]
const fn idle_pattern(address: u8) -> u16 {
    if address == address::BUTTONS {
        0x0000
    } else {
        0xFFFF
    }
}

/// One 4x4-field module behind a TCA9548 channel.
#[derive(Clone, Debug)]
pub struct SensorModule {
    select: ChannelSelect,
    states: [u16; CHIPS],
    enabled: SensorEnable,
}

impl SensorModule {
    /// Creates a module on `select`. All chips start in their idle pattern.
    pub fn new(select: ChannelSelect) -> Self {
        let mut states = [0u16; CHIPS];
        for (i, state) in states.iter_mut().enumerate() {
            *state = idle_pattern(address::BUTTONS + i as u8);
        }
        Self {
            select,
            states,
            enabled: SensorEnable::ALL,
        }
    }

    /// Switch channel of this module.
    pub fn channel(&self) -> u8 {
        self.select.channel
    }

    #[inline]
    fn chip(&self, address: u8) -> Pca9555 {
        Pca9555::behind(address, self.select)
    }

    /// Checks and configures all seven chips and reads their initial state.
    ///
    /// Missing chips are skipped; the first one is reported after every
    /// other chip was set up.
    pub fn begin<I: I2c>(&mut self, i2c: &mut I) -> Result<(), ModuleError> {
        let mut missing = None;

        for address in address::BUTTONS..=address::IRQ {
            let chip = self.chip(address);
            if !chip.responds(i2c) {
                warn!("Module {}: chip 0x{:02X} not responding", self.select.channel, address);
                missing.get_or_insert(ModuleError::NotResponding {
                    channel: self.select.channel,
                    address,
                });
                continue;
            }

            let (port0, port1) = if address == address::IRQ {
                IRQ_CONFIG
            } else {
                (0xFF, 0xFF)
            };
            if let Err(e) = chip.configure(i2c, port0, port1) {
                warn!("Module {}: configuring 0x{:02X} failed: {:?}", self.select.channel, address, e);
            }
            // Pieces may already sit on the board
            self.refresh(i2c, address);
        }

        match missing {
            Some(error) => Err(error),
            None => {
                info!("Module {} ready", self.select.channel);
                Ok(())
            }
        }
    }

    fn refresh<I: I2c>(&mut self, i2c: &mut I, address: u8) -> u16 {
        let state = match self.chip(address).read_inputs(i2c) {
            Some(value) => value,
            None => {
                warn!(
                    "Module {}: read of 0x{:02X} failed, assuming idle",
                    self.select.channel, address
                );
                idle_pattern(address)
            }
        };
        self.states[slot(address)] = state;
        state
    }

    /// Raw pin state of the chip at `address` as last read.
    pub fn pin_states(&self, address: u8) -> u16 {
        self.states[slot(address)]
    }

    /// Returns true if `pin` of the chip at `address` is active, honouring
    /// the chip's polarity.
    pub fn is_active(&self, address: u8, pin: u8) -> bool {
        let high = self.states[slot(address)] & (1 << pin) != 0;
        if address == address::BUTTONS {
            high
        } else {
            !high
        }
    }

    /// Active pins of the chip at `address` as a bitmask.
    pub fn active_mask(&self, address: u8) -> u16 {
        let raw = self.states[slot(address)];
        if address == address::BUTTONS {
            raw
        } else {
            !raw
        }
    }

    /// Selects which sensor kinds are read and reported.
    pub fn enable_sensors(&mut self, enabled: SensorEnable) {
        self.enabled = enabled;
    }

    /// Current enable flags.
    pub fn enabled(&self) -> SensorEnable {
        self.enabled
    }

    /// Handles the module interrupt line.
    ///
    /// Does nothing unless `irq_asserted`. Otherwise reads the interrupt
    /// aggregator and refreshes only the chips whose lines are asserted and
    /// whose kind is enabled. Buttons report only a press, i.e. when every
    /// button was released before.
    pub fn poll<I: I2c>(&mut self, i2c: &mut I, irq_asserted: bool) -> ModuleChanges {
        let mut changes = ModuleChanges::default();
        if !irq_asserted {
            return changes;
        }

        debug!("Module {}: interrupt", self.select.channel);
        self.refresh(i2c, address::IRQ);

        if self.enabled.board && self.is_active(address::IRQ, irq_pin::BOARD) {
            self.refresh(i2c, address::BOARD);
            changes.board = true;
        }

        if self.enabled.button && self.is_active(address::IRQ, irq_pin::BUTTONS) {
            let before = self.states[slot(address::BUTTONS)];
            self.refresh(i2c, address::BUTTONS);
            changes.button = before == 0;
        }

        if self.enabled.edge {
            for (sector, pin) in irq_pin::SECTORS.iter().enumerate() {
                if self.is_active(address::IRQ, *pin) {
                    self.refresh(i2c, address::SECTORS[sector]);
                    changes.edge = true;
                }
            }
        }

        changes
    }

    /// Writes the active bits of `kind` into `dest` (little endian per chip)
    /// and returns the number of bytes written.
    pub fn write_sensor_state(&self, kind: SensorKind, dest: &mut [u8]) -> Result<usize, ModuleError> {
        let needed = kind.state_len();
        if dest.len() < needed {
            return Err(ModuleError::BufferTooSmall {
                needed,
                available: dest.len(),
            });
        }

        match kind {
            SensorKind::Button => {
                dest[..2].copy_from_slice(&self.active_mask(address::BUTTONS).to_le_bytes())
            }
            SensorKind::Board => {
                dest[..2].copy_from_slice(&self.active_mask(address::BOARD).to_le_bytes())
            }
            SensorKind::Edge => {
                for (chunk, sector) in dest[..8].chunks_exact_mut(2).zip(address::SECTORS) {
                    chunk.copy_from_slice(&self.active_mask(sector).to_le_bytes());
                }
            }
        }

        Ok(needed)
    }
}

// ============================================================================
// Module Board
// ============================================================================

/// Four modules on switch channels 0 to 3.
#[derive(Clone, Debug)]
pub struct ModuleBoard {
    modules: [SensorModule; MODULES],
}

impl ModuleBoard {
    /// Creates a board whose switch sits at `switch_address`.
    pub fn new(switch_address: u8) -> Self {
        Self {
            modules: core::array::from_fn(|i| {
                SensorModule::new(ChannelSelect::new(switch_address, i as u8))
            }),
        }
    }

    /// The modules in channel order.
    pub fn modules(&self) -> &[SensorModule; MODULES] {
        &self.modules
    }

    /// Sets up every module. Returns the first failure after all modules
    /// were attempted.
    pub fn begin<I: I2c>(&mut self, i2c: &mut I) -> Result<(), ModuleError> {
        let mut first_error = None;
        for module in &mut self.modules {
            if let Err(e) = module.begin(i2c) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Applies the same enable flags to every module.
    pub fn enable_sensors(&mut self, enabled: SensorEnable) {
        info!(
            "Update sensor usage, board {}, button {}, edge {}",
            enabled.board, enabled.button, enabled.edge
        );
        for module in &mut self.modules {
            module.enable_sensors(enabled);
        }
    }

    /// Polls every module with its interrupt state and merges the changes.
    pub fn poll<I: I2c>(&mut self, i2c: &mut I, irq_asserted: [bool; MODULES]) -> ModuleChanges {
        let mut changes = ModuleChanges::default();
        for (module, asserted) in self.modules.iter_mut().zip(irq_asserted) {
            changes.merge(module.poll(i2c, asserted));
        }
        changes
    }

    /// Reads the (active-low) interrupt lines and polls the modules.
    ///
    /// A line that cannot be read counts as not asserted.
    pub fn poll_pins<I: I2c, P: InputPin>(
        &mut self,
        i2c: &mut I,
        irq_pins: &mut [P; MODULES],
    ) -> ModuleChanges {
        let mut asserted = [false; MODULES];
        for (flag, pin) in asserted.iter_mut().zip(irq_pins.iter_mut()) {
            *flag = pin.is_low().unwrap_or(false);
        }
        self.poll(i2c, asserted)
    }

    /// Concatenates the sensor state of every module into `dest`.
    pub fn write_sensor_state(&self, kind: SensorKind, dest: &mut [u8]) -> Result<usize, ModuleError> {
        let per_module = kind.state_len();
        let needed = per_module * MODULES;
        if dest.len() < needed {
            return Err(ModuleError::BufferTooSmall {
                needed,
                available: dest.len(),
            });
        }
        for (module, chunk) in self.modules.iter().zip(dest.chunks_exact_mut(per_module)) {
            module.write_sensor_state(kind, chunk)?;
        }
        Ok(needed)
    }

    /// Builds the 40-byte sensor update packet for `kind`.
    pub fn sensor_update(&self, kind: SensorKind, mac: [u8; 6]) -> [u8; SENSOR_UPDATE_LEN] {
        let mut packet = [0u8; SENSOR_UPDATE_LEN];
        packet[..6].copy_from_slice(&mac);
        packet[6] = DEVICE_TYPE_BOARD;
        packet[7] = kind as u8;
        // 8 header bytes plus at most 32 state bytes always fit
        let _ = self.write_sensor_state(kind, &mut packet[8..]);
        packet
    }
}
