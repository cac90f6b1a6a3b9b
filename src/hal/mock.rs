//! Mock implementations for testing without hardware.
//!
//! This module provides test doubles for the hardware and network traits,
//! so the scanner, controller and module drivers can be exercised on the
//! desktop.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockI2c`] | `embedded_hal::i2c::I2c` | Records transactions, simulates PCA9555 chips |
//! | [`MockPin`] | `embedded_hal::digital::InputPin` | Fixed interrupt line level |
//! | [`MockDelay`] | `embedded_hal::delay::DelayNs` | Sums requested delays |
//! | [`MockSensorArray`] | [`PortExpander`] + [`AnalogInput`] | Analog sensor board model |
//! | [`MockSectors`] | [`SectorSource`] | Per-group readings without masks |
//! | [`MockPixels`] | [`PixelDriver`] | Buffered LED strip |
//! | [`MockTransport`] | [`StatusTransport`] | Captures datagrams, queues commands |
//! | [`MockObserver`] | [`BoardObserver`] | Counts change notifications, records phases |
//!
//! # Example
//!
//! ```rust
//! use smartboard::{BoardScanner, Rotation, SensorConfig};
//! use smartboard::hal::MockSectors;
//!
//! let mut scanner: BoardScanner<_, 6> =
//!     BoardScanner::new(MockSectors::uniform(50), Rotation::Deg0, SensorConfig::default());
//! scanner.calibrate();
//!
//! // A magnet over group 0, channel 0
//! scanner.source_mut().set(0, 0, 120);
//! assert!(scanner.scan_cycle(&mut ()).changed());
//! ```
//!
//! [`PortExpander`]: crate::traits::PortExpander
//! [`AnalogInput`]: crate::traits::AnalogInput
//! [`SectorSource`]: crate::sector::SectorSource
//! [`PixelDriver`]: crate::traits::PixelDriver
//! [`StatusTransport`]: crate::traits::StatusTransport
//! [`BoardObserver`]: crate::traits::BoardObserver

use alloc::collections::VecDeque;
use alloc::rc::Rc;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::convert::Infallible;
use core::net::SocketAddrV4;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital;
use embedded_hal::i2c::{self, ErrorKind, NoAcknowledgeSource, Operation};

use crate::grid::FieldGrid;
use crate::scanner::{FieldChange, ScanPhase};
use crate::sector::{group_index, SectorReading, SectorSource, CHANNEL_SHIFT, MAX_GROUPS, SENSORS_PER_GROUP};
use crate::traits::{AnalogInput, BoardObserver, PixelDriver, PortExpander, Rgb, StatusTransport};

// ============================================================================
// I2C Bus Mock
// ============================================================================

/// One recorded I2C transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum I2cOp {
    /// Write of the given bytes.
    Write(u8, Vec<u8>),
    /// Read of the given length.
    Read(u8, usize),
    /// Register pointer write followed by a read of the given length.
    WriteRead(u8, Vec<u8>, usize),
}

/// Error returned by [`MockI2c`] for failing or absent devices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MockI2cError {
    /// Address that did not acknowledge.
    pub address: u8,
}

impl i2c::Error for MockI2cError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
    }
}

#[derive(Clone, Debug)]
struct SimChip {
    channel: Option<u8>,
    address: u8,
    registers: [u8; 8],
    pointer: u8,
}

/// Mock I2C bus.
///
/// Works in two modes:
///
/// - **Scripted**: without simulated chips or switch, every address
///   acknowledges and reads are served from [`queue_read`](Self::queue_read)
///   (zeros when the queue is empty).
/// - **Simulated**: once a switch or a chip is registered, only those
///   addresses acknowledge. Chips behave like PCA9555 register files and
///   are looked up by the currently selected switch channel.
///
/// Every transaction is recorded in [`ops`](Self::ops).
///
/// # Example
///
/// ```rust
/// use smartboard::expander::{ChannelSelect, Pca9555};
/// use smartboard::hal::MockI2c;
///
/// let mut bus = MockI2c::new().with_switch(0x70);
/// bus.add_chip(Some(1), 0x25);
/// bus.set_inputs(Some(1), 0x25, 0xBEEF);
///
/// let chip = Pca9555::behind(0x25, ChannelSelect::new(0x70, 1));
/// assert_eq!(chip.read_inputs(&mut bus), Some(0xBEEF));
///
/// // Same address on another channel is absent
/// let other = Pca9555::behind(0x25, ChannelSelect::new(0x70, 2));
/// assert!(!other.responds(&mut bus));
/// ```
#[derive(Clone, Debug, Default)]
pub struct MockI2c {
    /// All transactions in order.
    pub ops: Vec<I2cOp>,
    reads: VecDeque<Vec<u8>>,
    failing: Vec<u8>,
    switch: Option<u8>,
    channel: Option<u8>,
    chips: Vec<SimChip>,
}

impl MockI2c {
    /// Creates a scripted bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a TCA9548 switch at `address`.
    pub fn with_switch(mut self, address: u8) -> Self {
        self.switch = Some(address);
        self
    }

    /// Queues the bytes returned by the next scripted read.
    pub fn queue_read(&mut self, bytes: &[u8]) {
        self.reads.push_back(bytes.to_vec());
    }

    /// Makes every transaction to `address` fail.
    pub fn fail_address(&mut self, address: u8) {
        if !self.failing.contains(&address) {
            self.failing.push(address);
        }
    }

    /// Lets `address` acknowledge again.
    pub fn restore_address(&mut self, address: u8) {
        self.failing.retain(|a| *a != address);
    }

    /// Adds a simulated PCA9555 at `address`, visible on `channel` (or on
    /// every channel when `None`).
    pub fn add_chip(&mut self, channel: Option<u8>, address: u8) {
        self.chips.push(SimChip {
            channel,
            address,
            // Power-on state: outputs high, no inversion, all inputs
            registers: [0, 0, 0xFF, 0xFF, 0, 0, 0xFF, 0xFF],
            pointer: 0,
        });
    }

    /// Sets the input port levels of a simulated chip.
    pub fn set_inputs(&mut self, channel: Option<u8>, address: u8, value: u16) {
        if let Some(chip) = self.chip_entry(channel, address) {
            let [low, high] = value.to_le_bytes();
            chip.registers[0] = low;
            chip.registers[1] = high;
        }
    }

    /// Register file of a simulated chip.
    pub fn registers(&self, channel: Option<u8>, address: u8) -> Option<[u8; 8]> {
        self.chips
            .iter()
            .find(|c| c.address == address && c.channel == channel)
            .map(|c| c.registers)
    }

    /// Currently selected switch channel.
    pub fn selected_channel(&self) -> Option<u8> {
        self.channel
    }

    fn chip_entry(&mut self, channel: Option<u8>, address: u8) -> Option<&mut SimChip> {
        self.chips
            .iter_mut()
            .find(|c| c.address == address && c.channel == channel)
    }

    fn simulated(&self) -> bool {
        self.switch.is_some() || !self.chips.is_empty()
    }

    fn active_chip(&mut self, address: u8) -> Option<&mut SimChip> {
        let channel = self.channel;
        self.chips
            .iter_mut()
            .find(|c| c.address == address && (c.channel.is_none() || c.channel == channel))
    }

    fn check(&self, address: u8) -> Result<(), MockI2cError> {
        if self.failing.contains(&address) {
            Err(MockI2cError { address })
        } else {
            Ok(())
        }
    }

    fn do_write(&mut self, address: u8, bytes: &[u8]) -> Result<(), MockI2cError> {
        self.check(address)?;
        if self.switch == Some(address) {
            self.channel = bytes
                .first()
                .filter(|b| **b != 0)
                .map(|b| b.trailing_zeros() as u8);
            return Ok(());
        }
        if let Some(chip) = self.active_chip(address) {
            if let Some((pointer, data)) = bytes.split_first() {
                chip.pointer = *pointer & 0x07;
                for value in data {
                    chip.registers[chip.pointer as usize] = *value;
                    chip.pointer = (chip.pointer + 1) & 0x07;
                }
            }
            return Ok(());
        }
        if self.simulated() {
            Err(MockI2cError { address })
        } else {
            Ok(())
        }
    }

    fn do_read(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), MockI2cError> {
        self.check(address)?;
        if let Some(chip) = self.active_chip(address) {
            for byte in buffer.iter_mut() {
                *byte = chip.registers[chip.pointer as usize];
                chip.pointer = (chip.pointer + 1) & 0x07;
            }
            return Ok(());
        }
        if self.simulated() {
            return Err(MockI2cError { address });
        }
        buffer.fill(0);
        if let Some(bytes) = self.reads.pop_front() {
            let len = bytes.len().min(buffer.len());
            buffer[..len].copy_from_slice(&bytes[..len]);
        }
        Ok(())
    }
}

impl i2c::ErrorType for MockI2c {
    type Error = MockI2cError;
}

impl i2c::I2c for MockI2c {
    fn read(&mut self, address: u8, read: &mut [u8]) -> Result<(), Self::Error> {
        self.ops.push(I2cOp::Read(address, read.len()));
        self.do_read(address, read)
    }

    fn write(&mut self, address: u8, write: &[u8]) -> Result<(), Self::Error> {
        self.ops.push(I2cOp::Write(address, write.to_vec()));
        self.do_write(address, write)
    }

    fn write_read(&mut self, address: u8, write: &[u8], read: &mut [u8]) -> Result<(), Self::Error> {
        self.ops
            .push(I2cOp::WriteRead(address, write.to_vec(), read.len()));
        self.do_write(address, write)?;
        self.do_read(address, read)
    }

    fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), Self::Error> {
        for operation in operations {
            match operation {
                Operation::Read(buffer) => self.read(address, buffer)?,
                Operation::Write(bytes) => self.write(address, bytes)?,
            }
        }
        Ok(())
    }
}

/// Input pin with a fixed level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MockPin {
    /// Current level.
    pub high: bool,
}

impl MockPin {
    /// Pin reading low (an asserted interrupt line).
    pub fn low() -> Self {
        Self { high: false }
    }

    /// Pin reading high.
    pub fn high() -> Self {
        Self { high: true }
    }
}

impl digital::ErrorType for MockPin {
    type Error = Infallible;
}

impl digital::InputPin for MockPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.high)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.high)
    }
}

/// Delay that only sums what was requested.
#[derive(Clone, Copy, Debug, Default)]
pub struct MockDelay {
    total_ns: u64,
}

impl MockDelay {
    /// Creates a delay with nothing elapsed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total requested delay in whole milliseconds.
    pub fn total_ms(&self) -> u64 {
        self.total_ns / 1_000_000
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }

    fn delay_us(&mut self, us: u32) {
        self.total_ns += u64::from(us) * 1_000;
    }

    fn delay_ms(&mut self, ms: u32) {
        self.total_ns += u64::from(ms) * 1_000_000;
    }
}

// ============================================================================
// Analog Sensor Board Mock
// ============================================================================

#[derive(Debug)]
struct ArrayState {
    readings: [[u16; SENSORS_PER_GROUP]; MAX_GROUPS],
    mask: u16,
    fail_writes: bool,
    fail_analog: bool,
}

/// Model of an analog sensor board: a PCF8575 driving group and channel
/// lines, and an ADC behind the multiplexer.
///
/// The analog side answers with the reading of whichever group line is low
/// and whichever channel the high nibble selects, so a reader that writes
/// the wrong masks reads the wrong values.
#[derive(Clone, Debug)]
pub struct MockSensorArray {
    state: Rc<RefCell<ArrayState>>,
}

impl Default for MockSensorArray {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSensorArray {
    /// Creates a board with every sensor reading 0 and all lines high.
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(ArrayState {
                readings: [[0; SENSORS_PER_GROUP]; MAX_GROUPS],
                mask: 0xFFFF,
                fail_writes: false,
                fail_analog: false,
            })),
        }
    }

    /// Sets the raw value of `channel` in `group`.
    pub fn set_reading(&self, group: usize, channel: usize, value: u16) {
        self.state.borrow_mut().readings[group][channel] = value;
    }

    /// Last mask successfully written to the expander.
    pub fn last_mask(&self) -> u16 {
        self.state.borrow().mask
    }

    /// Makes every expander write fail.
    pub fn fail_writes(&self, fail: bool) {
        self.state.borrow_mut().fail_writes = fail;
    }

    /// Makes every conversion fail.
    pub fn fail_analog(&self, fail: bool) {
        self.state.borrow_mut().fail_analog = fail;
    }

    /// Returns an expander and an ADC sharing this board.
    pub fn split(&self) -> (MockExpander, MockAnalog) {
        (
            MockExpander {
                state: Rc::clone(&self.state),
            },
            MockAnalog {
                state: Rc::clone(&self.state),
            },
        )
    }
}

/// Error of the sensor array mock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MockArrayError {
    /// Expander did not acknowledge.
    Nack,
    /// Conversion timed out.
    AdcTimeout,
}

/// Expander half of a [`MockSensorArray`].
#[derive(Debug)]
pub struct MockExpander {
    state: Rc<RefCell<ArrayState>>,
}

impl PortExpander for MockExpander {
    type Error = MockArrayError;

    fn write16(&mut self, mask: u16) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.fail_writes {
            return Err(MockArrayError::Nack);
        }
        state.mask = mask;
        Ok(())
    }

    fn read16(&mut self) -> Result<u16, Self::Error> {
        let state = self.state.borrow();
        if state.fail_writes {
            return Err(MockArrayError::Nack);
        }
        Ok(state.mask)
    }
}

/// ADC half of a [`MockSensorArray`].
#[derive(Debug)]
pub struct MockAnalog {
    state: Rc<RefCell<ArrayState>>,
}

impl AnalogInput for MockAnalog {
    type Error = MockArrayError;

    fn read_raw(&mut self) -> Result<u16, Self::Error> {
        let state = self.state.borrow();
        if state.fail_analog {
            return Err(MockArrayError::AdcTimeout);
        }
        let channel = usize::from(state.mask >> CHANNEL_SHIFT);
        let value = (0..MAX_GROUPS)
            .find(|g| state.mask & (1 << g) == 0)
            .map_or(0, |group| state.readings[group][channel]);
        Ok(value)
    }
}

// ============================================================================
// Sector Source Mock
// ============================================================================

/// Sector source serving fixed readings per group.
///
/// Groups are addressed by their row-major index, channels by their
/// position in the group (field A slots 0-3, B 4-7, C 8-11, D 12-15).
#[derive(Clone, Debug)]
pub struct MockSectors {
    readings: [[u16; SENSORS_PER_GROUP]; MAX_GROUPS],
    failing: [bool; MAX_GROUPS],
    failing_channels: [u16; MAX_GROUPS],
    reads: u32,
    waited_ms: u32,
    last_samples: u16,
}

impl MockSectors {
    /// Every sensor reads `value`.
    pub fn uniform(value: u16) -> Self {
        Self {
            readings: [[value; SENSORS_PER_GROUP]; MAX_GROUPS],
            failing: [false; MAX_GROUPS],
            failing_channels: [0; MAX_GROUPS],
            reads: 0,
            waited_ms: 0,
            last_samples: 0,
        }
    }

    /// Sets one reading.
    pub fn set(&mut self, group: usize, channel: usize, value: u16) {
        self.readings[group][channel] = value;
    }

    /// Sets every reading.
    pub fn set_all(&mut self, value: u16) {
        self.readings = [[value; SENSORS_PER_GROUP]; MAX_GROUPS];
    }

    /// Makes every channel of `group` fault.
    pub fn fail_group(&mut self, group: usize, fail: bool) {
        self.failing[group] = fail;
    }

    /// Makes a single channel of `group` fault.
    pub fn fail_channel(&mut self, group: usize, channel: usize, fail: bool) {
        if fail {
            self.failing_channels[group] |= 1 << channel;
        } else {
            self.failing_channels[group] &= !(1 << channel);
        }
    }

    /// Number of groups read so far.
    pub fn reads(&self) -> u32 {
        self.reads
    }

    /// Total time waited through [`SectorSource::wait_ms`].
    pub fn waited_ms(&self) -> u32 {
        self.waited_ms
    }

    /// Sample count of the most recent read.
    pub fn last_samples(&self) -> u16 {
        self.last_samples
    }
}

impl SectorSource for MockSectors {
    fn read_sector(
        &mut self,
        group_row: usize,
        group_column: usize,
        groups_per_side: usize,
        samples: u16,
    ) -> SectorReading {
        self.reads += 1;
        self.last_samples = samples;

        let group = group_index(group_row, group_column, groups_per_side);
        match (self.readings.get(group), self.failing.get(group)) {
            (Some(values), Some(false)) => {
                let mut reading = SectorReading::new(*values);
                let failing = self.failing_channels[group];
                for channel in (0..SENSORS_PER_GROUP).filter(|c| failing & (1 << c) != 0) {
                    reading.fault(channel);
                }
                reading
            }
            _ => SectorReading::failed(SENSORS_PER_GROUP as u8),
        }
    }

    fn wait_ms(&mut self, ms: u32) {
        self.waited_ms += ms;
    }
}

// ============================================================================
// Output Mocks
// ============================================================================

/// Buffered LED strip.
#[derive(Clone, Debug)]
pub struct MockPixels {
    pixels: Vec<Rgb>,
    /// Current brightness.
    pub brightness: u8,
    /// Number of `show` calls.
    pub shows: u32,
}

impl MockPixels {
    /// Creates a strip of `len` pixels, all off, at full brightness.
    pub fn new(len: usize) -> Self {
        Self {
            pixels: vec![Rgb::OFF; len],
            brightness: 255,
            shows: 0,
        }
    }

    /// Buffered colour of pixel `index`.
    pub fn pixel(&self, index: u16) -> Option<Rgb> {
        self.pixels.get(usize::from(index)).copied()
    }

    /// Number of pixels currently lit.
    pub fn lit(&self) -> usize {
        self.pixels.iter().filter(|p| **p != Rgb::OFF).count()
    }
}

impl PixelDriver for MockPixels {
    type Error = Infallible;

    fn set_pixel(&mut self, index: u16, color: Rgb) -> Result<(), Self::Error> {
        if let Some(pixel) = self.pixels.get_mut(usize::from(index)) {
            *pixel = color;
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<(), Self::Error> {
        self.pixels.fill(Rgb::OFF);
        Ok(())
    }

    fn set_brightness(&mut self, level: u8) -> Result<(), Self::Error> {
        self.brightness = level;
        Ok(())
    }

    fn show(&mut self) -> Result<(), Self::Error> {
        self.shows += 1;
        Ok(())
    }
}

/// Error of [`MockTransport`] when sends are set to fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MockSendError;

/// Datagram transport capturing sends and serving queued packets.
#[derive(Clone, Debug, Default)]
pub struct MockTransport {
    /// Datagrams sent so far, with their destination.
    pub sent: Vec<(SocketAddrV4, Vec<u8>)>,
    inbox: VecDeque<Vec<u8>>,
    fail_sends: bool,
}

impl MockTransport {
    /// Creates an idle transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an inbound datagram.
    pub fn queue(&mut self, packet: &[u8]) {
        self.inbox.push_back(packet.to_vec());
    }

    /// Makes every send fail.
    pub fn fail_sends(&mut self, fail: bool) {
        self.fail_sends = fail;
    }
}

impl StatusTransport for MockTransport {
    type Error = MockSendError;

    fn send_to(&mut self, dest: SocketAddrV4, payload: &[u8]) -> Result<(), Self::Error> {
        if self.fail_sends {
            return Err(MockSendError);
        }
        self.sent.push((dest, payload.to_vec()));
        Ok(())
    }

    fn try_recv(&mut self, buf: &mut [u8]) -> Option<usize> {
        let packet = self.inbox.pop_front()?;
        let len = packet.len().min(buf.len());
        buf[..len].copy_from_slice(&packet[..len]);
        Some(len)
    }
}

/// Observer remembering the status masks of the last notification.
#[derive(Clone, Debug, Default)]
pub struct MockObserver {
    /// Number of notifications.
    pub calls: u32,
    /// Last change reported.
    pub last_change: Option<FieldChange>,
    /// Every scan phase entered, in order.
    pub phases: Vec<ScanPhase>,
    side: usize,
    masks: Vec<u8>,
}

impl MockObserver {
    /// Creates an observer that has seen nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Status mask of logical field `(column, row)` at the last notification.
    pub fn last_mask_at(&self, column: usize, row: usize) -> Option<u8> {
        if column >= self.side || row >= self.side {
            return None;
        }
        self.masks.get(row * self.side + column).copied()
    }
}

impl<const N: usize> BoardObserver<N> for MockObserver {
    fn board_changed(&mut self, grid: &FieldGrid<N>, change: &FieldChange) {
        self.calls += 1;
        self.last_change = Some(*change);
        self.side = N;
        self.masks = grid.iter_logical().map(|(_, _, field)| field.status_mask()).collect();
    }

    fn phase_entered(&mut self, phase: ScanPhase) {
        self.phases.push(phase);
    }
}
