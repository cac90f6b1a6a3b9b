//! Sector addressing and the reader that captures one group of sensors.
//!
//! Sensors are wired in groups of four fields (16 sensors). The expander's
//! low 12 lines switch the power of each group (active low), the high 4
//! lines select the analog multiplexer channel:
//!
//! ```text
//! bit  0..=8   group power, cleared = group selected
//! bit  9..=11  unused, always high
//! bit 12..=15  multiplexer channel 0..=15
//! ```
//!
//! # Example
//!
//! ```rust
//! use smartboard::sector::{channel_mask, group_mask};
//!
//! let mask = group_mask(4);
//! assert_eq!(mask, 0x0FEF);
//! assert_eq!(channel_mask(mask, 6), 0x6FEF);
//! ```

use embedded_hal::delay::DelayNs;
use log::warn;

use crate::traits::{AnalogInput, PortExpander};

/// Number of group select lines available on the expander.
pub const MAX_GROUPS: usize = 9;

/// All group lines plus the unused lines high, channel 0.
pub const GROUP_LINES: u16 = 0x0FFF;

/// Position of the multiplexer channel inside an expander mask.
pub const CHANNEL_SHIFT: u32 = 12;

/// Sensors per group.
pub const SENSORS_PER_GROUP: usize = 16;

/// Output mask that powers only group `group` (index `0..9`).
#[inline]
pub const fn group_mask(group: usize) -> u16 {
    GROUP_LINES & !(1u16 << group)
}

/// Output mask that keeps `group_mask` and selects multiplexer `channel`.
#[inline]
pub const fn channel_mask(group_mask: u16, channel: u8) -> u16 {
    group_mask | ((channel as u16 & 0x0F) << CHANNEL_SHIFT)
}

/// Linear group index of group `(row, column)` on a board with
/// `groups_per_side` groups per edge.
#[inline]
pub const fn group_index(group_row: usize, group_column: usize, groups_per_side: usize) -> usize {
    group_column + group_row * groups_per_side
}

/// The 16 raw readings of one group in multiplexer channel order.
///
/// Each channel is either captured or faulted. Faulted channels hold 0, so
/// a scan treats them as inactive, while calibration keeps the previous
/// baseline for them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SectorReading {
    values: [u16; SENSORS_PER_GROUP],
    captured: u16,
    /// Number of failed bus or ADC transactions while capturing.
    pub faults: u8,
}

impl SectorReading {
    /// Wraps 16 readings captured without faults.
    pub const fn new(values: [u16; SENSORS_PER_GROUP]) -> Self {
        Self {
            values,
            captured: u16::MAX,
            faults: 0,
        }
    }

    /// A reading where no channel could be captured.
    pub const fn failed(faults: u8) -> Self {
        Self {
            values: [0; SENSORS_PER_GROUP],
            captured: 0,
            faults,
        }
    }

    /// Stores the value of `channel` and marks it captured.
    #[inline]
    pub fn capture(&mut self, channel: usize, value: u16) {
        self.values[channel] = value;
        self.captured |= 1 << channel;
    }

    /// Marks `channel` faulted: its value reads as 0.
    #[inline]
    pub fn fault(&mut self, channel: usize) {
        self.values[channel] = 0;
        self.captured &= !(1 << channel);
        self.faults = self.faults.saturating_add(1);
    }

    /// All readings, faulted channels as 0.
    pub const fn values(&self) -> &[u16; SENSORS_PER_GROUP] {
        &self.values
    }

    /// Returns true if `channel` was captured.
    #[inline]
    pub const fn is_captured(&self, channel: usize) -> bool {
        self.captured & (1 << channel) != 0
    }

    /// Bit `i` set when channel `i` was captured.
    #[inline]
    pub const fn captured_mask(&self) -> u16 {
        self.captured
    }

    /// The four slot readings of field `index` (0 = A, 1 = B, 2 = C, 3 = D),
    /// `None` for faulted slots.
    #[inline]
    pub fn field_slots(&self, index: usize) -> [Option<u16>; 4] {
        let base = index * 4;
        core::array::from_fn(|slot| {
            let channel = base + slot;
            self.is_captured(channel).then_some(self.values[channel])
        })
    }
}

/// Something that can capture one sensor group.
///
/// The scanner depends only on this trait, which keeps it testable without
/// modelling expander masks.
pub trait SectorSource {
    /// Captures the 16 readings of group `(group_row, group_column)`,
    /// averaging `samples` conversions per sensor.
    ///
    /// Never fails: faulted channels are marked in the returned reading
    /// and counted in [`SectorReading::faults`].
    fn read_sector(
        &mut self,
        group_row: usize,
        group_column: usize,
        groups_per_side: usize,
        samples: u16,
    ) -> SectorReading;

    /// Blocks for `ms` milliseconds.
    fn wait_ms(&mut self, ms: u32);
}

/// Reads sensor groups through a [`PortExpander`] and an [`AnalogInput`].
pub struct SectorReader<X, A, D> {
    expander: X,
    analog: A,
    delay: D,
    settle_ms: u32,
}

impl<X, A, D> SectorReader<X, A, D>
where
    X: PortExpander,
    A: AnalogInput,
    D: DelayNs,
{
    /// Default settle time after powering a group.
    pub const DEFAULT_SETTLE_MS: u32 = 10;

    /// Creates a reader with the default settle time.
    pub fn new(expander: X, analog: A, delay: D) -> Self {
        Self {
            expander,
            analog,
            delay,
            settle_ms: Self::DEFAULT_SETTLE_MS,
        }
    }

    /// Sets the delay between powering a group and the first conversion.
    pub fn with_settle_ms(mut self, ms: u32) -> Self {
        self.settle_ms = ms;
        self
    }

    /// Returns the collaborators.
    pub fn into_parts(self) -> (X, A, D) {
        (self.expander, self.analog, self.delay)
    }
}

impl<X, A, D> SectorSource for SectorReader<X, A, D>
where
    X: PortExpander,
    A: AnalogInput,
    D: DelayNs,
{
    fn read_sector(
        &mut self,
        group_row: usize,
        group_column: usize,
        groups_per_side: usize,
        samples: u16,
    ) -> SectorReading {
        let group = group_index(group_row, group_column, groups_per_side);
        let mask = group_mask(group);
        let mut reading = SectorReading::default();

        if let Err(e) = self.expander.write16(mask) {
            warn!("group {} select failed: {:?}", group, e);
            reading.faults = reading.faults.saturating_add(1);
        }
        self.delay.delay_ms(self.settle_ms);

        for channel in 0..SENSORS_PER_GROUP {
            if let Err(e) = self.expander.write16(channel_mask(mask, channel as u8)) {
                warn!("group {} channel {} select failed: {:?}", group, channel, e);
                reading.fault(channel);
                continue;
            }
            match self.analog.read_averaged(samples) {
                Ok(value) => reading.capture(channel, value),
                Err(e) => {
                    warn!("group {} channel {} read failed: {:?}", group, channel, e);
                    reading.fault(channel);
                }
            }
        }

        reading
    }

    fn wait_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::mock::{MockDelay, MockSensorArray};

    // =========================================================================
    // Mask Tests
    // =========================================================================

    #[test]
    fn group_masks() {
        assert_eq!(group_mask(0), 0x0FFE);
        assert_eq!(group_mask(8), 0x0EFF);
        for group in 0..MAX_GROUPS {
            let mask = group_mask(group);
            assert_eq!(mask.count_zeros(), 5, "four channel bits plus one group bit");
            // Unused lines stay high
            assert_eq!(mask & 0x0E00, 0x0E00);
        }
    }

    #[test]
    fn channel_masks_keep_group() {
        let mask = group_mask(3);
        for channel in 0..16u8 {
            let m = channel_mask(mask, channel);
            assert_eq!(m & GROUP_LINES, mask);
            assert_eq!(m >> CHANNEL_SHIFT, u16::from(channel));
        }
    }

    #[test]
    fn group_indices() {
        assert_eq!(group_index(0, 0, 3), 0);
        assert_eq!(group_index(0, 2, 3), 2);
        assert_eq!(group_index(1, 1, 3), 4);
        assert_eq!(group_index(2, 2, 3), 8);
    }

    #[test]
    fn field_slots_split_readings() {
        let mut values = [0u16; 16];
        for (i, v) in values.iter_mut().enumerate() {
            *v = i as u16;
        }
        let reading = SectorReading::new(values);
        assert_eq!(reading.field_slots(0), [Some(0), Some(1), Some(2), Some(3)]);
        assert_eq!(reading.field_slots(3), [Some(12), Some(13), Some(14), Some(15)]);
    }

    #[test]
    fn faulted_channels_are_none() {
        let mut reading = SectorReading::new([70; 16]);
        reading.fault(5);
        assert_eq!(reading.faults, 1);
        assert_eq!(reading.values()[5], 0);
        assert_eq!(reading.field_slots(1), [Some(70), None, Some(70), Some(70)]);
        assert_eq!(reading.captured_mask(), !(1 << 5));

        let failed = SectorReading::failed(16);
        assert!(failed.field_slots(2).iter().all(Option::is_none));
        assert!(!failed.is_captured(0));
    }

    // =========================================================================
    // SectorReader Tests
    // =========================================================================

    #[test]
    fn reader_captures_each_channel() {
        let array = MockSensorArray::new();
        array.set_reading(4, 6, 120);
        array.set_reading(4, 15, 77);
        array.set_reading(3, 6, 999);
        let (expander, analog) = array.split();
        let mut reader = SectorReader::new(expander, analog, MockDelay::new());

        let reading = reader.read_sector(1, 1, 3, 10);
        assert_eq!(reading.faults, 0);
        assert_eq!(reading.captured_mask(), u16::MAX);
        assert_eq!(reading.values()[6], 120);
        assert_eq!(reading.values()[15], 77);
        assert_eq!(reading.values()[0], 0);

        // The last mask written keeps group 4 selected on channel 15
        assert_eq!(array.last_mask(), channel_mask(group_mask(4), 15));
    }

    #[test]
    fn reader_settles_after_group_select() {
        let array = MockSensorArray::new();
        let (expander, analog) = array.split();
        let mut reader =
            SectorReader::new(expander, analog, MockDelay::new()).with_settle_ms(25);
        reader.read_sector(0, 0, 3, 1);
        reader.wait_ms(500);
        let (_, _, delay) = reader.into_parts();
        assert_eq!(delay.total_ms(), 525);
    }

    #[test]
    fn reader_counts_faults_and_reads_zero() {
        let array = MockSensorArray::new();
        array.set_reading(0, 2, 300);
        array.fail_writes(true);
        let (expander, analog) = array.split();
        let mut reader = SectorReader::new(expander, analog, MockDelay::new());

        let reading = reader.read_sector(0, 0, 3, 10);
        assert_eq!(reading.faults, 17);
        assert!(reading.values().iter().all(|&v| v == 0));
        assert_eq!(reading.captured_mask(), 0);
    }

    #[test]
    fn reader_counts_adc_faults() {
        let array = MockSensorArray::new();
        array.fail_analog(true);
        let (expander, analog) = array.split();
        let mut reader = SectorReader::new(expander, analog, MockDelay::new());

        let reading = reader.read_sector(2, 2, 3, 10);
        assert_eq!(reading.faults, 16);
        assert_eq!(reading.field_slots(0), [None; 4]);
    }
}
