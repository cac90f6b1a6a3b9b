//! Turns the four raw readings of a field into calibrated sensor state.
//!
//! The sector multiplexer delivers readings in fixed physical slot order.
//! [`apply_readings`] relabels them as north/east/south/west according to the
//! board [`Rotation`] and then either captures them as the new baseline
//! ([`ReadMode::Calibrate`]) or stores them and re-evaluates the threshold
//! ([`ReadMode::Scan`]).
//!
//! Calibration never overwrites the baseline of a sensor that currently
//! detects a magnet; a piece left on the board would otherwise become the new
//! "empty" reference. A faulted slot keeps its baseline too: a zero baseline
//! turns ambient field into a phantom piece that no later calibration could
//! clear. In scan mode a faulted slot reads as 0, i.e. inactive.

use core::iter::Sum;
use core::ops::{Add, AddAssign};

use crate::field::Field;
use crate::rotation::Rotation;
use crate::sensor::{Direction, Threshold};

/// What to do with a set of readings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadMode {
    /// Capture baselines for idle sensors.
    Calibrate,
    /// Store readings and recompute `enabled`.
    Scan,
}

impl ReadMode {
    /// Returns true for [`ReadMode::Calibrate`].
    #[inline]
    pub const fn is_calibration(self) -> bool {
        matches!(self, ReadMode::Calibrate)
    }
}

/// Baseline writes left out by a calibration pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SkippedBaselines {
    /// The sensor detected a magnet.
    pub occupied: usize,
    /// The channel faulted; the previous baseline stays.
    pub faulted: usize,
}

impl Add for SkippedBaselines {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            occupied: self.occupied + other.occupied,
            faulted: self.faulted + other.faulted,
        }
    }
}

impl AddAssign for SkippedBaselines {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sum for SkippedBaselines {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

/// Orders four physical slot values as `[north, east, south, west]`.
///
/// ```
/// use smartboard::{calibration::compass_readings, Rotation};
///
/// let slots = [10, 11, 12, 13];
/// assert_eq!(compass_readings(Rotation::Deg0, slots), [10, 13, 12, 11]);
/// assert_eq!(compass_readings(Rotation::Deg90, slots), [11, 10, 13, 12]);
/// ```
#[inline]
pub fn compass_readings<T: Copy>(rotation: Rotation, slots: [T; 4]) -> [T; 4] {
    rotation.slot_map().map(|slot| slots[slot])
}

/// Applies one field's readings. `None` marks a faulted slot.
///
/// Returns the baseline writes that were left out (always none in scan
/// mode).
pub fn apply_readings(
    field: &mut Field,
    rotation: Rotation,
    slots: [Option<u16>; 4],
    mode: ReadMode,
    threshold: &Threshold,
) -> SkippedBaselines {
    let readings = compass_readings(rotation, slots);
    let mut skipped = SkippedBaselines::default();

    for (direction, reading) in Direction::ALL.into_iter().zip(readings) {
        let sensor = field.sensor_mut(direction);
        match (mode, reading) {
            (ReadMode::Calibrate, Some(value)) => {
                if !sensor.calibrate(value) {
                    skipped.occupied += 1;
                }
            }
            (ReadMode::Calibrate, None) => skipped.faulted += 1,
            (ReadMode::Scan, value) => sensor.update(value.unwrap_or(0), threshold),
        }
    }

    skipped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::Sensor;

    fn calibrated(reference: u16) -> Field {
        Field {
            north: Sensor::with_reference(reference),
            east: Sensor::with_reference(reference),
            south: Sensor::with_reference(reference),
            west: Sensor::with_reference(reference),
            ..Field::default()
        }
    }

    fn captured(slots: [u16; 4]) -> [Option<u16>; 4] {
        slots.map(Some)
    }

    #[test]
    fn compass_readings_all_rotations() {
        let slots = [0, 1, 2, 3];
        assert_eq!(compass_readings(Rotation::Deg0, slots), [0, 3, 2, 1]);
        assert_eq!(compass_readings(Rotation::Deg90, slots), [1, 0, 3, 2]);
        assert_eq!(compass_readings(Rotation::Deg180, slots), [2, 1, 0, 3]);
        assert_eq!(compass_readings(Rotation::Deg270, slots), [3, 2, 1, 0]);
    }

    #[test]
    fn calibrate_sets_references_and_clears_current() {
        let mut field = Field::default();
        field.north.current = 99;
        let skipped = apply_readings(
            &mut field,
            Rotation::Deg0,
            captured([50, 51, 52, 53]),
            ReadMode::Calibrate,
            &Threshold::default(),
        );
        assert_eq!(skipped, SkippedBaselines::default());
        assert_eq!(field.north.reference, 50);
        assert_eq!(field.east.reference, 53);
        assert_eq!(field.south.reference, 52);
        assert_eq!(field.west.reference, 51);
        assert_eq!(field.north.current, 0);
    }

    #[test]
    fn calibrate_is_idempotent() {
        let threshold = Threshold::default();
        let mut field = Field::default();
        let slots = captured([60, 61, 62, 63]);
        apply_readings(&mut field, Rotation::Deg90, slots, ReadMode::Calibrate, &threshold);
        let first = field;
        apply_readings(&mut field, Rotation::Deg90, slots, ReadMode::Calibrate, &threshold);
        assert_eq!(field, first);
    }

    #[test]
    fn calibrate_skips_enabled_sensors() {
        let threshold = Threshold::default();
        let mut field = calibrated(50);

        // Magnet on the north edge (slot 0 at 0 degrees)
        apply_readings(&mut field, Rotation::Deg0, captured([400, 50, 50, 50]), ReadMode::Scan, &threshold);
        assert!(field.north.enabled);

        let skipped = apply_readings(
            &mut field,
            Rotation::Deg0,
            captured([390, 55, 56, 57]),
            ReadMode::Calibrate,
            &threshold,
        );
        assert_eq!(skipped.occupied, 1);
        assert_eq!(skipped.faulted, 0);
        assert_eq!(field.north.reference, 50);
        assert_eq!(field.north.current, 400);
        assert_eq!(field.west.reference, 55);
        assert_eq!(field.south.reference, 56);
        assert_eq!(field.east.reference, 57);
    }

    #[test]
    fn calibrate_keeps_baseline_of_faulted_slots() {
        let threshold = Threshold::default();
        let mut field = calibrated(500);

        // Slot 3 is east at 0 degrees
        let skipped = apply_readings(
            &mut field,
            Rotation::Deg0,
            [Some(510), Some(505), Some(495), None],
            ReadMode::Calibrate,
            &threshold,
        );
        assert_eq!(skipped, SkippedBaselines { occupied: 0, faulted: 1 });
        assert_eq!(field.east.reference, 500);
        assert_eq!(field.north.reference, 510);

        // Healthy ambient readings stay below the threshold
        apply_readings(&mut field, Rotation::Deg0, captured([510, 505, 495, 500]), ReadMode::Scan, &threshold);
        assert!(!field.is_occupied());
    }

    #[test]
    fn scan_reads_faulted_slots_as_inactive() {
        let threshold = Threshold::default();
        let mut field = calibrated(50);
        apply_readings(&mut field, Rotation::Deg0, captured([400, 50, 50, 50]), ReadMode::Scan, &threshold);
        assert!(field.north.enabled);

        let skipped =
            apply_readings(&mut field, Rotation::Deg0, [None; 4], ReadMode::Scan, &threshold);
        assert_eq!(skipped, SkippedBaselines::default());
        assert_eq!(field.north.current, 0);
        assert!(!field.north.enabled);
        assert_eq!(field.north.reference, 50);
    }

    #[test]
    fn scan_updates_all_directions() {
        let threshold = Threshold::default();
        let mut field = calibrated(50);
        apply_readings(&mut field, Rotation::Deg180, captured([10, 20, 120, 30]), ReadMode::Scan, &threshold);

        // At 180 degrees slot 2 is north
        assert_eq!(field.north.current, 120);
        assert!(field.north.enabled);
        assert_eq!(field.east.current, 20);
        assert_eq!(field.south.current, 10);
        assert_eq!(field.west.current, 30);
        assert!(!field.east.enabled && !field.south.enabled && !field.west.enabled);
    }

    #[test]
    fn scan_never_touches_references() {
        let threshold = Threshold::default();
        let mut field = calibrated(70);
        let skipped =
            apply_readings(&mut field, Rotation::Deg270, captured([1, 2, 3, 4]), ReadMode::Scan, &threshold);
        assert_eq!(skipped, SkippedBaselines::default());
        for direction in Direction::ALL {
            assert_eq!(field.sensor(direction).reference, 70);
        }
    }

    #[test]
    fn skipped_baselines_add_up() {
        let parts = [
            SkippedBaselines { occupied: 1, faulted: 0 },
            SkippedBaselines { occupied: 2, faulted: 4 },
        ];
        let total: SkippedBaselines = parts.into_iter().sum();
        assert_eq!(total, SkippedBaselines { occupied: 3, faulted: 4 });
    }

    #[test]
    fn read_mode_is_calibration() {
        assert!(ReadMode::Calibrate.is_calibration());
        assert!(!ReadMode::Scan.is_calibration());
    }
}
