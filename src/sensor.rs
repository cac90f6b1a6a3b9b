//! Single HAL sensor state and the threshold rule that decides whether a
//! magnet is present.
//!
//! A sensor is "enabled" when its current reading rises far enough above the
//! no-piece baseline captured during calibration:
//!
//! ```text
//! enabled = current > reference * ratio  &&  current > floor
//! ```
//!
//! The ratio is stored in permille so the comparison stays exact in integer
//! arithmetic (`1035` means `1.035`).
//!
//! # Example
//!
//! ```rust
//! use smartboard::{Sensor, Threshold};
//!
//! let threshold = Threshold::default();
//! let mut sensor = Sensor::with_reference(500);
//!
//! sensor.update(510, &threshold);
//! assert!(!sensor.enabled); // 510 is below 500 * 1.035
//!
//! sensor.update(520, &threshold);
//! assert!(sensor.enabled);
//! ```

/// Compass direction of one of the four edge sensors of a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Direction {
    /// Top edge.
    North,
    /// Right edge.
    East,
    /// Bottom edge.
    South,
    /// Left edge.
    West,
}

impl Direction {
    /// All directions in comparison order.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Bit of this direction inside a status record bitmask.
    ///
    /// ```
    /// use smartboard::Direction;
    ///
    /// assert_eq!(Direction::West.status_bit(), 0b0001);
    /// assert_eq!(Direction::North.status_bit(), 0b1000);
    /// ```
    #[inline]
    pub const fn status_bit(self) -> u8 {
        match self {
            Direction::West => 1 << 0,
            Direction::South => 1 << 1,
            Direction::East => 1 << 2,
            Direction::North => 1 << 3,
        }
    }

    /// Returns the direction as a lowercase string.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::East => "east",
            Direction::South => "south",
            Direction::West => "west",
        }
    }
}

/// Threshold rule for turning a raw reading into an on/off state.
///
/// Both values are hardware-tuned; the defaults match the first generation
/// of HAL sensor boards (`1.035` ratio, floor of `100`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Threshold {
    /// Required ratio of reading to reference, in permille.
    pub ratio_permille: u32,
    /// Readings at or below this value never count as enabled.
    pub absolute_floor: u16,
}

impl Threshold {
    /// Default ratio, `1.035`.
    pub const DEFAULT_RATIO_PERMILLE: u32 = 1035;

    /// Default absolute floor.
    pub const DEFAULT_FLOOR: u16 = 100;

    /// Creates a threshold rule.
    pub const fn new(ratio_permille: u32, absolute_floor: u16) -> Self {
        Self {
            ratio_permille,
            absolute_floor,
        }
    }

    /// Returns true when `current` counts as a detected magnet against
    /// `reference`.
    ///
    /// ```
    /// use smartboard::Threshold;
    ///
    /// let t = Threshold::default();
    /// assert!(t.is_enabled(101, 0));
    /// assert!(!t.is_enabled(100, 0));
    /// assert!(!t.is_enabled(1035, 1000)); // exactly at the ratio
    /// assert!(t.is_enabled(1036, 1000));
    /// ```
    #[inline]
    pub fn is_enabled(&self, current: u16, reference: u16) -> bool {
        let scaled_current = u64::from(current) * 1000;
        let scaled_reference = u64::from(reference) * u64::from(self.ratio_permille);
        scaled_current > scaled_reference && current > self.absolute_floor
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self::new(Self::DEFAULT_RATIO_PERMILLE, Self::DEFAULT_FLOOR)
    }
}

/// One magnetic field detector.
///
/// `enabled` is derived from `current` and `reference` on every scan and is
/// never set from outside the calibration engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sensor {
    /// Latest raw reading.
    pub current: u16,
    /// Baseline reading captured with no piece present.
    pub reference: u16,
    /// Whether a magnet is currently detected.
    pub enabled: bool,
    /// Whether `reference` holds a captured baseline.
    pub calibrated: bool,
}

impl Sensor {
    /// Creates a sensor with a known baseline.
    pub const fn with_reference(reference: u16) -> Self {
        Self {
            current: 0,
            reference,
            enabled: false,
            calibrated: true,
        }
    }

    /// Stores a scan reading and recomputes `enabled`.
    #[inline]
    pub fn update(&mut self, current: u16, threshold: &Threshold) {
        self.current = current;
        self.enabled = threshold.is_enabled(current, self.reference);
    }

    /// Captures `reading` as the new baseline unless a piece is currently
    /// detected. Returns whether the baseline was written.
    ///
    /// A sensor that never had a baseline always takes the reading; its
    /// `enabled` flag was computed against a zero reference and says
    /// nothing about a piece.
    #[inline]
    pub fn calibrate(&mut self, reading: u16) -> bool {
        if self.enabled && self.calibrated {
            return false;
        }
        self.reference = reading;
        self.current = 0;
        self.calibrated = true;
        true
    }
}
