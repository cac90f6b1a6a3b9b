//! Board mounting orientation and the coordinate maps derived from it.
//!
//! The sensor wiring of a board never changes, but a board can be mounted in
//! four orientations. [`Rotation`] translates between the *logical* view the
//! game server uses (column/row, north/east/south/west) and the *physical*
//! storage order of the sensor hardware.
//!
//! # Example
//!
//! ```rust
//! use smartboard::Rotation;
//!
//! // On a 6x6 board mounted at 90 degrees, logical (0, 0) lives in the
//! // physical bottom-right column.
//! assert_eq!(Rotation::Deg90.to_physical(6, 0, 0), (5, 0));
//! assert_eq!(Rotation::Deg90.to_logical(6, 5, 0), (0, 0));
//! ```

/// Fixed physical mounting orientation of a board.
///
/// # Default
///
/// Defaults to [`Deg0`](Self::Deg0), where logical and physical views match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Rotation {
    /// Not rotated.
    #[default]
    Deg0 = 0,
    /// Rotated by 90 degrees.
    Deg90 = 1,
    /// Rotated by 180 degrees.
    Deg180 = 2,
    /// Rotated by 270 degrees.
    Deg270 = 3,
}

impl Rotation {
    /// All four rotations in ascending order.
    pub const ALL: [Rotation; 4] = [
        Rotation::Deg0,
        Rotation::Deg90,
        Rotation::Deg180,
        Rotation::Deg270,
    ];

    /// Returns the rotation for an index `0..=3`, the encoding used on the
    /// wire and in firmware build settings.
    ///
    /// ```
    /// use smartboard::Rotation;
    ///
    /// assert_eq!(Rotation::from_index(2), Some(Rotation::Deg180));
    /// assert_eq!(Rotation::from_index(4), None);
    /// ```
    pub const fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Rotation::Deg0),
            1 => Some(Rotation::Deg90),
            2 => Some(Rotation::Deg180),
            3 => Some(Rotation::Deg270),
            _ => None,
        }
    }

    /// Parses `"0"`, `"90"`, `"180"` or `"270"` (surrounding whitespace ignored).
    pub fn from_degrees_text(s: &str) -> Option<Self> {
        match s.trim() {
            "0" => Some(Rotation::Deg0),
            "90" => Some(Rotation::Deg90),
            "180" => Some(Rotation::Deg180),
            "270" => Some(Rotation::Deg270),
            _ => None,
        }
    }

    /// Rotation angle in degrees.
    #[inline]
    pub const fn degrees(self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Maps a logical `(column, row)` to physical storage indices on a board
    /// with `side` fields per edge.
    ///
    /// Callers must pass `column < side` and `row < side`.
    #[inline]
    pub const fn to_physical(self, side: usize, column: usize, row: usize) -> (usize, usize) {
        let last = side - 1;
        match self {
            Rotation::Deg0 => (column, row),
            Rotation::Deg90 => (last - row, column),
            Rotation::Deg180 => (last - column, last - row),
            Rotation::Deg270 => (row, last - column),
        }
    }

    /// Inverse of [`to_physical`](Self::to_physical).
    #[inline]
    pub const fn to_logical(self, side: usize, column: usize, row: usize) -> (usize, usize) {
        let last = side - 1;
        match self {
            Rotation::Deg0 => (column, row),
            Rotation::Deg90 => (row, last - column),
            Rotation::Deg180 => (last - column, last - row),
            Rotation::Deg270 => (last - row, column),
        }
    }

    /// Physical slot index feeding each compass direction, as
    /// `[north, east, south, west]`.
    ///
    /// Slot `n` of a field's four sensor readings is the `n`-th reading the
    /// sector multiplexer delivers for that field.
    ///
    /// ```
    /// use smartboard::Rotation;
    ///
    /// assert_eq!(Rotation::Deg0.slot_map(), [0, 3, 2, 1]);
    /// assert_eq!(Rotation::Deg180.slot_map(), [2, 1, 0, 3]);
    /// ```
    #[inline]
    pub const fn slot_map(self) -> [usize; 4] {
        let r = self as usize;
        [r, (r + 3) % 4, (r + 2) % 4, (r + 1) % 4]
    }
}
