//! Rotation-aware storage of the board state.
//!
//! [`FieldGrid`] owns two `N x N` matrices: the state written by the current
//! scan and a full snapshot of the previous scan. Storage is physical (the
//! order the sensor wiring delivers data in); every public accessor takes
//! *logical* coordinates and resolves them through the board [`Rotation`].
//!
//! # Example
//!
//! ```rust
//! use smartboard::{FieldGrid, Rotation};
//!
//! let grid: FieldGrid<6> = FieldGrid::new(Rotation::Deg90);
//!
//! // Logical (0, 0) is stored at physical (5, 0), whose LED is pixel 5.
//! assert_eq!(grid.field_at(0, 0).map(|f| f.pixel_no), Some(5));
//! assert!(grid.field_at(6, 0).is_none());
//! ```

use core::fmt;

use crate::calibration::{apply_readings, ReadMode, SkippedBaselines};
use crate::field::Field;
use crate::rotation::Rotation;
use crate::sector::{SectorReading, MAX_GROUPS};
use crate::sensor::{Direction, Threshold};

/// Default number of fields per board edge.
pub const DEFAULT_SIDE: usize = 6;

/// Board state: current scan, previous snapshot and the fixed rotation.
///
/// `N` must be even and the resulting `(N/2)^2` sensor groups must fit the
/// group select lines of the expander; other sizes fail to compile when the
/// grid is constructed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldGrid<const N: usize = DEFAULT_SIDE> {
    current: [[Field; N]; N],
    previous: [[Field; N]; N],
    rotation: Rotation,
}

impl<const N: usize> FieldGrid<N> {
    /// Number of sensor groups along one edge.
    pub const GROUPS_PER_SIDE: usize = N / 2;

    const VALID_SIZE: () = assert!(
        N >= 2 && N % 2 == 0 && (N / 2) * (N / 2) <= MAX_GROUPS,
        "board side must be even and fit the expander group lines"
    );

    /// Creates a zeroed grid and assigns LED numbers (`row * N + column` in
    /// physical order).
    pub fn new(rotation: Rotation) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::VALID_SIZE;

        let mut current = [[Field::default(); N]; N];
        for (column, fields) in current.iter_mut().enumerate() {
            for (row, field) in fields.iter_mut().enumerate() {
                field.pixel_no = (row * N + column) as u16;
            }
        }

        Self {
            current,
            previous: current,
            rotation,
        }
    }

    /// Fields per board edge.
    #[inline]
    pub const fn side(&self) -> usize {
        N
    }

    /// The fixed board rotation.
    #[inline]
    pub const fn rotation(&self) -> Rotation {
        self.rotation
    }

    #[inline]
    fn resolve(&self, column: usize, row: usize) -> Option<(usize, usize)> {
        if column < N && row < N {
            Some(self.rotation.to_physical(N, column, row))
        } else {
            None
        }
    }

    /// Field at logical `(column, row)` in the current scan.
    pub fn field_at(&self, column: usize, row: usize) -> Option<&Field> {
        self.resolve(column, row).map(|(c, r)| &self.current[c][r])
    }

    /// Field at logical `(column, row)` in the previous snapshot.
    pub fn previous_at(&self, column: usize, row: usize) -> Option<&Field> {
        self.resolve(column, row).map(|(c, r)| &self.previous[c][r])
    }

    pub(crate) fn field_at_mut(&mut self, column: usize, row: usize) -> Option<&mut Field> {
        self.resolve(column, row)
            .map(move |(c, r)| &mut self.current[c][r])
    }

    /// Visits every current field in row-major logical order.
    pub fn iter_logical(&self) -> impl Iterator<Item = (usize, usize, &Field)> + '_ {
        (0..N).flat_map(move |row| {
            (0..N).map(move |column| {
                let (c, r) = self.rotation.to_physical(N, column, row);
                (column, row, &self.current[c][r])
            })
        })
    }

    /// Writes the 16 readings of sensor group `(group_row, group_column)`
    /// into its four fields.
    ///
    /// Readings `0..4` belong to field A at physical `(2c, 2r)`, `4..8` to B
    /// at `(2c+1, 2r)`, `8..12` to C at `(2c, 2r+1)` and `12..16` to D at
    /// `(2c+1, 2r+1)`. Returns the calibration writes that were left out.
    pub(crate) fn apply_group(
        &mut self,
        group_row: usize,
        group_column: usize,
        reading: &SectorReading,
        mode: ReadMode,
        threshold: &Threshold,
    ) -> SkippedBaselines {
        let column = group_column * 2;
        let row = group_row * 2;
        let targets = [
            (column, row),
            (column + 1, row),
            (column, row + 1),
            (column + 1, row + 1),
        ];

        targets
            .iter()
            .enumerate()
            .map(|(i, &(c, r))| {
                apply_readings(
                    &mut self.current[c][r],
                    self.rotation,
                    reading.field_slots(i),
                    mode,
                    threshold,
                )
            })
            .sum()
    }

    /// Copies the current scan over the previous snapshot.
    #[inline]
    pub fn commit(&mut self) {
        self.previous = self.current;
    }

    /// Returns true if any field differs in `enabled` state from the
    /// previous snapshot.
    pub fn has_changes(&self) -> bool {
        self.current
            .iter()
            .flatten()
            .zip(self.previous.iter().flatten())
            .any(|(now, before)| now.status_mask() != before.status_mask())
    }

    /// Per-field diagnostics table for serial logging.
    pub fn summary(&self) -> GridSummary<'_, N> {
        GridSummary { grid: self }
    }
}

impl<const N: usize> Default for FieldGrid<N> {
    fn default() -> Self {
        Self::new(Rotation::default())
    }
}

/// [`Display`](fmt::Display) adapter returned by [`FieldGrid::summary`].
pub struct GridSummary<'a, const N: usize> {
    grid: &'a FieldGrid<N>,
}

impl<const N: usize> fmt::Display for GridSummary<'_, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (column, row, field) in self.grid.iter_logical() {
            write!(f, "({}|{}) led {:2} |", column, row, field.pixel_no)?;
            for direction in Direction::ALL {
                let sensor = field.sensor(direction);
                write!(
                    f,
                    " {} {:5}/{:5}{}",
                    &direction.as_str()[..1],
                    sensor.current,
                    sensor.reference,
                    if sensor.enabled { '*' } else { ' ' }
                )?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
