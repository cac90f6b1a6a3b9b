//! Per-cycle scan, comparison and change notification.
//!
//! One cycle moves through four phases:
//!
//! ```text
//! Idle -> Scanning -> Comparing -> Emitting -> Idle
//! ```
//!
//! - **Scanning** reads every sensor group in scan mode.
//! - **Comparing** walks the fields in row-major logical order, checking
//!   north, east, south and west, and stops at the first `enabled` difference
//!   against the previous snapshot.
//! - **Emitting** notifies the observer if a difference was found, then always
//!   copies the current state over the previous snapshot.
//!
//! The observer is told about every phase transition through
//! [`BoardObserver::phase_entered`].
//!
//! Failed reads do not abort the cycle; they read as inactive sensors and
//! are counted in the [`ScanReport`]. During calibration a failed read keeps
//! the sensor's previous baseline.
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
//! let report = scanner.scan_cycle(&mut ());
//! assert!(report.change.is_none());
//! ```

use log::{debug, info, warn};

use crate::calibration::{ReadMode, SkippedBaselines};
use crate::config::SensorConfig;
use crate::grid::{FieldGrid, DEFAULT_SIDE};
use crate::rotation::Rotation;
use crate::sector::SectorSource;
use crate::sensor::{Direction, Threshold};
use crate::traits::BoardObserver;

/// Phase of the scan cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScanPhase {
    /// Between cycles.
    #[default]
    Idle,
    /// Reading sensor groups.
    Scanning,
    /// Looking for the first difference.
    Comparing,
    /// Notifying and committing the snapshot.
    Emitting,
}

/// First difference found by a scan cycle, in logical coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldChange {
    /// Logical column.
    pub column: usize,
    /// Logical row.
    pub row: usize,
    /// Edge whose sensor changed.
    pub direction: Direction,
    /// New state of that sensor.
    pub enabled: bool,
    /// Reading that caused the change.
    pub current: u16,
    /// Baseline of the sensor.
    pub reference: u16,
}

/// Outcome of one scan cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// The first difference, if any.
    pub change: Option<FieldChange>,
    /// Failed bus or ADC transactions during the cycle.
    pub bus_faults: u32,
}

impl ScanReport {
    /// Returns true if the observer was notified.
    #[inline]
    pub fn changed(&self) -> bool {
        self.change.is_some()
    }
}

/// Outcome of a calibration run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CalibrationReport {
    /// Number of full-board passes.
    pub passes: u8,
    /// Baseline writes skipped because the sensor was enabled.
    pub skipped: usize,
    /// Baseline writes skipped because the channel faulted.
    pub faulted: usize,
    /// Failed bus or ADC transactions.
    pub bus_faults: u32,
}

/// Owns the grid and drives calibration and scan cycles.
pub struct BoardScanner<S, const N: usize = DEFAULT_SIDE> {
    source: S,
    grid: FieldGrid<N>,
    config: SensorConfig,
    threshold: Threshold,
    cycles: u32,
}

impl<S: SectorSource, const N: usize> BoardScanner<S, N> {
    /// Creates a scanner with a zeroed grid. Call
    /// [`calibrate`](Self::calibrate) before the first cycle.
    pub fn new(source: S, rotation: Rotation, config: SensorConfig) -> Self {
        let threshold = config.threshold();
        Self {
            source,
            grid: FieldGrid::new(rotation),
            config,
            threshold,
            cycles: 0,
        }
    }

    /// Current board state.
    #[inline]
    pub fn grid(&self) -> &FieldGrid<N> {
        &self.grid
    }

    #[inline]
    pub(crate) fn grid_mut(&mut self) -> &mut FieldGrid<N> {
        &mut self.grid
    }

    /// Sensor settings in use.
    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    /// Threshold rule in use.
    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    /// Completed scan cycles.
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    /// Mutable access to the sector source.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Releases the sector source.
    pub fn into_source(self) -> S {
        self.source
    }

    fn read_board(&mut self, mode: ReadMode) -> (SkippedBaselines, u32) {
        let groups = FieldGrid::<N>::GROUPS_PER_SIDE;
        let samples = if mode.is_calibration() {
            self.config.calibration_samples
        } else {
            self.config.scan_samples
        };

        let mut skipped = SkippedBaselines::default();
        let mut faults = 0u32;
        for group_row in 0..groups {
            for group_column in 0..groups {
                let reading = self
                    .source
                    .read_sector(group_row, group_column, groups, samples);
                faults += u32::from(reading.faults);
                skipped += self.grid.apply_group(
                    group_row,
                    group_column,
                    &reading,
                    mode,
                    &self.threshold,
                );
            }
        }
        (skipped, faults)
    }

    /// Start-up calibration: the configured number of passes, each followed
    /// by the settle delay.
    pub fn calibrate(&mut self) -> CalibrationReport {
        let passes = self.config.calibration_passes.max(1);
        let mut report = CalibrationReport::default();

        for _ in 0..passes {
            let (skipped, faults) = self.read_board(ReadMode::Calibrate);
            report.passes += 1;
            report.skipped += skipped.occupied;
            report.faulted += skipped.faulted;
            report.bus_faults += faults;
            self.source.wait_ms(self.config.calibration_settle_ms);
        }

        info!(
            "Calibrated {}x{} board in {} passes ({} skipped, {} bus faults)",
            N, N, report.passes, report.skipped, report.bus_faults
        );
        if report.faulted > 0 {
            warn!("{} baseline writes lost to bus faults", report.faulted);
        }
        report
    }

    /// Single on-demand calibration pass without settle delay.
    ///
    /// Sensors that currently detect a magnet keep their baseline.
    pub fn recalibrate(&mut self) -> CalibrationReport {
        let (skipped, bus_faults) = self.read_board(ReadMode::Calibrate);
        if bus_faults > 0 {
            warn!(
                "Recalibration saw {} bus faults, {} sensors kept their old baseline",
                bus_faults, skipped.faulted
            );
        }
        debug!("Recalibrated ({} occupied sensors kept their baseline)", skipped.occupied);
        CalibrationReport {
            passes: 1,
            skipped: skipped.occupied,
            faulted: skipped.faulted,
            bus_faults,
        }
    }

    /// Finds the first `enabled` difference between the current state and
    /// the previous snapshot.
    pub fn detect_change(&self) -> Option<FieldChange> {
        self.grid.iter_logical().find_map(|(column, row, field)| {
            let before = self.grid.previous_at(column, row)?;
            Direction::ALL.into_iter().find_map(|direction| {
                let now = field.sensor(direction);
                if now.enabled != before.sensor(direction).enabled {
                    Some(FieldChange {
                        column,
                        row,
                        direction,
                        enabled: now.enabled,
                        current: now.current,
                        reference: now.reference,
                    })
                } else {
                    None
                }
            })
        })
    }

    /// Runs one full cycle and notifies `observer` if anything changed.
    pub fn scan_cycle<O: BoardObserver<N> + ?Sized>(&mut self, observer: &mut O) -> ScanReport {
        observer.phase_entered(ScanPhase::Scanning);
        let (_, bus_faults) = self.read_board(ReadMode::Scan);
        if bus_faults > 0 {
            warn!("Scan cycle saw {} bus faults, affected sensors read as inactive", bus_faults);
        }

        observer.phase_entered(ScanPhase::Comparing);
        let change = self.detect_change();

        observer.phase_entered(ScanPhase::Emitting);
        if let Some(change) = &change {
            debug!(
                "[{}][{}] change detected on {}, ref {}, current {}, enabled {}",
                change.column,
                change.row,
                change.direction.as_str(),
                change.reference,
                change.current,
                change.enabled
            );
            observer.board_changed(&self.grid, change);
        }
        self.grid.commit();

        observer.phase_entered(ScanPhase::Idle);
        self.cycles = self.cycles.wrapping_add(1);

        ScanReport { change, bus_faults }
    }
}
