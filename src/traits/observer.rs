//! Observer hook for board changes.
//!
//! The scanner does not know about packets or sockets. When a cycle finds a
//! change it hands the whole grid to a [`BoardObserver`], which typically
//! encodes a status update and sends it to the registered listener.

use crate::grid::FieldGrid;
use crate::scanner::{FieldChange, ScanPhase};

/// Receives the board state after a scan cycle found a change.
///
/// Called at most once per cycle, before the previous snapshot is
/// overwritten, so `grid.previous_at()` still shows the state before the
/// change.
///
/// # Example
///
/// ```rust
/// use smartboard::{BoardObserver, FieldChange, FieldGrid};
///
/// struct CountChanges(u32);
///
/// impl BoardObserver<6> for CountChanges {
///     fn board_changed(&mut self, _grid: &FieldGrid<6>, _change: &FieldChange) {
///         self.0 += 1;
///     }
/// }
/// ```
pub trait BoardObserver<const N: usize> {
    /// Called with the full grid and the first difference found.
    fn board_changed(&mut self, grid: &FieldGrid<N>, change: &FieldChange);

    /// Called each time the scan cycle moves to `phase`, ending with
    /// [`ScanPhase::Idle`]. Does nothing unless overridden.
    fn phase_entered(&mut self, _phase: ScanPhase) {}
}

/// Ignores every change.
impl<const N: usize> BoardObserver<N> for () {
    fn board_changed(&mut self, _grid: &FieldGrid<N>, _change: &FieldChange) {}
}

impl<const N: usize, O: BoardObserver<N> + ?Sized> BoardObserver<N> for &mut O {
    fn board_changed(&mut self, grid: &FieldGrid<N>, change: &FieldChange) {
        (**self).board_changed(grid, change);
    }

    fn phase_entered(&mut self, phase: ScanPhase) {
        (**self).phase_entered(phase);
    }
}
