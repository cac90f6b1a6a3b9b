//! Board controller: ties the scanner, LEDs and game server link together.
//!
//! The [`BoardController`] is the main entry point for the firmware loop. It:
//!
//! - Calibrates the sensors at start-up
//! - Runs one scan cycle per [`tick`](BoardController::tick) and pushes a
//!   status update to the registered listener on change
//! - Drains at most one inbound command per tick
//!
//! No error stops the loop: LED and transport failures are logged and the
//! next tick carries on.
//!
//! # Example
//!
//! ```rust
//! use smartboard::{BoardController, BoardScanner, DeviceId, Rotation, SensorConfig};
//! use smartboard::hal::{MockPixels, MockSectors, MockTransport};
//!
//! let scanner: BoardScanner<_, 6> =
//!     BoardScanner::new(MockSectors::uniform(50), Rotation::Deg0, SensorConfig::default());
//! let device = DeviceId::from_mac([0x24, 0x6f, 0x28, 0x00, 0x00, 0x01]);
//! let mut controller =
//!     BoardController::new(scanner, MockPixels::new(36), MockTransport::new(), device);
//!
//! controller.start(200);
//! controller.tick();
//! assert!(controller.listener().is_none());
//! ```

use core::net::SocketAddrV4;

use log::{debug, info, warn};

use crate::commands::{BoardCommand, CommandError, CommandOutcome, PixelRecords};
use crate::grid::{FieldGrid, DEFAULT_SIDE};
use crate::scanner::{BoardScanner, CalibrationReport, FieldChange, ScanReport};
use crate::sector::SectorSource;
use crate::status::{encode, DeviceId};
use crate::traits::{BoardObserver, PixelDriver, StatusTransport};

/// Largest inbound datagram read per tick.
pub const MAX_COMMAND_LEN: usize = 512;

// ============================================================================
// Status Publisher
// ============================================================================

/// [`BoardObserver`] that encodes the grid and sends it to the listener.
///
/// Without a listener every publish is a logged no-op.
pub struct StatusPublisher<'a, T> {
    transport: &'a mut T,
    listener: Option<SocketAddrV4>,
    device: &'a DeviceId,
    sent: u32,
}

impl<'a, T: StatusTransport> StatusPublisher<'a, T> {
    /// Creates a publisher for one scan cycle or one explicit push.
    pub fn new(transport: &'a mut T, listener: Option<SocketAddrV4>, device: &'a DeviceId) -> Self {
        Self {
            transport,
            listener,
            device,
            sent: 0,
        }
    }

    /// Sends the status of `grid`. Returns whether a datagram went out.
    pub fn publish<const N: usize>(&mut self, grid: &FieldGrid<N>) -> bool {
        let Some(listener) = self.listener else {
            warn!("No listener registered, status update not sent");
            return false;
        };

        let packet = encode(grid, self.device);
        match self.transport.send_to(listener, &packet) {
            Ok(()) => {
                debug!("Sent {} byte status update to {}", packet.len(), listener);
                self.sent += 1;
                true
            }
            Err(e) => {
                warn!("Status update to {} failed: {:?}", listener, e);
                false
            }
        }
    }

    /// Number of updates sent by this publisher.
    pub fn sent(&self) -> u32 {
        self.sent
    }
}

impl<T: StatusTransport, const N: usize> BoardObserver<N> for StatusPublisher<'_, T> {
    fn board_changed(&mut self, grid: &FieldGrid<N>, _change: &FieldChange) {
        self.publish(grid);
    }
}

// ============================================================================
// Board Controller
// ============================================================================

/// Outcome of one controller tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickReport {
    /// Result of the scan cycle.
    pub scan: ScanReport,
    /// Whether a status update was sent for the scan.
    pub status_sent: bool,
    /// The command handled this tick, if one was queued.
    pub command: Option<Result<CommandOutcome, CommandError>>,
}

/// Main controller for an analog sensor board.
pub struct BoardController<S, P, T, const N: usize = DEFAULT_SIDE> {
    scanner: BoardScanner<S, N>,
    pixels: P,
    transport: T,
    device: DeviceId,
    listener: Option<SocketAddrV4>,
    rx: [u8; MAX_COMMAND_LEN],
}

impl<S, P, T, const N: usize> BoardController<S, P, T, N>
where
    S: SectorSource,
    P: PixelDriver,
    T: StatusTransport,
{
    /// Creates a controller. No listener is registered until the game server
    /// sends REGISTER_LISTENER.
    pub fn new(scanner: BoardScanner<S, N>, pixels: P, transport: T, device: DeviceId) -> Self {
        Self {
            scanner,
            pixels,
            transport,
            device,
            listener: None,
            rx: [0; MAX_COMMAND_LEN],
        }
    }

    /// Clears the LEDs at `brightness` and runs the start-up calibration.
    pub fn start(&mut self, brightness: u8) -> CalibrationReport {
        if let Err(e) = self.pixels.set_brightness(brightness) {
            warn!("Failed to set LED brightness: {:?}", e);
        }
        self.clear_pixels();
        let report = self.scanner.calibrate();
        info!("Board {} ready", self.device);
        report
    }

    /// Runs one scan cycle, then handles at most one queued command.
    pub fn tick(&mut self) -> TickReport {
        let mut publisher = StatusPublisher::new(&mut self.transport, self.listener, &self.device);
        let scan = self.scanner.scan_cycle(&mut publisher);
        let status_sent = publisher.sent() > 0;

        let command = self
            .transport
            .try_recv(&mut self.rx)
            .map(|len| len.min(MAX_COMMAND_LEN))
            .map(|len| {
                let packet = self.rx;
                self.handle_packet(&packet[..len])
            });

        TickReport {
            scan,
            status_sent,
            command,
        }
    }

    /// Decodes and applies one command datagram.
    pub fn handle_packet(&mut self, packet: &[u8]) -> Result<CommandOutcome, CommandError> {
        let command = BoardCommand::parse(packet).map_err(|e| {
            warn!("Dropped command packet ({} bytes): {}", packet.len(), e);
            e
        })?;
        Ok(self.apply(command))
    }

    /// Applies a decoded command.
    pub fn apply(&mut self, command: BoardCommand) -> CommandOutcome {
        info!("command: {}", command.command_type().as_str());
        let recalibrate = command.recalibrates();

        let outcome = match command {
            BoardCommand::RegisterListener(addr) => {
                self.listener = Some(addr);
                info!("Set server address to {}", addr);
                CommandOutcome::ListenerRegistered {
                    status_sent: self.push_status(),
                }
            }
            BoardCommand::ShowPixel(records) => self.show_pixels(&records),
            BoardCommand::ResetPixel => {
                self.clear_pixels();
                CommandOutcome::PixelsReset
            }
            BoardCommand::SetBrightness(level) => {
                if let Err(e) = self.pixels.set_brightness(level) {
                    warn!("Failed to set LED brightness: {:?}", e);
                }
                self.show();
                CommandOutcome::BrightnessSet(level)
            }
            BoardCommand::CalibrateSensors => CommandOutcome::Calibrated,
        };

        if recalibrate {
            self.scanner.recalibrate();
        }
        outcome
    }

    /// Sends the current board status to the listener now.
    ///
    /// Returns false (after logging) when no listener is registered or the
    /// transport fails.
    pub fn push_status(&mut self) -> bool {
        StatusPublisher::new(&mut self.transport, self.listener, &self.device)
            .publish(self.scanner.grid())
    }

    fn show_pixels(&mut self, records: &PixelRecords) -> CommandOutcome {
        let mut applied = 0;
        let mut skipped = 0;

        for record in records {
            let grid = self.scanner.grid_mut();
            let Some(field) = grid.field_at_mut(usize::from(record.column), usize::from(record.row))
            else {
                warn!(
                    "Pixel record ({}, {}) is outside the {}x{} board",
                    record.column, record.row, N, N
                );
                skipped += 1;
                continue;
            };
            field.effect = record.effect;
            let pixel = field.pixel_no;

            if let Err(e) = self.pixels.set_pixel(pixel, record.color) {
                warn!("Failed to set pixel {}: {:?}", pixel, e);
            }
            applied += 1;
        }

        self.show();
        CommandOutcome::PixelsShown { applied, skipped }
    }

    fn clear_pixels(&mut self) {
        if let Err(e) = self.pixels.clear() {
            warn!("Failed to clear LEDs: {:?}", e);
        }
        self.show();
    }

    fn show(&mut self) {
        if let Err(e) = self.pixels.show() {
            warn!("Failed to update LEDs: {:?}", e);
        }
    }

    /// The registered status listener.
    pub fn listener(&self) -> Option<SocketAddrV4> {
        self.listener
    }

    /// Identity used in status updates.
    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    /// The scanner and its grid.
    pub fn scanner(&self) -> &BoardScanner<S, N> {
        &self.scanner
    }

    /// Mutable access to the scanner.
    pub fn scanner_mut(&mut self) -> &mut BoardScanner<S, N> {
        &mut self.scanner
    }

    /// Current board state.
    pub fn grid(&self) -> &FieldGrid<N> {
        self.scanner.grid()
    }

    /// The LED driver.
    pub fn pixels(&self) -> &P {
        &self.pixels
    }

    /// The transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
