//! Control path of module-variant boards.
//!
//! A module board answers a smaller command set than the analog board and
//! reports digital sensor changes as 40-byte sensor updates instead of the
//! full grid status:
//!
//! | Opcode | Command | Payload |
//! |--------|---------|---------|
//! | 0 | [`Register`](ModuleCommand::Register) | IPv4 (4 bytes), port (2 bytes, big endian) |
//! | 1 | [`ColorClear`](ModuleCommand::ColorClear) | none |
//! | 2 | [`ColorUpdate`](ModuleCommand::ColorUpdate) | count, then `count` pairs of `{pixel, palette index}` |
//! | 3 | [`EnableSensors`](ModuleCommand::EnableSensors) | flags (bit 0 edge, bit 1 button, bit 2 board) |
//! | 4 | [`SetBrightness`](ModuleCommand::SetBrightness) | level (1 byte) |
//!
//! [`ModuleController`] polls the modules once per tick, sends one update
//! per changed sensor kind and then handles at most one queued command.
//!
//! # Example
//!
//! ```rust
//! use smartboard::module_controller::{ModuleCommand, PALETTE};
//!
//! let ModuleCommand::ColorUpdate(colors) = ModuleCommand::parse(&[2, 1, 9, 7]).unwrap() else {
//!     unreachable!()
//! };
//! assert_eq!(colors[0].pixel, 9);
//! assert_eq!(PALETTE[usize::from(colors[0].palette)], smartboard::Rgb::new(255, 0, 0));
//! ```

use core::fmt;
use core::net::{Ipv4Addr, SocketAddrV4};

use embedded_hal::digital::InputPin;
use embedded_hal::i2c::I2c;
use heapless::Vec as HVec;
use log::{debug, info, warn};

use crate::config::BoardConfig;
use crate::controller::MAX_COMMAND_LEN;
use crate::module::{ModuleBoard, ModuleChanges, ModuleError, SensorEnable, SensorKind, MODULES};
use crate::status::DeviceId;
use crate::traits::{PixelDriver, Rgb, StatusTransport};

// ============================================================================
// Palette
// ============================================================================

/// Colours addressed by BOARD_COLOR_UPDATE palette indices.
pub const PALETTE: [Rgb; 46] = [
    Rgb::new(0, 0, 0),       // black
    Rgb::new(112, 128, 144), // slate grey
    Rgb::new(128, 128, 128), // grey
    Rgb::new(211, 211, 211), // light grey
    Rgb::new(255, 255, 255), // white
    Rgb::new(139, 0, 0),     // dark red
    Rgb::new(220, 20, 60),   // crimson
    Rgb::new(255, 0, 0),     // red
    Rgb::new(255, 127, 80),  // coral
    Rgb::new(255, 69, 0),    // orange red
    Rgb::new(255, 165, 0),   // orange
    Rgb::new(210, 105, 30),  // chocolate
    Rgb::new(255, 255, 0),   // yellow
    Rgb::new(255, 215, 0),   // gold
    Rgb::new(0, 100, 0),     // dark green
    Rgb::new(173, 255, 47),  // green yellow
    Rgb::new(124, 252, 0),   // lawn green
    Rgb::new(0, 255, 0),     // lime
    Rgb::new(144, 238, 144), // light green
    Rgb::new(0, 255, 127),   // spring green
    Rgb::new(32, 178, 170),  // light sea green
    Rgb::new(0, 128, 128),   // teal
    Rgb::new(0, 255, 255),   // aqua
    Rgb::new(64, 224, 208),  // turquoise
    Rgb::new(127, 255, 212), // aquamarine
    Rgb::new(176, 224, 230), // powder blue
    Rgb::new(70, 130, 180),  // steel blue
    Rgb::new(100, 149, 237), // cornflower blue
    Rgb::new(0, 191, 255),   // deep sky blue
    Rgb::new(135, 206, 235), // sky blue
    Rgb::new(25, 25, 112),   // midnight blue
    Rgb::new(0, 0, 139),     // dark blue
    Rgb::new(0, 0, 205),     // medium blue
    Rgb::new(0, 0, 255),     // blue
    Rgb::new(65, 105, 225),  // royal blue
    Rgb::new(138, 43, 226),  // blue violet
    Rgb::new(75, 0, 130),    // indigo
    Rgb::new(147, 112, 219), // medium purple
    Rgb::new(139, 0, 139),   // dark magenta
    Rgb::new(148, 0, 212),   // dark violet
    Rgb::new(255, 0, 255),   // magenta
    Rgb::new(218, 112, 214), // orchid
    Rgb::new(255, 20, 127),  // deep pink
    Rgb::new(255, 192, 203), // pink
    Rgb::new(250, 250, 210), // light goldenrod yellow
    Rgb::new(245, 255, 250), // mint cream
];

/// Colour of palette entry `index`, if it exists.
#[inline]
pub fn palette_color(index: u8) -> Option<Rgb> {
    PALETTE.get(usize::from(index)).copied()
}

// ============================================================================
// Module Commands
// ============================================================================

/// Opcode of a module board command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ModuleCommandType {
    /// Register the sensor update listener.
    Register = 0,
    /// Turn all LEDs off.
    ColorClear = 1,
    /// Set LEDs from the palette.
    ColorUpdate = 2,
    /// Select the reported sensor kinds.
    EnableSensors = 3,
    /// Set LED brightness.
    SetBrightness = 4,
}

impl ModuleCommandType {
    /// Decodes an opcode byte.
    pub const fn from_byte(opcode: u8) -> Option<Self> {
        match opcode {
            0 => Some(ModuleCommandType::Register),
            1 => Some(ModuleCommandType::ColorClear),
            2 => Some(ModuleCommandType::ColorUpdate),
            3 => Some(ModuleCommandType::EnableSensors),
            4 => Some(ModuleCommandType::SetBrightness),
            _ => None,
        }
    }

    /// Name used in log output.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ModuleCommandType::Register => "REGISTER",
            ModuleCommandType::ColorClear => "BOARD_COLOR_CLEAR",
            ModuleCommandType::ColorUpdate => "BOARD_COLOR_UPDATE",
            ModuleCommandType::EnableSensors => "BOARD_ENABLE_SENSOR",
            ModuleCommandType::SetBrightness => "BOARD_SET_BRIGHTNESS",
        }
    }
}

/// Most assignments one BOARD_COLOR_UPDATE can carry (the count is a byte).
pub const MAX_COLOR_ASSIGNMENTS: usize = u8::MAX as usize;

/// One LED set to a palette colour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColorAssignment {
    /// LED index along the chained module strips.
    pub pixel: u8,
    /// Index into [`PALETTE`].
    pub palette: u8,
}

/// Assignments of one BOARD_COLOR_UPDATE command.
pub type ColorAssignments = HVec<ColorAssignment, MAX_COLOR_ASSIGNMENTS>;

/// A decoded module board command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModuleCommand {
    /// Send sensor updates to this address from now on.
    Register(SocketAddrV4),
    /// Turn all LEDs off.
    ColorClear,
    /// Set LEDs from the palette.
    ColorUpdate(ColorAssignments),
    /// Replace the enabled sensor kinds.
    EnableSensors(SensorEnable),
    /// Set LED brightness.
    SetBrightness(u8),
}

impl ModuleCommand {
    /// Decodes one command datagram.
    ///
    /// BOARD_COLOR_UPDATE must carry every pair its count announces; bytes
    /// after the last pair are ignored.
    pub fn parse(packet: &[u8]) -> Result<Self, ModuleCommandError> {
        let (&opcode, payload) = packet.split_first().ok_or(ModuleCommandError::Empty)?;
        let kind = ModuleCommandType::from_byte(opcode)
            .ok_or(ModuleCommandError::UnknownOpcode(opcode))?;

        let require = |needed: usize| {
            if payload.len() < needed {
                Err(ModuleCommandError::Truncated {
                    command: kind,
                    needed: needed + 1,
                    len: packet.len(),
                })
            } else {
                Ok(())
            }
        };

        match kind {
            ModuleCommandType::Register => {
                require(6)?;
                let ip = Ipv4Addr::new(payload[0], payload[1], payload[2], payload[3]);
                let port = u16::from_be_bytes([payload[4], payload[5]]);
                Ok(ModuleCommand::Register(SocketAddrV4::new(ip, port)))
            }
            ModuleCommandType::ColorClear => Ok(ModuleCommand::ColorClear),
            ModuleCommandType::ColorUpdate => {
                require(1)?;
                let count = usize::from(payload[0]);
                require(1 + count * 2)?;

                let mut colors = ColorAssignments::new();
                for pair in payload[1..].chunks_exact(2).take(count) {
                    // A byte count never exceeds the capacity
                    let _ = colors.push(ColorAssignment {
                        pixel: pair[0],
                        palette: pair[1],
                    });
                }
                Ok(ModuleCommand::ColorUpdate(colors))
            }
            ModuleCommandType::EnableSensors => {
                require(1)?;
                Ok(ModuleCommand::EnableSensors(SensorEnable::from_wire(payload[0])))
            }
            ModuleCommandType::SetBrightness => {
                require(1)?;
                Ok(ModuleCommand::SetBrightness(payload[0]))
            }
        }
    }

    /// The opcode of this command.
    pub fn command_type(&self) -> ModuleCommandType {
        match self {
            ModuleCommand::Register(_) => ModuleCommandType::Register,
            ModuleCommand::ColorClear => ModuleCommandType::ColorClear,
            ModuleCommand::ColorUpdate(_) => ModuleCommandType::ColorUpdate,
            ModuleCommand::EnableSensors(_) => ModuleCommandType::EnableSensors,
            ModuleCommand::SetBrightness(_) => ModuleCommandType::SetBrightness,
        }
    }
}

/// Reason a module command datagram was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModuleCommandError {
    /// Zero-length datagram.
    Empty,
    /// First byte is not a known opcode.
    UnknownOpcode(u8),
    /// Payload shorter than the command requires.
    Truncated {
        /// Command being decoded.
        command: ModuleCommandType,
        /// Minimum packet length.
        needed: usize,
        /// Received packet length.
        len: usize,
    },
}

impl fmt::Display for ModuleCommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleCommandError::Empty => write!(f, "empty command packet"),
            ModuleCommandError::UnknownOpcode(op) => write!(f, "unknown opcode {}", op),
            ModuleCommandError::Truncated { command, needed, len } => write!(
                f,
                "{} needs {} bytes, got {}",
                command.as_str(),
                needed,
                len
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ModuleCommandError {}

/// Result of applying a module command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModuleOutcome {
    /// Listener stored.
    ListenerRegistered(SocketAddrV4),
    /// LEDs cleared.
    PixelsCleared,
    /// Palette colours applied.
    PixelsShown {
        /// Assignments written to the strip.
        applied: usize,
        /// Assignments with an unknown palette index.
        skipped: usize,
    },
    /// Enabled sensor kinds replaced.
    SensorsEnabled(SensorEnable),
    /// Brightness changed.
    BrightnessSet(u8),
}

// ============================================================================
// Module Controller
// ============================================================================

/// Outcome of one module controller tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModuleTickReport {
    /// Sensor kinds that changed this tick.
    pub changes: ModuleChanges,
    /// Sensor updates that reached the transport.
    pub updates_sent: usize,
    /// The command handled this tick, if one was queued.
    pub command: Option<Result<ModuleOutcome, ModuleCommandError>>,
}

/// Main controller for a module-variant board.
///
/// Owns the I2C bus, the four module interrupt lines, the LED strip and the
/// transport. Like [`BoardController`](crate::BoardController) no error
/// stops the loop.
pub struct ModuleController<I, Q, P, T> {
    board: ModuleBoard,
    i2c: I,
    irq_pins: [Q; MODULES],
    pixels: P,
    transport: T,
    device: DeviceId,
    listener: Option<SocketAddrV4>,
    brightness: u8,
    rx: [u8; MAX_COMMAND_LEN],
}

impl<I, Q, P, T> ModuleController<I, Q, P, T>
where
    I: I2c,
    Q: InputPin,
    P: PixelDriver,
    T: StatusTransport,
{
    /// Creates a controller for the modules behind `config.switch_address`.
    pub fn new(
        config: &BoardConfig,
        i2c: I,
        irq_pins: [Q; MODULES],
        pixels: P,
        transport: T,
        device: DeviceId,
    ) -> Self {
        Self {
            board: ModuleBoard::new(config.switch_address),
            i2c,
            irq_pins,
            pixels,
            transport,
            device,
            listener: None,
            brightness: config.led_brightness,
            rx: [0; MAX_COMMAND_LEN],
        }
    }

    /// Clears the LEDs and sets up every module.
    ///
    /// # Errors
    ///
    /// The first module that failed to respond. The other modules are set up
    /// regardless and the controller stays usable.
    pub fn start(&mut self) -> Result<(), ModuleError> {
        if let Err(e) = self.pixels.set_brightness(self.brightness) {
            warn!("Failed to set LED brightness: {:?}", e);
        }
        self.clear_pixels();

        let result = self.board.begin(&mut self.i2c);
        match &result {
            Ok(()) => info!("Module board {} ready", self.device),
            Err(e) => warn!("Module board {} started degraded: {}", self.device, e),
        }
        result
    }

    /// Polls the modules, sends an update per changed kind, then handles at
    /// most one queued command.
    pub fn tick(&mut self) -> ModuleTickReport {
        let changes = self.board.poll_pins(&mut self.i2c, &mut self.irq_pins);
        let updates_sent = changes.kinds().filter(|kind| self.send_update(*kind)).count();

        let command = self
            .transport
            .try_recv(&mut self.rx)
            .map(|len| len.min(MAX_COMMAND_LEN))
            .map(|len| {
                let packet = self.rx;
                self.handle_packet(&packet[..len])
            });

        ModuleTickReport {
            changes,
            updates_sent,
            command,
        }
    }

    /// Sends the state of `kind` to the listener. Returns whether a datagram
    /// went out.
    pub fn send_update(&mut self, kind: SensorKind) -> bool {
        let Some(listener) = self.listener else {
            debug!("No listener registered, {:?} update not sent", kind);
            return false;
        };

        let packet = self.board.sensor_update(kind, self.device.mac());
        match self.transport.send_to(listener, &packet) {
            Ok(()) => {
                debug!("Sent {:?} update to {}", kind, listener);
                true
            }
            Err(e) => {
                warn!("{:?} update to {} failed: {:?}", kind, listener, e);
                false
            }
        }
    }

    /// Decodes and applies one command datagram.
    pub fn handle_packet(&mut self, packet: &[u8]) -> Result<ModuleOutcome, ModuleCommandError> {
        let command = ModuleCommand::parse(packet).map_err(|e| {
            warn!("Dropped command packet ({} bytes): {}", packet.len(), e);
            e
        })?;
        Ok(self.apply(command))
    }

    /// Applies a decoded command.
    pub fn apply(&mut self, command: ModuleCommand) -> ModuleOutcome {
        info!("command: {}", command.command_type().as_str());

        match command {
            ModuleCommand::Register(addr) => {
                self.listener = Some(addr);
                info!("Set UDP server address to {}", addr);
                ModuleOutcome::ListenerRegistered(addr)
            }
            ModuleCommand::ColorClear => {
                self.clear_pixels();
                ModuleOutcome::PixelsCleared
            }
            ModuleCommand::ColorUpdate(colors) => self.show_colors(&colors),
            ModuleCommand::EnableSensors(enabled) => {
                self.board.enable_sensors(enabled);
                ModuleOutcome::SensorsEnabled(enabled)
            }
            ModuleCommand::SetBrightness(level) => {
                self.brightness = level;
                if let Err(e) = self.pixels.set_brightness(level) {
                    warn!("Failed to set LED brightness: {:?}", e);
                }
                self.show();
                ModuleOutcome::BrightnessSet(level)
            }
        }
    }

    fn show_colors(&mut self, colors: &ColorAssignments) -> ModuleOutcome {
        let mut applied = 0;
        let mut skipped = 0;

        for assignment in colors {
            let Some(color) = palette_color(assignment.palette) else {
                warn!(
                    "Unknown palette index {} for LED {}",
                    assignment.palette, assignment.pixel
                );
                skipped += 1;
                continue;
            };
            if let Err(e) = self.pixels.set_pixel(u16::from(assignment.pixel), color) {
                warn!("Failed to set pixel {}: {:?}", assignment.pixel, e);
            }
            applied += 1;
        }

        self.show();
        ModuleOutcome::PixelsShown { applied, skipped }
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

    /// The registered sensor update listener.
    pub fn listener(&self) -> Option<SocketAddrV4> {
        self.listener
    }

    /// The modules and their last read state.
    pub fn board(&self) -> &ModuleBoard {
        &self.board
    }

    /// Mutable access to the I2C bus.
    pub fn i2c_mut(&mut self) -> &mut I {
        &mut self.i2c
    }

    /// Mutable access to the module interrupt lines.
    pub fn irq_pins_mut(&mut self) -> &mut [Q; MODULES] {
        &mut self.irq_pins
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
