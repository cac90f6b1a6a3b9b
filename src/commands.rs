//! Inbound commands from the game server.
//!
//! Every command is one datagram whose first byte is the opcode:
//!
//! | Opcode | Command | Payload |
//! |--------|---------|---------|
//! | 0 | [`RegisterListener`](BoardCommand::RegisterListener) | IPv4 (4 bytes), port (2 bytes, big endian) |
//! | 1 | [`ShowPixel`](BoardCommand::ShowPixel) | up to 36 records of 8 bytes |
//! | 2 | [`ResetPixel`](BoardCommand::ResetPixel) | none |
//! | 3 | [`SetBrightness`](BoardCommand::SetBrightness) | level (1 byte) |
//! | 4 | [`CalibrateSensors`](BoardCommand::CalibrateSensors) | none |
//!
//! A pixel record is `{column, row, r, g, b, effect, pad, pad}` in logical
//! board coordinates.
//!
//! # Example
//!
//! ```rust
//! use smartboard::{BoardCommand, CommandError};
//!
//! let cmd = BoardCommand::parse(&[0, 192, 168, 1, 20, 0x0F, 0xA0]).unwrap();
//! match cmd {
//!     BoardCommand::RegisterListener(addr) => assert_eq!(addr.port(), 4000),
//!     _ => unreachable!(),
//! }
//!
//! assert_eq!(BoardCommand::parse(&[9]), Err(CommandError::UnknownOpcode(9)));
//! ```

use core::fmt;
use core::net::{Ipv4Addr, SocketAddrV4};

use heapless::Vec as HVec;

use crate::field::ColorEffect;
use crate::traits::Rgb;

// ============================================================================
// Command Type
// ============================================================================

/// Opcode of an inbound command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CommandType {
    /// Register the sender as status listener.
    RegisterListener = 0,
    /// Set field colours.
    ShowPixel = 1,
    /// Turn all LEDs off.
    ResetPixel = 2,
    /// Set LED brightness.
    SetBrightness = 3,
    /// Recalibrate the sensors.
    CalibrateSensors = 4,
}

impl CommandType {
    /// Decodes an opcode byte.
    pub const fn from_byte(opcode: u8) -> Option<Self> {
        match opcode {
            0 => Some(CommandType::RegisterListener),
            1 => Some(CommandType::ShowPixel),
            2 => Some(CommandType::ResetPixel),
            3 => Some(CommandType::SetBrightness),
            4 => Some(CommandType::CalibrateSensors),
            _ => None,
        }
    }

    /// Name used in log output.
    pub const fn as_str(&self) -> &'static str {
        match self {
            CommandType::RegisterListener => "REGISTER_LISTENER",
            CommandType::ShowPixel => "SHOW_PIXEL",
            CommandType::ResetPixel => "RESET_PIXEL",
            CommandType::SetBrightness => "SET_BRIGHTNESS",
            CommandType::CalibrateSensors => "CALIBRATE_SENSORS",
        }
    }
}

// ============================================================================
// Pixel Records
// ============================================================================

/// Bytes per pixel record.
pub const PIXEL_RECORD_LEN: usize = 8;

/// Most pixel records a SHOW_PIXEL command carries.
pub const MAX_PIXEL_RECORDS: usize = 36;

/// One field colour assignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PixelRecord {
    /// Logical column.
    pub column: u8,
    /// Logical row.
    pub row: u8,
    /// Colour of the field LED.
    pub color: Rgb,
    /// Effect stored on the field.
    pub effect: ColorEffect,
}

impl PixelRecord {
    fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            column: bytes[0],
            row: bytes[1],
            color: Rgb::new(bytes[2], bytes[3], bytes[4]),
            effect: ColorEffect::from_wire(bytes[5]),
        }
    }
}

/// Pixel records of one SHOW_PIXEL command.
pub type PixelRecords = HVec<PixelRecord, MAX_PIXEL_RECORDS>;

// ============================================================================
// Board Command
// ============================================================================

/// A decoded command from the game server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BoardCommand {
    /// Send status updates to this address from now on.
    RegisterListener(SocketAddrV4),
    /// Set field colours and effects.
    ShowPixel(PixelRecords),
    /// Turn all LEDs off.
    ResetPixel,
    /// Set LED brightness.
    SetBrightness(u8),
    /// Recalibrate the sensors.
    CalibrateSensors,
}

impl BoardCommand {
    /// Decodes one command datagram.
    ///
    /// SHOW_PIXEL takes as many whole records as the packet holds (at most
    /// 36); trailing bytes that do not form a whole record are ignored.
    pub fn parse(packet: &[u8]) -> Result<Self, CommandError> {
        let (&opcode, payload) = packet.split_first().ok_or(CommandError::Empty)?;
        let kind = CommandType::from_byte(opcode).ok_or(CommandError::UnknownOpcode(opcode))?;

        let require = |needed: usize| {
            if payload.len() < needed {
                Err(CommandError::Truncated {
                    command: kind,
                    needed: needed + 1,
                    len: packet.len(),
                })
            } else {
                Ok(())
            }
        };

        match kind {
            CommandType::RegisterListener => {
                require(6)?;
                let ip = Ipv4Addr::new(payload[0], payload[1], payload[2], payload[3]);
                let port = u16::from_be_bytes([payload[4], payload[5]]);
                Ok(BoardCommand::RegisterListener(SocketAddrV4::new(ip, port)))
            }
            CommandType::ShowPixel => {
                let mut records = PixelRecords::new();
                for chunk in payload
                    .chunks_exact(PIXEL_RECORD_LEN)
                    .take(MAX_PIXEL_RECORDS)
                {
                    // Capacity matches the `take` above
                    let _ = records.push(PixelRecord::from_bytes(chunk));
                }
                Ok(BoardCommand::ShowPixel(records))
            }
            CommandType::ResetPixel => Ok(BoardCommand::ResetPixel),
            CommandType::SetBrightness => {
                require(1)?;
                Ok(BoardCommand::SetBrightness(payload[0]))
            }
            CommandType::CalibrateSensors => Ok(BoardCommand::CalibrateSensors),
        }
    }

    /// The opcode of this command.
    pub fn command_type(&self) -> CommandType {
        match self {
            BoardCommand::RegisterListener(_) => CommandType::RegisterListener,
            BoardCommand::ShowPixel(_) => CommandType::ShowPixel,
            BoardCommand::ResetPixel => CommandType::ResetPixel,
            BoardCommand::SetBrightness(_) => CommandType::SetBrightness,
            BoardCommand::CalibrateSensors => CommandType::CalibrateSensors,
        }
    }

    /// Returns true if applying the command ends with a sensor
    /// recalibration (LED current shifts the HAL baselines).
    pub fn recalibrates(&self) -> bool {
        !matches!(self, BoardCommand::SetBrightness(_))
    }
}

// ============================================================================
// Errors and Outcomes
// ============================================================================

/// Reason a command datagram was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandError {
    /// Zero-length datagram.
    Empty,
    /// First byte is not a known opcode.
    UnknownOpcode(u8),
    /// Payload shorter than the command requires.
    Truncated {
        /// Command being decoded.
        command: CommandType,
        /// Minimum packet length.
        needed: usize,
        /// Received packet length.
        len: usize,
    },
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Empty => write!(f, "empty command packet"),
            CommandError::UnknownOpcode(op) => write!(f, "unknown opcode {}", op),
            CommandError::Truncated { command, needed, len } => write!(
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
impl std::error::Error for CommandError {}

/// Result of applying a command.
///
/// Returned by [`BoardController::handle_packet`] to indicate what happened.
///
/// [`BoardController::handle_packet`]: crate::BoardController::handle_packet
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Listener stored; `status_sent` tells whether the immediate status
    /// push reached the transport.
    ListenerRegistered {
        /// Whether the initial status update was sent.
        status_sent: bool,
    },
    /// Colours applied.
    PixelsShown {
        /// Records applied to a field.
        applied: usize,
        /// Records outside the board.
        skipped: usize,
    },
    /// LEDs cleared.
    PixelsReset,
    /// Brightness changed.
    BrightnessSet(u8),
    /// Sensors recalibrated.
    Calibrated,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn show_pixel_packet(records: &[[u8; 8]]) -> Vec<u8> {
        let mut packet = vec![1u8];
        for record in records {
            packet.extend_from_slice(record);
        }
        packet
    }

    #[test]
    fn command_type_from_byte() {
        for op in 0..=4u8 {
            let kind = CommandType::from_byte(op).unwrap();
            assert_eq!(kind as u8, op);
        }
        assert_eq!(CommandType::from_byte(5), None);
        assert_eq!(CommandType::SetBrightness.as_str(), "SET_BRIGHTNESS");
    }

    #[test]
    fn parse_register_listener() {
        let cmd = BoardCommand::parse(&[0, 10, 0, 0, 7, 0x11, 0x5D]).unwrap();
        assert_eq!(
            cmd,
            BoardCommand::RegisterListener(SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 7), 4445))
        );
        assert_eq!(cmd.command_type(), CommandType::RegisterListener);
    }

    #[test]
    fn parse_register_listener_truncated() {
        assert_eq!(
            BoardCommand::parse(&[0, 10, 0, 0, 7, 0x11]),
            Err(CommandError::Truncated {
                command: CommandType::RegisterListener,
                needed: 7,
                len: 6
            })
        );
    }

    #[test]
    fn parse_show_pixel_records() {
        let packet = show_pixel_packet(&[
            [2, 3, 255, 0, 10, 1, 0, 0],
            [5, 0, 0, 0, 0, 4, 0xAA, 0xBB],
        ]);
        let BoardCommand::ShowPixel(records) = BoardCommand::parse(&packet).unwrap() else {
            panic!("expected SHOW_PIXEL");
        };
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].column, 2);
        assert_eq!(records[0].row, 3);
        assert_eq!(records[0].color, Rgb::new(255, 0, 10));
        assert_eq!(records[0].effect, ColorEffect::FixedColor);
        assert_eq!(records[1].effect, ColorEffect::BlueFlame);
    }

    #[test]
    fn parse_show_pixel_ignores_partial_record() {
        let mut packet = show_pixel_packet(&[[1, 1, 1, 1, 1, 1, 0, 0]]);
        packet.extend_from_slice(&[4, 4, 4]);
        let BoardCommand::ShowPixel(records) = BoardCommand::parse(&packet).unwrap() else {
            panic!("expected SHOW_PIXEL");
        };
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn parse_show_pixel_caps_at_36() {
        let packet = show_pixel_packet(&[[0u8; 8]; 40]);
        let BoardCommand::ShowPixel(records) = BoardCommand::parse(&packet).unwrap() else {
            panic!("expected SHOW_PIXEL");
        };
        assert_eq!(records.len(), MAX_PIXEL_RECORDS);
    }

    #[test]
    fn parse_show_pixel_empty() {
        assert_eq!(
            BoardCommand::parse(&[1]),
            Ok(BoardCommand::ShowPixel(PixelRecords::new()))
        );
    }

    #[test]
    fn parse_simple_commands() {
        assert_eq!(BoardCommand::parse(&[2]), Ok(BoardCommand::ResetPixel));
        assert_eq!(BoardCommand::parse(&[3, 128]), Ok(BoardCommand::SetBrightness(128)));
        assert_eq!(BoardCommand::parse(&[4, 99, 99]), Ok(BoardCommand::CalibrateSensors));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(BoardCommand::parse(&[]), Err(CommandError::Empty));
        assert_eq!(BoardCommand::parse(&[200, 1, 2]), Err(CommandError::UnknownOpcode(200)));
        assert!(matches!(
            BoardCommand::parse(&[3]),
            Err(CommandError::Truncated {
                command: CommandType::SetBrightness,
                ..
            })
        ));
    }

    #[test]
    fn only_brightness_skips_recalibration() {
        assert!(!BoardCommand::SetBrightness(10).recalibrates());
        assert!(BoardCommand::ResetPixel.recalibrates());
        assert!(BoardCommand::CalibrateSensors.recalibrates());
        assert!(BoardCommand::ShowPixel(PixelRecords::new()).recalibrates());
    }

    #[test]
    fn error_display() {
        assert_eq!(CommandError::UnknownOpcode(7).to_string(), "unknown opcode 7");
        assert_eq!(
            BoardCommand::parse(&[3]).unwrap_err().to_string(),
            "SET_BRIGHTNESS needs 2 bytes, got 1"
        );
    }
}
