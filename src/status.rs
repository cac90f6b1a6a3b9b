//! Binary status update sent to the game server.
//!
//! # Wire format
//!
//! ```text
//! byte 0       message type, 0 = status update
//! bytes 1..13  device id: MAC as 12 uppercase hex chars, no separators
//! bytes 13..   one 3-byte record per field in row-major logical order:
//!              column, row, sensor mask
//! ```
//!
//! The sensor mask has bit 0 west, bit 1 south, bit 2 east and bit 3 north.
//! On a 6x6 board the packet is exactly 121 bytes.
//!
//! # Example
//!
//! ```rust
//! use smartboard::{DeviceId, FieldGrid, Rotation, StatusUpdate};
//! use smartboard::status::encode;
//!
//! let grid: FieldGrid<6> = FieldGrid::new(Rotation::Deg0);
//! let id = DeviceId::from_mac([0x24, 0x6f, 0x28, 0xa1, 0xb2, 0xc3]);
//! let packet = encode(&grid, &id);
//! assert_eq!(packet.len(), 121);
//!
//! let update = StatusUpdate::parse(&packet).unwrap();
//! assert_eq!(update.device.as_str(), "246F28A1B2C3");
//! assert_eq!(update.records.len(), 36);
//! ```

use core::fmt;
use core::ops::Deref;

use heapless::Vec as HVec;

use crate::grid::FieldGrid;
use crate::sensor::Direction;

/// Message type byte of a status update.
pub const STATUS_MESSAGE_TYPE: u8 = 0;

/// Length of the header (type byte plus device id).
pub const HEADER_LEN: usize = 1 + DeviceId::LEN;

/// Bytes per field record.
pub const RECORD_LEN: usize = 3;

/// Most records a status packet can carry (6x6 board).
pub const MAX_RECORDS: usize = 36;

/// Largest status packet.
pub const MAX_STATUS_LEN: usize = HEADER_LEN + RECORD_LEN * MAX_RECORDS;

/// Length of a status packet for a board with `side` fields per edge.
#[inline]
pub const fn status_len(side: usize) -> usize {
    HEADER_LEN + RECORD_LEN * side * side
}

// ============================================================================
// Device identity
// ============================================================================

/// Device identity as sent on the wire: the MAC address in 12 uppercase hex
/// characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId {
    ascii: [u8; DeviceId::LEN],
}

impl DeviceId {
    /// Number of ASCII characters.
    pub const LEN: usize = 12;

    /// Builds the identity from a 6-byte MAC.
    pub fn from_mac(mac: [u8; 6]) -> Self {
        const HEX: &[u8; 16] = b"0123456789ABCDEF";
        let mut ascii = [0u8; Self::LEN];
        for (i, byte) in mac.iter().enumerate() {
            ascii[i * 2] = HEX[usize::from(byte >> 4)];
            ascii[i * 2 + 1] = HEX[usize::from(byte & 0x0F)];
        }
        Self { ascii }
    }

    /// Parses 12 uppercase hex characters.
    pub fn from_ascii(bytes: &[u8]) -> Option<Self> {
        let ascii: [u8; Self::LEN] = bytes.try_into().ok()?;
        if ascii
            .iter()
            .all(|c| c.is_ascii_digit() || (b'A'..=b'F').contains(c))
        {
            Some(Self { ascii })
        } else {
            None
        }
    }

    /// The MAC bytes this identity was built from.
    pub fn mac(&self) -> [u8; 6] {
        fn nibble(c: u8) -> u8 {
            match c {
                b'0'..=b'9' => c - b'0',
                _ => c - b'A' + 10,
            }
        }
        let mut mac = [0u8; 6];
        for (i, byte) in mac.iter_mut().enumerate() {
            *byte = (nibble(self.ascii[i * 2]) << 4) | nibble(self.ascii[i * 2 + 1]);
        }
        mac
    }

    /// The identity as text.
    pub fn as_str(&self) -> &str {
        // Only ever holds ASCII hex digits
        core::str::from_utf8(&self.ascii).unwrap_or_default()
    }

    /// The identity as wire bytes.
    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.ascii
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceId({})", self.as_str())
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Errors from encoding or decoding status packets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusError {
    /// Output buffer cannot hold the packet.
    BufferTooSmall {
        /// Bytes required.
        needed: usize,
        /// Bytes available.
        available: usize,
    },
    /// First byte is not a status update.
    UnexpectedType(u8),
    /// Packet ends inside the header or a record.
    Truncated {
        /// Received length.
        len: usize,
    },
    /// Device id is not 12 uppercase hex characters.
    InvalidDeviceId,
    /// More records than any supported board has.
    TooManyRecords,
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusError::BufferTooSmall { needed, available } => {
                write!(f, "status buffer too small: need {} bytes, have {}", needed, available)
            }
            StatusError::UnexpectedType(t) => write!(f, "unexpected message type {}", t),
            StatusError::Truncated { len } => write!(f, "truncated status packet ({} bytes)", len),
            StatusError::InvalidDeviceId => write!(f, "invalid device id"),
            StatusError::TooManyRecords => write!(f, "too many field records"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for StatusError {}

// ============================================================================
// Encoding
// ============================================================================

/// Writes the status packet for `grid` into `buf`, returning its length.
///
/// Fields are visited in row-major logical order through the rotation.
pub fn encode_into<const N: usize>(
    grid: &FieldGrid<N>,
    device: &DeviceId,
    buf: &mut [u8],
) -> Result<usize, StatusError> {
    let needed = status_len(N);
    if buf.len() < needed {
        return Err(StatusError::BufferTooSmall {
            needed,
            available: buf.len(),
        });
    }

    buf[0] = STATUS_MESSAGE_TYPE;
    buf[1..HEADER_LEN].copy_from_slice(device.as_bytes());

    for (record, (column, row, field)) in buf[HEADER_LEN..needed]
        .chunks_exact_mut(RECORD_LEN)
        .zip(grid.iter_logical())
    {
        record[0] = column as u8;
        record[1] = row as u8;
        record[2] = field.status_mask();
    }

    Ok(needed)
}

/// A fixed-capacity encoded status packet. Dereferences to the packet bytes.
#[derive(Clone)]
pub struct StatusPacket {
    bytes: [u8; MAX_STATUS_LEN],
    len: usize,
}

impl Deref for StatusPacket {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

impl fmt::Debug for StatusPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusPacket").field("len", &self.len).finish()
    }
}

/// Encodes the status packet for `grid`.
pub fn encode<const N: usize>(grid: &FieldGrid<N>, device: &DeviceId) -> StatusPacket {
    let mut bytes = [0u8; MAX_STATUS_LEN];
    // Grid sizes are bounded at compile time, so the packet always fits
    let len = encode_into(grid, device, &mut bytes).unwrap_or(0);
    StatusPacket { bytes, len }
}

// ============================================================================
// Decoding
// ============================================================================

/// One decoded field record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldRecord {
    /// Logical column.
    pub column: u8,
    /// Logical row.
    pub row: u8,
    /// Sensor mask (bit 0 west, bit 1 south, bit 2 east, bit 3 north).
    pub mask: u8,
}

impl FieldRecord {
    /// Returns true if the sensor at `direction` is enabled.
    #[inline]
    pub fn is_set(&self, direction: Direction) -> bool {
        self.mask & direction.status_bit() != 0
    }
}

/// A decoded status update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusUpdate {
    /// Sender identity.
    pub device: DeviceId,
    /// Field records in packet order.
    pub records: HVec<FieldRecord, MAX_RECORDS>,
}

impl StatusUpdate {
    /// Decodes a status packet.
    pub fn parse(packet: &[u8]) -> Result<Self, StatusError> {
        let len = packet.len();
        if len < HEADER_LEN {
            return Err(StatusError::Truncated { len });
        }
        if packet[0] != STATUS_MESSAGE_TYPE {
            return Err(StatusError::UnexpectedType(packet[0]));
        }
        let device =
            DeviceId::from_ascii(&packet[1..HEADER_LEN]).ok_or(StatusError::InvalidDeviceId)?;

        let body = &packet[HEADER_LEN..];
        if body.len() % RECORD_LEN != 0 {
            return Err(StatusError::Truncated { len });
        }

        let mut records = HVec::new();
        for chunk in body.chunks_exact(RECORD_LEN) {
            records
                .push(FieldRecord {
                    column: chunk[0],
                    row: chunk[1],
                    mask: chunk[2],
                })
                .map_err(|_| StatusError::TooManyRecords)?;
        }

        Ok(Self { device, records })
    }

    /// Record for logical `(column, row)`, if present.
    pub fn record_at(&self, column: u8, row: u8) -> Option<&FieldRecord> {
        self.records
            .iter()
            .find(|r| r.column == column && r.row == row)
    }
}
