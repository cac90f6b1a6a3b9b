//! A single board cell: four edge sensors plus one LED.

use crate::sensor::{Direction, Sensor};

/// Special LED effect of a field.
///
/// Effects are cosmetic and are only ever set by game server commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ColorEffect {
    /// LED off / no effect.
    #[default]
    None = 0,
    /// Static colour.
    FixedColor = 1,
    /// Flickering red flame.
    RedFlame = 2,
    /// Flickering green flame.
    GreenFlame = 3,
    /// Flickering blue flame.
    BlueFlame = 4,
}

impl ColorEffect {
    /// Decodes the wire value of an effect. Unknown values map to `None`.
    ///
    /// ```
    /// use smartboard::ColorEffect;
    ///
    /// assert_eq!(ColorEffect::from_wire(1), ColorEffect::FixedColor);
    /// assert_eq!(ColorEffect::from_wire(42), ColorEffect::None);
    /// ```
    pub const fn from_wire(value: u8) -> Self {
        match value {
            1 => ColorEffect::FixedColor,
            2 => ColorEffect::RedFlame,
            3 => ColorEffect::GreenFlame,
            4 => ColorEffect::BlueFlame,
            _ => ColorEffect::None,
        }
    }
}

/// One playable board cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Field {
    /// Index of the field's LED on the strip.
    pub pixel_no: u16,
    /// Current LED effect.
    pub effect: ColorEffect,
    /// Sensor at the top edge.
    pub north: Sensor,
    /// Sensor at the right edge.
    pub east: Sensor,
    /// Sensor at the bottom edge.
    pub south: Sensor,
    /// Sensor at the left edge.
    pub west: Sensor,
}

impl Field {
    /// Returns the sensor for `direction`.
    #[inline]
    pub fn sensor(&self, direction: Direction) -> &Sensor {
        match direction {
            Direction::North => &self.north,
            Direction::East => &self.east,
            Direction::South => &self.south,
            Direction::West => &self.west,
        }
    }

    #[inline]
    pub(crate) fn sensor_mut(&mut self, direction: Direction) -> &mut Sensor {
        match direction {
            Direction::North => &mut self.north,
            Direction::East => &mut self.east,
            Direction::South => &mut self.south,
            Direction::West => &mut self.west,
        }
    }

    /// Packs the four `enabled` flags into a status bitmask
    /// (bit0 west, bit1 south, bit2 east, bit3 north).
    ///
    /// ```
    /// use smartboard::Field;
    ///
    /// let mut field = Field::default();
    /// field.north.enabled = true;
    /// field.west.enabled = true;
    /// assert_eq!(field.status_mask(), 0b1001);
    /// ```
    pub fn status_mask(&self) -> u8 {
        Direction::ALL
            .iter()
            .filter(|d| self.sensor(**d).enabled)
            .fold(0, |mask, d| mask | d.status_bit())
    }

    /// Returns true if any edge sensor detects a magnet.
    #[inline]
    pub fn is_occupied(&self) -> bool {
        self.status_mask() != 0
    }
}
