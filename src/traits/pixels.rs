//! LED strip abstraction for per-field feedback.
//!
//! The sensor core never animates anything. It only forwards the colours the
//! game server asks for and clears the strip on request, so the trait stays
//! small.

/// A 24-bit colour.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// All channels off.
    pub const OFF: Rgb = Rgb::new(0, 0, 0);

    /// Creates a colour.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Addressable LED strip trait.
///
/// Implementors buffer pixel changes until [`show`](Self::show) is called,
/// like WS2812 drivers do.
///
/// # Example
///
/// ```ignore
/// use smartboard::traits::{PixelDriver, Rgb};
///
/// struct MyStrip { /* ... */ }
///
/// impl PixelDriver for MyStrip {
///     type Error = ();
///
///     fn set_pixel(&mut self, index: u16, color: Rgb) -> Result<(), ()> { Ok(()) }
///     fn clear(&mut self) -> Result<(), ()> { Ok(()) }
///     fn set_brightness(&mut self, level: u8) -> Result<(), ()> { Ok(()) }
///     fn show(&mut self) -> Result<(), ()> { Ok(()) }
/// }
/// ```
pub trait PixelDriver {
    /// Error type for strip operations.
    type Error: core::fmt::Debug;

    /// Sets the buffered colour of one pixel.
    ///
    /// Indices past the end of the strip are ignored.
    fn set_pixel(&mut self, index: u16, color: Rgb) -> Result<(), Self::Error>;

    /// Turns every buffered pixel off.
    fn clear(&mut self) -> Result<(), Self::Error>;

    /// Sets the global brightness (0 to 255).
    fn set_brightness(&mut self, level: u8) -> Result<(), Self::Error>;

    /// Pushes the buffer to the strip.
    fn show(&mut self) -> Result<(), Self::Error>;
}
