//! Pixel matrix frame buffer trait

/// Frame buffer backing the LED matrix
///
/// Provides a hardware-agnostic interface for plugins to draw into.
/// Implementations handle shifting the buffer out to the panel; drawing
/// calls never fail.
pub trait FrameBuffer {
    /// Matrix width in pixels
    fn width(&self) -> u8;

    /// Matrix height in pixels
    fn height(&self) -> u8;

    /// Set a pixel value (0 = off, 255 = full)
    ///
    /// Coordinates outside the matrix are ignored.
    fn set_pixel(&mut self, x: u8, y: u8, value: u8);

    /// Clear every pixel
    fn clear(&mut self);

    /// Set global panel brightness
    fn set_brightness(&mut self, brightness: u8);

    /// Current global panel brightness
    fn brightness(&self) -> u8;
}
