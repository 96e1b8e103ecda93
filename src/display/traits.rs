/*
 *  display/traits.rs
 *
 *  statmon - host vitals at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Core trait definitions for display driver abstraction
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use crate::display::Canvas;
use crate::display::error::DisplayError;

/// Display capabilities and metadata
#[derive(Debug, Clone)]
pub struct DisplayCapabilities {
    /// Visible width in pixels, after rotation
    pub width: u32,

    /// Visible height in pixels, after rotation
    pub height: u32,

    /// Rotation the panel was configured with
    pub rotation: u16,

    /// Whether the display has a switchable backlight
    pub supports_backlight: bool,
}

/// Minimal hardware abstraction - all display drivers must implement this trait
///
/// The sample loop only ever hands over a finished canvas; drivers never
/// see individual draw calls.
pub trait DisplayDriver: Send {
    /// Returns the capabilities of this display
    fn capabilities(&self) -> &DisplayCapabilities;

    /// Returns the visible dimensions as (width, height)
    fn dimensions(&self) -> (u32, u32) {
        let caps = self.capabilities();
        (caps.width, caps.height)
    }

    /// Initialize the display hardware
    fn init(&mut self) -> Result<(), DisplayError>;

    /// Transfer a whole canvas to the panel
    ///
    /// The canvas must match `dimensions()`.
    fn push(&mut self, canvas: &Canvas) -> Result<(), DisplayError>;

    /// Switch the backlight (if supported)
    fn set_backlight(&mut self, _on: bool) -> Result<(), DisplayError> {
        Err(DisplayError::UnsupportedOperation)
    }

    /// Change the rotation (0, 90, 180 or 270 degrees)
    ///
    /// Landscape/portrait flips swap `dimensions()`; the caller must
    /// reallocate its canvas.
    fn set_rotation(&mut self, degrees: u16) -> Result<(), DisplayError>;
}

/// Visible size of a native (portrait) panel once rotated
pub fn rotated_size(native: (u32, u32), degrees: u16) -> Result<(u32, u32), DisplayError> {
    match degrees {
        0 | 180 => Ok(native),
        90 | 270 => Ok((native.1, native.0)),
        other => Err(DisplayError::InvalidRotation(other)),
    }
}

/// Check a canvas against the panel before transfer
pub fn check_canvas(caps: &DisplayCapabilities, canvas: &Canvas) -> Result<(), DisplayError> {
    let expected = caps.width as usize * caps.height as usize;
    let actual = canvas.width() * canvas.height();
    if canvas.width() != caps.width as usize || actual != expected {
        return Err(DisplayError::BufferSizeMismatch { expected, actual });
    }
    Ok(())
}
