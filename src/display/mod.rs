/*
 *  display/mod.rs
 *
 *  statmon - host vitals at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display layer: canvas, driver trait, drivers and factory
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

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::RgbColor;

use crate::vframebuf::VarFrameBuf;

// Core trait definitions
pub mod traits;
pub mod error;
pub mod color;
pub mod factory;

// Display drivers (hardware ones are feature gated inside)
pub mod drivers;

// Re-exports for convenience
pub use traits::{DisplayDriver, DisplayCapabilities};
pub use error::{DisplayError, DisplayFactoryError};
pub use color::Color;
pub use factory::{DisplayDriverFactory, BoxedDriver};
pub use drivers::mock::MockDriver;

#[cfg(feature = "driver-st7789")]
pub use drivers::st7789::St7789Driver;

/// In-memory frame, sized to the visible panel area
pub type Canvas = VarFrameBuf<Rgb565>;

/// Canvas fill and erase color
pub const BACKGROUND: Rgb565 = Rgb565::BLACK;
