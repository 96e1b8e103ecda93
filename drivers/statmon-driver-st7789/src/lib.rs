/*
 *  statmon ST7789 Driver
 *
 *  Sitronix ST7789 TFT panels through the mipidsi ST7789 model,
 *  generic over the embedded-hal 1.0 SPI, GPIO and delay traits.
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 */

//! # statmon ST7789 Panel Driver
//!
//! Pushes whole RGB565 frames to an ST7789 controller.
//!
//! ## Features
//!
//! - RGB565 (16-bit) pixel format
//! - Rotation 0, 90, 180, 270 degrees
//! - Glass offsets for panels smaller than the 240x320 controller RAM
//! - Optional backlight GPIO
//! - Transfers staged in a buffer sized for the Linux spidev `bufsiz`
//!
//! ## Hardware Support
//!
//! - Adafruit 1.14" 240x135 (Mini PiTFT) - [`Geometry::ADAFRUIT_114`]
//! - Any ST7789 glass, given its native size and offsets
//!
//! ## Usage
//!
//! The driver is selected by statmon when configured with:
//!
//! ```yaml
//! display:
//!   driver: st7789
//!   rotate_deg: 90
//!   bus:
//!     bus: "/dev/spidev0.0"
//!     speed_hz: 64000000
//!     dc_pin: 25
//!   backlight_pin: 22
//! ```

mod panel;

pub use panel::{Error, Geometry, Rotation, St7789, TRANSFER_BUFFER};
