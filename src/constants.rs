/*
 *  constants.rs
 *
 *  statmon - host vitals at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Built-in defaults for timing, layout, panel wiring and metric sources
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

//! Global defaults; anything here can be overridden from the config file.

// Timing
/// Delay between the end of one cycle and the start of the next.
pub const POLL_INTERVAL_MS: u64 = 100;
/// Upper bound on a single metric read before it is reported as failed.
pub const SAMPLE_TIMEOUT_MS: u64 = 500;
/// Value text shown in place of a metric that could not be read.
pub const PLACEHOLDER: &str = "N/A";

// Layout
/// X position of every text line.
pub const TEXT_ORIGIN_X: i32 = 0;
/// Y position of the first line; negative tucks the font's blank top rows off-screen.
pub const TOP_PADDING: i32 = -2;

// Panel, Adafruit 1.14" Mini PiTFT in its native portrait orientation
pub const PANEL_WIDTH: u32 = 135;
pub const PANEL_HEIGHT: u32 = 240;
pub const PANEL_X_OFFSET: u16 = 53;
pub const PANEL_Y_OFFSET: u16 = 40;
/// Landscape, as the panel sits on the Pi header.
pub const PANEL_ROTATION: u16 = 90;
pub const PANEL_INVERT: bool = true;

// Wiring
pub const SPI_BUS: &str = "/dev/spidev0.0";
/// Default max is 24MHz on paper; the Mini PiTFT is happy at 64MHz.
pub const SPI_SPEED_HZ: u32 = 64_000_000;
pub const DC_PIN: u32 = 25;
pub const BACKLIGHT_PIN: u32 = 22;

// Metric sources
pub const PROC_ROOT: &str = "/proc";
pub const THERMAL_ZONE: &str = "/sys/class/thermal/thermal_zone0/temp";
pub const DISK_MOUNT: &str = "/";
