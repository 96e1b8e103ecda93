/*
 *  display/drivers/st7789.rs
 *
 *  statmon - host vitals at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  ST7789 TFT over Linux spidev and sysfs GPIO
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

use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
use linux_embedded_hal::sysfs_gpio::Direction;
use linux_embedded_hal::{Delay, SpidevDevice, SysfsPin};
use statmon_driver_st7789::{Geometry, Rotation, St7789};

use crate::config::DisplayConfig;
use crate::display::Canvas;
use crate::display::error::DisplayError;
use crate::display::traits::{check_canvas, DisplayCapabilities, DisplayDriver};

use log::{debug, info, warn};

type Panel = St7789<SpidevDevice, SysfsPin, SysfsPin>;

/// ST7789 display driver wrapper
///
/// Owns the panel (spidev handle and D/C line, handed to mipidsi on
/// `init`) and the optional backlight line. Frames are pushed whole.
pub struct St7789Driver {
    panel: Panel,
    delay: Delay,
    capabilities: DisplayCapabilities,
}

impl St7789Driver {
    /// Create a new ST7789 driver using SPI
    ///
    /// # Arguments
    ///
    /// * `spi_bus_path` - Path to SPI device (e.g., "/dev/spidev0.0")
    /// * `speed_hz` - SPI clock
    /// * `dc_pin` - BCM number of the data/command line
    /// * `config` - Display configuration
    pub fn new_spi(
        spi_bus_path: &str,
        speed_hz: u32,
        dc_pin: u32,
        config: &DisplayConfig,
    ) -> Result<Self, DisplayError> {
        info!("Initializing ST7789 on {} @ {} Hz, DC GPIO{}", spi_bus_path, speed_hz, dc_pin);

        let rotation = Rotation::from_degrees(config.rotate_deg())
            .ok_or(DisplayError::InvalidRotation(config.rotate_deg()))?;

        let (width, height) = config.native_size();
        let (x_offset, y_offset) = config.offsets();
        let geometry = Geometry {
            width: to_u16(width, "width")?,
            height: to_u16(height, "height")?,
            x_offset,
            y_offset,
            invert: config.invert(),
        };

        let mut spi = SpidevDevice::open(spi_bus_path)
            .map_err(|e| DisplayError::SpiError(format!("open {}: {:?}", spi_bus_path, e)))?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(speed_hz)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        spi.configure(&options)
            .map_err(|e| DisplayError::SpiError(format!("configure {}: {}", spi_bus_path, e)))?;

        let dc = output_pin(dc_pin)?;
        let backlight = match config.backlight_pin() {
            Some(pin) => Some(output_pin(pin)?),
            None => None,
        };

        let (w, h) = geometry.size(rotation);
        let capabilities = DisplayCapabilities {
            width: w as u32,
            height: h as u32,
            rotation: rotation.degrees(),
            supports_backlight: backlight.is_some(),
        };
        debug!("ST7789 visible area {}x{}, glass offset ({}, {})", w, h, x_offset, y_offset);

        Ok(Self {
            panel: St7789::new(spi, dc, backlight, geometry, rotation),
            delay: Delay,
            capabilities,
        })
    }
}

fn to_u16(value: u32, what: &str) -> Result<u16, DisplayError> {
    u16::try_from(value)
        .map_err(|_| DisplayError::InvalidConfiguration(format!("display {} {} out of range", what, value)))
}

/// Export a sysfs GPIO line and make it an output.
fn output_pin(number: u32) -> Result<SysfsPin, DisplayError> {
    let pin = SysfsPin::new(number as u64);
    pin.export()
        .map_err(|e| DisplayError::GpioError(format!("export GPIO{}: {}", number, e)))?;
    pin.set_direction(Direction::Out)
        .map_err(|e| DisplayError::GpioError(format!("GPIO{} direction: {}", number, e)))?;
    Ok(pin)
}

impl DisplayDriver for St7789Driver {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        self.panel.init(&mut self.delay)?;
        Ok(())
    }

    fn push(&mut self, canvas: &Canvas) -> Result<(), DisplayError> {
        check_canvas(&self.capabilities, canvas)?;
        self.panel.draw_frame(canvas.as_slice())?;
        Ok(())
    }

    fn set_backlight(&mut self, on: bool) -> Result<(), DisplayError> {
        if !self.panel.has_backlight() {
            return Err(DisplayError::UnsupportedOperation);
        }
        self.panel.set_backlight(on)?;
        Ok(())
    }

    fn set_rotation(&mut self, degrees: u16) -> Result<(), DisplayError> {
        let rotation = Rotation::from_degrees(degrees)
            .ok_or(DisplayError::InvalidRotation(degrees))?;
        self.panel.set_rotation(rotation)?;
        let (w, h) = self.panel.size();
        self.capabilities.width = w as u32;
        self.capabilities.height = h as u32;
        self.capabilities.rotation = degrees;
        Ok(())
    }
}

impl Drop for St7789Driver {
    fn drop(&mut self) {
        if self.panel.has_backlight() {
            if let Err(e) = self.panel.set_backlight(false) {
                warn!("ST7789 backlight off failed: {}", e);
            }
        }
        if let Err(e) = self.panel.sleep(&mut self.delay) {
            warn!("ST7789 sleep failed: {}", e);
        }
    }
}
