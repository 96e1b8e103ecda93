/*
 *  display/factory.rs
 *
 *  statmon - host vitals at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Builds the configured display driver
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

use crate::config::{DisplayConfig, DriverKind};
use crate::display::error::DisplayFactoryError;
use crate::display::traits::DisplayDriver;
use crate::display::drivers::mock::MockDriver;
use log::{debug, info};

#[cfg(feature = "driver-st7789")]
use crate::display::drivers::st7789::St7789Driver;

/// Type alias for boxed display driver trait objects
pub type BoxedDriver = Box<dyn DisplayDriver>;

/// Factory for creating display drivers from configuration
pub struct DisplayDriverFactory;

impl DisplayDriverFactory {
    /// Create and initialize a display driver from configuration
    ///
    /// The returned driver has been through `init()` and is ready to accept
    /// frames of `dimensions()` pixels.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let config = DisplayConfig {
    ///     driver: Some(DriverKind::Mock),
    ///     ..Default::default()
    /// };
    ///
    /// let driver = DisplayDriverFactory::create_from_config(&config)?;
    /// ```
    pub fn create_from_config(
        config: &DisplayConfig
    ) -> Result<BoxedDriver, DisplayFactoryError> {
        let mut driver = Self::build(config)?;
        driver.init()?;
        let (w, h) = driver.dimensions();
        info!("Display ready: {:?} {}x{} rotated {}",
            config.driver_kind(), w, h, driver.capabilities().rotation);
        Ok(driver)
    }

    fn build(config: &DisplayConfig) -> Result<BoxedDriver, DisplayFactoryError> {
        let kind = config.driver_kind();
        debug!("Creating {:?} display driver", kind);
        match kind {
            #[cfg(feature = "driver-st7789")]
            DriverKind::St7789 => {
                let spi = config.spi();
                let speed = spi.speed_hz.unwrap_or(crate::constants::SPI_SPEED_HZ);
                Ok(Box::new(St7789Driver::new_spi(&spi.bus, speed, spi.dc_pin, config)?))
            }

            #[cfg(not(feature = "driver-st7789"))]
            DriverKind::St7789 => Err(DisplayFactoryError::DriverNotEnabled("ST7789".to_string())),

            DriverKind::Mock => Ok(Box::new(MockDriver::new(config)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::error::DisplayError;

    #[test]
    fn test_factory_builds_mock() {
        let config = DisplayConfig {
            driver: Some(DriverKind::Mock),
            ..Default::default()
        };
        let driver = DisplayDriverFactory::create_from_config(&config).unwrap();
        assert_eq!(driver.dimensions(), (240, 135));
        assert_eq!(driver.capabilities().rotation, 90);
    }

    #[test]
    fn test_factory_rejects_bad_rotation() {
        let config = DisplayConfig {
            driver: Some(DriverKind::Mock),
            rotate_deg: Some(100),
            ..Default::default()
        };
        let err = DisplayDriverFactory::create_from_config(&config).err().unwrap();
        assert!(matches!(
            err,
            DisplayFactoryError::DriverInitFailed(DisplayError::InvalidRotation(100))
        ));
    }
}
