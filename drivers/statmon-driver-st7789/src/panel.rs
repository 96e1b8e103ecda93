/*
 *  statmon ST7789 Driver - Panel Implementation
 *
 *  Wraps the mipidsi ST7789 model over any embedded-hal SpiDevice plus
 *  a data/command pin and an optional backlight pin
 */

use core::fmt;

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiDevice;
use mipidsi::interface::SpiInterface;
use mipidsi::models::ST7789;
use mipidsi::options::{ColorInversion, Orientation, Rotation as PanelRotation};
use mipidsi::{Builder, Display, NoResetPin};

/// Bytes mipidsi stages per SPI transfer; matches the default spidev `bufsiz`.
pub const TRANSFER_BUFFER: usize = 4096;

type Panel<SPI, DC> = Display<SpiInterface<'static, SPI, DC>, ST7789, NoResetPin>;

/// Panel rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn from_degrees(degrees: u16) -> Option<Self> {
        match degrees {
            0 => Some(Rotation::Deg0),
            90 => Some(Rotation::Deg90),
            180 => Some(Rotation::Deg180),
            270 => Some(Rotation::Deg270),
            _ => None,
        }
    }

    pub fn degrees(self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    pub fn is_landscape(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }

    fn orientation(self) -> Orientation {
        let rotation = match self {
            Rotation::Deg0 => PanelRotation::Deg0,
            Rotation::Deg90 => PanelRotation::Deg90,
            Rotation::Deg180 => PanelRotation::Deg180,
            Rotation::Deg270 => PanelRotation::Deg270,
        };
        Orientation::new().rotate(rotation)
    }
}

/// Glass geometry in the panel's native (portrait) orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: u16,
    pub height: u16,
    /// Column of GRAM where the glass starts
    pub x_offset: u16,
    /// Row of GRAM where the glass starts
    pub y_offset: u16,
    /// IPS glass needs inversion on to show true colors
    pub invert: bool,
}

impl Geometry {
    /// Adafruit 1.14" 240x135 Mini PiTFT
    pub const ADAFRUIT_114: Geometry = Geometry {
        width: 135,
        height: 240,
        x_offset: 53,
        y_offset: 40,
        invert: true,
    };

    /// Visible (width, height) once `rotation` is applied
    pub fn size(&self, rotation: Rotation) -> (u16, u16) {
        if rotation.is_landscape() {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }

    fn inversion(&self) -> ColorInversion {
        if self.invert {
            ColorInversion::Inverted
        } else {
            ColorInversion::Normal
        }
    }
}

/// Driver errors; bus and pin errors are carried as their debug text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Controller bring-up failed, or the bus was already handed over
    Init(String),
    /// SPI or D/C line failure while talking to the controller
    Bus(String),
    /// Backlight line failure
    Pin(String),
    /// Frame pushed before `init`
    NotReady,
    /// Frame does not cover the visible area exactly
    FrameSize { expected: usize, actual: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Init(e) => write!(f, "panel init failed: {}", e),
            Error::Bus(e) => write!(f, "SPI error: {}", e),
            Error::Pin(e) => write!(f, "GPIO error: {}", e),
            Error::NotReady => write!(f, "panel not initialized"),
            Error::FrameSize { expected, actual } => {
                write!(f, "frame size: expected {} pixels, got {}", expected, actual)
            }
        }
    }
}

impl std::error::Error for Error {}

/// ST7789 panel on an SPI bus
///
/// The bus and D/C line are held until `init` hands them to mipidsi.
pub struct St7789<SPI: SpiDevice, DC: OutputPin, BL> {
    bus: Option<(SPI, DC)>,
    display: Option<Panel<SPI, DC>>,
    backlight: Option<BL>,
    geometry: Geometry,
    rotation: Rotation,
}

impl<SPI, DC, BL> St7789<SPI, DC, BL>
where
    SPI: SpiDevice,
    DC: OutputPin,
    BL: OutputPin,
{
    pub fn new(spi: SPI, dc: DC, backlight: Option<BL>, geometry: Geometry, rotation: Rotation) -> Self {
        Self {
            bus: Some((spi, dc)),
            display: None,
            backlight,
            geometry,
            rotation,
        }
    }

    /// Reset the controller and bring the panel up with the configured
    /// size, offsets, inversion and rotation.
    pub fn init<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Error> {
        let (spi, dc) = self
            .bus
            .take()
            .ok_or_else(|| Error::Init("bus already handed to the controller".to_string()))?;

        // mipidsi borrows its staging buffer for as long as the display lives
        let buffer: &'static mut [u8] = Box::leak(vec![0u8; TRANSFER_BUFFER].into_boxed_slice());
        let interface = SpiInterface::new(spi, dc, buffer);

        let display = Builder::new(ST7789, interface)
            .display_size(self.geometry.width, self.geometry.height)
            .display_offset(self.geometry.x_offset, self.geometry.y_offset)
            .invert_colors(self.geometry.inversion())
            .orientation(self.rotation.orientation())
            .init(delay)
            .map_err(|e| Error::Init(format!("{:?}", e)))?;
        self.display = Some(display);

        #[cfg(feature = "debug-logging")]
        log::debug!("ST7789 up at {:?}, rotation {}", self.size(), self.rotation.degrees());

        Ok(())
    }

    /// Visible size as (width, height)
    pub fn size(&self) -> (u16, u16) {
        self.geometry.size(self.rotation)
    }

    /// Change rotation; before `init` it is only recorded.
    pub fn set_rotation(&mut self, rotation: Rotation) -> Result<(), Error> {
        if let Some(display) = self.display.as_mut() {
            display
                .set_orientation(rotation.orientation())
                .map_err(|e| Error::Bus(format!("{:?}", e)))?;
        }
        self.rotation = rotation;
        Ok(())
    }

    pub fn has_backlight(&self) -> bool {
        self.backlight.is_some()
    }

    /// Switch the backlight; a no-op when no backlight pin was given.
    pub fn set_backlight(&mut self, on: bool) -> Result<(), Error> {
        if let Some(pin) = self.backlight.as_mut() {
            let result = if on { pin.set_high() } else { pin.set_low() };
            result.map_err(|e| Error::Pin(format!("{:?}", e)))?;
        }
        Ok(())
    }

    /// Display off and enter sleep mode.
    pub fn sleep<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Error> {
        match self.display.as_mut() {
            Some(display) => display.sleep(delay).map_err(|e| Error::Bus(format!("{:?}", e))),
            None => Ok(()),
        }
    }

    /// Write one full frame, row-major from the visible top-left.
    pub fn draw_frame(&mut self, pixels: &[Rgb565]) -> Result<(), Error> {
        let (w, h) = self.size();
        let expected = w as usize * h as usize;
        if pixels.len() != expected {
            return Err(Error::FrameSize { expected, actual: pixels.len() });
        }
        let display = self.display.as_mut().ok_or(Error::NotReady)?;
        let area = Rectangle::new(Point::zero(), Size::new(w as u32, h as u32));
        display
            .fill_contiguous(&area, pixels.iter().copied())
            .map_err(|e| Error::Bus(format!("{:?}", e)))
    }
}
