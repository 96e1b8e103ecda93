/*
 *  vframebuf.rs
 *
 *  statmon - host vitals at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Runtime-sized framebuffer used as the persistent canvas
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

use core::convert::Infallible;
use embedded_graphics::geometry::{OriginDimensions, Size};
use embedded_graphics::pixelcolor::PixelColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

/// A runtime-sized framebuffer for embedded-graphics.
///
/// Allocated once; every later operation writes in place.
#[derive(Debug, Clone)]
pub struct VarFrameBuf<C: PixelColor> {
    buf: Vec<C>,
    w: usize,
    h: usize,
}

impl<C: PixelColor> VarFrameBuf<C> {
    pub fn new(width: u32, height: u32, fill: C) -> Self {
        let (w, h) = (width as usize, height as usize);
        Self { buf: vec![fill; w * h], w, h }
    }

    pub fn width(&self) -> usize { self.w }
    pub fn height(&self) -> usize { self.h }

    /// Immutable raw access, row-major (what gets pushed to the panel)
    pub fn as_slice(&self) -> &[C] { &self.buf }

    /// Clear to a color
    pub fn clear_color(&mut self, color: C) {
        self.buf.fill(color);
    }

    /// Pixel at (x, y), None when out of bounds
    pub fn pixel(&self, x: i32, y: i32) -> Option<C> {
        self.idx(Point::new(x, y)).map(|i| self.buf[i])
    }

    /// Fill a rectangle, clipped to the buffer
    pub fn fill_rect(&mut self, area: &Rectangle, color: C) {
        let area = area.intersection(&self.bounding_box());
        if area.is_zero_sized() {
            return;
        }
        let cols = area.columns();
        for y in area.rows() {
            let base = y as usize * self.w;
            self.buf[base + cols.start as usize..base + cols.end as usize].fill(color);
        }
    }

    /// Map (x,y) to linear index; returns None if out of bounds
    #[inline]
    fn idx(&self, p: Point) -> Option<usize> {
        if p.x >= 0 && p.y >= 0 {
            let (x, y) = (p.x as usize, p.y as usize);
            if x < self.w && y < self.h {
                return Some(y * self.w + x);
            }
        }
        None
    }
}

impl<C: PixelColor> OriginDimensions for VarFrameBuf<C> {
    fn size(&self) -> Size {
        Size::new(self.w as u32, self.h as u32)
    }
}

impl<C: PixelColor> DrawTarget for VarFrameBuf<C> {
    type Color = C;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, c) in pixels {
            if let Some(i) = self.idx(p) {
                self.buf[i] = c;
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.clear_color(color);
        Ok(())
    }

    fn fill_contiguous<I>(&mut self, area: &Rectangle, colors: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Self::Color>,
    {
        // colors arrive row-major for the unclipped area
        let mut it = colors.into_iter();
        for p in area.points() {
            let Some(c) = it.next() else { return Ok(()) };
            if let Some(i) = self.idx(p) {
                self.buf[i] = c;
            }
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        self.fill_rect(area, color);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::pixelcolor::{Rgb565, RgbColor};

    #[test]
    fn test_fill_rect_clips() {
        let mut fb = VarFrameBuf::new(10, 5, Rgb565::BLACK);
        fb.fill_rect(&Rectangle::new(Point::new(-2, -2), Size::new(4, 4)), Rgb565::RED);

        assert_eq!(fb.pixel(0, 0), Some(Rgb565::RED));
        assert_eq!(fb.pixel(1, 1), Some(Rgb565::RED));
        assert_eq!(fb.pixel(2, 0), Some(Rgb565::BLACK));
        assert_eq!(fb.pixel(0, 2), Some(Rgb565::BLACK));
        assert_eq!(fb.as_slice().iter().filter(|&&c| c == Rgb565::RED).count(), 4);
    }

    #[test]
    fn test_fill_rect_outside_is_noop() {
        let mut fb = VarFrameBuf::new(10, 5, Rgb565::BLACK);
        fb.fill_rect(&Rectangle::new(Point::new(20, 20), Size::new(4, 4)), Rgb565::RED);
        assert!(fb.as_slice().iter().all(|&c| c == Rgb565::BLACK));
    }

    #[test]
    fn test_pixel_bounds() {
        let fb = VarFrameBuf::new(10, 5, Rgb565::BLACK);
        assert_eq!(fb.pixel(9, 4), Some(Rgb565::BLACK));
        assert_eq!(fb.pixel(10, 0), None);
        assert_eq!(fb.pixel(-1, 0), None);
    }

    #[test]
    fn test_fill_contiguous_clipped() {
        let mut fb = VarFrameBuf::new(4, 4, Rgb565::BLACK);
        let area = Rectangle::new(Point::new(3, 3), Size::new(2, 2));
        fb.fill_contiguous(&area, [Rgb565::RED, Rgb565::GREEN, Rgb565::BLUE, Rgb565::WHITE])
            .unwrap();
        assert_eq!(fb.pixel(3, 3), Some(Rgb565::RED));
        assert_eq!(fb.as_slice().iter().filter(|&&c| c != Rgb565::BLACK).count(), 1);
    }
}
