/*
 *  glyphs.rs
 *
 *  statmon - host vitals at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Text measuring and drawing over embedded-graphics mono fonts
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

use clap::ValueEnum;
use embedded_graphics::mono_font::ascii::{FONT_10X20, FONT_6X10, FONT_7X13, FONT_9X18};
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::text::renderer::TextRenderer;
use embedded_graphics::text::{Baseline, Text};
use serde::{Deserialize, Serialize};

use crate::compositor::RenderError;
use crate::display::Canvas;

/// Built-in mono faces, named by cell size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum FontFace {
    #[serde(rename = "6x10")]
    #[value(name = "6x10")]
    Font6x10,
    #[serde(rename = "7x13")]
    #[value(name = "7x13")]
    Font7x13,
    #[default]
    #[serde(rename = "9x18")]
    #[value(name = "9x18")]
    Font9x18,
    #[serde(rename = "10x20")]
    #[value(name = "10x20")]
    Font10x20,
}

impl FontFace {
    pub fn font(self) -> &'static MonoFont<'static> {
        match self {
            FontFace::Font6x10 => &FONT_6X10,
            FontFace::Font7x13 => &FONT_7X13,
            FontFace::Font9x18 => &FONT_9X18,
            FontFace::Font10x20 => &FONT_10X20,
        }
    }
}

/// Measures and draws single text lines.
///
/// Lines are placed by their top-left corner.
pub trait GlyphProvider: Send {
    /// Height of one line of text
    fn line_height(&self) -> u32;

    /// Bounding size of `text` drawn as one line
    fn measure_line(&self, text: &str) -> Result<Size, RenderError>;

    /// Draw `text` with its top-left corner at `origin`
    fn draw_line(
        &self,
        canvas: &mut Canvas,
        text: &str,
        origin: Point,
        color: Rgb565,
    ) -> Result<(), RenderError>;
}

/// [`GlyphProvider`] over an embedded-graphics mono font
#[derive(Debug, Clone, Copy)]
pub struct MonoGlyphs {
    font: &'static MonoFont<'static>,
}

impl MonoGlyphs {
    pub fn new(face: FontFace) -> Self {
        Self { font: face.font() }
    }

    // Mono fonts have no glyph for control characters; a newline would also
    // break the one-line layout.
    fn check(text: &str) -> Result<(), RenderError> {
        match text.chars().find(|c| c.is_control()) {
            Some(c) => Err(RenderError::Glyph(format!("unprintable character {:?}", c))),
            None => Ok(()),
        }
    }
}

impl Default for MonoGlyphs {
    fn default() -> Self {
        Self::new(FontFace::default())
    }
}

impl GlyphProvider for MonoGlyphs {
    fn line_height(&self) -> u32 {
        self.font.character_size.height
    }

    fn measure_line(&self, text: &str) -> Result<Size, RenderError> {
        Self::check(text)?;
        let style = MonoTextStyle::new(self.font, Rgb565::WHITE);
        let metrics = style.measure_string(text, Point::zero(), Baseline::Top);
        Ok(Size::new(metrics.bounding_box.size.width, self.line_height()))
    }

    fn draw_line(
        &self,
        canvas: &mut Canvas,
        text: &str,
        origin: Point,
        color: Rgb565,
    ) -> Result<(), RenderError> {
        Self::check(text)?;
        let style = MonoTextStyle::new(self.font, color);
        Text::with_baseline(text, origin, style, Baseline::Top)
            .draw(canvas)
            .map(|_| ())
            .map_err(|e| match e {})
    }
}
