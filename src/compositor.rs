/*
 *  compositor.rs
 *
 *  statmon - host vitals at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Draws metric lines onto the persistent canvas
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

//! Line placement and redraw.
//!
//! Lines stack top to bottom in registry order; each one starts where the
//! previous one ended. The compositor remembers where every line was last
//! drawn so that, under the default policy, it only ever clears and paints
//! the rows belonging to lines that need it.

use clap::ValueEnum;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::constants::{TEXT_ORIGIN_X, TOP_PADDING};
use crate::display::{Canvas, BACKGROUND};
use crate::glyphs::GlyphProvider;

/// How much of the canvas a cycle repaints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RedrawPolicy {
    /// Clear and repaint only the lines that changed (or moved)
    #[default]
    Partial,
    /// Clear everything and repaint every line when anything changed
    Full,
    /// Clear everything, repaint only the changed lines
    Legacy,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("line {name} ends at row {bottom}, canvas is {height} rows high")]
    OffCanvas { name: String, bottom: i32, height: u32 },
    #[error("glyph error: {0}")]
    Glyph(String),
}

/// One metric line as it should appear this cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line<'a> {
    pub name: &'a str,
    pub text: &'a str,
    pub color: Rgb565,
}

/// What a render pass did
#[derive(Debug, Default)]
pub struct RenderOutcome {
    /// Lines painted, in registry order
    pub drawn: Vec<String>,
    /// Lines whose draw was aborted
    pub failed: Vec<(String, RenderError)>,
}

impl RenderOutcome {
    pub fn count(&self) -> usize {
        self.drawn.len()
    }
}

pub struct FrameCompositor<G> {
    glyphs: G,
    policy: RedrawPolicy,
    origin: Point,
    placed: HashMap<String, Rectangle>,
    // text each line last failed to draw with
    failed: HashMap<String, String>,
}

impl<G: GlyphProvider> FrameCompositor<G> {
    pub fn new(glyphs: G, policy: RedrawPolicy) -> Self {
        Self::with_origin(glyphs, policy, Point::new(TEXT_ORIGIN_X, TOP_PADDING))
    }

    pub fn with_origin(glyphs: G, policy: RedrawPolicy, origin: Point) -> Self {
        Self { glyphs, policy, origin, placed: HashMap::new(), failed: HashMap::new() }
    }

    pub fn policy(&self) -> RedrawPolicy {
        self.policy
    }

    /// Where `name` was last painted, if it is still on the canvas
    pub fn placed(&self, name: &str) -> Option<Rectangle> {
        self.placed.get(name).copied()
    }

    /// Box of every line, in order.
    ///
    /// `y_0` is the origin row and `y_{i+1} = y_i + height(text_i)`. A line
    /// that cannot be measured keeps the font's line height so the ones
    /// below it do not jump.
    pub fn layout(&self, lines: &[Line<'_>]) -> Vec<Rectangle> {
        let mut y = self.origin.y;
        lines
            .iter()
            .map(|line| {
                let size = self
                    .glyphs
                    .measure_line(line.text)
                    .unwrap_or_else(|_| Size::new(0, self.glyphs.line_height()));
                let rect = Rectangle::new(Point::new(self.origin.x, y), size);
                y += size.height as i32;
                rect
            })
            .collect()
    }

    /// Bring `canvas` up to date with `lines`.
    ///
    /// `changed` names the lines whose text differs from what was last
    /// committed. Which lines get painted, and how much is cleared first,
    /// depends on the policy. A failed line is reported in the outcome and
    /// leaves the others untouched.
    ///
    /// Under `Full` and `Legacy` a line that already failed with the same
    /// text does not on its own trigger a whole-canvas redraw; it is
    /// retried when something else forces one.
    pub fn render(
        &mut self,
        canvas: &mut Canvas,
        lines: &[Line<'_>],
        changed: &HashSet<&str>,
    ) -> RenderOutcome {
        let rects = self.layout(lines);
        let moved = |placed: &HashMap<String, Rectangle>, i: usize| {
            placed.get(lines[i].name) != Some(&rects[i])
        };
        let is_changed = |i: usize| changed.contains(lines[i].name);
        let failed_before = |i: usize| {
            self.failed.get(lines[i].name).map(String::as_str) == Some(lines[i].text)
        };

        let targets: Vec<usize> = match self.policy {
            RedrawPolicy::Partial => (0..lines.len())
                .filter(|&i| is_changed(i) || moved(&self.placed, i))
                .collect(),
            RedrawPolicy::Full => {
                if (0..lines.len())
                    .any(|i| (is_changed(i) || moved(&self.placed, i)) && !failed_before(i))
                {
                    (0..lines.len()).collect()
                } else {
                    Vec::new()
                }
            }
            RedrawPolicy::Legacy => {
                if (0..lines.len()).any(|i| is_changed(i) && !failed_before(i)) {
                    (0..lines.len()).filter(|&i| is_changed(i)).collect()
                } else {
                    Vec::new()
                }
            }
        };

        let mut outcome = RenderOutcome::default();
        if targets.is_empty() {
            return outcome;
        }

        // erase first so a line growing into a neighbour's old box never
        // wipes freshly drawn text
        match self.policy {
            RedrawPolicy::Partial => {
                for &i in &targets {
                    if let Some(prev) = self.placed.remove(lines[i].name) {
                        canvas.fill_rect(&prev, BACKGROUND);
                    }
                    canvas.fill_rect(&rects[i], BACKGROUND);
                }
            }
            RedrawPolicy::Full | RedrawPolicy::Legacy => {
                canvas.clear_color(BACKGROUND);
                self.placed.clear();
            }
        }

        let height = canvas.height() as u32;
        for &i in &targets {
            let line = &lines[i];
            let rect = rects[i];
            let bottom = rect.top_left.y + rect.size.height as i32;
            let result = if bottom > height as i32 {
                Err(RenderError::OffCanvas { name: line.name.to_string(), bottom, height })
            } else {
                self.glyphs.draw_line(canvas, line.text, rect.top_left, line.color)
            };
            match result {
                Ok(()) => {
                    trace!("drew {} at {:?}", line.name, rect);
                    self.placed.insert(line.name.to_string(), rect);
                    self.failed.remove(line.name);
                    outcome.drawn.push(line.name.to_string());
                }
                Err(e) => {
                    debug!("skipped {}: {}", line.name, e);
                    self.failed.insert(line.name.to_string(), line.text.to_string());
                    outcome.failed.push((line.name.to_string(), e));
                }
            }
        }
        outcome
    }
}
