/*
 *  sampler.rs
 *
 *  statmon - host vitals at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  The sample, diff, render, push cycle
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

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, trace, warn};
use tokio::sync::watch;

use crate::compositor::{FrameCompositor, Line};
use crate::config::Config;
use crate::constants::{PLACEHOLDER, POLL_INTERVAL_MS, SAMPLE_TIMEOUT_MS};
use crate::display::{BoxedDriver, Canvas, DisplayError, BACKGROUND};
use crate::glyphs::GlyphProvider;
use crate::metrics::{InFlight, MetricRegistry, Sample};
use crate::tracker::ChangeTracker;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopSettings {
    pub poll_interval: Duration,
    pub sample_timeout: Duration,
    /// Value text for a metric that could not be read
    pub placeholder: String,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(POLL_INTERVAL_MS),
            sample_timeout: Duration::from_millis(SAMPLE_TIMEOUT_MS),
            placeholder: PLACEHOLDER.to_string(),
        }
    }
}

impl LoopSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            poll_interval: cfg.poll_interval(),
            sample_timeout: cfg.sample_timeout(),
            placeholder: cfg.placeholder().to_string(),
        }
    }
}

/// What one cycle did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub sampled: usize,
    pub changed: usize,
    pub drawn: usize,
    /// Lines whose draw was aborted
    pub failed: usize,
    pub pushed: bool,
}

/// Owns the canvas, the tracker and the display for the life of the process.
pub struct SampleLoop<G> {
    registry: Arc<MetricRegistry>,
    tracker: ChangeTracker,
    compositor: FrameCompositor<G>,
    canvas: Canvas,
    display: BoxedDriver,
    settings: LoopSettings,
    in_flight: InFlight,
    // canvas differs from the panel
    push_pending: bool,
    // names currently logged as broken, so a stuck source warns once
    unreadable: HashSet<String>,
    undrawable: HashSet<String>,
}

impl<G: GlyphProvider> SampleLoop<G> {
    /// Size the canvas to the panel, light it and blank it.
    pub fn new(
        registry: Arc<MetricRegistry>,
        compositor: FrameCompositor<G>,
        display: BoxedDriver,
        settings: LoopSettings,
    ) -> Self {
        let (w, h) = display.dimensions();
        let mut this = Self {
            registry,
            tracker: ChangeTracker::new(),
            compositor,
            canvas: Canvas::new(w, h, BACKGROUND),
            display,
            settings,
            in_flight: InFlight::new(),
            push_pending: true,
            unreadable: HashSet::new(),
            undrawable: HashSet::new(),
        };
        this.backlight(true);
        this.flush();
        this
    }

    /// One SAMPLE → DIFF → RENDER → PUSH pass
    pub async fn cycle(&mut self) -> CycleReport {
        let readings = self
            .registry
            .sample_all_within(self.settings.sample_timeout, &mut self.in_flight)
            .await;

        let mut samples = Vec::with_capacity(readings.len());
        for (reading, metric) in readings.into_iter().zip(self.registry.metrics()) {
            let value = match reading.result {
                Ok(value) => {
                    if self.unreadable.remove(&metric.name) {
                        info!("{} readable again", metric.name);
                    }
                    value
                }
                Err(e) => {
                    if self.unreadable.insert(metric.name.clone()) {
                        warn!("{} unreadable: {}", metric.name, e);
                    } else {
                        trace!("{} still unreadable: {}", metric.name, e);
                    }
                    metric.placeholder(&self.settings.placeholder)
                }
            };
            samples.push(Sample::new(reading.name, value));
        }

        let mut report = CycleReport { sampled: samples.len(), ..Default::default() };
        let changed: HashSet<&str> = self
            .tracker
            .diff(&samples)
            .into_iter()
            .map(|s| s.name.as_str())
            .collect();
        report.changed = changed.len();

        if !changed.is_empty() {
            let lines: Vec<Line<'_>> = samples
                .iter()
                .zip(self.registry.metrics())
                .map(|(s, m)| Line { name: &s.name, text: &s.value, color: m.color.into() })
                .collect();
            let outcome = self.compositor.render(&mut self.canvas, &lines, &changed);

            for name in &outcome.drawn {
                if let Some(sample) = samples.iter().find(|s| &s.name == name) {
                    self.tracker.commit(sample);
                }
                self.undrawable.remove(name);
            }
            for (name, e) in &outcome.failed {
                if self.undrawable.insert(name.clone()) {
                    warn!("{} not drawn: {}", name, e);
                }
            }

            report.drawn = outcome.count();
            report.failed = outcome.failed.len();
            if report.drawn > 0 {
                self.push_pending = true;
            }
        }

        report.pushed = self.flush();
        report
    }

    /// Cycle until `shutdown` turns true (or its sender goes away), then
    /// switch the backlight off.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Sampling {} metrics every {:?}, {:?} redraw",
            self.registry.len(),
            self.settings.poll_interval,
            self.compositor.policy()
        );
        loop {
            if *shutdown.borrow() {
                break;
            }
            let report = self.cycle().await;
            if report.drawn > 0 || report.failed > 0 {
                debug!("{:?}", report);
            }

            tokio::select! {
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
                res = shutdown.changed() => {
                    if res.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        self.backlight(false);
        info!("Sample loop stopped");
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    pub fn compositor(&self) -> &FrameCompositor<G> {
        &self.compositor
    }

    /// Reads still running past an earlier deadline
    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    pub fn push_pending(&self) -> bool {
        self.push_pending
    }

    fn flush(&mut self) -> bool {
        if !self.push_pending {
            return false;
        }
        match self.display.push(&self.canvas) {
            Ok(()) => {
                self.push_pending = false;
                true
            }
            Err(e) => {
                warn!("Display push failed, retrying next cycle: {}", e);
                false
            }
        }
    }

    fn backlight(&mut self, on: bool) {
        match self.display.set_backlight(on) {
            Ok(()) => debug!("Backlight {}", if on { "on" } else { "off" }),
            Err(DisplayError::UnsupportedOperation) => trace!("No backlight control"),
            Err(e) => warn!("Backlight switch failed: {}", e),
        }
    }
}
