/*
 *  config.rs
 *
 *  statmon - host vitals at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Layered configuration: defaults, YAML file, command line overrides
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

use clap::{ArgAction, Parser, ValueEnum, ValueHint};
use dirs_next::home_dir;
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}, time::Duration};
use thiserror::Error;

use crate::compositor::RedrawPolicy;
use crate::constants::*;
use crate::glyphs::FontFace;
use crate::metrics::SourcePaths;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// General options
    pub log_level: Option<String>,         // e.g., "info" | "debug"
    pub poll_interval_ms: Option<u64>,
    pub sample_timeout_ms: Option<u64>,
    pub placeholder: Option<String>,       // value text for unreadable metrics
    pub redraw: Option<RedrawPolicy>,
    pub font: Option<FontFace>,
    /// where metric sources read from
    pub sources: Option<SourceConfig>,
    /// display-specific geometry & wiring
    pub display: Option<DisplayConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SourceConfig {
    pub proc_root: Option<PathBuf>,
    pub thermal_zone: Option<PathBuf>,
    pub disk_mount: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DisplayConfig {
    pub driver: Option<DriverKind>,
    /// native (unrotated) glass size
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub x_offset: Option<u16>,
    pub y_offset: Option<u16>,
    pub rotate_deg: Option<u16>,
    pub invert: Option<bool>,
    pub bus: Option<SpiBusConfig>,
    pub backlight_pin: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpiBusConfig {
    pub bus: String,            // e.g. "/dev/spidev0.0"
    pub speed_hz: Option<u32>,
    pub dc_pin: u32,            // BCM numbering
}

impl Default for SpiBusConfig {
    fn default() -> Self {
        Self { bus: SPI_BUS.to_string(), speed_hz: Some(SPI_SPEED_HZ), dc_pin: DC_PIN }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    #[default]
    St7789,
    Mock, // headless, frames are kept in memory only
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "statmon", about = "Host vitals on a small TFT", version)]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub log_level: Option<String>,
    /// shorthand for --log-level debug
    #[arg(short, long, action = ArgAction::SetTrue)]
    pub debug: bool,
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,
    #[arg(long)]
    pub sample_timeout_ms: Option<u64>,
    #[arg(long, value_enum)]
    pub redraw: Option<RedrawPolicy>,
    #[arg(long, value_enum)]
    pub font: Option<FontFace>,
    #[arg(long, value_enum)]
    pub driver: Option<DriverKind>,
    #[arg(long)]
    pub display_rotate_deg: Option<u16>,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Public entry point: read YAML, merge CLI, validate.
pub fn load_from(cli: &Cli) -> Result<Config, ConfigError> {
    // 1) defaults (from `Default` impl)
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    // 4) Validate
    validate(&cfg)?;

    Ok(cfg)
}

/// Pretty YAML of effective config (nice for debugging)
pub fn dump(cfg: &Config) -> Result<String, ConfigError> {
    Ok(serde_yaml::to_string(cfg)?)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/statmon/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/statmon/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/statmon.yaml");
        if p.exists() { return Some(p) }
    }
    // project local, then system-wide for the service unit
    for candidate in &["statmon.yaml", "config.yaml", "config/statmon.yaml", "/etc/statmon.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    parse_yaml(&s)
}

pub fn parse_yaml(s: &str) -> Result<Config, ConfigError> {
    let cfg: Config = serde_yaml::from_str(s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut Config, src: Config) {
    // top-level
    if src.log_level.is_some()          { dst.log_level = src.log_level; }
    if src.poll_interval_ms.is_some()   { dst.poll_interval_ms = src.poll_interval_ms; }
    if src.sample_timeout_ms.is_some()  { dst.sample_timeout_ms = src.sample_timeout_ms; }
    if src.placeholder.is_some()        { dst.placeholder = src.placeholder; }
    if src.redraw.is_some()             { dst.redraw = src.redraw; }
    if src.font.is_some()               { dst.font = src.font; }
    // sources
    match (&mut dst.sources, src.sources) {
        (None, Some(s)) => dst.sources = Some(s),
        (Some(d), Some(s)) => merge_sources(d, s),
        _ => {}
    }
    // display
    match (&mut dst.display, src.display) {
        (None, Some(c)) => dst.display = Some(c),
        (Some(d), Some(s)) => merge_display(d, s),
        _ => {}
    }
}

fn merge_sources(dst: &mut SourceConfig, src: SourceConfig) {
    if src.proc_root.is_some()     { dst.proc_root = src.proc_root; }
    if src.thermal_zone.is_some()  { dst.thermal_zone = src.thermal_zone; }
    if src.disk_mount.is_some()    { dst.disk_mount = src.disk_mount; }
}

fn merge_display(dst: &mut DisplayConfig, src: DisplayConfig) {
    if src.driver.is_some()         { dst.driver = src.driver; }
    if src.width.is_some()          { dst.width = src.width; }
    if src.height.is_some()         { dst.height = src.height; }
    if src.x_offset.is_some()       { dst.x_offset = src.x_offset; }
    if src.y_offset.is_some()       { dst.y_offset = src.y_offset; }
    if src.rotate_deg.is_some()     { dst.rotate_deg = src.rotate_deg; }
    if src.invert.is_some()         { dst.invert = src.invert; }
    if src.bus.is_some()            { dst.bus = src.bus; }
    if src.backlight_pin.is_some()  { dst.backlight_pin = src.backlight_pin; }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some()          { cfg.log_level = cli.log_level.clone(); }
    if cli.debug                        { cfg.log_level = Some("debug".to_string()); }
    if cli.poll_interval_ms.is_some()   { cfg.poll_interval_ms = cli.poll_interval_ms; }
    if cli.sample_timeout_ms.is_some()  { cfg.sample_timeout_ms = cli.sample_timeout_ms; }
    if cli.redraw.is_some()             { cfg.redraw = cli.redraw; }
    if cli.font.is_some()               { cfg.font = cli.font; }

    let any_display = cli.driver.is_some() || cli.display_rotate_deg.is_some();
    if any_display && cfg.display.is_none() {
        cfg.display = Some(DisplayConfig::default());
    }
    if let Some(display) = cfg.display.as_mut() {
        if cli.driver.is_some()              { display.driver = cli.driver; }
        if cli.display_rotate_deg.is_some()  { display.rotate_deg = cli.display_rotate_deg; }
    }
}

/// Put any invariants here (required fields, ranges, etc.)
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.poll_interval_ms == Some(0) {
        return Err(ConfigError::Validation("poll_interval_ms must be > 0".into()));
    }
    if cfg.sample_timeout_ms == Some(0) {
        return Err(ConfigError::Validation("sample_timeout_ms must be > 0".into()));
    }
    if let Some(display) = cfg.display.as_ref() {
        if display.width == Some(0) || display.height == Some(0) {
            return Err(ConfigError::Validation("display width/height must be > 0".into()));
        }
        if let Some(rot) = display.rotate_deg {
            match rot {
                0 | 90 | 180 | 270 => {},
                _ => return Err(ConfigError::Validation("display rotate_deg must be 0|90|180|270".into()))
            }
        }
    }
    Ok(())
}

impl Config {
    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.unwrap_or(POLL_INTERVAL_MS))
    }

    pub fn sample_timeout(&self) -> Duration {
        Duration::from_millis(self.sample_timeout_ms.unwrap_or(SAMPLE_TIMEOUT_MS))
    }

    pub fn placeholder(&self) -> &str {
        self.placeholder.as_deref().unwrap_or(PLACEHOLDER)
    }

    pub fn redraw(&self) -> RedrawPolicy {
        self.redraw.unwrap_or_default()
    }

    pub fn font(&self) -> FontFace {
        self.font.unwrap_or_default()
    }

    pub fn display(&self) -> DisplayConfig {
        self.display.clone().unwrap_or_default()
    }

    pub fn source_paths(&self) -> SourcePaths {
        let mut paths = SourcePaths::default();
        if let Some(src) = self.sources.as_ref() {
            if let Some(p) = &src.proc_root     { paths.proc_root = p.clone(); }
            if let Some(p) = &src.thermal_zone  { paths.thermal_zone = p.clone(); }
            if let Some(p) = &src.disk_mount    { paths.disk_mount = p.clone(); }
        }
        paths
    }
}

impl DisplayConfig {
    pub fn driver_kind(&self) -> DriverKind {
        self.driver.unwrap_or_default()
    }

    pub fn rotate_deg(&self) -> u16 {
        self.rotate_deg.unwrap_or(PANEL_ROTATION)
    }

    /// Native glass size as (width, height)
    pub fn native_size(&self) -> (u32, u32) {
        (self.width.unwrap_or(PANEL_WIDTH), self.height.unwrap_or(PANEL_HEIGHT))
    }

    /// Size the canvas must have once rotation is applied
    pub fn visible_size(&self) -> (u32, u32) {
        let (w, h) = self.native_size();
        match self.rotate_deg() {
            90 | 270 => (h, w),
            _ => (w, h),
        }
    }

    pub fn offsets(&self) -> (u16, u16) {
        (self.x_offset.unwrap_or(PANEL_X_OFFSET), self.y_offset.unwrap_or(PANEL_Y_OFFSET))
    }

    pub fn invert(&self) -> bool {
        self.invert.unwrap_or(PANEL_INVERT)
    }

    pub fn spi(&self) -> SpiBusConfig {
        self.bus.clone().unwrap_or_default()
    }

    pub fn backlight_pin(&self) -> Option<u32> {
        self.backlight_pin.or(Some(BACKLIGHT_PIN))
    }
}
