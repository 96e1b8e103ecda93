/*
 *  metrics.rs
 *
 *  statmon - host vitals at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Host metric sources and the registry that samples them
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
//! Gathering host vitals from /proc, /sys and the network stack.
//!
//! Every source turns one fresh reading into the exact line shown on the
//! panel. The parsing helpers are plain functions over file contents so they
//! can be fed fixtures.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use local_ip_address::local_ip;
use log::{debug, trace, warn};
use sysinfo::Disks;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::constants::{DISK_MOUNT, PROC_ROOT, THERMAL_ZONE};
use crate::display::Color;

const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * MIB;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SampleError {
    #[error("cannot read {}: {message}", .path.display())]
    Io { path: PathBuf, message: String },
    #[error("cannot parse {what}: {detail}")]
    Parse { what: &'static str, detail: String },
    #[error("no usable network address: {0}")]
    Network(String),
    #[error("no reading within {0:?}")]
    Timeout(Duration),
    #[error("sampler task aborted: {0}")]
    Aborted(String),
}

impl SampleError {
    fn io(path: &Path, err: io::Error) -> Self {
        SampleError::Io { path: path.to_path_buf(), message: err.to_string() }
    }

    fn parse(what: &'static str, detail: impl Into<String>) -> Self {
        SampleError::Parse { what, detail: detail.into() }
    }
}

/// One metric's value as captured this cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub name: String,
    pub value: String,
}

impl Sample {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }
}

/// Produces the current display line of one metric.
///
/// Implementations must not keep anything open between calls.
pub trait MetricSource: Send + Sync {
    fn sample(&self) -> Result<String, SampleError>;
}

impl<F> MetricSource for F
where
    F: Fn() -> Result<String, SampleError> + Send + Sync,
{
    fn sample(&self) -> Result<String, SampleError> {
        self()
    }
}

fn read(path: &Path) -> Result<String, SampleError> {
    fs::read_to_string(path).map_err(|e| SampleError::io(path, e))
}

// -- IP ---------------------------------------------------------------------

/// First non-loopback IPv4 address
#[derive(Debug, Default, Clone, Copy)]
pub struct IpAddress;

impl MetricSource for IpAddress {
    fn sample(&self) -> Result<String, SampleError> {
        let ip = local_ip().map_err(|e| SampleError::Network(e.to_string()))?;
        Ok(format!("IP: {}", ip))
    }
}

// -- CPU load ---------------------------------------------------------------

/// 1-minute load average from `loadavg`
#[derive(Debug, Clone)]
pub struct CpuLoad {
    path: PathBuf,
}

impl CpuLoad {
    pub fn new(proc_root: &Path) -> Self {
        Self { path: proc_root.join("loadavg") }
    }
}

impl MetricSource for CpuLoad {
    fn sample(&self) -> Result<String, SampleError> {
        parse_load(&read(&self.path)?).map(format_load)
    }
}

pub fn parse_load(content: &str) -> Result<f64, SampleError> {
    let first = content
        .split_whitespace()
        .next()
        .ok_or_else(|| SampleError::parse("loadavg", "empty"))?;
    first
        .parse::<f64>()
        .map_err(|e| SampleError::parse("loadavg", format!("{:?}: {}", first, e)))
}

pub fn format_load(load: f64) -> String {
    format!("CPU Load: {:.2}", load)
}

// -- Memory -----------------------------------------------------------------

/// Used/total memory in MiB from `meminfo`
#[derive(Debug, Clone)]
pub struct MemUsage {
    path: PathBuf,
}

impl MemUsage {
    pub fn new(proc_root: &Path) -> Self {
        Self { path: proc_root.join("meminfo") }
    }
}

impl MetricSource for MemUsage {
    fn sample(&self) -> Result<String, SampleError> {
        let (used, total) = parse_meminfo(&read(&self.path)?)?;
        Ok(format_memory(used, total))
    }
}

/// (used, total) in MiB. Used is total minus available; kernels without
/// MemAvailable fall back to free + buffers + cached.
pub fn parse_meminfo(content: &str) -> Result<(u64, u64), SampleError> {
    let field = |key: &str| -> Option<u64> {
        content.lines().find_map(|line| {
            let rest = line.strip_prefix(key)?.strip_prefix(':')?;
            rest.split_whitespace().next()?.parse().ok()
        })
    };

    let total_kib = field("MemTotal").ok_or_else(|| SampleError::parse("meminfo", "no MemTotal"))?;
    let avail_kib = match field("MemAvailable") {
        Some(v) => v,
        None => {
            let free = field("MemFree").ok_or_else(|| SampleError::parse("meminfo", "no MemAvailable or MemFree"))?;
            free + field("Buffers").unwrap_or(0) + field("Cached").unwrap_or(0)
        }
    };
    if total_kib == 0 {
        return Err(SampleError::parse("meminfo", "MemTotal is zero"));
    }

    let used_kib = total_kib.saturating_sub(avail_kib);
    Ok((used_kib * 1024 / MIB, total_kib * 1024 / MIB))
}

pub fn format_memory(used_mib: u64, total_mib: u64) -> String {
    let pct = if total_mib == 0 { 0.0 } else { used_mib as f64 * 100.0 / total_mib as f64 };
    format!("Mem: {}/{} MB  {:.2}%", used_mib, total_mib, pct)
}

// -- Disk -------------------------------------------------------------------

/// Filesystem usage of a mount point, in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskStats {
    pub total: u64,
    pub used: u64,
    /// Space available to unprivileged users
    pub avail: u64,
}

impl DiskStats {
    /// Space not available to unprivileged users counts as used.
    pub fn from_space(total: u64, avail: u64) -> Self {
        Self { total, used: total.saturating_sub(avail), avail }
    }

    /// Percent used the way `df` reports it, rounded up.
    pub fn percent(&self) -> u64 {
        let denom = self.used + self.avail;
        if denom == 0 {
            return 0;
        }
        (self.used * 100).div_ceil(denom)
    }
}

/// Usage of the filesystem holding `mount`
#[derive(Debug, Clone)]
pub struct DiskUsage {
    mount: PathBuf,
}

impl DiskUsage {
    pub fn new(mount: &Path) -> Self {
        Self { mount: mount.to_path_buf() }
    }
}

impl MetricSource for DiskUsage {
    fn sample(&self) -> Result<String, SampleError> {
        disk_stats(&self.mount).map(|s| format_disk(&s))
    }
}

/// Query the mounted filesystems afresh and pick the one holding `path`.
pub fn disk_stats(path: &Path) -> Result<DiskStats, SampleError> {
    let disks = Disks::new_with_refreshed_list();
    let mounts: Vec<(&Path, DiskStats)> = disks
        .list()
        .iter()
        .map(|d| (d.mount_point(), DiskStats::from_space(d.total_space(), d.available_space())))
        .collect();
    holding_mount(&mounts, path).ok_or_else(|| SampleError::Io {
        path: path.to_path_buf(),
        message: "no mounted filesystem holds it".to_string(),
    })
}

/// Deepest mount point that contains `path`, as `df <path>` resolves it
pub fn holding_mount(mounts: &[(&Path, DiskStats)], path: &Path) -> Option<DiskStats> {
    mounts
        .iter()
        .filter(|(point, _)| path.starts_with(point))
        .max_by_key(|(point, _)| point.components().count())
        .map(|(_, stats)| *stats)
}

/// Whole GiB rounded up the way `df -h` prints sizes: one decimal below
/// 10G (which the display then truncates), whole units above.
pub fn df_gib(bytes: u64) -> u64 {
    let gib = bytes as f64 / GIB as f64;
    if gib < 10.0 {
        ((gib * 10.0).ceil() / 10.0).trunc() as u64
    } else {
        gib.ceil() as u64
    }
}

pub fn format_disk(stats: &DiskStats) -> String {
    format!("Disk: {}/{} GB  {}%", df_gib(stats.used), df_gib(stats.total), stats.percent())
}

// -- Temperature ------------------------------------------------------------

/// SoC temperature from a thermal zone, millidegrees in the file
#[derive(Debug, Clone)]
pub struct CpuTemp {
    path: PathBuf,
}

impl CpuTemp {
    pub fn new(path: &Path) -> Self {
        Self { path: path.to_path_buf() }
    }
}

impl MetricSource for CpuTemp {
    fn sample(&self) -> Result<String, SampleError> {
        parse_millidegrees(&read(&self.path)?).map(format_temp)
    }
}

pub fn parse_millidegrees(content: &str) -> Result<f64, SampleError> {
    let raw = content.trim();
    raw.parse::<f64>()
        .map(|m| m / 1000.0)
        .map_err(|e| SampleError::parse("thermal zone", format!("{:?}: {}", raw, e)))
}

pub fn format_temp(celsius: f64) -> String {
    format!("CPU Temp: {:.1} C", celsius)
}

// -- Registry ---------------------------------------------------------------

/// Where the built-in sources read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePaths {
    pub proc_root: PathBuf,
    pub thermal_zone: PathBuf,
    pub disk_mount: PathBuf,
}

impl Default for SourcePaths {
    fn default() -> Self {
        Self {
            proc_root: PathBuf::from(PROC_ROOT),
            thermal_zone: PathBuf::from(THERMAL_ZONE),
            disk_mount: PathBuf::from(DISK_MOUNT),
        }
    }
}

/// A named source with its display color
#[derive(Clone)]
pub struct Metric {
    pub name: String,
    /// Text before the colon, also used for the placeholder line
    pub label: String,
    pub color: Color,
    pub source: Arc<dyn MetricSource>,
}

impl Metric {
    pub fn new(
        name: impl Into<String>,
        label: impl Into<String>,
        color: Color,
        source: impl MetricSource + 'static,
    ) -> Self {
        Self { name: name.into(), label: label.into(), color, source: Arc::new(source) }
    }

    /// Line shown when the metric cannot be read
    pub fn placeholder(&self, text: &str) -> String {
        format!("{}: {}", self.label, text)
    }
}

impl fmt::Debug for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metric")
            .field("name", &self.name)
            .field("label", &self.label)
            .field("color", &self.color)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("metric {0} registered twice")]
    DuplicateName(String),
}

/// Outcome of sampling one metric
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub name: String,
    pub result: Result<String, SampleError>,
}

/// Metrics in display order, top line first
#[derive(Debug, Default, Clone)]
pub struct MetricRegistry {
    metrics: Vec<Metric>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// IP, CPU, MemUsage, Disk, Temp
    pub fn builtin(paths: &SourcePaths) -> Self {
        let metrics = vec![
            Metric::new("IP", "IP", Color::WHITE, IpAddress),
            Metric::new("CPU", "CPU Load", Color::YELLOW, CpuLoad::new(&paths.proc_root)),
            Metric::new("MemUsage", "Mem", Color::GREEN, MemUsage::new(&paths.proc_root)),
            Metric::new("Disk", "Disk", Color::BLUE, DiskUsage::new(&paths.disk_mount)),
            Metric::new("Temp", "CPU Temp", Color::MAGENTA, CpuTemp::new(&paths.thermal_zone)),
        ];
        Self { metrics }
    }

    pub fn register(&mut self, metric: Metric) -> Result<(), RegistryError> {
        if self.get(&metric.name).is_some() {
            return Err(RegistryError::DuplicateName(metric.name));
        }
        self.metrics.push(metric);
        Ok(())
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn get(&self, name: &str) -> Option<&Metric> {
        self.metrics.iter().find(|m| m.name == name)
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Sample every metric in order on the calling thread
    pub fn sample_all(&self) -> Vec<Reading> {
        self.metrics
            .iter()
            .map(|m| Reading { name: m.name.clone(), result: sample_guarded(m.source.as_ref()) })
            .collect()
    }

    /// Sample every metric on the blocking pool, all sharing one deadline.
    ///
    /// A source still running at the deadline is reported as
    /// [`SampleError::Timeout`] and parked in `in_flight`. Later calls wait
    /// on that same read instead of starting another, so a hung source
    /// holds at most one blocking thread.
    pub async fn sample_all_within(&self, timeout: Duration, in_flight: &mut InFlight) -> Vec<Reading> {
        let deadline = tokio::time::Instant::now() + timeout;
        let handles: Vec<Pending> = self
            .metrics
            .iter()
            .map(|m| match in_flight.handles.remove(&m.name) {
                Some(handle) => {
                    trace!("{} still busy with an earlier read", m.name);
                    handle
                }
                None => {
                    let source = Arc::clone(&m.source);
                    tokio::task::spawn_blocking(move || sample_guarded(source.as_ref()))
                }
            })
            .collect();

        let mut readings = Vec::with_capacity(handles.len());
        for (metric, mut handle) in self.metrics.iter().zip(handles) {
            let result = match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(result)) => result,
                Ok(Err(join)) => {
                    warn!("{} sampler died: {}", metric.name, join);
                    Err(SampleError::Aborted(join.to_string()))
                }
                Err(_) => {
                    debug!("{} missed the {:?} deadline", metric.name, timeout);
                    in_flight.handles.insert(metric.name.clone(), handle);
                    Err(SampleError::Timeout(timeout))
                }
            };
            readings.push(Reading { name: metric.name.clone(), result });
        }
        readings
    }
}

type Pending = JoinHandle<Result<String, SampleError>>;

/// Reads that outlived their cycle's deadline, at most one per metric
#[derive(Debug, Default)]
pub struct InFlight {
    handles: HashMap<String, Pending>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handles.contains_key(name)
    }
}

/// A panicking source is reported like any other failed read.
fn sample_guarded(source: &dyn MetricSource) -> Result<String, SampleError> {
    match catch_unwind(AssertUnwindSafe(|| source.sample())) {
        Ok(result) => result,
        Err(panic_info) => {
            let message = if let Some(s) = panic_info.downcast_ref::<&str>() {
                format!("source panicked: {}", s)
            } else if let Some(s) = panic_info.downcast_ref::<String>() {
                format!("source panicked: {}", s)
            } else {
                "source panicked".to_string()
            };
            Err(SampleError::Aborted(message))
        }
    }
}
