/*
 *  tests/sample_loop.rs
 *
 *  End-to-end cycles of the sample loop against fake sources and the
 *  mock panel
 *
 *  statmon - host vitals at a glance
 *  (c) 2020-26 Stuart Hunter
 */

use std::sync::{Arc, Mutex};
use std::time::Duration;

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use tokio::sync::watch;

use statmon::compositor::{FrameCompositor, RedrawPolicy};
use statmon::display::{Color, DisplayDriver, MockDriver};
use statmon::glyphs::{FontFace, MonoGlyphs};
use statmon::metrics::{Metric, MetricRegistry, MetricSource, SampleError};
use statmon::sampler::{CycleReport, LoopSettings, SampleLoop};

/// A source whose next reading the test controls
#[derive(Clone)]
struct Knob(Arc<Mutex<Result<String, SampleError>>>);

impl Knob {
    fn new(value: &str) -> Self {
        Knob(Arc::new(Mutex::new(Ok(value.to_string()))))
    }

    fn set(&self, value: &str) {
        *self.0.lock().unwrap() = Ok(value.to_string());
    }

    fn fail(&self) {
        *self.0.lock().unwrap() = Err(SampleError::Parse { what: "fixture", detail: "broken".into() });
    }
}

impl MetricSource for Knob {
    fn sample(&self) -> Result<String, SampleError> {
        self.0.lock().unwrap().clone()
    }
}

struct Rig {
    ip: Knob,
    cpu: Knob,
    temp: Knob,
    panel: MockDriver,
    sampler: SampleLoop<MonoGlyphs>,
}

fn rig_with(policy: RedrawPolicy, height: u32, settings: LoopSettings) -> Rig {
    let ip = Knob::new("IP: 192.168.1.20");
    let cpu = Knob::new("CPU Load: 0.25");
    let temp = Knob::new("CPU Temp: 47.2 C");

    let mut registry = MetricRegistry::new();
    registry.register(Metric::new("IP", "IP", Color::WHITE, ip.clone())).unwrap();
    registry.register(Metric::new("CPU", "CPU Load", Color::YELLOW, cpu.clone())).unwrap();
    registry.register(Metric::new("MemUsage", "Mem", Color::GREEN, Knob::new("Mem: 512/3906 MB  13.11%"))).unwrap();
    registry.register(Metric::new("Disk", "Disk", Color::BLUE, Knob::new("Disk: 9/29 GB  32%"))).unwrap();
    registry.register(Metric::new("Temp", "CPU Temp", Color::MAGENTA, temp.clone())).unwrap();

    // brought up the way the factory does it
    let mut panel = MockDriver::new_with_size(240, height).unwrap();
    panel.init().unwrap();
    let compositor = FrameCompositor::new(MonoGlyphs::new(FontFace::Font9x18), policy);
    let sampler = SampleLoop::new(Arc::new(registry), compositor, Box::new(panel.clone()), settings);

    Rig { ip, cpu, temp, panel, sampler }
}

fn rig(policy: RedrawPolicy) -> Rig {
    rig_with(policy, 135, LoopSettings::default())
}

fn has(sampler: &SampleLoop<MonoGlyphs>, color: Rgb565) -> bool {
    sampler.canvas().as_slice().contains(&color)
}

#[tokio::test]
async fn test_startup_blanks_and_lights_panel() {
    let rig = rig(RedrawPolicy::Partial);
    let state = rig.panel.state();
    let state = state.lock().unwrap();
    assert_eq!(state.init_count, 1);
    assert_eq!(state.push_count, 1);
    assert_eq!(state.backlight, Some(true));
    assert!(state.last_frame.iter().all(|&p| p == Rgb565::BLACK));
}

#[tokio::test]
async fn test_first_cycle_draws_everything_once() {
    let mut rig = rig(RedrawPolicy::Partial);
    let report = rig.sampler.cycle().await;

    assert_eq!(report, CycleReport { sampled: 5, changed: 5, drawn: 5, failed: 0, pushed: true });
    assert_eq!(rig.panel.push_count(), 2);
    assert_eq!(rig.sampler.tracker().len(), 5);
    assert_eq!(rig.panel.last_frame(), rig.sampler.canvas().as_slice());
}

#[tokio::test]
async fn test_unchanged_cycle_skips_push() {
    let mut rig = rig(RedrawPolicy::Partial);
    rig.sampler.cycle().await;
    let report = rig.sampler.cycle().await;

    assert_eq!(report.changed, 0);
    assert_eq!(report.drawn, 0);
    assert!(!report.pushed);
    assert_eq!(rig.panel.push_count(), 2);
}

#[tokio::test]
async fn test_only_cpu_changes() {
    let mut rig = rig(RedrawPolicy::Partial);
    rig.sampler.cycle().await;
    let before = rig.sampler.canvas().clone();

    rig.cpu.set("CPU Load: 1.75");
    let report = rig.sampler.cycle().await;

    assert_eq!(report.changed, 1);
    assert_eq!(report.drawn, 1);
    assert!(report.pushed);
    assert_eq!(rig.sampler.tracker().last("CPU"), Some("CPU Load: 1.75"));

    // rows outside the CPU line are untouched
    let cpu_box = rig.sampler.compositor().placed("CPU").unwrap();
    for y in 0..135 {
        if (cpu_box.top_left.y..cpu_box.top_left.y + cpu_box.size.height as i32).contains(&y) {
            continue;
        }
        for x in 0..240 {
            assert_eq!(rig.sampler.canvas().pixel(x, y), before.pixel(x, y), "pixel {},{}", x, y);
        }
    }
    assert!(has(&rig.sampler, Rgb565::MAGENTA));
}

#[tokio::test]
async fn test_full_policy_redraws_all_lines() {
    let mut rig = rig(RedrawPolicy::Full);
    rig.sampler.cycle().await;

    rig.cpu.set("CPU Load: 1.75");
    let report = rig.sampler.cycle().await;
    assert_eq!(report.changed, 1);
    assert_eq!(report.drawn, 5);
    assert!(has(&rig.sampler, Rgb565::MAGENTA));
}

#[tokio::test]
async fn test_legacy_policy_loses_unchanged_lines() {
    let mut rig = rig(RedrawPolicy::Legacy);
    rig.sampler.cycle().await;
    assert!(has(&rig.sampler, Rgb565::MAGENTA));

    rig.cpu.set("CPU Load: 1.75");
    let report = rig.sampler.cycle().await;
    assert_eq!(report.drawn, 1);
    assert!(has(&rig.sampler, Rgb565::YELLOW));
    assert!(!has(&rig.sampler, Rgb565::MAGENTA));
    assert!(!rig.panel.last_frame().contains(&Rgb565::MAGENTA));
}

#[tokio::test]
async fn test_failing_source_shows_placeholder() {
    let mut rig = rig(RedrawPolicy::Partial);
    rig.temp.fail();
    rig.ip.fail();

    let report = rig.sampler.cycle().await;
    assert_eq!(report.drawn, 5);
    assert_eq!(rig.sampler.tracker().last("Temp"), Some("CPU Temp: N/A"));
    assert_eq!(rig.sampler.tracker().last("IP"), Some("IP: N/A"));
    assert_eq!(rig.sampler.tracker().last("CPU"), Some("CPU Load: 0.25"));

    // still failing: nothing new to draw
    assert_eq!(rig.sampler.cycle().await.changed, 0);

    rig.temp.set("CPU Temp: 48.0 C");
    let report = rig.sampler.cycle().await;
    assert_eq!(report.changed, 1);
    assert_eq!(rig.sampler.tracker().last("Temp"), Some("CPU Temp: 48.0 C"));
}

#[tokio::test]
async fn test_custom_placeholder() {
    let settings = LoopSettings { placeholder: "--".to_string(), ..Default::default() };
    let mut rig = rig_with(RedrawPolicy::Partial, 135, settings);
    rig.cpu.fail();
    rig.sampler.cycle().await;
    assert_eq!(rig.sampler.tracker().last("CPU"), Some("CPU Load: --"));
}

#[tokio::test]
async fn test_push_failure_retries_next_cycle() {
    let mut rig = rig(RedrawPolicy::Partial);
    rig.sampler.cycle().await;

    rig.panel.fail_pushes(true);
    rig.cpu.set("CPU Load: 3.00");
    let report = rig.sampler.cycle().await;
    assert_eq!(report.drawn, 1);
    assert!(!report.pushed);
    assert!(rig.sampler.push_pending());
    assert_eq!(rig.panel.push_count(), 2);

    rig.panel.fail_pushes(false);
    let report = rig.sampler.cycle().await;
    assert_eq!(report.changed, 0);
    assert!(report.pushed);
    assert!(!rig.sampler.push_pending());
    assert_eq!(rig.panel.push_count(), 3);
    assert_eq!(rig.panel.last_frame(), rig.sampler.canvas().as_slice());
}

#[tokio::test]
async fn test_line_off_canvas_is_retried() {
    // 9x18 lines from row -2: Disk would end at 70, Temp at 88
    let mut rig = rig_with(RedrawPolicy::Partial, 60, LoopSettings::default());

    let report = rig.sampler.cycle().await;
    assert_eq!(report.drawn, 3);
    assert_eq!(report.failed, 2);
    assert!(report.pushed);
    assert_eq!(rig.sampler.tracker().last("Disk"), None);
    assert_eq!(rig.sampler.tracker().last("Temp"), None);

    let report = rig.sampler.cycle().await;
    assert_eq!(report.changed, 2);
    assert_eq!(report.drawn, 0);
    assert!(!report.pushed);
}

#[tokio::test]
async fn test_full_policy_does_not_repush_failed_lines() {
    let mut rig = rig_with(RedrawPolicy::Full, 60, LoopSettings::default());

    let report = rig.sampler.cycle().await;
    assert_eq!((report.drawn, report.failed), (3, 2));
    assert_eq!(rig.panel.push_count(), 2);

    for _ in 0..3 {
        let report = rig.sampler.cycle().await;
        assert_eq!(report.changed, 2);
        assert_eq!(report.drawn, 0);
        assert!(!report.pushed);
    }
    assert_eq!(rig.panel.push_count(), 2);

    rig.cpu.set("CPU Load: 1.75");
    let report = rig.sampler.cycle().await;
    assert_eq!((report.drawn, report.failed), (3, 2));
    assert!(report.pushed);
    assert_eq!(rig.panel.push_count(), 3);
}

#[tokio::test]
async fn test_slow_source_times_out() {
    let settings = LoopSettings { sample_timeout: Duration::from_millis(50), ..Default::default() };
    let mut registry = MetricRegistry::new();
    registry.register(Metric::new("CPU", "CPU Load", Color::YELLOW, Knob::new("CPU Load: 0.10"))).unwrap();
    registry.register(Metric::new("Temp", "CPU Temp", Color::MAGENTA, || -> Result<String, SampleError> {
        std::thread::sleep(Duration::from_millis(300));
        Ok("CPU Temp: 40.0 C".to_string())
    })).unwrap();

    let panel = MockDriver::new_with_size(240, 135).unwrap();
    let compositor = FrameCompositor::new(MonoGlyphs::default(), RedrawPolicy::Partial);
    let mut sampler = SampleLoop::new(Arc::new(registry), compositor, Box::new(panel), settings);

    let report = sampler.cycle().await;
    assert_eq!(report.drawn, 2);
    assert_eq!(sampler.tracker().last("Temp"), Some("CPU Temp: N/A"));
    assert_eq!(sampler.tracker().last("CPU"), Some("CPU Load: 0.10"));
    assert!(sampler.in_flight().contains("Temp"));

    // still busy: waited on, not sampled again
    let report = sampler.cycle().await;
    assert_eq!(report.changed, 0);
    assert_eq!(sampler.in_flight().len(), 1);

    tokio::time::sleep(Duration::from_millis(300)).await;
    let report = sampler.cycle().await;
    assert_eq!(report.changed, 1);
    assert_eq!(sampler.tracker().last("Temp"), Some("CPU Temp: 40.0 C"));
    assert!(sampler.in_flight().is_empty());
}

#[tokio::test]
async fn test_shutdown_interrupts_sleep() {
    let settings = LoopSettings { poll_interval: Duration::from_secs(30), ..Default::default() };
    let rig = rig_with(RedrawPolicy::Partial, 135, settings);
    let panel = rig.panel.clone();
    let mut sampler = rig.sampler;

    let (tx, rx) = watch::channel(false);
    let task = tokio::spawn(async move {
        sampler.run(rx).await;
        sampler
    });

    // let the first cycle land, then stop while the loop sleeps
    tokio::time::sleep(Duration::from_millis(100)).await;
    tx.send(true).unwrap();

    let sampler = tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("loop did not stop")
        .unwrap();
    assert_eq!(sampler.tracker().len(), 5);
    assert_eq!(panel.push_count(), 2);
    let state = panel.state();
    let state = state.lock().unwrap();
    assert_eq!(state.backlight, Some(false));
    // the loop never re-initializes the panel
    assert_eq!(state.init_count, 1);
}

#[tokio::test]
async fn test_dropped_sender_stops_loop() {
    let settings = LoopSettings { poll_interval: Duration::from_secs(30), ..Default::default() };
    let rig = rig_with(RedrawPolicy::Partial, 135, settings);
    let mut sampler = rig.sampler;

    let (tx, rx) = watch::channel(false);
    let task = tokio::spawn(async move { sampler.run(rx).await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    drop(tx);

    assert!(tokio::time::timeout(Duration::from_secs(2), task).await.is_ok());
}
