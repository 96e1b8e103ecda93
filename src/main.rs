/*
 *  main.rs
 *
 *  statmon - host vitals at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Daemon entry point: config, logging, display and the sample loop
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

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{error, info};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;

use statmon::compositor::FrameCompositor;
use statmon::config::{self, Cli};
use statmon::display::DisplayDriverFactory;
use statmon::glyphs::MonoGlyphs;
use statmon::metrics::MetricRegistry;
use statmon::sampler::{LoopSettings, SampleLoop};

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// Waits for SIGINT, SIGTERM or SIGHUP.
async fn signal_handler() -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_from(&cli).context("loading configuration")?;

    if cli.dump_config {
        print!("{}", config::dump(&cfg)?);
        return Ok(());
    }

    env_logger::Builder::from_env(Env::default().default_filter_or(cfg.log_level()))
        .format_timestamp_secs()
        .init();

    info!("{} - host vitals at a glance", env!("CARGO_PKG_NAME"));
    info!("v.{} built {} ({})", env!("CARGO_PKG_VERSION"), BUILD_DATE, BUILD_TARGET);

    let registry = Arc::new(MetricRegistry::builtin(&cfg.source_paths()));
    let driver = DisplayDriverFactory::create_from_config(&cfg.display())
        .context("initializing display")?;
    let compositor = FrameCompositor::new(MonoGlyphs::new(cfg.font()), cfg.redraw());
    let mut sampler = SampleLoop::new(registry, compositor, driver, LoopSettings::from_config(&cfg));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut worker = tokio::spawn(async move {
        sampler.run(shutdown_rx).await;
    });

    tokio::select! {
        res = signal_handler() => res?,
        res = &mut worker => {
            // the loop only returns on shutdown, so getting here means it panicked
            error!("Sample loop ended unexpectedly");
            res.context("sample loop")?;
            return Ok(());
        }
    }

    let _ = shutdown_tx.send(true);
    worker.await.context("sample loop")?;
    info!("Shutdown complete");
    Ok(())
}
