/*
 *  display/drivers/mock.rs
 *
 *  statmon - host vitals at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  In-memory display driver, used headless and under test
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

use embedded_graphics::pixelcolor::Rgb565;

use crate::config::DisplayConfig;
use crate::display::Canvas;
use crate::display::error::DisplayError;
use crate::display::traits::{check_canvas, rotated_size, DisplayCapabilities, DisplayDriver};

use std::sync::{Arc, Mutex, MutexGuard};

/// Mock display driver
///
/// Keeps the last pushed frame in memory instead of sending it to a panel.
/// Selected with `driver: mock` for headless hosts, and used by the tests to
/// observe what the sampling loop pushed and when.
///
/// Clones share the same state, so a test can keep a handle after the
/// driver has been boxed and moved into the loop.
#[derive(Debug, Clone)]
pub struct MockDriver {
    capabilities: DisplayCapabilities,
    native: (u32, u32),
    state: Arc<Mutex<MockDriverState>>,
}

/// Internal state for the mock driver (shared for inspection in tests)
#[derive(Debug, Default)]
pub struct MockDriverState {
    /// Number of times init() was called
    pub init_count: usize,

    /// Number of frames accepted by push()
    pub push_count: usize,

    /// Number of push() calls rejected by a simulated failure
    pub failed_pushes: usize,

    /// Last backlight state set
    pub backlight: Option<bool>,

    /// Copy of the last accepted frame, row-major
    pub last_frame: Vec<Rgb565>,

    /// Simulate failures (for error testing)
    pub simulate_push_failure: bool,
    pub simulate_init_failure: bool,
}

impl MockDriver {
    /// Create a mock sized like the configured panel after rotation
    pub fn new(config: &DisplayConfig) -> Result<Self, DisplayError> {
        let rotation = config.rotate_deg();
        let native = config.native_size();
        let (width, height) = rotated_size(native, rotation)?;
        if width == 0 || height == 0 {
            return Err(DisplayError::InvalidConfiguration(format!(
                "mock display cannot be {}x{}", width, height
            )));
        }

        Ok(Self {
            capabilities: DisplayCapabilities {
                width,
                height,
                rotation,
                supports_backlight: true,
            },
            native,
            state: Arc::new(Mutex::new(MockDriverState::default())),
        })
    }

    /// Create a mock driver with specific visible dimensions
    pub fn new_with_size(width: u32, height: u32) -> Result<Self, DisplayError> {
        let config = DisplayConfig {
            width: Some(width),
            height: Some(height),
            rotate_deg: Some(0),
            ..Default::default()
        };
        Self::new(&config)
    }

    /// Get reference to state for inspection in tests
    pub fn state(&self) -> Arc<Mutex<MockDriverState>> {
        Arc::clone(&self.state)
    }

    /// Number of frames pushed so far
    pub fn push_count(&self) -> usize {
        self.lock().map(|s| s.push_count).unwrap_or(0)
    }

    /// Copy of the last frame pushed, empty before the first push
    pub fn last_frame(&self) -> Vec<Rgb565> {
        self.lock().map(|s| s.last_frame.clone()).unwrap_or_default()
    }

    /// Pixel of the last pushed frame
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb565> {
        if x >= self.capabilities.width || y >= self.capabilities.height {
            return None;
        }
        let idx = (y * self.capabilities.width + x) as usize;
        self.lock().ok().and_then(|s| s.last_frame.get(idx).copied())
    }

    /// Toggle the simulated push failure
    pub fn fail_pushes(&self, fail: bool) {
        if let Ok(mut state) = self.lock() {
            state.simulate_push_failure = fail;
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, MockDriverState>, DisplayError> {
        self.state
            .lock()
            .map_err(|_| DisplayError::Other("mock state poisoned".to_string()))
    }
}

impl DisplayDriver for MockDriver {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        let mut state = self.lock()?;
        if state.simulate_init_failure {
            return Err(DisplayError::InitializationFailed("Simulated init failure".to_string()));
        }
        state.init_count += 1;
        Ok(())
    }

    fn push(&mut self, canvas: &Canvas) -> Result<(), DisplayError> {
        check_canvas(&self.capabilities, canvas)?;

        let mut state = self.lock()?;
        if state.simulate_push_failure {
            state.failed_pushes += 1;
            return Err(DisplayError::SpiError("Simulated push failure".to_string()));
        }
        state.last_frame.clear();
        state.last_frame.extend_from_slice(canvas.as_slice());
        state.push_count += 1;
        Ok(())
    }

    fn set_backlight(&mut self, on: bool) -> Result<(), DisplayError> {
        self.lock()?.backlight = Some(on);
        Ok(())
    }

    fn set_rotation(&mut self, degrees: u16) -> Result<(), DisplayError> {
        let (width, height) = rotated_size(self.native, degrees)?;
        self.capabilities.width = width;
        self.capabilities.height = height;
        self.capabilities.rotation = degrees;
        Ok(())
    }
}
