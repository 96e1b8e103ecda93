/*
 *  tests/display_integration.rs
 *
 *  Integration tests for the display layer: factory, mock panel and
 *  the compositor drawing onto a pushed canvas
 *
 *  statmon - host vitals at a glance
 *  (c) 2020-26 Stuart Hunter
 */

use std::collections::HashSet;

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;

use statmon::compositor::{FrameCompositor, Line, RedrawPolicy};
use statmon::config::{DisplayConfig, DriverKind};
use statmon::display::{
    BACKGROUND, Canvas, Color, DisplayDriver, DisplayDriverFactory, DisplayError,
    DisplayFactoryError, MockDriver,
};
use statmon::glyphs::{FontFace, MonoGlyphs};

fn mock_config() -> DisplayConfig {
    DisplayConfig {
        driver: Some(DriverKind::Mock),
        ..Default::default()
    }
}

#[test]
fn test_factory_mock_matches_panel_geometry() {
    let driver = DisplayDriverFactory::create_from_config(&mock_config()).unwrap();
    let caps = driver.capabilities();
    assert_eq!((caps.width, caps.height), (240, 135));
    assert_eq!(caps.rotation, 90);
    assert!(caps.supports_backlight);
}

#[test]
fn test_factory_portrait_mock() {
    let config = DisplayConfig {
        rotate_deg: Some(0),
        ..mock_config()
    };
    let driver = DisplayDriverFactory::create_from_config(&config).unwrap();
    assert_eq!(driver.dimensions(), (135, 240));
}

#[test]
fn test_factory_reports_bad_geometry() {
    let config = DisplayConfig {
        width: Some(0),
        ..mock_config()
    };
    match DisplayDriverFactory::create_from_config(&config) {
        Err(DisplayFactoryError::DriverInitFailed(DisplayError::InvalidConfiguration(_))) => {}
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("zero-width display accepted"),
    }
}

#[test]
fn test_compose_and_push() {
    let mut driver = MockDriver::new(&mock_config()).unwrap();
    let observer = driver.clone();
    driver.init().unwrap();

    let (w, h) = driver.dimensions();
    let mut canvas = Canvas::new(w, h, BACKGROUND);
    let mut compositor = FrameCompositor::new(MonoGlyphs::new(FontFace::Font9x18), RedrawPolicy::Partial);

    let lines = [
        Line { name: "IP", text: "IP: 192.168.1.20", color: Color::WHITE.into() },
        Line { name: "Temp", text: "CPU Temp: 47.2 C", color: Color::MAGENTA.into() },
    ];
    let changed: HashSet<&str> = ["IP", "Temp"].into_iter().collect();
    let outcome = compositor.render(&mut canvas, &lines, &changed);
    assert_eq!(outcome.count(), 2);

    driver.push(&canvas).unwrap();
    let frame = observer.last_frame();
    assert_eq!(frame.len(), 240 * 135);
    assert!(frame.contains(&Rgb565::WHITE));
    assert!(frame.contains(&Rgb565::MAGENTA));

    // second line sits one 18px row below the first, which starts at -2
    let temp_row = (16..34).any(|y| (0..240).any(|x| observer.pixel(x, y) == Some(Rgb565::MAGENTA)));
    assert!(temp_row);
    assert!((0..16).all(|y| (0..240).all(|x| observer.pixel(x, y) != Some(Rgb565::MAGENTA))));
}

#[test]
fn test_push_rejects_wrong_canvas() {
    let mut driver = DisplayDriverFactory::create_from_config(&mock_config()).unwrap();
    let canvas = Canvas::new(135, 240, BACKGROUND);
    assert!(matches!(
        driver.push(&canvas),
        Err(DisplayError::BufferSizeMismatch { .. })
    ));
}

#[test]
fn test_rotation_resizes_mock() {
    let mut driver = DisplayDriverFactory::create_from_config(&mock_config()).unwrap();
    driver.set_rotation(180).unwrap();
    assert_eq!(driver.dimensions(), (135, 240));
    driver.push(&Canvas::new(135, 240, BACKGROUND)).unwrap();
}
