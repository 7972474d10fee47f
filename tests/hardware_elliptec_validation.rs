//! Elliptec Hardware Validation Tests
//!
//! Tests for Thorlabs Elliptec ELL14 rotation mounts on a shared bus.
//! Hardware: 3 rotators at addresses 2, 3, 8 on /dev/ttyUSB0 (override the port
//! with ELLIPTEC_TEST_PORT)
//!
//! Run with: cargo test --features hardware_tests --test hardware_elliptec_validation -- --nocapture --test-threads=1
//!
//! SAFETY: These tests move physical hardware. Ensure no obstructions before running.

#![cfg(all(feature = "hardware_tests", feature = "instrument_serial"))]

use anyhow::{Context, Result};
use elliptec::config::SerialSettings;
use elliptec::protocol::{Address, Status};
use elliptec::{Controller, DeviceOptions, Direction, HomeDirection, Motor, Rotator};
use std::time::Duration;

const DEFAULT_PORT: &str = "/dev/ttyUSB0";
const ADDRESSES: [&str; 3] = ["2", "3", "8"];
const POSITION_TOLERANCE_DEG: f64 = 1.0;

fn port() -> String {
    std::env::var("ELLIPTEC_TEST_PORT").unwrap_or_else(|_| DEFAULT_PORT.to_string())
}

fn address(text: &str) -> Address {
    text.parse().unwrap()
}

/// Open the bus with a timeout long enough for a full rotation
fn controller() -> Result<Controller> {
    let settings = SerialSettings {
        port: port(),
        timeout: Duration::from_secs(6),
        ..SerialSettings::default()
    };
    Controller::open_serial(&settings).context("Failed to open Elliptec bus")
}

fn rotator(controller: &Controller, addr: &str) -> Result<Rotator> {
    Rotator::connect(controller.clone(), address(addr), &DeviceOptions::default())
        .with_context(|| format!("Failed to connect rotator {addr}"))
}

// =============================================================================
// Phase 1: Basic Connectivity Tests
// =============================================================================

#[test]
fn test_all_rotators_respond_to_info() {
    println!("\n=== Test: Device Info Responses ===");

    let controller = controller().unwrap();
    for addr in ADDRESSES {
        let motor = Motor::connect(controller.clone(), address(addr)).unwrap();
        println!("Rotator {addr}:\n{motor}\n");

        assert_eq!(motor.address(), address(addr));
        assert!(motor.calibration().pulses_per_rev() > 0);
        assert_eq!(motor.descriptor().map(|d| d.name), Some("ELL14"));
    }
}

#[test]
fn test_all_rotators_respond_to_position_query() {
    println!("\n=== Test: Position Query for All Rotators ===");

    let controller = controller().unwrap();
    for addr in ADDRESSES {
        let rotator = rotator(&controller, addr).unwrap();
        let angle = rotator.get_angle().unwrap().expect("no position in reply");
        println!("Rotator {addr} position: {angle:.2}°");
        assert!(angle.is_finite());
    }
}

#[test]
fn test_absent_address_is_not_found() {
    let controller = controller().unwrap();
    let result = Motor::connect(controller, address("F"));
    assert!(result.is_err(), "No device expected at address F");
}

// =============================================================================
// Phase 2: Movement Tests
// =============================================================================

#[test]
fn test_absolute_movement_single_rotator() {
    println!("\n=== Test: Absolute Movement (Single Rotator) ===");

    let controller = controller().unwrap();
    let rotator = rotator(&controller, "2").unwrap();

    let initial = rotator.get_angle().unwrap().unwrap();
    println!("Initial position: {initial:.2}°");

    let target = 45.0;
    let reached = rotator.set_angle(target).unwrap().expect("no position in reply");
    println!("Final position: {reached:.2}°");

    let error = (reached - target).abs();
    assert!(
        error < POSITION_TOLERANCE_DEG,
        "Position error too large: {error:.2}° (tolerance: {POSITION_TOLERANCE_DEG:.2}°)"
    );

    rotator.set_angle(initial).ok();
}

#[test]
fn test_relative_movement() {
    println!("\n=== Test: Relative Movement ===");

    let controller = controller().unwrap();
    let rotator = rotator(&controller, "3").unwrap();

    let initial = rotator.get_angle().unwrap().unwrap();
    rotator.shift_angle(10.0).unwrap();
    let back = rotator.shift_angle(-10.0).unwrap().unwrap();
    println!("Initial {initial:.2}°, after +10/-10: {back:.2}°");

    assert!(
        (back - initial).abs() < POSITION_TOLERANCE_DEG,
        "Failed to return to initial position"
    );
}

#[test]
fn test_home_command() {
    println!("\n=== Test: Home Command ===");

    let controller = controller().unwrap();
    let rotator = rotator(&controller, "8").unwrap();

    let initial = rotator.get_angle().unwrap().unwrap();
    let home = rotator.home(HomeDirection::Clockwise).unwrap().unwrap();
    println!("Position after home: {home:.2}°");

    let offset = rotator.home_offset().unwrap().unwrap_or(0.0);
    assert!(
        (home - offset).abs() < 5.0,
        "Home position too far from offset {offset:.2}°: {home:.2}°"
    );

    rotator.set_angle(initial).ok();
}

#[test]
fn test_jog_step_get_set() {
    println!("\n=== Test: Jog Step Get/Set ===");

    let controller = controller().unwrap();
    let rotator = rotator(&controller, "2").unwrap();

    let original = rotator.jog_step().unwrap().unwrap();
    let status = rotator.set_jog_step(5.0).unwrap();
    assert!(!status.is_device_error(), "Device error: {status}");

    let step = rotator.jog_step().unwrap().unwrap();
    assert!((step - 5.0).abs() < 0.01, "Jog step readback {step}");

    let start = rotator.get_angle().unwrap().unwrap();
    let forward = rotator.jog(Direction::Forward).unwrap().unwrap();
    assert!((forward - start - 5.0).abs() < POSITION_TOLERANCE_DEG);
    rotator.jog(Direction::Backward).unwrap();

    rotator.set_jog_step(original).unwrap();
}

// =============================================================================
// Phase 3: Raw Command Tests
// =============================================================================

#[test]
fn test_motor_info() {
    println!("\n=== Test: Motor Electrical Info ===");

    let controller = controller().unwrap();
    let motor = Motor::connect(controller, address("2")).unwrap();

    for name in ["motor_1_info", "motor_2_info"] {
        match motor.get(name).unwrap() {
            Status::MotorElectrical(info) => {
                println!("{name}: {info:?}");
                assert!(info.current >= 0.0);
            }
            other => panic!("Unexpected reply to {name}: {other}"),
        }
    }
}

#[test]
fn test_status_is_ok() {
    let controller = controller().unwrap();
    for addr in ADDRESSES {
        let motor = Motor::connect(controller.clone(), address(addr)).unwrap();
        let status = motor.status().unwrap();
        println!("Rotator {addr}: {status}");
        assert!(!status.is_device_error());
    }
}
