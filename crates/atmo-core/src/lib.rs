//! Hardware-independent core library for atmo-rs
//!
//! This crate contains the sensor acquisition and compensation logic for
//! the atmo weather station: bus transaction sequencing for the two fixed
//! devices, the fixed-point calibration math, multi-sample averaging, and
//! altitude derivation.
//!
//! It is `no_std` and generic over `embedded-hal-async` bus traits so it
//! compiles on both the embedded target (ESP32-S3) and desktop hosts (for
//! the simulator and tests). Network handling, status LEDs, and report
//! formatting live in the firmware crate; the core only consumes a bus
//! and produces physical readings.

#![cfg_attr(not(test), no_std)]

pub mod altitude;
pub mod config;
pub mod sensors;
pub mod shared_i2c;
pub mod station;

pub use config::StationConfig;
pub use sensors::SensorError;
pub use station::{WeatherReport, WeatherStation};
