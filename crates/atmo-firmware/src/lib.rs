//! ESP32-S3 firmware-specific modules for atmo-rs
//!
//! Hardware bring-up, WiFi association and retry, the status LED, and
//! report logging live here. All acquisition and compensation logic is
//! in `atmo-core`; this crate is only its collaborator.

#![no_std]

pub mod wifi_secrets;
