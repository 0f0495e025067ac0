//! Drivers for the two fixed bus devices.

use thiserror_no_std::Error;

pub mod aht20;
pub mod bmp280;

#[cfg(test)]
pub(crate) mod mockbus;

pub use aht20::{Aht20, Aht20Measurement};
pub use bmp280::{Bmp280, Bmp280Measurement, Calibration};

/// Failures surfaced by the acquisition core.
///
/// Every failure propagates to the immediate caller. The core performs
/// no retries and never substitutes a default value for a reading;
/// reconnect or retry policy belongs to the caller.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// A bus transaction failed (NACK or timeout).
    #[error("bus transaction failed, device unreachable")]
    DeviceUnreachable,
    /// Compensation was requested before its preconditions were met:
    /// either the calibration coefficients were never loaded, or a
    /// pressure read was attempted without a preceding temperature
    /// read in the same acquisition cycle.
    #[error("compensation requested before its preconditions were met")]
    NotCalibrated,
    /// The pressure compensation divisor evaluated to zero. The sensor
    /// is not ready and no numeric pressure exists for this cycle.
    #[error("pressure compensation produced a zero divisor")]
    InvalidPressure,
    /// A derived computation was handed a physically meaningless input.
    #[error("physically invalid input")]
    InvalidInput,
}
