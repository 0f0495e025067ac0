//! Altitude estimation from the international barometric formula.

use crate::sensors::SensorError;

/// Exponent of the pressure ratio in the barometric formula.
const PRESSURE_RATIO_EXPONENT: f32 = 1.0 / 5.257;

/// Standard atmospheric lapse rate, K/m.
const LAPSE_RATE_K_PER_M: f32 = 0.0065;

const KELVIN_OFFSET: f32 = 273.15;

/// Estimate altitude in meters from the measured pressure, the
/// configured sea-level reference, and the measured air temperature.
///
/// Both pressures must be in the same unit; the core uses hPa
/// throughout. A non-positive measured pressure (notably the
/// invalid-pressure case upstream) is rejected with `InvalidInput`
/// before any float operation runs.
pub fn estimate(
    pressure_hpa: f32,
    sea_level_hpa: f32,
    temperature_c: f32,
) -> Result<f32, SensorError> {
    if pressure_hpa <= 0.0 {
        return Err(SensorError::InvalidInput);
    }
    let ratio = libm::powf(sea_level_hpa / pressure_hpa, PRESSURE_RATIO_EXPONENT);
    Ok((ratio - 1.0) * (temperature_c + KELVIN_OFFSET) / LAPSE_RATE_K_PER_M)
}
