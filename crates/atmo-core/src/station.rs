//! Multi-sample acquisition pipeline.
//!
//! Drives both drivers for a fixed number of rounds, averages each
//! quantity, derives altitude, and yields the report 5-tuple to the
//! caller. Formatting and transport of the report are out of scope.

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use serde::{Deserialize, Serialize};

use crate::altitude;
use crate::config::StationConfig;
use crate::sensors::aht20::Aht20;
use crate::sensors::bmp280::Bmp280;
use crate::sensors::SensorError;

/// Arithmetic means over one aggregator invocation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AveragedReadings {
    pub barometer_temperature_c: f32,
    pub pressure_hpa: f32,
    pub hygrometer_temperature_c: f32,
    pub humidity_pct: f32,
}

/// The 5-tuple yielded after each aggregator cycle.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct WeatherReport {
    pub barometer_temperature_c: f32,
    pub pressure_hpa: f32,
    pub hygrometer_temperature_c: f32,
    pub humidity_pct: f32,
    pub altitude_m: f32,
}

/// The acquisition pipeline over the two injected drivers.
pub struct WeatherStation<B, H, D, E> {
    barometer: Bmp280<B, D>,
    hygrometer: Aht20<H, E>,
    config: StationConfig,
}

impl<B: I2c, H: I2c, D: DelayNs, E: DelayNs> WeatherStation<B, H, D, E> {
    pub fn new(barometer: Bmp280<B, D>, hygrometer: Aht20<H, E>, config: StationConfig) -> Self {
        Self {
            barometer,
            hygrometer,
            config,
        }
    }

    /// Load the barometer calibration. Must run once before sampling.
    pub async fn init(&mut self) -> Result<(), SensorError> {
        self.barometer.init().await
    }

    /// Run the configured number of full acquisition cycles and return
    /// the arithmetic mean of each quantity.
    ///
    /// Fail-fast: the first error in any round, including an invalid
    /// pressure, aborts the average and propagates. A failed round is
    /// never averaged in.
    pub async fn read_averaged(&mut self) -> Result<AveragedReadings, SensorError> {
        let rounds = self.config.sample_rounds;
        if rounds == 0 {
            return Err(SensorError::InvalidInput);
        }

        let mut barometer_temperature_sum = 0.0f32;
        let mut pressure_sum = 0.0f32;
        let mut hygrometer_temperature_sum = 0.0f32;
        let mut humidity_sum = 0.0f32;

        for _ in 0..rounds {
            let barometric = self.barometer.measure().await?;
            let hygrometric = self.hygrometer.measure().await?;

            barometer_temperature_sum += barometric.temperature_c;
            pressure_sum += barometric.pressure_hpa;
            hygrometer_temperature_sum += hygrometric.temperature_c;
            humidity_sum += hygrometric.humidity_pct;
        }

        let n = rounds as f32;
        Ok(AveragedReadings {
            barometer_temperature_c: barometer_temperature_sum / n,
            pressure_hpa: pressure_sum / n,
            hygrometer_temperature_c: hygrometer_temperature_sum / n,
            humidity_pct: humidity_sum / n,
        })
    }

    /// One aggregator cycle plus altitude derivation.
    pub async fn report(&mut self) -> Result<WeatherReport, SensorError> {
        let averaged = self.read_averaged().await?;
        let altitude_m = altitude::estimate(
            averaged.pressure_hpa,
            self.config.sea_level_hpa,
            averaged.hygrometer_temperature_c,
        )?;
        Ok(WeatherReport {
            barometer_temperature_c: averaged.barometer_temperature_c,
            pressure_hpa: averaged.pressure_hpa,
            hygrometer_temperature_c: averaged.hygrometer_temperature_c,
            humidity_pct: averaged.humidity_pct,
            altitude_m,
        })
    }
}
