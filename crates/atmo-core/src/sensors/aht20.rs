//! AHT20 humidity/temperature driver.
//!
//! The device has no register addressing: a raw 3-byte command triggers
//! a combined measurement and a raw 6-byte read returns the two packed
//! 20-bit output codes. No factory calibration is involved; both codes
//! scale linearly against the 2^20 full scale.

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;

use super::SensorError;

/// Fixed I2C address.
pub const AHT20_ADDRESS: u8 = 0x38;

/// Combined temperature/humidity measurement trigger.
const MEASURE_COMMAND: [u8; 3] = [0xAC, 0x33, 0x00];

/// Humidity conversion is an order of magnitude slower than the
/// barometric sensor's.
const MEASURE_DELAY_MS: u32 = 100;

/// Full scale of the 20-bit output codes.
const FULL_SCALE: f32 = 1_048_576.0;

/// One combined reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aht20Measurement {
    pub temperature_c: f32,
    pub humidity_pct: f32,
}

/// AHT20 driver, generic over the bus and delay it is handed.
pub struct Aht20<I2C, D> {
    i2c: I2C,
    delay: D,
}

impl<I2C: I2c, D: DelayNs> Aht20<I2C, D> {
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self { i2c, delay }
    }

    /// Trigger a combined measurement, wait out the conversion, and
    /// decode both codes.
    ///
    /// The humidity code spans bytes 1-3 of the frame, the temperature
    /// code bytes 3-5, sharing the middle byte.
    pub async fn measure(&mut self) -> Result<Aht20Measurement, SensorError> {
        self.i2c
            .write(AHT20_ADDRESS, &MEASURE_COMMAND)
            .await
            .map_err(|_| SensorError::DeviceUnreachable)?;
        self.delay.delay_ms(MEASURE_DELAY_MS).await;

        let mut frame = [0u8; 6];
        self.i2c
            .read(AHT20_ADDRESS, &mut frame)
            .await
            .map_err(|_| SensorError::DeviceUnreachable)?;

        let humidity_code =
            ((frame[1] as u32) << 12) | ((frame[2] as u32) << 4) | ((frame[3] as u32) >> 4);
        let temperature_code =
            (((frame[3] & 0x0F) as u32) << 16) | ((frame[4] as u32) << 8) | frame[5] as u32;

        Ok(Aht20Measurement {
            temperature_c: (temperature_code as f32 / FULL_SCALE) * 200.0 - 50.0,
            humidity_pct: (humidity_code as f32 / FULL_SCALE) * 100.0,
        })
    }
}
