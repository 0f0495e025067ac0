//! BMP280 barometric pressure/temperature driver.
//!
//! Operates the sensor in forced (one-shot) mode: every reading writes a
//! measurement control code, waits out the conversion, then reads the
//! data registers. Compensation follows the manufacturer's integer
//! reference formulas with 64-bit intermediates.

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use log::{info, warn};

use super::SensorError;

/// Fixed I2C address (SDO pulled high).
pub const BMP280_ADDRESS: u8 = 0x77;

pub(crate) const REG_CHIP_ID: u8 = 0xD0;
pub(crate) const REG_CTRL_MEAS: u8 = 0xF4;
pub(crate) const REG_PRESSURE_DATA: u8 = 0xF7;
pub(crate) const REG_TEMP_DATA: u8 = 0xFA;
pub(crate) const REG_CALIBRATION: u8 = 0x88;

const CHIP_ID: u8 = 0x58;

/// One-shot control codes: oversampling x1, forced mode.
const CTRL_MEASURE_TEMPERATURE: u8 = 0x2E;
const CTRL_MEASURE_PRESSURE: u8 = 0x34;

/// Conversion settle time after triggering a one-shot measurement.
/// Reading the data registers earlier yields stale or partial data.
const SETTLE_DELAY_MS: u32 = 5;

/// Factory compensation coefficients, read once from the 24-byte
/// calibration region at startup and immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calibration {
    dig_t1: u16,
    dig_t2: i16,
    dig_t3: i16,
    dig_p1: u16,
    dig_p2: i16,
    dig_p3: i16,
    dig_p4: i16,
    dig_p5: i16,
    dig_p6: i16,
    dig_p7: i16,
    dig_p8: i16,
    dig_p9: i16,
}

impl Calibration {
    /// Decode the little-endian, mixed signed/unsigned register layout:
    /// one unsigned and two signed 16-bit words for temperature, then
    /// one unsigned and eight signed 16-bit words for pressure.
    pub fn from_bytes(raw: &[u8; 24]) -> Self {
        Self {
            dig_t1: u16::from_le_bytes([raw[0], raw[1]]),
            dig_t2: i16::from_le_bytes([raw[2], raw[3]]),
            dig_t3: i16::from_le_bytes([raw[4], raw[5]]),
            dig_p1: u16::from_le_bytes([raw[6], raw[7]]),
            dig_p2: i16::from_le_bytes([raw[8], raw[9]]),
            dig_p3: i16::from_le_bytes([raw[10], raw[11]]),
            dig_p4: i16::from_le_bytes([raw[12], raw[13]]),
            dig_p5: i16::from_le_bytes([raw[14], raw[15]]),
            dig_p6: i16::from_le_bytes([raw[16], raw[17]]),
            dig_p7: i16::from_le_bytes([raw[18], raw[19]]),
            dig_p8: i16::from_le_bytes([raw[20], raw[21]]),
            dig_p9: i16::from_le_bytes([raw[22], raw[23]]),
        }
    }
}

/// One temperature/pressure pair from a single acquisition cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bmp280Measurement {
    pub temperature_c: f32,
    pub pressure_hpa: f32,
}

/// BMP280 driver, generic over the bus and delay it is handed.
pub struct Bmp280<I2C, D> {
    i2c: I2C,
    delay: D,
    calibration: Option<Calibration>,
    /// Fine temperature from the current cycle's temperature
    /// compensation; consumed by the pressure compensation step.
    t_fine: Option<i32>,
}

impl<I2C: I2c, D: DelayNs> Bmp280<I2C, D> {
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self {
            i2c,
            delay,
            calibration: None,
            t_fine: None,
        }
    }

    /// Probe the chip and load the factory calibration coefficients.
    ///
    /// Must run once before any compensation call; the coefficients are
    /// never re-read afterwards.
    pub async fn init(&mut self) -> Result<(), SensorError> {
        let mut id = [0u8; 1];
        self.i2c
            .write_read(BMP280_ADDRESS, &[REG_CHIP_ID], &mut id)
            .await
            .map_err(|_| SensorError::DeviceUnreachable)?;
        if id[0] == CHIP_ID {
            info!("BMP280 found, chip id 0x{:02X}", id[0]);
        } else {
            warn!("unexpected BMP280 chip id 0x{:02X}", id[0]);
        }

        let mut raw = [0u8; 24];
        self.i2c
            .write_read(BMP280_ADDRESS, &[REG_CALIBRATION], &mut raw)
            .await
            .map_err(|_| SensorError::DeviceUnreachable)?;
        self.calibration = Some(Calibration::from_bytes(&raw));
        Ok(())
    }

    /// Trigger a one-shot temperature measurement, wait out the
    /// conversion, and return the compensated temperature in °C.
    ///
    /// Also computes the fine-temperature intermediate required by
    /// [`read_pressure`](Self::read_pressure) in the same cycle.
    pub async fn read_temperature(&mut self) -> Result<f32, SensorError> {
        let cal = self.calibration.ok_or(SensorError::NotCalibrated)?;
        let adc = self
            .trigger_and_read(CTRL_MEASURE_TEMPERATURE, REG_TEMP_DATA)
            .await?;
        let (centi_celsius, t_fine) = compensate_temperature(adc, &cal);
        self.t_fine = Some(t_fine);
        Ok(centi_celsius as f32 / 100.0)
    }

    /// Trigger a one-shot pressure measurement, wait out the conversion,
    /// and return the compensated pressure in hPa.
    ///
    /// Consumes the fine temperature stored by
    /// [`read_temperature`](Self::read_temperature): every pressure read
    /// must be preceded by a temperature read within the same acquisition
    /// cycle, and a stale intermediate is never reused.
    pub async fn read_pressure(&mut self) -> Result<f32, SensorError> {
        let cal = self.calibration.ok_or(SensorError::NotCalibrated)?;
        let t_fine = self.t_fine.take().ok_or(SensorError::NotCalibrated)?;
        let adc = self
            .trigger_and_read(CTRL_MEASURE_PRESSURE, REG_PRESSURE_DATA)
            .await?;
        let pressure_q8 = compensate_pressure(adc, t_fine, &cal)?;
        // Compensation output is Pa scaled by 256; a single /25600
        // divisor folds the /256 to Pa and /100 to hPa.
        Ok(pressure_q8 as f32 / 25600.0)
    }

    /// One full acquisition cycle, temperature first.
    pub async fn measure(&mut self) -> Result<Bmp280Measurement, SensorError> {
        let temperature_c = self.read_temperature().await?;
        let pressure_hpa = self.read_pressure().await?;
        Ok(Bmp280Measurement {
            temperature_c,
            pressure_hpa,
        })
    }

    async fn trigger_and_read(&mut self, control: u8, data_reg: u8) -> Result<u32, SensorError> {
        self.i2c
            .write(BMP280_ADDRESS, &[REG_CTRL_MEAS, control])
            .await
            .map_err(|_| SensorError::DeviceUnreachable)?;
        self.delay.delay_ms(SETTLE_DELAY_MS).await;

        let mut raw = [0u8; 3];
        self.i2c
            .write_read(BMP280_ADDRESS, &[data_reg], &mut raw)
            .await
            .map_err(|_| SensorError::DeviceUnreachable)?;
        Ok((((raw[0] as u32) << 16) | ((raw[1] as u32) << 8) | raw[2] as u32) >> 4)
    }
}

/// Integer temperature compensation per the reference formula.
///
/// Returns the temperature in hundredths of a degree together with the
/// fine-temperature intermediate the pressure formula depends on.
fn compensate_temperature(adc_t: u32, cal: &Calibration) -> (i32, i32) {
    let adc_t = adc_t as i32;
    let dig_t1 = cal.dig_t1 as i32;
    let var1 = (((adc_t >> 3) - (dig_t1 << 1)) * (cal.dig_t2 as i32)) >> 11;
    let var2 = (((((adc_t >> 4) - dig_t1) * ((adc_t >> 4) - dig_t1)) >> 12) * (cal.dig_t3 as i32))
        >> 14;
    let t_fine = var1 + var2;
    ((t_fine * 5 + 128) >> 8, t_fine)
}

/// Integer pressure compensation with 64-bit intermediates.
///
/// Returns the pressure in Pa scaled by 256, or `InvalidPressure` when
/// the divisor evaluates to zero. A zero divisor means the sensor is not
/// ready; it must surface as a distinguishable failure, never as a
/// numeric zero pressure.
fn compensate_pressure(adc_p: u32, t_fine: i32, cal: &Calibration) -> Result<i64, SensorError> {
    let mut var1 = (t_fine as i64) - 128_000;
    let mut var2 = var1 * var1 * (cal.dig_p6 as i64);
    var2 += (var1 * (cal.dig_p5 as i64)) << 17;
    var2 += (cal.dig_p4 as i64) << 35;
    var1 = ((var1 * var1 * (cal.dig_p3 as i64)) >> 8) + ((var1 * (cal.dig_p2 as i64)) << 12);
    var1 = (((1i64 << 47) + var1) * (cal.dig_p1 as i64)) >> 33;
    if var1 == 0 {
        return Err(SensorError::InvalidPressure);
    }

    let mut p = 1_048_576 - (adc_p as i64);
    p = (((p << 31) - var2) * 3125) / var1;
    let var1 = ((cal.dig_p9 as i64) * (p >> 13) * (p >> 13)) >> 25;
    let var2 = ((cal.dig_p8 as i64) * p) >> 19;
    Ok(((p + var1 + var2) >> 8) + ((cal.dig_p7 as i64) << 4))
}

#[cfg(test)]
mod tests {
    use core::cell::RefCell;

    use embassy_futures::block_on;

    use super::*;
    use crate::sensors::mockbus::{BusState, MockBus, NoopDelay, DATASHEET_CALIBRATION};

    fn datasheet_calibration() -> Calibration {
        Calibration::from_bytes(&DATASHEET_CALIBRATION)
    }

    #[test]
    fn decodes_calibration_layout() {
        let cal = datasheet_calibration();
        assert_eq!(cal.dig_t1, 27504);
        assert_eq!(cal.dig_t2, 26435);
        assert_eq!(cal.dig_t3, -1000);
        assert_eq!(cal.dig_p1, 36477);
        assert_eq!(cal.dig_p2, -10685);
        assert_eq!(cal.dig_p3, 3024);
        assert_eq!(cal.dig_p4, 2855);
        assert_eq!(cal.dig_p5, 140);
        assert_eq!(cal.dig_p6, -7);
        assert_eq!(cal.dig_p7, 15500);
        assert_eq!(cal.dig_p8, -14600);
        assert_eq!(cal.dig_p9, 6000);
    }

    #[test]
    fn temperature_matches_reference_worked_example() {
        // ADC 0x7EED0 with the datasheet coefficients compensates to
        // 25.08 °C with a fine temperature of 128422.
        let cal = datasheet_calibration();
        let (centi, t_fine) = compensate_temperature(0x7EED0, &cal);
        assert_eq!(centi, 2508);
        assert_eq!(t_fine, 128422);
    }

    #[test]
    fn pressure_matches_reference_worked_example() {
        // ADC 0x655AC at t_fine 128422 compensates to 25767233 in
        // Pa x 256, i.e. 100653.25 Pa.
        let cal = datasheet_calibration();
        let p = compensate_pressure(0x655AC, 128422, &cal).unwrap();
        assert_eq!(p, 25_767_233);
    }

    #[test]
    fn pressure_is_exact_for_out_of_band_adc_code() {
        let cal = datasheet_calibration();
        let p = compensate_pressure(0x5C579, 128422, &cal).unwrap();
        assert_eq!(p, 27_400_313);
    }

    #[test]
    fn zero_divisor_is_surfaced_not_zeroed() {
        // An all-zero coefficient set forces the divisor to zero.
        let cal = Calibration::from_bytes(&[0u8; 24]);
        assert_eq!(
            compensate_pressure(0x655AC, 0, &cal),
            Err(SensorError::InvalidPressure)
        );
    }

    #[test]
    fn full_cycle_over_the_bus() {
        let state = RefCell::new(BusState::new());
        let mut driver = Bmp280::new(MockBus::new(&state), NoopDelay);

        block_on(driver.init()).unwrap();
        let measurement = block_on(driver.measure()).unwrap();

        assert!((measurement.temperature_c - 25.08).abs() < 1e-4);
        assert!((measurement.pressure_hpa - 1006.5325).abs() < 1e-3);
        // Temperature must be triggered before pressure within the cycle.
        assert_eq!(state.borrow().ctrl_meas_writes, vec![0x2E, 0x34]);
    }

    #[test]
    fn pressure_requires_fresh_temperature() {
        let state = RefCell::new(BusState::new());
        let mut driver = Bmp280::new(MockBus::new(&state), NoopDelay);
        block_on(driver.init()).unwrap();

        // No temperature read yet in this cycle.
        assert_eq!(
            block_on(driver.read_pressure()),
            Err(SensorError::NotCalibrated)
        );

        // A full cycle consumes the intermediate; a second pressure read
        // without a new temperature read is rejected again.
        block_on(driver.measure()).unwrap();
        assert_eq!(
            block_on(driver.read_pressure()),
            Err(SensorError::NotCalibrated)
        );
    }

    #[test]
    fn compensation_before_calibration_is_rejected() {
        let state = RefCell::new(BusState::new());
        let mut driver = Bmp280::new(MockBus::new(&state), NoopDelay);
        assert_eq!(
            block_on(driver.read_temperature()),
            Err(SensorError::NotCalibrated)
        );
    }

    #[test]
    fn bus_failure_maps_to_device_unreachable() {
        let state = RefCell::new(BusState::new());
        state.borrow_mut().unreachable = true;
        let mut driver = Bmp280::new(MockBus::new(&state), NoopDelay);
        assert_eq!(block_on(driver.init()), Err(SensorError::DeviceUnreachable));
    }

    #[test]
    fn zero_divisor_propagates_through_the_driver() {
        let state = RefCell::new(BusState::new());
        state.borrow_mut().calibration = [0u8; 24];
        let mut driver = Bmp280::new(MockBus::new(&state), NoopDelay);
        block_on(driver.init()).unwrap();

        block_on(driver.read_temperature()).unwrap();
        assert_eq!(
            block_on(driver.read_pressure()),
            Err(SensorError::InvalidPressure)
        );
    }
}
