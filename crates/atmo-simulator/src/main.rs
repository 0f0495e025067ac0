//! Desktop simulator for the atmo-rs weather station core.
//!
//! Stands a register-level simulation of the BMP280 and AHT20 behind the
//! same bus trait the firmware uses, then runs the real acquisition
//! pipeline against it: calibration load, trigger/settle/read cycles,
//! integer compensation, averaging, and altitude derivation. Reports are
//! logged once per second so the pipeline can be watched without
//! hardware.

use std::convert::Infallible;
use std::thread;
use std::time::Duration;

use embassy_futures::block_on;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{ErrorType, I2c, Operation};
use log::{info, warn};

use atmo_core::sensors::aht20::AHT20_ADDRESS;
use atmo_core::sensors::bmp280::BMP280_ADDRESS;
use atmo_core::sensors::{Aht20, Bmp280};
use atmo_core::shared_i2c::SharedI2cDevice;
use atmo_core::{StationConfig, WeatherStation};

/// Interval between reports, matching the firmware's main loop.
const REPORT_INTERVAL: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// Simulated devices
// ---------------------------------------------------------------------------

/// Manufacturer worked-example coefficients, in register layout.
const CALIBRATION: [u8; 24] = [
    0x70, 0x6B, 0x43, 0x67, 0x18, 0xFC, 0x7D, 0x8E, 0x43, 0xD6, 0xD0, 0x0B, 0x27, 0x0B, 0x8C,
    0x00, 0xF9, 0xFF, 0x8C, 0x3C, 0xF8, 0xC6, 0x70, 0x17,
];

const REG_CHIP_ID: u8 = 0xD0;
const REG_CTRL_MEAS: u8 = 0xF4;
const REG_PRESSURE_DATA: u8 = 0xF7;
const REG_TEMP_DATA: u8 = 0xFA;
const REG_CALIBRATION: u8 = 0x88;

const CTRL_MEASURE_TEMPERATURE: u8 = 0x2E;

/// Generates slowly drifting raw ADC codes around the worked-example
/// operating point, so compensated output wanders over plausible
/// indoor values.
struct SimulatedSensors {
    /// Completed acquisition rounds, advanced on each temperature
    /// trigger.
    rounds: u32,
}

impl SimulatedSensors {
    fn new() -> Self {
        Self { rounds: 0 }
    }

    fn phase(&self) -> f32 {
        self.rounds as f32 / 16.0
    }

    fn temperature_adc(&self) -> u32 {
        (0x7EED0 as f32 + 2400.0 * self.phase().sin()) as u32
    }

    fn pressure_adc(&self) -> u32 {
        (0x655AC as f32 + 1600.0 * (self.phase() / 3.0).cos()) as u32
    }

    fn humidity_code(&self) -> u32 {
        // 45-65 %RH band
        ((0.55 + 0.10 * (self.phase() / 2.0).sin()) * 1_048_576.0) as u32
    }

    fn hygrometer_temperature_code(&self) -> u32 {
        // 20-25 degC band
        ((((22.5 + 2.5 * self.phase().cos()) + 50.0) / 200.0) * 1_048_576.0) as u32
    }
}

/// Register-level bus simulation for both devices.
struct SimulatedBus {
    sensors: SimulatedSensors,
    selected_register: Option<u8>,
}

impl SimulatedBus {
    fn new() -> Self {
        Self {
            sensors: SimulatedSensors::new(),
            selected_register: None,
        }
    }

    fn fill_bmp280(&self, register: u8, buffer: &mut [u8]) {
        match register {
            REG_CHIP_ID => buffer[0] = 0x58,
            REG_CALIBRATION => buffer.copy_from_slice(&CALIBRATION),
            REG_TEMP_DATA => encode_adc(self.sensors.temperature_adc(), buffer),
            REG_PRESSURE_DATA => encode_adc(self.sensors.pressure_adc(), buffer),
            _ => buffer.fill(0),
        }
    }

    fn fill_aht20(&self, buffer: &mut [u8]) {
        let humidity = self.sensors.humidity_code();
        let temperature = self.sensors.hygrometer_temperature_code();
        buffer.copy_from_slice(&[
            0x18,
            (humidity >> 12) as u8,
            (humidity >> 4) as u8,
            (((humidity & 0x0F) as u8) << 4) | ((temperature >> 16) as u8 & 0x0F),
            (temperature >> 8) as u8,
            temperature as u8,
        ]);
    }
}

/// Pack a 20-bit ADC code into the device's 3-byte, 4-bit-left-shifted
/// data register layout.
fn encode_adc(code: u32, buffer: &mut [u8]) {
    let shifted = code << 4;
    buffer[0] = (shifted >> 16) as u8;
    buffer[1] = (shifted >> 8) as u8;
    buffer[2] = shifted as u8;
}

impl ErrorType for SimulatedBus {
    type Error = Infallible;
}

impl I2c for SimulatedBus {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        for operation in operations.iter_mut() {
            match operation {
                Operation::Write(bytes) => {
                    if address == BMP280_ADDRESS {
                        if bytes.len() == 2 && bytes[0] == REG_CTRL_MEAS {
                            if bytes[1] == CTRL_MEASURE_TEMPERATURE {
                                self.sensors.rounds += 1;
                            }
                        } else if bytes.len() == 1 {
                            self.selected_register = Some(bytes[0]);
                        }
                    }
                    // AHT20 triggers need no bookkeeping.
                }
                Operation::Read(buffer) => {
                    if address == BMP280_ADDRESS {
                        if let Some(register) = self.selected_register.take() {
                            self.fill_bmp280(register, buffer);
                        }
                    } else if address == AHT20_ADDRESS {
                        self.fill_aht20(buffer);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Real-time delay so the simulated settle timing matches hardware.
struct StdDelay;

impl DelayNs for StdDelay {
    async fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(ns as u64));
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let bus: Mutex<CriticalSectionRawMutex, _> = Mutex::new(SimulatedBus::new());
    let mut station = WeatherStation::new(
        Bmp280::new(SharedI2cDevice::new(&bus), StdDelay),
        Aht20::new(SharedI2cDevice::new(&bus), StdDelay),
        StationConfig::default(),
    );

    block_on(station.init()).expect("simulated barometer always initializes");
    info!("Simulator running; one report per second. Ctrl-C to quit.");

    loop {
        match block_on(station.report()) {
            Ok(report) => {
                info!(
                    "BMP280: temperature = {:.2} C, pressure = {:.2} hPa",
                    report.barometer_temperature_c, report.pressure_hpa
                );
                info!(
                    "AHT20: temperature = {:.2} C, humidity = {:.2} %",
                    report.hygrometer_temperature_c, report.humidity_pct
                );
                info!("Altitude = {:.2} m", report.altitude_m);
            }
            Err(e) => warn!("sensor cycle failed: {e}"),
        }
        thread::sleep(REPORT_INTERVAL);
    }
}
