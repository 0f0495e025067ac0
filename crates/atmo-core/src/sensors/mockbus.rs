//! Scripted in-memory bus used by the driver tests.
//!
//! Models just enough of the two devices for the core to run against:
//! register reads on the BMP280 side, raw command/frame exchanges on
//! the AHT20 side, and a switch that NACKs every transaction.

use core::cell::RefCell;

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{self, ErrorType, I2c, Operation};

use crate::sensors::aht20::AHT20_ADDRESS;
use crate::sensors::bmp280::{
    BMP280_ADDRESS, REG_CALIBRATION, REG_CHIP_ID, REG_CTRL_MEAS, REG_PRESSURE_DATA, REG_TEMP_DATA,
};

/// Manufacturer worked-example coefficient set, serialized in the
/// device's little-endian register layout.
pub const DATASHEET_CALIBRATION: [u8; 24] = [
    0x70, 0x6B, 0x43, 0x67, 0x18, 0xFC, 0x7D, 0x8E, 0x43, 0xD6, 0xD0, 0x0B, 0x27, 0x0B, 0x8C,
    0x00, 0xF9, 0xFF, 0x8C, 0x3C, 0xF8, 0xC6, 0x70, 0x17,
];

/// Temperature data registers for ADC code 0x7EED0 (25.08 °C under the
/// datasheet coefficients).
pub const RAW_TEMPERATURE_25_08C: [u8; 3] = [0x7E, 0xED, 0x00];

/// Pressure data registers for ADC code 0x655AC (1006.5325 hPa at the
/// matching fine temperature).
pub const RAW_PRESSURE_DATASHEET: [u8; 3] = [0x65, 0x5A, 0xC0];

/// Build a 6-byte AHT20 frame from the two 20-bit codes.
pub fn aht20_frame(humidity_code: u32, temperature_code: u32) -> [u8; 6] {
    [
        0x18, // status: calibrated, not busy
        (humidity_code >> 12) as u8,
        (humidity_code >> 4) as u8,
        (((humidity_code & 0x0F) as u8) << 4) | ((temperature_code >> 16) as u8 & 0x0F),
        (temperature_code >> 8) as u8,
        temperature_code as u8,
    ]
}

/// Register-level state for both simulated devices.
pub struct BusState {
    pub chip_id: u8,
    pub calibration: [u8; 24],
    pub temperature: [u8; 3],
    pub pressure: [u8; 3],
    pub aht20_frame: [u8; 6],
    /// Control codes written to CTRL_MEAS, in order.
    pub ctrl_meas_writes: Vec<u8>,
    /// Trigger commands received by the AHT20.
    pub aht20_triggers: Vec<[u8; 3]>,
    /// When set, every transaction NACKs.
    pub unreachable: bool,
}

impl BusState {
    pub fn new() -> Self {
        Self {
            chip_id: 0x58,
            calibration: DATASHEET_CALIBRATION,
            temperature: RAW_TEMPERATURE_25_08C,
            pressure: RAW_PRESSURE_DATASHEET,
            aht20_frame: aht20_frame(1 << 19, 1 << 19),
            ctrl_meas_writes: Vec::new(),
            aht20_triggers: Vec::new(),
            unreachable: false,
        }
    }
}

/// Bus handle. Both drivers in a test share one underlying [`BusState`].
pub struct MockBus<'a> {
    state: &'a RefCell<BusState>,
}

impl<'a> MockBus<'a> {
    pub fn new(state: &'a RefCell<BusState>) -> Self {
        Self { state }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockBusError;

impl i2c::Error for MockBusError {
    fn kind(&self) -> i2c::ErrorKind {
        i2c::ErrorKind::NoAcknowledge(i2c::NoAcknowledgeSource::Address)
    }
}

impl ErrorType for MockBus<'_> {
    type Error = MockBusError;
}

impl I2c for MockBus<'_> {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.unreachable {
            return Err(MockBusError);
        }

        // A one-byte write followed by a read within the same
        // transaction behaves like the device's register addressing.
        let mut selected_register: Option<u8> = None;
        for operation in operations.iter_mut() {
            match operation {
                Operation::Write(bytes) => match address {
                    BMP280_ADDRESS => {
                        if bytes.len() == 2 && bytes[0] == REG_CTRL_MEAS {
                            state.ctrl_meas_writes.push(bytes[1]);
                        } else if bytes.len() == 1 {
                            selected_register = Some(bytes[0]);
                        } else {
                            return Err(MockBusError);
                        }
                    }
                    AHT20_ADDRESS => {
                        if bytes.len() == 3 {
                            state.aht20_triggers.push([bytes[0], bytes[1], bytes[2]]);
                        } else {
                            return Err(MockBusError);
                        }
                    }
                    _ => return Err(MockBusError),
                },
                Operation::Read(buffer) => match address {
                    BMP280_ADDRESS => {
                        let register = selected_register.take().ok_or(MockBusError)?;
                        fill_bmp280_registers(&state, register, buffer)?;
                    }
                    AHT20_ADDRESS => buffer.copy_from_slice(&state.aht20_frame),
                    _ => return Err(MockBusError),
                },
            }
        }
        Ok(())
    }
}

fn fill_bmp280_registers(
    state: &BusState,
    register: u8,
    buffer: &mut [u8],
) -> Result<(), MockBusError> {
    match register {
        REG_CHIP_ID => buffer[0] = state.chip_id,
        REG_CALIBRATION => buffer.copy_from_slice(&state.calibration),
        REG_TEMP_DATA => buffer.copy_from_slice(&state.temperature),
        REG_PRESSURE_DATA => buffer.copy_from_slice(&state.pressure),
        _ => return Err(MockBusError),
    }
    Ok(())
}

/// Settle delays are irrelevant against the scripted bus.
pub struct NoopDelay;

impl DelayNs for NoopDelay {
    async fn delay_ns(&mut self, _ns: u32) {}
}
