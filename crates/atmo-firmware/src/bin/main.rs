#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]

use atmo_core::sensors::{Aht20, Bmp280};
use atmo_core::shared_i2c::SharedI2cDevice;
use atmo_core::{StationConfig, WeatherStation};
use atmo_firmware::wifi_secrets::{WIFI_PASSWORD, WIFI_SSID};
use embassy_executor::Spawner;
use embassy_net::StackResources;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::{Duration, Timer};
use esp_hal::Async;
use esp_hal::clock::CpuClock;
use esp_hal::gpio::{Level, Output, OutputConfig};
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::rng::Rng;
use esp_hal::timer::timg::TimerGroup;
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController, WifiDevice, WifiEvent, WifiState};
use log::{info, warn};
use static_cell::StaticCell;

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
esp_bootloader_esp_idf::esp_app_desc!();

static I2C_BUS: StaticCell<Mutex<CriticalSectionRawMutex, I2c<'static, Async>>> = StaticCell::new();
static NET_RESOURCES: StaticCell<StackResources<3>> = StaticCell::new();

#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 73744);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("Embassy initialized");

    // Status LEDs stay dark until the network is up.
    let mut network_led = Output::new(peripherals.GPIO12, Level::Low, OutputConfig::default());
    let _activity_led = Output::new(peripherals.GPIO13, Level::Low, OutputConfig::default());

    let mut rng = Rng::new();
    let net_seed = ((rng.random() as u64) << 32) | rng.random() as u64;

    let radio_init = esp_radio::init().expect("Failed to initialize Wi-Fi/BLE controller");
    let (wifi_controller, interfaces) =
        esp_radio::wifi::new(&radio_init, peripherals.WIFI, Default::default())
            .expect("Failed to initialize Wi-Fi controller");

    let (stack, runner) = embassy_net::new(
        interfaces.sta,
        embassy_net::Config::dhcpv4(Default::default()),
        NET_RESOURCES.init(StackResources::new()),
        net_seed,
    );

    spawner.spawn(wifi_connection(wifi_controller)).unwrap();
    spawner.spawn(net_task(runner)).unwrap();

    stack.wait_config_up().await;
    if let Some(net_config) = stack.config_v4() {
        info!("WiFi connected successfully");
        info!("IP address: {}", net_config.address);
    }
    network_led.set_high();
    Timer::after(Duration::from_secs(1)).await;
    network_led.set_low();

    // Both sensors share the one I2C bus.
    let i2c = I2c::new(peripherals.I2C0, I2cConfig::default())
        .expect("Failed to initialize I2C bus")
        .with_sda(peripherals.GPIO4)
        .with_scl(peripherals.GPIO5)
        .into_async();
    let i2c_bus = I2C_BUS.init(Mutex::new(i2c));

    let mut station = WeatherStation::new(
        Bmp280::new(SharedI2cDevice::new(i2c_bus), embassy_time::Delay),
        Aht20::new(SharedI2cDevice::new(i2c_bus), embassy_time::Delay),
        StationConfig::default(),
    );

    // The core never retries; reconnect policy lives out here.
    while let Err(e) = station.init().await {
        warn!("barometer init failed ({e}), retrying");
        Timer::after(Duration::from_secs(1)).await;
    }

    loop {
        match station.report().await {
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
        Timer::after(Duration::from_secs(1)).await;
    }
}

/// Keeps the station associated: (re)starts the controller, connects,
/// and retries with a delay after every disconnect or failure.
#[embassy_executor::task]
async fn wifi_connection(mut controller: WifiController<'static>) {
    loop {
        if esp_radio::wifi::sta_state() == WifiState::StaConnected {
            controller.wait_for_event(WifiEvent::StaDisconnected).await;
            Timer::after(Duration::from_millis(5000)).await;
        }
        if !matches!(controller.is_started(), Ok(true)) {
            let client_config = ModeConfig::Client(
                ClientConfig::default()
                    .with_ssid(WIFI_SSID.into())
                    .with_password(WIFI_PASSWORD.into()),
            );
            controller
                .set_config(&client_config)
                .expect("Invalid WiFi configuration");
            controller
                .start_async()
                .await
                .expect("Failed to start WiFi controller");
        }
        match controller.connect_async().await {
            Ok(()) => info!("WiFi association established"),
            Err(e) => {
                warn!("WiFi connect failed: {:?}, retrying in 5s", e);
                Timer::after(Duration::from_millis(5000)).await;
            }
        }
    }
}

#[embassy_executor::task]
async fn net_task(mut runner: embassy_net::Runner<'static, WifiDevice<'static>>) -> ! {
    runner.run().await
}
