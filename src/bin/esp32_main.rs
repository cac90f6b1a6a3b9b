//! ESP32-C3 SuperMini SmartBoard sensor firmware.
//!
//! This is the main entry point for an analog sensor board. It:
//! - Connects to WiFi and binds the game server UDP port
//! - Calibrates all HAL sensors at start-up
//! - Scans the board continuously and pushes a status update to the
//!   registered listener whenever a sensor changes
//! - Handles one inbound command per loop (listener registration, LED
//!   colours, brightness, recalibration)
//!
//! # Build
//!
//! ```bash
//! WIFI_SSID=... WIFI_PASSWORD=... BOARD_ROTATION=90 DEVICE_NAME=tavern \
//!     cargo build --release --features wifi --bin esp32_main
//! ```

use esp_idf_hal::adc::oneshot::AdcDriver;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::prelude::*;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{debug, info, warn};
use smartboard::traits::RejoinSchedule;
use std::time::Instant;
use smartboard::expander::Pcf8575;
use smartboard::hal::esp32::{read_mac, Esp32Analog, Esp32Pixels, Esp32Udp, Esp32Wifi};
use smartboard::{
    BoardConfig, BoardController, BoardScanner, Config, DeviceConfig, DeviceId, NetworkConfig,
    Rotation, SectorReader, WifiConfig,
};

/// Board side length (fields per row).
const SIDE: usize = 6;

/// Pause between loop iterations, keeps the idle task fed.
const LOOP_INTERVAL_MS: u32 = 1;

fn main() -> anyhow::Result<()> {
    // Initialize ESP-IDF
    esp_idf_hal::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    info!("================================");
    info!("  SmartBoard sensor firmware");
    info!("================================");

    // =========================================================================
    // Configuration
    // =========================================================================
    let rotation = option_env!("BOARD_ROTATION")
        .and_then(Rotation::from_degrees_text)
        .unwrap_or_default();
    let config = Config::default()
        .with_wifi(
            WifiConfig::default()
                .with_ssid(option_env!("WIFI_SSID").unwrap_or(""))
                .with_password(option_env!("WIFI_PASSWORD").unwrap_or("")),
        )
        .with_board(BoardConfig::default().with_rotation(rotation))
        .with_network(NetworkConfig::default())
        .with_device(
            DeviceConfig::default().with_name(option_env!("DEVICE_NAME").unwrap_or("smartboard")),
        );

    let peripherals = Peripherals::take()?;

    // =========================================================================
    // Network
    // =========================================================================
    if !config.wifi.is_configured() {
        anyhow::bail!("WiFi not configured (set WIFI_SSID/WIFI_PASSWORD)");
    }
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let mut wifi = Esp32Wifi::new(peripherals.modem, sysloop, Some(nvs), &config.wifi)?;
    info!("[OK] WiFi connected: {:?}", wifi.ip_addr());

    let transport = Esp32Udp::bind(config.network.udp_port)?;
    let device = DeviceId::from_mac(read_mac()?);
    info!("[OK] Device '{}' id {}", config.device.name, device);

    // =========================================================================
    // Sensor path: PCF8575 on I2C, multiplexer output on GPIO4
    // =========================================================================
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio8, // SDA
        peripherals.pins.gpio9, // SCL
        &I2cConfig::new().baudrate(400.kHz().into()),
    )?;
    let expander = Pcf8575::new(config.board.expander_address).attach(i2c);

    let adc1 = AdcDriver::new(peripherals.adc1)?;
    let analog = Esp32Analog::new(&adc1, peripherals.pins.gpio4)?;

    let reader = SectorReader::new(expander, analog, FreeRtos)
        .with_settle_ms(config.sensor.group_settle_ms);
    info!("[OK] Sensor path initialized (GPIO8/9 I2C, GPIO4 ADC)");

    // =========================================================================
    // LEDs (WS2812 on GPIO5)
    // =========================================================================
    let pixels = Esp32Pixels::new(peripherals.rmt.channel0, peripherals.pins.gpio5, SIDE * SIDE)?;
    info!("[OK] LED strip initialized (GPIO5 RMT)");

    // =========================================================================
    // Controller
    // =========================================================================
    let scanner: BoardScanner<_, SIDE> =
        BoardScanner::new(reader, config.board.rotation, config.sensor.clone());
    let mut controller = BoardController::new(scanner, pixels, transport, device);

    info!("Calibrating ({} degrees)...", config.board.rotation.degrees());
    let report = controller.start(config.board.led_brightness);
    if report.bus_faults > 0 {
        warn!("Calibration saw {} bus faults", report.bus_faults);
    }
    debug!("\n{}", controller.grid().summary());
    info!("Waiting for a listener on port {}", config.network.udp_port);

    // =========================================================================
    // Main Loop
    // =========================================================================
    let boot = Instant::now();
    let uptime_ms = || u64::try_from(boot.elapsed().as_millis()).unwrap_or(u64::MAX);
    let mut rejoin = RejoinSchedule::new(config.wifi.rejoin_interval_ms);
    let mut online = true;
    loop {
        let tick = controller.tick();

        if let Some(change) = tick.scan.change {
            debug!(
                "({}|{}) {:?} -> {}",
                change.column, change.row, change.direction, change.enabled
            );
        }

        match tick.command {
            Some(Ok(outcome)) => info!("Command handled: {:?}", outcome),
            Some(Err(e)) => warn!("Dropped packet: {}", e),
            None => {}
        }

        // Scanning continues offline; a rejoin round blocks until its retry
        // budget is spent, so rounds are spaced by the rejoin interval
        if !wifi.is_connected() {
            if online {
                warn!("WiFi connection lost, rejoining");
            }
            if rejoin.is_due(uptime_ms()) {
                if let Err(e) = wifi.reconnect() {
                    warn!(
                        "Rejoin failed: {:?}, next round in {} ms",
                        e, config.wifi.rejoin_interval_ms
                    );
                }
                rejoin.record_attempt(uptime_ms());
            }
        }
        let connected = wifi.is_connected();
        if connected && !online {
            info!("WiFi connection restored");
            rejoin.reset();
        }
        online = connected;

        FreeRtos::delay_ms(LOOP_INTERVAL_MS);
    }
}
