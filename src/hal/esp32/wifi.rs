//! Station-mode WiFi for the sensor board.
//!
//! The board is useless without a network path to the game server, so
//! [`Esp32Wifi::new`] blocks until the station has an address (or the retry
//! budget is spent) and [`Esp32Wifi::reconnect`] lets the main loop recover
//! after the access point drops us.
//!
//! ```ignore
//! use smartboard::config::WifiConfig;
//! use smartboard::hal::esp32::Esp32Wifi;
//!
//! let config = WifiConfig::default().with_ssid("Tavern").with_password("dragon");
//! let wifi = Esp32Wifi::new(modem, sysloop, Some(nvs), &config)?;
//! log::info!("board reachable at {:?}", wifi.ip_addr());
//! ```

use crate::config::WifiConfig;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, ClientConfiguration, Configuration, EspWifi};
use log::{info, warn};
use std::net::Ipv4Addr;

/// Station connection kept alive for the lifetime of the firmware.
pub struct Esp32Wifi<'a> {
    wifi: BlockingWifi<EspWifi<'a>>,
    max_retries: u8,
    retry_delay_ms: u32,
}

fn client_configuration(config: &WifiConfig) -> Configuration {
    // esp-idf limits: 32 byte SSID, 64 byte passphrase
    let mut ssid: heapless::String<32> = heapless::String::new();
    let _ = ssid.push_str(config.ssid.as_str());
    let mut password: heapless::String<64> = heapless::String::new();
    let _ = password.push_str(config.password.as_str());

    Configuration::Client(ClientConfiguration {
        ssid,
        password,
        ..Default::default()
    })
}

impl<'a> Esp32Wifi<'a> {
    /// Starts the station and connects to `config.ssid`.
    ///
    /// # Errors
    ///
    /// Driver set-up failures, or the last connect error once
    /// `config.max_retries` attempts failed (0 retries forever).
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
        config: &WifiConfig,
    ) -> anyhow::Result<Self> {
        let driver = EspWifi::new(modem, sysloop.clone(), nvs)?;
        let mut wifi = BlockingWifi::wrap(driver, sysloop)?;
        wifi.set_configuration(&client_configuration(config))?;
        wifi.start()?;
        info!("[WiFi] Station started, joining '{}'", config.ssid);

        let mut station = Self {
            wifi,
            max_retries: config.max_retries,
            retry_delay_ms: config.retry_delay_ms,
        };
        station.reconnect()?;
        Ok(station)
    }

    /// Joins the configured network again and waits for DHCP.
    ///
    /// # Errors
    ///
    /// The last connect or DHCP error after the retry budget is spent.
    pub fn reconnect(&mut self) -> anyhow::Result<()> {
        let mut attempt: u8 = 0;
        loop {
            attempt = attempt.saturating_add(1);
            match self.wifi.connect().and_then(|_| self.wifi.wait_netif_up()) {
                Ok(()) => break,
                Err(e) if self.max_retries == 0 || attempt < self.max_retries => {
                    warn!("[WiFi] Attempt {} failed: {:?}", attempt, e);
                    FreeRtos::delay_ms(self.retry_delay_ms);
                }
                Err(e) => return Err(e.into()),
            }
        }

        match self.ip_addr() {
            Some(ip) => info!("[WiFi] Joined after {} attempt(s), IP {}", attempt, ip),
            None => info!("[WiFi] Joined after {} attempt(s)", attempt),
        }
        Ok(())
    }

    /// Station address, if DHCP has assigned one.
    pub fn ip_addr(&self) -> Option<Ipv4Addr> {
        self.wifi
            .wifi()
            .sta_netif()
            .get_ip_info()
            .ok()
            .map(|info| info.ip)
    }

    /// Returns true while associated with the access point.
    pub fn is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }
}
