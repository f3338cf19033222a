//! Warning Badge Firmware — Main Entry Point
//!
//! Cloud-synchronised SAFE/ALARM badge.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  WifiAdapter    MqttAdapter    SystemClock    StatusDisplay     │
//! │  (LinkPort)     (BrokerPort)   (ClockPort)    (DisplayPort)     │
//! │  LogEventSink   CertStore      BleAdvertiser  system::restart   │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              BadgeService (pure logic)                 │    │
//! │  │  Transport · Session · Router · Telemetry · State      │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::{Context, Result};
use log::{error, info};

use esp_idf_hal::prelude::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};

use warnbadge::adapters::ble::BleAdvertiser;
use warnbadge::adapters::cert_store::CertStore;
use warnbadge::adapters::display::StatusDisplay;
use warnbadge::adapters::log_sink::LogEventSink;
use warnbadge::adapters::mqtt::{MqttAdapter, MqttSettings};
use warnbadge::adapters::system;
use warnbadge::adapters::time::SystemClock;
use warnbadge::adapters::wifi::WifiAdapter;
use warnbadge::app::service::BadgeService;
use warnbadge::config::BadgeConfig;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Warning Badge v{}                ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = BadgeConfig::default();
    config.validate().map_err(|e| anyhow::anyhow!("config: {e}"))?;
    let thing_name = config.thing_name().map_err(|e| anyhow::anyhow!("config: {e}"))?;
    let badge_label = config
        .advertised_name()
        .map_err(|e| anyhow::anyhow!("config: {e}"))?;
    info!("Badge: {} ({})", thing_name, badge_label);

    // ── 3. Credentials ────────────────────────────────────────
    CertStore::mount_flash().map_err(|e| anyhow::anyhow!("{e}"))?;
    let credentials = CertStore::new(&config.certificate_path, &config.private_key_path)
        .load()
        .map_err(|e| anyhow::anyhow!("credentials: {e}"))?;

    // ── 4. Platform services ──────────────────────────────────
    // Bluedroid keeps its config store in NVS, so NVS comes up first.
    let peripherals = Peripherals::take().context("peripherals already taken")?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    // ── 5. Presence advertising (fire-and-forget) ─────────────
    let mut ble = BleAdvertiser::new(
        badge_label.clone(),
        config.ble_service_uuid,
        config.ble_advertising_interval_ms,
    );
    ble.start();

    // ── 6. Adapters ───────────────────────────────────────────
    let esp_wifi = EspWifi::new(peripherals.modem, sys_loop.clone(), Some(nvs))?;
    let mut wifi = WifiAdapter::new(BlockingWifi::wrap(esp_wifi, sys_loop)?);
    wifi.set_credentials(&config.wifi_ssid, &config.wifi_password)
        .map_err(|e| anyhow::anyhow!("wifi: {e}"))?;

    let mqtt = MqttAdapter::new(MqttSettings {
        url: config.broker_url().map_err(|e| anyhow::anyhow!("config: {e}"))?,
        client_id: thing_name,
        keepalive_secs: config.keepalive_secs,
        handshake_timeout_ms: config.handshake_timeout_ms,
    });

    let mut clock = SystemClock::new();
    let mut display = StatusDisplay::new(badge_label);
    let mut sink = LogEventSink::new();

    // ── 7. Bring-up and steady loop ───────────────────────────
    let mut badge = BadgeService::new(&config, wifi, mqtt, credentials)
        .map_err(|e| anyhow::anyhow!("config: {e}"))?;

    if let Err(e) = badge.start(&mut clock, &mut sink) {
        // Only link configuration errors get here.
        error!("Bring-up failed: {}, restarting", e);
        system::restart();
    }

    badge.run_until_restart(&mut display, &mut clock, &mut sink);

    // ── 8. Scheduled restart ──────────────────────────────────
    system::restart();
}
