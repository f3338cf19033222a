//! System configuration parameters
//!
//! All tunable parameters for the warning badge.  The badge has no
//! provisioning path: values are compiled in through [`BadgeConfig::default`].

use core::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Capacity of derived names (thing name, advertised name, broker URL).
pub type NameString = heapless::String<64>;

/// Core badge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadgeConfig {
    // --- Network ---
    /// Access point SSID (2.4 GHz only)
    pub wifi_ssid: heapless::String<32>,
    /// WPA2 passphrase (empty for an open network)
    pub wifi_password: heapless::String<64>,

    // --- Identity ---
    /// Badge number, distinguishes badges in the same cloud account
    pub badge_number: heapless::String<8>,
    /// Thing name prefix; the badge number is appended
    pub thing_prefix: heapless::String<32>,
    /// Named shadow holding desired/reported alarm state
    pub shadow_name: heapless::String<32>,
    /// First topic segment
    pub topic_namespace: heapless::String<16>,
    /// Second topic segment
    pub device_type: heapless::String<32>,

    // --- Broker ---
    /// Broker endpoint host
    pub broker_host: heapless::String<96>,
    /// Broker TLS port
    pub broker_port: u16,
    /// MQTT keepalive interval (seconds)
    pub keepalive_secs: u32,
    /// Maximum time to wait for CONNACK (milliseconds)
    pub handshake_timeout_ms: u32,
    /// PEM client certificate on the flash filesystem
    pub certificate_path: heapless::String<64>,
    /// PEM private key on the flash filesystem
    pub private_key_path: heapless::String<64>,

    // --- Timing ---
    /// Telemetry publish period T_pub (milliseconds)
    pub publish_interval_ms: u32,
    /// Sleep at the end of every loop iteration (milliseconds)
    pub loop_interval_ms: u32,
    /// Pause after a link association or broker handshake (milliseconds)
    pub settle_delay_ms: u32,
    /// Uptime after which the badge restarts itself (T_reset). `None` disables.
    pub reset_after_secs: Option<u32>,
    /// Fixed correction added to the wall clock in reported timestamps
    pub time_offset_secs: i64,

    // --- Presence advertising ---
    /// 128-bit service UUID advertised alongside the badge name
    pub ble_service_uuid: u128,
    /// Advertising interval (milliseconds)
    pub ble_advertising_interval_ms: u32,
}

fn fixed<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    // Length checked at compile time by `fixed!`.
    let _ = out.push_str(s);
    out
}

/// A compiled-in default that fails the build if it outgrows its field.
macro_rules! fixed {
    ($cap:literal, $s:literal) => {{
        const _: () = assert!($s.len() <= $cap, "default does not fit its field");
        fixed::<$cap>($s)
    }};
}

impl Default for BadgeConfig {
    fn default() -> Self {
        Self {
            // Network
            wifi_ssid: fixed!(32, "Wifi_name"),
            wifi_password: fixed!(64, "Wifi_password"),

            // Identity
            badge_number: fixed!(8, "1"),
            thing_prefix: fixed!(32, "WarningBadge_"),
            shadow_name: fixed!(32, "WarningBadge"),
            topic_namespace: fixed!(16, "EduKit"),
            device_type: fixed!(32, "WarningBadge"),

            // Broker
            broker_host: fixed!(96, "xxxxxxxxxxxxxx-ats.iot.us-east-1.amazonaws.com"),
            broker_port: 8883,
            keepalive_secs: 10_000,
            handshake_timeout_ms: 10_000,
            certificate_path: fixed!(64, "/flash/certs/certificate.pem.crt"),
            private_key_path: fixed!(64, "/flash/certs/private.pem.key"),

            // Timing
            publish_interval_ms: 1000, // 1 Hz
            loop_interval_ms: 250,     // 4 Hz
            settle_delay_ms: 1000,
            reset_after_secs: Some(3600), // 1 h
            time_offset_secs: 0,

            // Presence advertising
            ble_service_uuid: 0x6E40_0001_B5A3_F393_E0A9_E10E_24DC_CAAA,
            ble_advertising_interval_ms: 500,
        }
    }
}

impl BadgeConfig {
    /// Thing name registered with the broker; doubles as the MQTT client id.
    pub fn thing_name(&self) -> Result<NameString, ConfigError> {
        let mut name = NameString::new();
        write!(name, "{}{}", self.thing_prefix, self.badge_number)
            .map_err(|_| ConfigError::TooLong("thing name"))?;
        Ok(name)
    }

    /// Local name carried in presence advertisements.
    pub fn advertised_name(&self) -> Result<heapless::String<24>, ConfigError> {
        let mut name = heapless::String::new();
        write!(name, "Badge {}", self.badge_number)
            .map_err(|_| ConfigError::TooLong("advertised name"))?;
        Ok(name)
    }

    /// TLS broker URL, e.g. `mqtts://host:8883`.
    pub fn broker_url(&self) -> Result<heapless::String<128>, ConfigError> {
        let mut url = heapless::String::new();
        write!(url, "mqtts://{}:{}", self.broker_host, self.broker_port)
            .map_err(|_| ConfigError::TooLong("broker URL"))?;
        Ok(url)
    }

    /// Reject configurations the loop cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wifi_ssid.is_empty() {
            return Err(ConfigError::Invalid("wifi_ssid is empty"));
        }
        if self.badge_number.is_empty() {
            return Err(ConfigError::Invalid("badge_number is empty"));
        }
        if self.broker_host.is_empty() {
            return Err(ConfigError::Invalid("broker_host is empty"));
        }
        if self.thing_prefix.is_empty()
            || self.shadow_name.is_empty()
            || self.topic_namespace.is_empty()
            || self.device_type.is_empty()
        {
            return Err(ConfigError::Invalid("topic and shadow names must be set"));
        }
        if self.certificate_path.is_empty() || self.private_key_path.is_empty() {
            return Err(ConfigError::Invalid("credential paths must be set"));
        }
        if self.publish_interval_ms == 0 {
            return Err(ConfigError::Invalid("publish_interval_ms must be > 0"));
        }
        if self.loop_interval_ms == 0 {
            return Err(ConfigError::Invalid("loop_interval_ms must be > 0"));
        }
        if self.loop_interval_ms >= self.publish_interval_ms {
            return Err(ConfigError::Invalid(
                "loop_interval_ms must be shorter than publish_interval_ms",
            ));
        }
        if let Some(reset) = self.reset_after_secs {
            if u64::from(reset) * 1000 <= u64::from(self.publish_interval_ms) {
                return Err(ConfigError::Invalid(
                    "reset_after_secs must exceed the publish interval",
                ));
            }
        }
        self.thing_name()?;
        self.advertised_name()?;
        self.broker_url()?;
        Ok(())
    }
}
