//! WiFi station-mode adapter.
//!
//! Implements [`LinkPort`], the hexagonal boundary for link-layer
//! connectivity.  One call to [`LinkPort::associate`] is one attempt;
//! retry and backoff belong to the
//! [`TransportSupervisor`](crate::app::transport::TransportSupervisor).
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver via
//!   `esp_idf_svc::wifi::BlockingWifi`.
//! - **all other targets**: simulation stubs for host-side tests, with
//!   hooks to force failures and drop the link.

use log::{info, warn};

use crate::app::ports::LinkPort;
use crate::error::LinkError;

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

/// Printable ASCII: space through tilde.
fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), LinkError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(LinkError::InvalidSsid);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), LinkError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(LinkError::InvalidPassword);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
type Driver = esp_idf_svc::wifi::BlockingWifi<esp_idf_svc::wifi::EspWifi<'static>>;

pub struct WifiAdapter {
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    #[cfg(target_os = "espidf")]
    wifi: Driver,
    #[cfg(target_os = "espidf")]
    configured: bool,
    /// Simulation: association state.
    #[cfg(not(target_os = "espidf"))]
    sim_up: bool,
    /// Simulation: number of upcoming attempts that fail.
    #[cfg(not(target_os = "espidf"))]
    sim_fail_next: u32,
    /// Simulation: total association attempts.
    #[cfg(not(target_os = "espidf"))]
    sim_attempts: u32,
}

impl WifiAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(wifi: Driver) -> Self {
        Self {
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            wifi,
            configured: false,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            sim_up: false,
            sim_fail_next: 0,
            sim_attempts: 0,
        }
    }

    pub fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), LinkError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        self.ssid.clear();
        self.ssid.push_str(ssid).map_err(|_| LinkError::InvalidSsid)?;
        self.password.clear();
        self.password
            .push_str(password)
            .map_err(|_| LinkError::InvalidPassword)?;
        #[cfg(target_os = "espidf")]
        {
            self.configured = false;
        }
        info!("WiFi: credentials set (SSID='{}')", self.ssid);
        Ok(())
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_configure(&mut self) -> Result<(), LinkError> {
        use embedded_svc::wifi::{AuthMethod, ClientConfiguration, Configuration};

        if self.configured {
            return Ok(());
        }
        let auth_method = if self.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let conf = Configuration::Client(ClientConfiguration {
            ssid: self
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| LinkError::InvalidSsid)?,
            password: self
                .password
                .as_str()
                .try_into()
                .map_err(|_| LinkError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        });
        self.wifi.set_configuration(&conf).map_err(|e| {
            warn!("WiFi: set_configuration failed: {:?}", e);
            LinkError::AssociationFailed
        })?;
        if !self.wifi.is_started().unwrap_or(false) {
            self.wifi.start().map_err(|e| {
                warn!("WiFi: start failed: {:?}", e);
                LinkError::AssociationFailed
            })?;
        }
        self.configured = true;
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_associate(&mut self) -> Result<(), LinkError> {
        self.platform_configure()?;
        // A stale association blocks connect(); drop it first.
        let _ = self.wifi.disconnect();
        self.wifi.connect().map_err(|e| {
            warn!("WiFi: connect failed: {:?}", e);
            LinkError::AssociationFailed
        })?;
        self.wifi.wait_netif_up().map_err(|e| {
            warn!("WiFi: netif did not come up: {:?}", e);
            LinkError::Timeout
        })?;
        if let Ok(ip) = self.wifi.wifi().sta_netif().get_ip_info() {
            info!("WiFi: IP {}", ip.ip);
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_associate(&mut self) -> Result<(), LinkError> {
        self.sim_attempts = self.sim_attempts.wrapping_add(1);
        if self.sim_fail_next > 0 {
            self.sim_fail_next -= 1;
            warn!("WiFi(sim): simulated association failure (attempt {})", self.sim_attempts);
            return Err(LinkError::AssociationFailed);
        }
        self.sim_up = true;
        info!("WiFi(sim): associated with '{}' (attempt {})", self.ssid, self.sim_attempts);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_associated(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_associated(&self) -> bool {
        self.sim_up
    }

    // ── Simulation hooks ──────────────────────────────────────

    /// Simulate the access point going away.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_drop_link(&mut self) {
        warn!("WiFi(sim): link dropped");
        self.sim_up = false;
    }

    /// Make the next `n` association attempts fail.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_fail_next(&mut self, n: u32) {
        self.sim_fail_next = n;
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_attempts(&self) -> u32 {
        self.sim_attempts
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for WifiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// LinkPort
// ───────────────────────────────────────────────────────────────

impl LinkPort for WifiAdapter {
    fn associate(&mut self) -> Result<(), LinkError> {
        if self.ssid.is_empty() {
            return Err(LinkError::NoCredentials);
        }
        info!("WiFi: connecting to '{}'", self.ssid);
        self.platform_associate()
    }

    fn is_associated(&self) -> bool {
        self.platform_is_associated()
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
