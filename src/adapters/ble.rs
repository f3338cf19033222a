//! BLE presence advertising adapter.
//!
//! Advertises the badge name and a 128-bit service UUID so nearby
//! scanners can see which badges are present.  There is no GATT server
//! and no connection handling: advertising is started once at boot and
//! left running.  Failures are logged and otherwise ignored.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: Bluedroid GAP via `esp_idf_svc::sys`.
//! - **all other targets**: simulation stubs for host-side tests.

#[cfg(target_os = "espidf")]
use log::error;
use log::info;

/// Bluetooth advertising interval unit (0.625 ms).
const ADV_UNIT_US: u32 = 625;

/// Shortest and longest intervals the controller accepts (20 ms … 10.24 s).
const ADV_INTERVAL_MIN: u16 = 0x0020;
const ADV_INTERVAL_MAX: u16 = 0x4000;

/// Convert milliseconds to controller units, clamped to the legal range.
pub fn interval_units(ms: u32) -> u16 {
    let units = ms.saturating_mul(1000) / ADV_UNIT_US;
    units.clamp(u32::from(ADV_INTERVAL_MIN), u32::from(ADV_INTERVAL_MAX)) as u16
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BleState {
    Idle,
    Advertising,
    Failed,
}

// ───────────────────────────────────────────────────────────────
// GAP callback
// ───────────────────────────────────────────────────────────────

/// Advertising interval for the GAP callback, in controller units.
#[cfg(target_os = "espidf")]
static ADV_INTERVAL: core::sync::atomic::AtomicU16 = core::sync::atomic::AtomicU16::new(0x0320);

/// Advertising starts once the controller has accepted the payload.
#[cfg(target_os = "espidf")]
unsafe extern "C" fn ble_gap_event_handler(
    event: esp_idf_svc::sys::esp_gap_ble_cb_event_t,
    _param: *mut esp_idf_svc::sys::esp_ble_gap_cb_param_t,
) {
    use esp_idf_svc::sys::*;
    match event {
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_DATA_SET_COMPLETE_EVT => {
            let interval = ADV_INTERVAL.load(core::sync::atomic::Ordering::Relaxed);
            let mut adv_params = esp_ble_adv_params_t {
                adv_int_min: interval,
                adv_int_max: interval,
                adv_type: esp_ble_adv_type_t_ADV_TYPE_NONCONN_IND,
                own_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
                channel_map: esp_ble_adv_channel_t_ADV_CHNL_ALL,
                adv_filter_policy: esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_ANY,
                ..core::mem::zeroed()
            };
            esp_ble_gap_start_advertising(&mut adv_params);
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_START_COMPLETE_EVT => {
            log::info!("BLE GAP: advertising started");
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_STOP_COMPLETE_EVT => {
            log::info!("BLE GAP: advertising stopped");
        }
        _ => {}
    }
}

// ───────────────────────────────────────────────────────────────
// BLE adapter
// ───────────────────────────────────────────────────────────────

pub struct BleAdvertiser {
    state: BleState,
    device_name: heapless::String<24>,
    service_uuid: u128,
    interval_ms: u32,
}

impl BleAdvertiser {
    pub fn new(device_name: heapless::String<24>, service_uuid: u128, interval_ms: u32) -> Self {
        Self {
            state: BleState::Idle,
            device_name,
            service_uuid,
            interval_ms,
        }
    }

    pub fn state(&self) -> BleState {
        self.state
    }

    /// Fire-and-forget.  Never fails the caller.
    pub fn start(&mut self) {
        if self.state == BleState::Advertising {
            return;
        }
        info!(
            "BLE: advertising '{}' every {} ms",
            self.device_name, self.interval_ms
        );
        self.state = if self.platform_start() {
            BleState::Advertising
        } else {
            BleState::Failed
        };
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_start(&mut self) -> bool {
        use esp_idf_svc::sys::*;

        ADV_INTERVAL.store(
            interval_units(self.interval_ms),
            core::sync::atomic::Ordering::Relaxed,
        );

        unsafe {
            // BLE only: give the classic BT memory back.
            esp_bt_controller_mem_release(esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT);

            let mut bt_cfg = esp_bt_controller_config_t::default();
            let ret = esp_bt_controller_init(&mut bt_cfg);
            if ret != ESP_OK as i32 {
                error!("BLE: bt_controller_init failed ({})", ret);
                return false;
            }

            let ret = esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BLE);
            if ret != ESP_OK as i32 {
                error!("BLE: bt_controller_enable failed ({})", ret);
                return false;
            }

            let ret = esp_bluedroid_init();
            if ret != ESP_OK as i32 {
                error!("BLE: bluedroid_init failed ({})", ret);
                return false;
            }

            let ret = esp_bluedroid_enable();
            if ret != ESP_OK as i32 {
                error!("BLE: bluedroid_enable failed ({})", ret);
                return false;
            }

            esp_ble_gap_register_callback(Some(ble_gap_event_handler));

            // NUL-terminated copy of the name for the C API.
            let mut name = [0u8; 25];
            let bytes = self.device_name.as_bytes();
            name[..bytes.len()].copy_from_slice(bytes);
            esp_ble_gap_set_device_name(name.as_ptr() as *const _);

            // Bluedroid deep-copies the advertising data.
            let mut uuid = self.service_uuid.to_le_bytes();
            let mut adv_data = esp_ble_adv_data_t {
                set_scan_rsp: false,
                include_name: true,
                include_txpower: false,
                p_service_uuid: uuid.as_mut_ptr(),
                service_uuid_len: uuid.len() as u16,
                flag: (ESP_BLE_ADV_FLAG_GEN_DISC | ESP_BLE_ADV_FLAG_BREDR_NOT_SPT) as u8,
                ..core::mem::zeroed()
            };
            let ret = esp_ble_gap_config_adv_data(&mut adv_data);
            if ret != ESP_OK as i32 {
                error!("BLE: config_adv_data failed ({})", ret);
                return false;
            }
        }

        info!("BLE(espidf): advertising configured as '{}'", self.device_name);
        true
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start(&mut self) -> bool {
        info!(
            "BLE(sim): advertising '{}' (service {:032x}, {} units)",
            self.device_name,
            self.service_uuid,
            interval_units(self.interval_ms)
        );
        true
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
