//! Credential store — reads the TLS client certificate and private key.
//!
//! Both live as PEM files on the flash filesystem (mounted at `/flash`
//! on the device; any directory in simulation).  The material is
//! NUL-terminated on load because mbedTLS parses PEM as a C string.
//!
//! | File                               | Content                   |
//! |------------------------------------|---------------------------|
//! | `/flash/certs/certificate.pem.crt` | PEM client certificate    |
//! | `/flash/certs/private.pem.key`     | PEM private key           |

use log::info;

use crate::app::ports::{TlsCredentials, MAX_CERT_SIZE, MAX_KEY_SIZE};
use crate::error::CredentialError;

/// Mount point of the SPIFFS partition holding the credentials.
pub const FLASH_MOUNT: &str = "/flash";

const PEM_HEADER: &[u8] = b"-----BEGIN";

/// Credential store adapter.
pub struct CertStore<'a> {
    certificate_path: &'a str,
    private_key_path: &'a str,
}

impl<'a> CertStore<'a> {
    pub fn new(certificate_path: &'a str, private_key_path: &'a str) -> Self {
        Self {
            certificate_path,
            private_key_path,
        }
    }

    /// Load and check both PEM files.
    pub fn load(&self) -> Result<TlsCredentials, CredentialError> {
        let certificate = read_pem::<MAX_CERT_SIZE>(self.certificate_path, "certificate")?;
        let private_key = read_pem::<MAX_KEY_SIZE>(self.private_key_path, "private key")?;

        let creds = TlsCredentials {
            certificate,
            private_key,
        };
        info!(
            "CertStore: loaded credentials (cert={}B, key={}B)",
            creds.certificate.len(),
            creds.private_key.len(),
        );
        Ok(creds)
    }

    /// Mount the SPIFFS partition at [`FLASH_MOUNT`].
    #[cfg(target_os = "espidf")]
    pub fn mount_flash() -> Result<(), CredentialError> {
        use esp_idf_svc::sys::{esp_vfs_spiffs_conf_t, esp_vfs_spiffs_register, ESP_OK};

        let conf = esp_vfs_spiffs_conf_t {
            base_path: c"/flash".as_ptr(),
            partition_label: core::ptr::null(),
            max_files: 4,
            format_if_mount_failed: false,
        };
        let ret = unsafe { esp_vfs_spiffs_register(&conf) };
        if ret != ESP_OK as i32 {
            return Err(CredentialError::Unreadable("flash filesystem"));
        }
        info!("CertStore: mounted flash filesystem at {}", FLASH_MOUNT);
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn mount_flash() -> Result<(), CredentialError> {
        info!("CertStore(sim): no flash filesystem to mount");
        Ok(())
    }
}

/// Read a PEM file into a NUL-terminated buffer of capacity `N`.
fn read_pem<const N: usize>(
    path: &str,
    what: &'static str,
) -> Result<heapless::Vec<u8, N>, CredentialError> {
    let raw = std::fs::read(path).map_err(|e| {
        log::warn!("CertStore: cannot read {} '{}': {}", what, path, e);
        CredentialError::Unreadable(what)
    })?;

    // Tolerate a trailing NUL already present in the file.
    let body = raw.strip_suffix(&[0]).unwrap_or(&raw);
    if !body.trim_ascii_start().starts_with(PEM_HEADER) {
        return Err(CredentialError::NotPem(what));
    }

    let mut buf = heapless::Vec::new();
    buf.extend_from_slice(body)
        .map_err(|_| CredentialError::TooLarge(what))?;
    buf.push(0).map_err(|_| CredentialError::TooLarge(what))?;
    Ok(buf)
}

// ── Tests ────────────────────────────────────────────────────
