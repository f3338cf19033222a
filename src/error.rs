//! Unified error types for the badge firmware.
//!
//! Every failure in the connectivity loop belongs to one of four classes,
//! each with a fixed recovery policy:
//!
//! | Class          | Raised by            | Recovery                          |
//! |----------------|----------------------|-----------------------------------|
//! | `LinkError`    | WiFi association     | retried forever, never surfaced   |
//! | `SessionError` | broker handshake     | full recovery on the next tick    |
//! | `PublishError` | best-effort publish  | logged and dropped                |
//! | `DecodeError`  | inbound payload      | logged and dropped                |
//!
//! None of them is fatal.  The scheduled restart is a maintenance action,
//! not an error, and does not appear here.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    Link(LinkError),
    Session(SessionError),
    Publish(PublishError),
    Decode(DecodeError),
    Config(ConfigError),
    Credential(CredentialError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Link(e) => write!(f, "link: {e}"),
            Self::Session(e) => write!(f, "session: {e}"),
            Self::Publish(e) => write!(f, "publish: {e}"),
            Self::Decode(e) => write!(f, "decode: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Credential(e) => write!(f, "credentials: {e}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Link (WiFi association) errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// No SSID configured.
    NoCredentials,
    /// SSID is empty, too long, or not printable ASCII.
    InvalidSsid,
    /// Passphrase length is not valid for WPA2.
    InvalidPassword,
    /// The access point refused or never answered the association.
    AssociationFailed,
    /// Associated, but no IP configuration arrived in time.
    Timeout,
}

impl LinkError {
    /// Configuration problems cannot be fixed by retrying.
    pub const fn is_permanent(self) -> bool {
        matches!(
            self,
            Self::NoCredentials | Self::InvalidSsid | Self::InvalidPassword
        )
    }
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)"),
            Self::AssociationFailed => write!(f, "WiFi association failed"),
            Self::Timeout => write!(f, "WiFi association timed out"),
        }
    }
}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

// ---------------------------------------------------------------------------
// Session (secure MQTT) errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    /// The transport link is not associated.
    LinkDown,
    /// Certificate or key material is missing or incomplete.
    CredentialsMissing,
    /// The broker rejected the handshake.
    Rejected,
    /// No CONNACK within the handshake window.
    Timeout,
    /// The broker refused a subscription.
    SubscribeFailed,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LinkDown => write!(f, "transport link is down"),
            Self::CredentialsMissing => write!(f, "TLS credentials missing"),
            Self::Rejected => write!(f, "broker rejected the handshake"),
            Self::Timeout => write!(f, "broker handshake timed out"),
            Self::SubscribeFailed => write!(f, "subscription refused"),
        }
    }
}

impl From<SessionError> for Error {
    fn from(e: SessionError) -> Self {
        Self::Session(e)
    }
}

// ---------------------------------------------------------------------------
// Publish errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishError {
    /// No live session to publish on.
    NotConnected,
    /// The client refused to enqueue the message.
    Rejected,
    /// Serialised payload exceeds the outbound buffer.
    PayloadTooLarge,
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "no session"),
            Self::Rejected => write!(f, "client rejected the message"),
            Self::PayloadTooLarge => write!(f, "payload too large"),
        }
    }
}

impl From<PublishError> for Error {
    fn from(e: PublishError) -> Self {
        Self::Publish(e)
    }
}

// ---------------------------------------------------------------------------
// Decode errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Payload is not well-formed JSON.
    InvalidJson,
    /// JSON is well-formed but does not match the channel's schema.
    SchemaMismatch,
    /// A numeric alarm state other than 0 or 1.
    InvalidAlarmState,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidJson => write!(f, "payload is not valid JSON"),
            Self::SchemaMismatch => write!(f, "payload does not match schema"),
            Self::InvalidAlarmState => write!(f, "alarm_state must be 0 or 1"),
        }
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(e: serde_json::Error) -> Self {
        match e.classify() {
            serde_json::error::Category::Data => Self::SchemaMismatch,
            _ => Self::InvalidJson,
        }
    }
}

impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Self {
        Self::Decode(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A field failed validation; the message names the field.
    Invalid(&'static str),
    /// A derived topic or name does not fit its fixed-capacity buffer.
    TooLong(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid(msg) => write!(f, "invalid: {msg}"),
            Self::TooLong(what) => write!(f, "{what} exceeds its buffer"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Credential store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialError {
    /// The file could not be opened or read.
    Unreadable(&'static str),
    /// The file exceeds the PEM buffer.
    TooLarge(&'static str),
    /// The file is empty or has no PEM header.
    NotPem(&'static str),
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreadable(what) => write!(f, "{what} unreadable"),
            Self::TooLarge(what) => write!(f, "{what} too large"),
            Self::NotPem(what) => write!(f, "{what} is not PEM"),
        }
    }
}

impl From<CredentialError> for Error {
    fn from(e: CredentialError) -> Self {
        Self::Credential(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
