use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::cred::CredentialField;

/// Vendor request code (`bRequest`) for all PicoWifi WiFi sub-commands
pub const VENDOR_REQUEST_WIFI: u8 = 2;

/// Size of the status structure returned by [`WifiCmd::Status`]
pub const WIFI_STATUS_SIZE: usize = 16;

/// Sub-commands of [`VENDOR_REQUEST_WIFI`], carried in `wIndex`
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiCmd {
    SetSsid = 0x0,
    SetPasswd = 0x1,
    Connect = 0x2,
    Status = 0x3,
    FirmwareUpdate = 0x100,
}

impl WifiCmd {
    /// `wIndex` value selecting this sub-command
    pub fn index(self) -> u16 {
        self as u16
    }

    /// Whether the device answers this sub-command with data
    pub fn is_device_to_host(self) -> bool {
        self == WifiCmd::Status
    }
}

/// Link state reported by the CYW43 driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Down,
    Join,
    NoIp,
    Up,
    Fail,
    NoNet,
    BadAuth,
    Unknown(i32),
}

impl From<i32> for LinkStatus {
    fn from(code: i32) -> Self {
        match code {
            0 => LinkStatus::Down,
            1 => LinkStatus::Join,
            2 => LinkStatus::NoIp,
            3 => LinkStatus::Up,
            -1 => LinkStatus::Fail,
            -2 => LinkStatus::NoNet,
            -3 => LinkStatus::BadAuth,
            c => LinkStatus::Unknown(c),
        }
    }
}

/// Status block returned by [`WifiCmd::Status`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiStatus {
    link_up: i32,
    cyw43_status: i32,
    last_rssi: i32,
    last_rate: i32,
}

impl WifiStatus {
    pub fn from_bytes(buf: &[u8]) -> Result<Self, PicoWifiError> {
        if buf.len() < WIFI_STATUS_SIZE {
            return Err(PicoWifiError::ShortTransfer {
                expected: WIFI_STATUS_SIZE,
                actual: buf.len(),
            });
        }
        Ok(bincode::deserialize(&buf[..WIFI_STATUS_SIZE])?)
    }

    /// Whether the wireless link is up
    pub fn link_up(&self) -> bool {
        self.link_up != 0
    }

    pub fn link_status(&self) -> LinkStatus {
        LinkStatus::from(self.cyw43_status)
    }

    /// Last received signal strength, in dBm
    pub fn rssi(&self) -> i32 {
        self.last_rssi
    }

    /// Last reported PHY rate, in units of 500 kbit/s
    pub fn rate(&self) -> i32 {
        self.last_rate
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PicoWifiError {
    #[error("no PicoWifi device found (VID {vid:#06x}, PID {pid:#06x})")]
    DeviceNotFound { vid: u16, pid: u16 },
    #[error("usb error: {0}")]
    UsbError(#[source] rusb::Error),
    #[error("failed to select device configuration: {0}")]
    ConfigurationError(#[source] rusb::Error),
    #[error("control transfer failed: {0}")]
    TransferError(#[source] rusb::Error),
    #[error("short transfer: expected {expected} bytes, got {actual}")]
    ShortTransfer { expected: usize, actual: usize },
    #[error("{field} is {len} bytes long, at most {max} are allowed")]
    FieldTooLong {
        field: CredentialField,
        len: usize,
        max: usize,
    },
    #[error("{field} contains {ch:?}, which is not representable in Latin-1")]
    UnencodableChar { field: CredentialField, ch: char },
    #[error("not a PicoWifi credential block: {0}")]
    InvalidBlock(&'static str),
    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),
    #[error("could not write '{}': {source}", path.display())]
    FileWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<rusb::Error> for PicoWifiError {
    fn from(e: rusb::Error) -> Self {
        PicoWifiError::UsbError(e)
    }
}
