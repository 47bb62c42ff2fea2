use std::time::Duration;

use rusb::{DeviceHandle, Direction, Recipient, RequestType, UsbContext};

use crate::cmd::{PicoWifiError, WifiCmd, WifiStatus, VENDOR_REQUEST_WIFI, WIFI_STATUS_SIZE};
use crate::cred::{AuthType, CredentialField, WifiCredentials, CRED_FIELD_SIZE};

/// Timeout for every control transfer
pub const TIMEOUT: Duration = Duration::from_millis(1000);

/// `bmRequestType` for host-to-device vendor requests (0x40)
pub fn request_type_out() -> u8 {
    rusb::request_type(Direction::Out, RequestType::Vendor, Recipient::Device)
}

/// `bmRequestType` for device-to-host vendor requests (0xC0)
pub fn request_type_in() -> u8 {
    rusb::request_type(Direction::In, RequestType::Vendor, Recipient::Device)
}

fn request_type_for(cmd: WifiCmd) -> u8 {
    if cmd.is_device_to_host() {
        request_type_in()
    } else {
        request_type_out()
    }
}

/// An open device that can carry control transfers.
pub trait WifiTransport {
    /// Selects the first configuration of the device.
    fn set_default_configuration(&mut self) -> rusb::Result<()>;

    fn write_control(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &[u8],
    ) -> rusb::Result<usize>;

    fn read_control(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
    ) -> rusb::Result<usize>;
}

impl<T: UsbContext> WifiTransport for DeviceHandle<T> {
    fn set_default_configuration(&mut self) -> rusb::Result<()> {
        let config = self.device().config_descriptor(0)?;
        self.set_active_configuration(config.number())
    }

    fn write_control(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &[u8],
    ) -> rusb::Result<usize> {
        DeviceHandle::write_control(self, request_type, request, value, index, buf, TIMEOUT)
    }

    fn read_control(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
    ) -> rusb::Result<usize> {
        DeviceHandle::read_control(self, request_type, request, value, index, buf, TIMEOUT)
    }
}

/// Source of device handles, usually a libusb context.
pub trait UsbBus {
    type Handle: WifiTransport;

    /// Opens the first attached device matching `vid`/`pid`, if any.
    fn open(&self, vid: u16, pid: u16) -> Result<Option<Self::Handle>, PicoWifiError>;
}

impl<T: UsbContext> UsbBus for T {
    type Handle = DeviceHandle<T>;

    fn open(&self, vid: u16, pid: u16) -> Result<Option<Self::Handle>, PicoWifiError> {
        let devices = self.devices()?;
        let mut matching = devices.iter().filter(|dev| match dev.device_descriptor() {
            Ok(desc) => desc.vendor_id() == vid && desc.product_id() == pid,
            Err(_) => false,
        });

        let Some(dev) = matching.next() else {
            return Ok(None);
        };
        let others = matching.count();
        if others > 0 {
            tracing::warn!(
                others,
                "more than one matching device attached, using bus {} address {}",
                dev.bus_number(),
                dev.address()
            );
        }
        tracing::debug!(bus = dev.bus_number(), address = dev.address(), "opening device");
        Ok(Some(dev.open()?))
    }
}

/// Result of asking the device to reboot into its bootloader
#[derive(Debug)]
pub enum RebootOutcome {
    /// The device acknowledged the request before resetting
    Acknowledged,
    /// The transfer failed in a way consistent with the device resetting
    /// mid-transfer. The device most likely rebooted anyway.
    Unacknowledged(rusb::Error),
}

/// Errors that the reboot request may produce because the device dropped off
/// the bus while answering. A stall (`Pipe`) means the firmware refused the
/// request and is not among them.
fn is_reset_race(e: &rusb::Error) -> bool {
    matches!(
        e,
        rusb::Error::NoDevice | rusb::Error::Io | rusb::Error::Timeout
    )
}

/// Connection to a running PicoWifi device
pub struct PicoWifiConnection<H: WifiTransport> {
    handle: H,
}

impl<H: WifiTransport> PicoWifiConnection<H> {
    /// Finds the device on `bus` and selects its default configuration.
    pub fn open<B>(bus: &B, vid: u16, pid: u16) -> Result<Self, PicoWifiError>
    where
        B: UsbBus<Handle = H>,
    {
        let mut handle = bus
            .open(vid, pid)?
            .ok_or(PicoWifiError::DeviceNotFound { vid, pid })?;
        handle
            .set_default_configuration()
            .map_err(PicoWifiError::ConfigurationError)?;
        Ok(Self::from_handle(handle))
    }

    /// Wraps an already configured handle.
    pub fn from_handle(handle: H) -> Self {
        PicoWifiConnection { handle }
    }

    fn wifi_out(&mut self, cmd: WifiCmd, value: u16, data: &[u8]) -> Result<usize, PicoWifiError> {
        tracing::debug!(?cmd, value, len = data.len(), "vendor request");
        self.handle
            .write_control(
                request_type_for(cmd),
                VENDOR_REQUEST_WIFI,
                value,
                cmd.index(),
                data,
            )
            .map_err(PicoWifiError::TransferError)
    }

    fn check_field(data: &[u8], field: CredentialField) -> Result<(), PicoWifiError> {
        if data.len() > CRED_FIELD_SIZE {
            return Err(PicoWifiError::FieldTooLong {
                field,
                len: data.len(),
                max: CRED_FIELD_SIZE,
            });
        }
        Ok(())
    }

    /// Sets the SSID used by the next connect request.
    pub fn set_ssid(&mut self, ssid: &[u8]) -> Result<(), PicoWifiError> {
        Self::check_field(ssid, CredentialField::Ssid)?;
        self.wifi_out(WifiCmd::SetSsid, 0, ssid)?;
        Ok(())
    }

    /// Sets the password used by the next connect request.
    pub fn set_password(&mut self, password: &[u8]) -> Result<(), PicoWifiError> {
        Self::check_field(password, CredentialField::Password)?;
        self.wifi_out(WifiCmd::SetPasswd, 0, password)?;
        Ok(())
    }

    /// Makes the device (re)connect with the stored SSID and password.
    pub fn connect(&mut self, auth: AuthType) -> Result<(), PicoWifiError> {
        self.wifi_out(WifiCmd::Connect, auth.to_w_value(), &[])?;
        Ok(())
    }

    /// Sends SSID, password and connect request. Nothing is written to flash.
    pub fn configure(&mut self, creds: &WifiCredentials) -> Result<(), PicoWifiError> {
        self.set_ssid(creds.ssid_bytes())?;
        self.set_password(creds.password_bytes())?;
        self.connect(creds.auth())
    }

    pub fn status(&mut self) -> Result<WifiStatus, PicoWifiError> {
        let mut buf = [0u8; WIFI_STATUS_SIZE];
        let len = self
            .handle
            .read_control(
                request_type_for(WifiCmd::Status),
                VENDOR_REQUEST_WIFI,
                0,
                WifiCmd::Status.index(),
                &mut buf,
            )
            .map_err(PicoWifiError::TransferError)?;
        WifiStatus::from_bytes(&buf[..len])
    }

    /// Asks the device to reboot into its USB bootloader.
    ///
    /// The firmware resets right after acknowledging, so the transfer can
    /// fail with `NoDevice`, `Io` or `Timeout` even though the request was
    /// carried out. Those come back as [`RebootOutcome::Unacknowledged`];
    /// any other failure is a [`PicoWifiError::TransferError`].
    pub fn reboot_to_bootloader(&mut self) -> Result<RebootOutcome, PicoWifiError> {
        match self.wifi_out(WifiCmd::FirmwareUpdate, 0, &[]) {
            Ok(_) => Ok(RebootOutcome::Acknowledged),
            Err(PicoWifiError::TransferError(e)) if is_reset_race(&e) => {
                tracing::warn!(error = %e, "reboot request not acknowledged, device is probably resetting");
                Ok(RebootOutcome::Unacknowledged(e))
            }
            Err(e) => Err(e),
        }
    }
}

/// Finds the device matching `vid`/`pid` on `bus` and reboots it into its
/// USB bootloader.
pub fn reboot<B: UsbBus>(bus: &B, vid: u16, pid: u16) -> Result<RebootOutcome, PicoWifiError> {
    let mut conn = PicoWifiConnection::open(bus, vid, pid)?;
    conn.reboot_to_bootloader()
}
