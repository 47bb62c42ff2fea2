//! Provisioning a PicoWifi USB bridge from the host.
//!
//! <br>
//!
//! PicoWifi is firmware for the Raspberry Pi Pico W that exposes the CYW43
//! wireless chip to a host computer as a USB network bridge. The device reads
//! its wireless credentials from a small record stored in the last page of
//! flash. This crate produces that record as a single-block UF2 file that can
//! be dropped onto the device while it is in BOOTSEL mode, and talks to a
//! running device over its vendor control interface, most notably to reboot
//! it back into the USB bootloader without pressing the BOOTSEL button.
//!
//! # Example
//!
//! ```no_run
//! use picowifi::{reboot, write_uf2, PICOWIFI_PID, PICOWIFI_VID};
//! use rusb::Context;
//!
//! let block = picowifi::encode("MyNet", "hunter22").expect("not representable in Latin-1");
//! write_uf2("wificred.uf2", &block).expect("failed to write credentials");
//!
//! let ctx = Context::new().expect("could not initialize libusb");
//! reboot(&ctx, PICOWIFI_VID, PICOWIFI_PID).expect("failed to reboot device");
//! ```

/// PicoWifi USB Vendor ID
pub const PICOWIFI_VID: u16 = 0x20A0;
/// PicoWifi USB Product ID
pub const PICOWIFI_PID: u16 = 0x42EC;

/// RP MCU memory address for the start of flash storage
pub const FLASH_START: u32 = 0x10000000;
/// Flash size of a Pico W board
pub const FLASH_SIZE: u32 = 0x00200000;
/// Size of the flash page reserved for the credential record
pub const CRED_PAGE_SIZE: u32 = 0x00010000;
/// Flash address of the credential record (last 64k page of flash)
pub const CRED_FLASH_ADDR: u32 = FLASH_START + FLASH_SIZE - CRED_PAGE_SIZE; // 0x101F0000
/// RP MCU flash page size (for writing)
pub const PAGE_SIZE: u32 = 0x100;

/// UF2 Family ID for RP2040
pub const UF2_RP2040_FAMILY_ID: u32 = 0xE48BFF56;

/// Credential Record Module
pub mod cred;
pub use cred::{AuthType, CredentialField, FieldPolicy, WifiCredentials};

/// Vendor Request Module
pub mod cmd;
pub use cmd::{LinkStatus, PicoWifiError, WifiCmd, WifiStatus};

/// UF2 Encoding Module
pub mod uf2;
pub use uf2::{encode, write_uf2, Uf2Block, Uf2Flags};

/// USB Connection Module
pub mod usb;
pub use usb::{reboot, PicoWifiConnection, RebootOutcome, UsbBus, WifiTransport};

mod bytes;
