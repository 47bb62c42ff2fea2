use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::bytes::ByteArray;
use crate::cmd::PicoWifiError;
use crate::cred::{FieldPolicy, WifiCredentials, CRED_FINAL_MAGIC, CRED_RECORD_SIZE};
use crate::{CRED_FLASH_ADDR, PAGE_SIZE, UF2_RP2040_FAMILY_ID};

/// First UF2 start magic ("UF2\n")
pub const UF2_MAGIC_START0: u32 = 0x0A324655;
/// Second UF2 start magic
pub const UF2_MAGIC_START1: u32 = 0x9E5D5157;
/// UF2 end-of-block magic
pub const UF2_MAGIC_END: u32 = 0x0AB16F30;

/// Size of a UF2 block
pub const UF2_BLOCK_SIZE: usize = 512;
/// Size of the data region of a UF2 block
pub const UF2_DATA_SIZE: usize = 476;

// The credential block closes with CRED_FINAL_MAGIC in the slot where UF2
// expects its end magic.
const _: () = assert!(CRED_FINAL_MAGIC == UF2_MAGIC_END);

/// UF2 block flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Uf2Flags(pub u32);

impl Uf2Flags {
    pub const EMPTY: Self = Self(0);
    pub const FAMILY_ID_PRESENT: Self = Self(0x0000_2000);

    pub fn family_id_present(self) -> bool {
        self.0 & Self::FAMILY_ID_PRESENT.0 != 0
    }

    pub fn with_family_id_present(self, present: bool) -> Self {
        if present {
            Self(self.0 | Self::FAMILY_ID_PRESENT.0)
        } else {
            Self(self.0 & !Self::FAMILY_ID_PRESENT.0)
        }
    }
}

/// A single 512-byte UF2 block. Serializes (bincode, fixed-int little-endian)
/// to exactly the on-disk layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Uf2Block {
    magic_start0: u32,
    magic_start1: u32,
    flags: u32,
    target_addr: u32,
    payload_size: u32,
    block_no: u32,
    num_blocks: u32,
    family_id: u32,
    data: ByteArray<UF2_DATA_SIZE>,
    magic_end: u32,
}

impl Uf2Block {
    /// Builds a block with `data` at the front of the data region and the
    /// rest zero-filled. `payload_size` is how much of the region the
    /// bootloader writes to flash and may differ from `data.len()`.
    pub fn new(
        flags: Uf2Flags,
        target_addr: u32,
        payload_size: u32,
        block_no: u32,
        num_blocks: u32,
        family_id: u32,
        data: &[u8],
    ) -> Result<Self, PicoWifiError> {
        if data.len() > UF2_DATA_SIZE || payload_size as usize > UF2_DATA_SIZE {
            return Err(PicoWifiError::InvalidBlock("data too long for UF2 block"));
        }
        Ok(Uf2Block {
            magic_start0: UF2_MAGIC_START0,
            magic_start1: UF2_MAGIC_START1,
            flags: flags.0,
            target_addr,
            payload_size,
            block_no,
            num_blocks,
            family_id,
            data: ByteArray::padded(data),
            magic_end: UF2_MAGIC_END,
        })
    }

    /// Single-block file placing `creds` in the credential page of an RP2040.
    pub fn from_credentials(creds: &WifiCredentials) -> Result<Self, PicoWifiError> {
        let record = creds.to_record()?;
        let mut block = Uf2Block::new(
            Uf2Flags::EMPTY.with_family_id_present(true),
            CRED_FLASH_ADDR,
            PAGE_SIZE,
            0,
            1,
            UF2_RP2040_FAMILY_ID,
            &record,
        )?;
        block.magic_end = CRED_FINAL_MAGIC;
        Ok(block)
    }

    pub fn to_bytes(&self) -> Result<[u8; UF2_BLOCK_SIZE], PicoWifiError> {
        let mut out = [0u8; UF2_BLOCK_SIZE];
        bincode::serialize_into(&mut out[..], self)?;
        Ok(out)
    }

    /// Parses one block, checking the three magic numbers and the payload size.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, PicoWifiError> {
        if buf.len() != UF2_BLOCK_SIZE {
            return Err(PicoWifiError::InvalidBlock("UF2 block must be 512 bytes"));
        }
        let block: Uf2Block = bincode::deserialize(buf)?;
        if block.magic_start0 != UF2_MAGIC_START0 || block.magic_start1 != UF2_MAGIC_START1 {
            return Err(PicoWifiError::InvalidBlock("bad UF2 start magic"));
        }
        if block.magic_end != UF2_MAGIC_END {
            return Err(PicoWifiError::InvalidBlock("bad UF2 end magic"));
        }
        if block.payload_size as usize > UF2_DATA_SIZE {
            return Err(PicoWifiError::InvalidBlock("payload larger than data region"));
        }
        Ok(block)
    }

    pub fn flags(&self) -> Uf2Flags {
        Uf2Flags(self.flags)
    }

    pub fn target_addr(&self) -> u32 {
        self.target_addr
    }

    pub fn payload_size(&self) -> u32 {
        self.payload_size
    }

    pub fn block_no(&self) -> u32 {
        self.block_no
    }

    pub fn num_blocks(&self) -> u32 {
        self.num_blocks
    }

    pub fn family_id(&self) -> u32 {
        self.family_id
    }

    pub fn data(&self) -> &[u8; UF2_DATA_SIZE] {
        &self.data.0
    }

    /// The part of the data region the bootloader writes to flash
    pub fn payload(&self) -> &[u8] {
        &self.data.0[..self.payload_size as usize]
    }
}

impl WifiCredentials {
    /// Recovers credentials from a file made by [`encode`].
    pub fn from_uf2(buf: &[u8]) -> Result<Self, PicoWifiError> {
        let block = Uf2Block::from_bytes(buf)?;
        if block.family_id != UF2_RP2040_FAMILY_ID || !block.flags().family_id_present() {
            return Err(PicoWifiError::InvalidBlock("not an RP2040 block"));
        }
        if block.target_addr != CRED_FLASH_ADDR {
            return Err(PicoWifiError::InvalidBlock("not targeting the credential page"));
        }
        if block.payload_size != PAGE_SIZE {
            return Err(PicoWifiError::InvalidBlock("credential payload must be one flash page"));
        }
        if block.magic_end != CRED_FINAL_MAGIC {
            return Err(PicoWifiError::InvalidBlock("credential block not terminated"));
        }
        if block.data()[CRED_RECORD_SIZE..].iter().any(|&b| b != 0) {
            return Err(PicoWifiError::InvalidBlock("non-zero filler after credential record"));
        }
        WifiCredentials::from_record(block.payload())
    }
}

/// Builds the `wificred.uf2` image for `ssid` and `password`.
///
/// Fields longer than 64 bytes are truncated; use [`WifiCredentials::new`]
/// with [`FieldPolicy::Reject`] to refuse them instead. Fails only on
/// characters outside Latin-1.
pub fn encode(ssid: &str, password: &str) -> Result<[u8; UF2_BLOCK_SIZE], PicoWifiError> {
    let creds = WifiCredentials::new(ssid, password, FieldPolicy::Truncate)?;
    Uf2Block::from_credentials(&creds)?.to_bytes()
}

/// Writes `data` to `path` through a temporary sibling file, so an existing
/// file is either fully replaced or left untouched.
pub fn write_uf2<P: AsRef<Path>>(path: P, data: &[u8]) -> Result<(), PicoWifiError> {
    let path = path.as_ref();
    let tmp = temp_path(path);

    let res = File::create(&tmp)
        .and_then(|mut f| {
            f.write_all(data)?;
            f.sync_all()
        })
        .and_then(|_| fs::rename(&tmp, path));

    if let Err(source) = res {
        let _ = fs::remove_file(&tmp);
        return Err(PicoWifiError::FileWriteError {
            path: path.to_path_buf(),
            source,
        });
    }
    tracing::debug!(path = %path.display(), len = data.len(), "wrote UF2");
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
