use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bytes::ByteArray;
use crate::cmd::PicoWifiError;

/// Magic number marking a valid credential record in flash
pub const WIFI_CRED_MAGIC: u32 = 0x55AAAA55;
/// Completion marker closing a credential block. Shares its value with the
/// UF2 end-of-block magic, and the credential block relies on that.
pub const CRED_FINAL_MAGIC: u32 = 0x0AB16F30;
/// Size of the SSID and password fields, in bytes
pub const CRED_FIELD_SIZE: usize = 64;
/// Size of the serialized credential record
pub const CRED_RECORD_SIZE: usize = 4 + CRED_FIELD_SIZE * 2 + 4;

/// Authentication modes understood by the CYW43 driver
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthType {
    Open = 0x00000000,
    WpaTkipPsk = 0x00200002,
    #[default]
    Wpa2AesPsk = 0x00400004,
    Wpa2MixedPsk = 0x00400006,
}

impl AuthType {
    pub fn value(self) -> u32 {
        self as u32
    }

    /// Packs the auth mode into the 16-bit `wValue` of a connect request.
    /// The device unpacks it as `(v & 0xF) | ((v & 0xFFF0) << 12)`.
    pub fn to_w_value(self) -> u16 {
        let v = self.value();
        ((v & 0xF) | ((v >> 12) & 0xFFF0)) as u16
    }
}

impl TryFrom<u32> for AuthType {
    type Error = PicoWifiError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0x00000000 => Ok(AuthType::Open),
            0x00200002 => Ok(AuthType::WpaTkipPsk),
            0x00400004 => Ok(AuthType::Wpa2AesPsk),
            0x00400006 => Ok(AuthType::Wpa2MixedPsk),
            _ => Err(PicoWifiError::InvalidBlock("unknown authentication type")),
        }
    }
}

/// Credential text field, for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialField {
    Ssid,
    Password,
}

impl fmt::Display for CredentialField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialField::Ssid => f.write_str("SSID"),
            CredentialField::Password => f.write_str("password"),
        }
    }
}

/// What to do with an SSID or password longer than [`CRED_FIELD_SIZE`] bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldPolicy {
    /// Silently keep the first 64 bytes
    #[default]
    Truncate,
    /// Fail with [`PicoWifiError::FieldTooLong`]
    Reject,
}

/// On-flash layout read by the firmware at boot
#[derive(Debug, Serialize, Deserialize)]
struct CredRecord {
    magic: u32,
    ssid: ByteArray<CRED_FIELD_SIZE>,
    password: ByteArray<CRED_FIELD_SIZE>,
    auth: u32,
}

/// WiFi credentials as stored on a PicoWifi device
#[derive(Clone, PartialEq, Eq)]
pub struct WifiCredentials {
    ssid: ByteArray<CRED_FIELD_SIZE>,
    password: ByteArray<CRED_FIELD_SIZE>,
    auth: AuthType,
}

impl WifiCredentials {
    pub fn new(ssid: &str, password: &str, policy: FieldPolicy) -> Result<Self, PicoWifiError> {
        Ok(WifiCredentials {
            ssid: ByteArray::padded(&encode_field(CredentialField::Ssid, ssid, policy)?),
            password: ByteArray::padded(&encode_field(
                CredentialField::Password,
                password,
                policy,
            )?),
            auth: AuthType::default(),
        })
    }

    pub fn with_auth(mut self, auth: AuthType) -> Self {
        self.auth = auth;
        self
    }

    /// SSID bytes, without NUL padding
    pub fn ssid_bytes(&self) -> &[u8] {
        trim_nul(&self.ssid.0)
    }

    /// Password bytes, without NUL padding
    pub fn password_bytes(&self) -> &[u8] {
        trim_nul(&self.password.0)
    }

    pub fn ssid(&self) -> String {
        decode_latin1(self.ssid_bytes())
    }

    pub fn password(&self) -> String {
        decode_latin1(self.password_bytes())
    }

    pub fn auth(&self) -> AuthType {
        self.auth
    }

    /// Serializes the 136-byte record the firmware looks for in flash.
    pub fn to_record(&self) -> Result<Vec<u8>, PicoWifiError> {
        let rec = CredRecord {
            magic: WIFI_CRED_MAGIC,
            ssid: self.ssid,
            password: self.password,
            auth: self.auth.value(),
        };
        Ok(bincode::serialize(&rec)?)
    }

    /// Parses a record produced by [`WifiCredentials::to_record`].
    pub fn from_record(buf: &[u8]) -> Result<Self, PicoWifiError> {
        if buf.len() < CRED_RECORD_SIZE {
            return Err(PicoWifiError::InvalidBlock("credential record truncated"));
        }
        let rec: CredRecord = bincode::deserialize(&buf[..CRED_RECORD_SIZE])?;
        if rec.magic != WIFI_CRED_MAGIC {
            return Err(PicoWifiError::InvalidBlock("bad credential magic"));
        }
        Ok(WifiCredentials {
            ssid: rec.ssid,
            password: rec.password,
            auth: AuthType::try_from(rec.auth)?,
        })
    }
}

impl fmt::Debug for WifiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WifiCredentials")
            .field("ssid", &self.ssid())
            .field("password", &"<redacted>")
            .field("auth", &self.auth)
            .finish()
    }
}

/// Encodes `text` as Latin-1, one byte per char, applying `policy` to
/// anything past [`CRED_FIELD_SIZE`] bytes.
pub fn encode_field(
    field: CredentialField,
    text: &str,
    policy: FieldPolicy,
) -> Result<Vec<u8>, PicoWifiError> {
    let mut out = text
        .chars()
        .map(|ch| u8::try_from(ch).map_err(|_| PicoWifiError::UnencodableChar { field, ch }))
        .collect::<Result<Vec<u8>, _>>()?;

    if out.len() > CRED_FIELD_SIZE {
        match policy {
            FieldPolicy::Truncate => {
                tracing::debug!(%field, len = out.len(), "truncating to {} bytes", CRED_FIELD_SIZE);
                out.truncate(CRED_FIELD_SIZE);
            }
            FieldPolicy::Reject => {
                return Err(PicoWifiError::FieldTooLong {
                    field,
                    len: out.len(),
                    max: CRED_FIELD_SIZE,
                });
            }
        }
    }
    Ok(out)
}

fn trim_nul(buf: &[u8]) -> &[u8] {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    &buf[..end]
}

fn decode_latin1(buf: &[u8]) -> String {
    buf.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_layout() {
        let creds = WifiCredentials::new("MyNet", "secret", FieldPolicy::Truncate).unwrap();
        let rec = creds.to_record().unwrap();
        assert_eq!(rec.len(), CRED_RECORD_SIZE);
        assert_eq!(rec.len(), 136);
        assert_eq!(&rec[0..4], &WIFI_CRED_MAGIC.to_le_bytes());
        assert_eq!(&rec[4..9], b"MyNet");
        assert!(rec[9..68].iter().all(|&b| b == 0));
        assert_eq!(&rec[68..74], b"secret");
        assert!(rec[74..132].iter().all(|&b| b == 0));
        assert_eq!(&rec[132..136], &0x00400004u32.to_le_bytes());
    }

    #[test]
    fn latin1_is_one_byte_per_char() {
        let creds = WifiCredentials::new("Café", "ÿ", FieldPolicy::Reject).unwrap();
        assert_eq!(creds.ssid_bytes(), &[b'C', b'a', b'f', 0xE9]);
        assert_eq!(creds.password_bytes(), &[0xFF]);
        assert_eq!(creds.ssid(), "Café");
    }

    #[test]
    fn non_latin1_is_rejected_in_either_mode() {
        for policy in [FieldPolicy::Truncate, FieldPolicy::Reject] {
            match WifiCredentials::new("net", "pass€", policy) {
                Err(PicoWifiError::UnencodableChar { field, ch }) => {
                    assert_eq!(field, CredentialField::Password);
                    assert_eq!(ch, '€');
                }
                other => panic!("unexpected result: {:?}", other),
            }
        }
    }

    #[test]
    fn overlong_field_truncates_by_default() {
        let long = "x".repeat(80);
        let creds = WifiCredentials::new(&long, "pw", FieldPolicy::default()).unwrap();
        assert_eq!(creds.ssid_bytes().len(), CRED_FIELD_SIZE);
        assert_eq!(creds.ssid(), "x".repeat(64));
    }

    #[test]
    fn overlong_field_rejected_in_strict_mode() {
        let long = "y".repeat(65);
        match WifiCredentials::new("net", &long, FieldPolicy::Reject) {
            Err(PicoWifiError::FieldTooLong { field, len, max }) => {
                assert_eq!(field, CredentialField::Password);
                assert_eq!(len, 65);
                assert_eq!(max, 64);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        // exactly 64 bytes still fits
        assert!(WifiCredentials::new(&"z".repeat(64), "", FieldPolicy::Reject).is_ok());
    }

    #[test]
    fn record_parses_back() {
        let creds = WifiCredentials::new("home", "letmein", FieldPolicy::Truncate)
            .unwrap()
            .with_auth(AuthType::Wpa2MixedPsk);
        let parsed = WifiCredentials::from_record(&creds.to_record().unwrap()).unwrap();
        assert_eq!(parsed, creds);
        assert_eq!(parsed.password(), "letmein");
    }

    #[test]
    fn record_with_bad_magic_is_rejected() {
        let mut rec = WifiCredentials::new("a", "b", FieldPolicy::Truncate)
            .unwrap()
            .to_record()
            .unwrap();
        rec[0] ^= 0xFF;
        assert!(matches!(
            WifiCredentials::from_record(&rec),
            Err(PicoWifiError::InvalidBlock(_))
        ));
    }

    #[test]
    fn connect_w_value_packing() {
        assert_eq!(AuthType::Wpa2AesPsk.to_w_value(), 0x0404);
        assert_eq!(AuthType::WpaTkipPsk.to_w_value(), 0x0202);
        assert_eq!(AuthType::Wpa2MixedPsk.to_w_value(), 0x0406);
        assert_eq!(AuthType::Open.to_w_value(), 0);
    }

    #[test]
    fn debug_output_hides_password() {
        let creds = WifiCredentials::new("net", "topsecret", FieldPolicy::Truncate).unwrap();
        let s = format!("{:?}", creds);
        assert!(s.contains("net"));
        assert!(!s.contains("topsecret"));
    }
}
