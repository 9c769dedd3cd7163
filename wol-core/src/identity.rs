//! Device identity: 6-byte MAC addresses, parsed from colon/hyphen separated hex text.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Length of a MAC address in bytes.
pub const MAC_LEN: usize = 6;

/// Hardware (MAC) address. Immutable once parsed.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct MacAddress([u8; MAC_LEN]);

impl MacAddress {
    pub const fn new(bytes: [u8; MAC_LEN]) -> Self {
        MacAddress(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; MAC_LEN] {
        &self.0
    }

    /// Parse `AA:BB:CC:DD:EE:FF`, `aa-bb-cc-dd-ee-ff` or `AABBCCDDEEFF`.
    /// Separators are stripped; exactly 12 hex digits must remain.
    pub fn parse(text: &str) -> Result<Self, MacParseError> {
        let cleaned: String = text.chars().filter(|c| *c != ':' && *c != '-').collect();
        if cleaned.len() != MAC_LEN * 2 {
            return Err(MacParseError::InvalidAddressFormat(text.to_owned()));
        }
        let mut bytes = [0u8; MAC_LEN];
        hex::decode_to_slice(&cleaned, &mut bytes)
            .map_err(|_| MacParseError::InvalidAddressFormat(text.to_owned()))?;
        Ok(MacAddress(bytes))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            a, b, c, d, e, g
        )
    }
}

impl FromStr for MacAddress {
    type Err = MacParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MacAddress::parse(s)
    }
}

// Serialized as its canonical text form so it reads naturally in TOML.
impl Serialize for MacAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddress {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let text = String::deserialize(d)?;
        MacAddress::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MacParseError {
    #[error("invalid MAC address format: {0:?}")]
    InvalidAddressFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_colon_hyphen_and_bare() {
        let expected = MacAddress::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
        assert_eq!(MacAddress::parse("AA:BB:CC:DD:EE:FF").unwrap(), expected);
        assert_eq!(MacAddress::parse("aa-bb-cc-dd-ee-ff").unwrap(), expected);
        assert_eq!(MacAddress::parse("AABBCCDDEEFF").unwrap(), expected);
        assert_eq!("aA:bB-cCdD:eE:fF".parse::<MacAddress>().unwrap(), expected);
    }

    #[test]
    fn parse_rejects_wrong_length_and_non_hex() {
        for bad in [
            "",
            "AA:BB:CC:DD:EE",
            "AA:BB:CC:DD:EE:FF:00",
            "AA:BB:CC:DD:EE:GG",
            "AA BB CC DD EE FF",
            "AA:BB:CC:DD:EE:F",
        ] {
            assert!(
                matches!(
                    MacAddress::parse(bad),
                    Err(MacParseError::InvalidAddressFormat(_))
                ),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn display_is_upper_case_colon_form() {
        let mac = MacAddress::parse("0a-1b-2c-3d-4e-5f").unwrap();
        assert_eq!(mac.to_string(), "0A:1B:2C:3D:4E:5F");
        assert_eq!(MacAddress::parse(&mac.to_string()).unwrap(), mac);
    }
}
