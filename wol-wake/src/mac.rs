//! Hardware (MAC) address parsing.

use std::fmt;
use std::str::FromStr;

use crate::error::WakeError;

/// A 48-bit hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl FromStr for MacAddress {
    type Err = WakeError;

    /// Accepts six hex octets separated by `:` or `-`, e.g. `AA:BB:CC:DD:EE:FF`
    /// or `aa-bb-cc-dd-ee-ff`. Single-digit octets (`a:b:c:d:e:f`) are allowed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || WakeError::AddressInvalid(s.to_string());

        let parts: Vec<&str> = trimmed.split(|c| c == ':' || c == '-').collect();
        if parts.len() != 6 {
            return Err(invalid());
        }

        let mut octets = [0u8; 6];
        for (slot, part) in octets.iter_mut().zip(parts) {
            if part.is_empty() || part.len() > 2 || !part.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(invalid());
            }
            *slot = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }

        Ok(Self(octets))
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

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("AA:BB:CC:DD:EE:FF", [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF])]
    #[case("aa-bb-cc-dd-ee-ff", [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF])]
    #[case("00:11:22:33:44:55", [0x00, 0x11, 0x22, 0x33, 0x44, 0x55])]
    #[case("  01:02:03:04:05:06  ", [1, 2, 3, 4, 5, 6])]
    #[case("a:b:c:d:e:f", [0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F])]
    #[case("AA-BB:CC-DD:EE-FF", [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF])]
    fn test_parse_valid(#[case] input: &str, #[case] expected: [u8; 6]) {
        let mac: MacAddress = input.parse().unwrap();
        assert_eq!(mac.octets(), expected);
    }

    #[rstest]
    #[case("AA:BB:CC")]
    #[case("AA:BB:CC:DD:EE:FF:00")]
    #[case("")]
    #[case("AA:BB:CC:DD:EE:")]
    #[case("GG:BB:CC:DD:EE:FF")]
    #[case("AAA:BB:CC:DD:EE:FF")]
    #[case("AABBCCDDEEFF")]
    #[case("AA.BB.CC.DD.EE.FF")]
    fn test_parse_invalid(#[case] input: &str) {
        let result = input.parse::<MacAddress>();
        assert_eq!(result, Err(WakeError::AddressInvalid(input.to_string())));
    }

    #[test]
    fn test_display_is_uppercase_colon_separated() {
        let mac: MacAddress = "0a-1b-2c-3d-4e-5f".parse().unwrap();
        assert_eq!(mac.to_string(), "0A:1B:2C:3D:4E:5F");
    }
}
