//! Kerberos encryption type masks, hex rendering, and RBCD SID extraction

use crate::errors::{AdError, Result};
use crate::identity::parse_object_sid;

/// A single encryption type flag with its bit position and name, used to
/// decode the msDS-SupportedEncryptionTypes attribute
struct EncryptionType {
    bit: u64,
    name: &'static str,
}

const ENCRYPTION_TYPES: &[EncryptionType] = &[
    EncryptionType { bit: 1 << 0, name: "DES_CBC_CRC" },
    EncryptionType { bit: 1 << 1, name: "DES_CBC_MD5" },
    EncryptionType { bit: 1 << 2, name: "RC4_HMAC" },
    EncryptionType { bit: 1 << 3, name: "AES128_CTS_HMAC_SHA1_96" },
    EncryptionType { bit: 1 << 4, name: "AES256_CTS_HMAC_SHA1_96" },
    EncryptionType { bit: 1 << 5, name: "FAST_Supported" },
    EncryptionType { bit: 1 << 6, name: "Compound_Identity_Supported" },
    EncryptionType { bit: 1 << 7, name: "Claims_Supported" },
    EncryptionType { bit: 1 << 8, name: "Resource_SID_Compression_Disabled" },
    EncryptionType { bit: 1 << 9, name: "AES256_CTS_HMAC_SHA1_96_SK" },
];

/// Parses the msDS-SupportedEncryptionTypes bitmask.
/// https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-kile/6cfc7b50-11ed-4b4d-846d-6f08f0812919
pub fn supported_encryption_types(raw: &str) -> Result<String> {
    let mask: u64 = raw.parse().map_err(|e| AdError::DecodeFailed {
        attribute: "msDS-SupportedEncryptionTypes".to_string(),
        message: format!("invalid encryption types value: {}", e),
    })?;

    let mut supported: Vec<String> = ENCRYPTION_TYPES
        .iter()
        .filter(|t| mask & t.bit != 0)
        .map(|t| t.name.to_string())
        .collect();

    // Bits 10-31 are undefined; report them rather than dropping silently
    let remaining = mask & !((1u64 << 10) - 1);
    if remaining != 0 {
        supported.push(format!("UNKNOWN_BITS(0x{:X})", remaining));
    }

    if supported.is_empty() {
        return Ok(format!("NONE(0x{:X})", mask));
    }
    Ok(supported.join(" | "))
}

/// Converts raw bytes to a hexadecimal string with "0x" prefix (uppercase)
pub fn attribute_hex_bytes(raw: &[u8]) -> String {
    format!("0x{}", hex::encode_upper(raw))
}

/// Extracts SIDs embedded in msDS-AllowedToActOnBehalfOfOtherIdentity.
///
/// The attribute carries a security descriptor; rather than a full descriptor
/// walk, this scans for the NT_AUTHORITY SID signature (revision 0x01,
/// authority 00 00 00 00 00 05) and decodes each match.
pub fn parse_rbcd_binary(data: &[u8]) -> Vec<String> {
    let mut sids = Vec::new();

    if data.len() < 8 {
        return sids;
    }

    let mut i = 0;
    while i + 8 <= data.len() {
        if data[i] != 0x01 {
            i += 1;
            continue;
        }

        let sub_auth_count = data[i + 1] as usize;
        let sid_len = 8 + sub_auth_count * 4;
        if i + sid_len > data.len() {
            i += 1;
            continue;
        }

        if data[i + 2..i + 7] != [0, 0, 0, 0, 0] || data[i + 7] != 0x05 {
            i += 1;
            continue;
        }

        match parse_object_sid(&data[i..i + sid_len]) {
            Ok(sid) => {
                sids.push(sid);
                i += sid_len;
            }
            Err(_) => {
                i += 1;
            }
        }
    }

    sids
}

/// Formats an RBCD blob: embedded SIDs joined with `, `, hex on failure
pub fn format_rbcd(raw: &[u8]) -> String {
    let sids = parse_rbcd_binary(raw);
    if sids.is_empty() {
        return attribute_hex_bytes(raw);
    }
    sids.join(", ")
}
