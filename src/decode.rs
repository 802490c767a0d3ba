//! Attribute value formatting
//!
//! Maps `(entry, attribute name)` to a single printable string suitable for
//! any report format. Dispatch is a table on the attribute name; every
//! formatter is a pure function over the raw bytes. Decode failures are
//! per-attribute and never abort the stream: `format_entry_attributes`
//! renders them as the empty string.

use std::collections::BTreeMap;

use ldap3::SearchEntry;

use crate::acl::format_sd_summary;
use crate::attributes::*;
use crate::errors::{AdError, Result};
use crate::identity::{parse_object_guid, parse_object_sid};
use crate::security::{attribute_hex_bytes, format_rbcd, supported_encryption_types};
use crate::timestamps::{account_expires, generalized_time_to_date_time, parse_file_time};
use crate::uac::parse_user_account_control;

/// Returns the first string value of an attribute, or empty
pub fn attr_value<'a>(entry: &'a SearchEntry, name: &str) -> &'a str {
    entry
        .attrs
        .get(name)
        .and_then(|v| v.first())
        .map(String::as_str)
        .unwrap_or("")
}

/// Returns all string values of an attribute
pub fn attr_values<'a>(entry: &'a SearchEntry, name: &str) -> &'a [String] {
    entry.attrs.get(name).map(Vec::as_slice).unwrap_or(&[])
}

/// Returns the first raw value of an attribute.
///
/// ldap3 routes values that fail UTF-8 validation into `bin_attrs`; values
/// that happen to be valid UTF-8 stay in `attrs`, so binary decoders must
/// consult both maps.
pub fn raw_attr_value<'a>(entry: &'a SearchEntry, name: &str) -> &'a [u8] {
    if let Some(v) = entry.bin_attrs.get(name).and_then(|v| v.first()) {
        return v;
    }
    entry
        .attrs
        .get(name)
        .and_then(|v| v.first())
        .map(String::as_bytes)
        .unwrap_or(&[])
}

/// Formats an LDAP attribute value based on the attribute name.
///
/// Specialized decoders cover the Windows-typed attributes (GUIDs, SIDs,
/// FILETIMEs, UAC masks, security descriptors, encryption type masks);
/// everything else passes through as text, or hex when the value looks
/// binary.
pub fn format_attribute_value(entry: &SearchEntry, attribute: &str) -> Result<String> {
    match attribute {
        ATTR_OBJECT_CLASS => format_object_class(entry),

        ATTR_OBJECT_GUID => parse_object_guid(raw_attr_value(entry, attribute)),

        ATTR_OBJECT_SID | ATTR_MSDS_CREATOR_SID => {
            parse_object_sid(raw_attr_value(entry, attribute))
        }

        ATTR_WHEN_CREATED | ATTR_WHEN_CHANGED | ATTR_DS_CORE_PROPAGATION_DATA => {
            generalized_time_to_date_time(attr_value(entry, attribute))
        }

        ATTR_MSDS_SUPPORTED_ENCRYPTION_TYPES => {
            supported_encryption_types(attr_value(entry, attribute))
        }

        ATTR_LAST_LOGON | ATTR_PWD_LAST_SET | ATTR_LAST_LOGON_TIMESTAMP
        | ATTR_BAD_PASSWORD_TIME => parse_file_time(attr_value(entry, attribute)),

        ATTR_MSDS_GENERATION_ID | ATTR_LOGON_HOURS => {
            let raw = raw_attr_value(entry, attribute);
            if raw.is_empty() {
                return Ok(String::new());
            }
            Ok(attribute_hex_bytes(raw))
        }

        ATTR_MSDS_ALLOWED_TO_ACT => {
            let raw = raw_attr_value(entry, attribute);
            if raw.is_empty() {
                return Ok(String::new());
            }
            Ok(format_rbcd(raw))
        }

        ATTR_NT_SECURITY_DESCRIPTOR => {
            let raw = raw_attr_value(entry, attribute);
            if raw.is_empty() {
                return Ok(String::new());
            }
            // Summary first; raw hex when the descriptor does not parse
            match format_sd_summary(raw) {
                Ok(summary) if !summary.is_empty() => Ok(summary),
                _ => Ok(attribute_hex_bytes(raw)),
            }
        }

        ATTR_USER_ACCOUNT_CONTROL => parse_user_account_control(attr_value(entry, attribute)),

        ATTR_ACCOUNT_EXPIRES => account_expires(attr_value(entry, attribute)),

        _ => {
            let v = attr_value(entry, attribute);
            if v.is_empty() {
                let raw = raw_attr_value(entry, attribute);
                if raw.is_empty() {
                    return Ok(String::new());
                }
                return Ok(attribute_hex_bytes(raw));
            }
            if is_binary_like(v) {
                return Ok(attribute_hex_bytes(v.as_bytes()));
            }
            Ok(v.to_string())
        }
    }
}

/// Joins the multi-valued objectClass list with commas.
/// The most specific class is conventionally last.
fn format_object_class(entry: &SearchEntry) -> Result<String> {
    let classes = attr_values(entry, ATTR_OBJECT_CLASS);
    if classes.is_empty() {
        return Err(AdError::DecodeFailed {
            attribute: ATTR_OBJECT_CLASS.to_string(),
            message: "invalid objectClass: no values found".to_string(),
        });
    }
    Ok(classes.join(","))
}

/// Detects strings that carry binary data: control characters other than
/// tab/newline/carriage return, or DEL
fn is_binary_like(s: &str) -> bool {
    s.chars().any(|c| {
        (c < '\u{20}' && c != '\t' && c != '\n' && c != '\r')
            || c == '\u{7f}'
            || c == char::REPLACEMENT_CHARACTER
    })
}

/// Formats every attribute of an entry into a sorted name/value map.
///
/// Decode failures surface as empty strings so the entry still flows
/// through the report encoders.
pub fn format_entry_attributes(entry: &SearchEntry) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for name in entry.attrs.keys().chain(entry.bin_attrs.keys()) {
        if out.contains_key(name) {
            continue;
        }
        let value = format_attribute_value(entry, name).unwrap_or_default();
        out.insert(name.clone(), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn entry_with(attrs: Vec<(&str, Vec<&str>)>, bins: Vec<(&str, Vec<Vec<u8>>)>) -> SearchEntry {
        SearchEntry {
            dn: "CN=Test,CN=Users,DC=corp,DC=example,DC=com".to_string(),
            attrs: attrs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.into_iter().map(String::from).collect()))
                .collect(),
            bin_attrs: bins
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect::<HashMap<_, _>>(),
        }
    }

    #[test]
    fn test_object_class_joined() {
        let entry = entry_with(
            vec![(
                "objectClass",
                vec!["top", "person", "organizationalPerson", "user"],
            )],
            vec![],
        );
        assert_eq!(
            format_attribute_value(&entry, "objectClass").unwrap(),
            "top,person,organizationalPerson,user"
        );
    }

    #[test]
    fn test_object_class_empty_is_error() {
        let entry = entry_with(vec![], vec![]);
        assert!(format_attribute_value(&entry, "objectClass").is_err());
    }

    #[test]
    fn test_object_guid_dispatch() {
        let guid = vec![
            0xd0, 0xcf, 0x11, 0xe0, 0xa1, 0xb1, 0x1a, 0xe1, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x46,
        ];
        let entry = entry_with(vec![], vec![("objectGUID", vec![guid])]);
        assert_eq!(
            format_attribute_value(&entry, "objectGUID").unwrap(),
            "{e011cfd0-b1a1-e11a-0000-000000000046}"
        );
    }

    #[test]
    fn test_object_sid_dispatch() {
        let sid = vec![
            0x01, 0x05, 0x00, 0x00, 0x00, 0x00, 0x00, 0x05, 0x15, 0, 0, 0, 0x07, 0x02, 0, 0, 0x08,
            0x02, 0, 0, 0x09, 0x02, 0, 0, 0xe9, 0x03, 0, 0,
        ];
        let entry = entry_with(vec![], vec![("objectSid", vec![sid])]);
        assert_eq!(
            format_attribute_value(&entry, "objectSid").unwrap(),
            "S-1-5-21-519-520-521-1001"
        );
    }

    #[test]
    fn test_uac_dispatch() {
        let entry = entry_with(vec![("userAccountControl", vec!["532480"])], vec![]);
        assert_eq!(
            format_attribute_value(&entry, "userAccountControl").unwrap(),
            "532480, Domain Controller"
        );
    }

    #[test]
    fn test_account_expires_dispatch() {
        let entry = entry_with(
            vec![("accountExpires", vec!["9223372036854775807"])],
            vec![],
        );
        assert_eq!(
            format_attribute_value(&entry, "accountExpires").unwrap(),
            "9223372036854775807, never"
        );
    }

    #[test]
    fn test_filetime_zero_is_error() {
        let entry = entry_with(vec![("lastLogon", vec!["0"])], vec![]);
        assert!(format_attribute_value(&entry, "lastLogon").is_err());
    }

    #[test]
    fn test_logon_hours_hex() {
        let entry = entry_with(
            vec![],
            vec![("logonHours", vec![vec![0xff, 0x00, 0xab]])],
        );
        assert_eq!(
            format_attribute_value(&entry, "logonHours").unwrap(),
            "0xFF00AB"
        );
    }

    #[test]
    fn test_default_passthrough() {
        let entry = entry_with(vec![("sAMAccountName", vec!["svc-web"])], vec![]);
        assert_eq!(
            format_attribute_value(&entry, "sAMAccountName").unwrap(),
            "svc-web"
        );
    }

    #[test]
    fn test_default_binary_like_hexed() {
        let entry = entry_with(vec![("description", vec!["a\u{1}b"])], vec![]);
        assert_eq!(
            format_attribute_value(&entry, "description").unwrap(),
            "0x610162"
        );
    }

    #[test]
    fn test_default_whitespace_allowed() {
        let entry = entry_with(vec![("info", vec!["line1\nline2\ttab"])], vec![]);
        assert_eq!(
            format_attribute_value(&entry, "info").unwrap(),
            "line1\nline2\ttab"
        );
    }

    #[test]
    fn test_default_binary_attr_hexed() {
        let entry = entry_with(vec![], vec![("someBlob", vec![vec![0xde, 0xad]])]);
        assert_eq!(
            format_attribute_value(&entry, "someBlob").unwrap(),
            "0xDEAD"
        );
    }

    #[test]
    fn test_missing_attribute_is_empty() {
        let entry = entry_with(vec![], vec![]);
        assert_eq!(format_attribute_value(&entry, "absent").unwrap(), "");
    }

    #[test]
    fn test_security_descriptor_empty() {
        let entry = entry_with(vec![], vec![("nTSecurityDescriptor", vec![vec![]])]);
        assert_eq!(
            format_attribute_value(&entry, "nTSecurityDescriptor").unwrap(),
            ""
        );
    }

    #[test]
    fn test_security_descriptor_garbage_falls_back_to_hex() {
        let entry = entry_with(
            vec![],
            vec![("nTSecurityDescriptor", vec![vec![0x01, 0x02, 0x03]])],
        );
        assert_eq!(
            format_attribute_value(&entry, "nTSecurityDescriptor").unwrap(),
            "0x010203"
        );
    }

    #[test]
    fn test_rbcd_dispatch() {
        let mut blob = vec![0x01, 0x00, 0x04, 0x80];
        blob.extend_from_slice(&[0x01, 0x01, 0, 0, 0, 0, 0, 0x05, 18, 0, 0, 0]);
        let entry = entry_with(
            vec![],
            vec![("msDS-AllowedToActOnBehalfOfOtherIdentity", vec![blob])],
        );
        assert_eq!(
            format_attribute_value(&entry, "msDS-AllowedToActOnBehalfOfOtherIdentity").unwrap(),
            "S-1-5-18"
        );
    }

    #[test]
    fn test_format_entry_attributes_maps_failures_to_empty() {
        let entry = entry_with(
            vec![
                ("sAMAccountName", vec!["alice"]),
                ("lastLogon", vec!["0"]), // decode failure, renders empty
            ],
            vec![],
        );
        let map = format_entry_attributes(&entry);
        assert_eq!(map["sAMAccountName"], "alice");
        assert_eq!(map["lastLogon"], "");
    }
}
