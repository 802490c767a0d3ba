//! userAccountControl flag constants and role classification
//!
//! UAC is a 32-bit bitmask encoding account type and state
//! (MS-SAMR 2.2.1.12 / ADS_USER_FLAG_ENUM).

pub const UAC_ACCOUNT_DISABLE: u32 = 0x2;
pub const UAC_ENCRYPTED_TEXT_PASSWORD_ALLOWED: u32 = 0x80;
pub const UAC_NORMAL_ACCOUNT: u32 = 0x200;
pub const UAC_INTERDOMAIN_TRUST_ACCOUNT: u32 = 0x800;
pub const UAC_WORKSTATION_TRUST_ACCOUNT: u32 = 0x1000;
pub const UAC_SERVER_TRUST_ACCOUNT: u32 = 0x2000;
pub const UAC_DONT_EXPIRE_PASSWORD: u32 = 0x10000;
pub const UAC_MNS_LOGON_ACCOUNT: u32 = 0x20000;
pub const UAC_SMARTCARD_REQUIRED: u32 = 0x40000;
pub const UAC_TRUSTED_FOR_DELEGATION: u32 = 0x80000;
pub const UAC_NOT_DELEGATED: u32 = 0x100000;
pub const UAC_USE_DES_KEY_ONLY: u32 = 0x200000;
pub const UAC_DONT_REQUIRE_PREAUTH: u32 = 0x400000;
pub const UAC_PASSWORD_EXPIRED: u32 = 0x800000;
pub const UAC_TRUSTED_TO_AUTH_FOR_DELEGATION: u32 = 0x1000000;
pub const UAC_PARTIAL_SECRETS_ACCOUNT: u32 = 0x4000000;

// Common combinations
pub const UAC_DOMAIN_CONTROLLER: u32 = UAC_SERVER_TRUST_ACCOUNT | UAC_TRUSTED_FOR_DELEGATION; // 532480
pub const UAC_WORKSTATION_OR_SERVER: u32 = UAC_WORKSTATION_TRUST_ACCOUNT | UAC_SERVER_TRUST_ACCOUNT; // 12288
pub const UAC_DISABLED_USER: u32 = UAC_NORMAL_ACCOUNT | UAC_ACCOUNT_DISABLE; // 514
pub const UAC_KRBTGT: u32 = UAC_NORMAL_ACCOUNT | UAC_ACCOUNT_DISABLE | UAC_DONT_EXPIRE_PASSWORD; // 66050

use crate::errors::{AdError, Result};

/// Parses a userAccountControl value to `"<n>, <role>"`.
///
/// The role is matched against compound constants in priority order; values
/// that fit no known account shape fall through to `Unknown`.
pub fn parse_user_account_control(uac_str: &str) -> Result<String> {
    let uac: u32 = uac_str.parse().map_err(|e| AdError::DecodeFailed {
        attribute: "userAccountControl".to_string(),
        message: format!("failed to parse userAccountControl: {}", e),
    })?;

    let role = match uac {
        UAC_DOMAIN_CONTROLLER => "Domain Controller",
        UAC_WORKSTATION_OR_SERVER | UAC_WORKSTATION_TRUST_ACCOUNT => "Workstation / Server",
        UAC_KRBTGT => "Krbtgt",
        UAC_DISABLED_USER => "Disabled User",
        UAC_NORMAL_ACCOUNT => "User",
        _ => "Unknown",
    };

    Ok(format!("{}, {}", uac, role))
}

/// Decodes individual UAC flag names from a mask; used by report encoders
/// that need per-flag visibility rather than the role summary.
pub fn uac_flag_names(uac: u32) -> Vec<&'static str> {
    const FLAGS: &[(u32, &str)] = &[
        (UAC_ACCOUNT_DISABLE, "ACCOUNTDISABLE"),
        (UAC_ENCRYPTED_TEXT_PASSWORD_ALLOWED, "ENCRYPTED_TEXT_PASSWORD_ALLOWED"),
        (UAC_NORMAL_ACCOUNT, "NORMAL_ACCOUNT"),
        (UAC_INTERDOMAIN_TRUST_ACCOUNT, "INTERDOMAIN_TRUST_ACCOUNT"),
        (UAC_WORKSTATION_TRUST_ACCOUNT, "WORKSTATION_TRUST_ACCOUNT"),
        (UAC_SERVER_TRUST_ACCOUNT, "SERVER_TRUST_ACCOUNT"),
        (UAC_DONT_EXPIRE_PASSWORD, "DONT_EXPIRE_PASSWORD"),
        (UAC_MNS_LOGON_ACCOUNT, "MNS_LOGON_ACCOUNT"),
        (UAC_SMARTCARD_REQUIRED, "SMARTCARD_REQUIRED"),
        (UAC_TRUSTED_FOR_DELEGATION, "TRUSTED_FOR_DELEGATION"),
        (UAC_NOT_DELEGATED, "NOT_DELEGATED"),
        (UAC_USE_DES_KEY_ONLY, "USE_DES_KEY_ONLY"),
        (UAC_DONT_REQUIRE_PREAUTH, "DONT_REQUIRE_PREAUTH"),
        (UAC_PASSWORD_EXPIRED, "PASSWORD_EXPIRED"),
        (UAC_TRUSTED_TO_AUTH_FOR_DELEGATION, "TRUSTED_TO_AUTH_FOR_DELEGATION"),
        (UAC_PARTIAL_SECRETS_ACCOUNT, "PARTIAL_SECRETS_ACCOUNT"),
    ];

    FLAGS
        .iter()
        .filter(|(bit, _)| uac & bit != 0)
        .map(|(_, name)| *name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_controller() {
        assert_eq!(
            parse_user_account_control("532480").unwrap(),
            "532480, Domain Controller"
        );
    }

    #[test]
    fn test_workstation_or_server() {
        assert_eq!(
            parse_user_account_control("12288").unwrap(),
            "12288, Workstation / Server"
        );
        assert_eq!(
            parse_user_account_control("4096").unwrap(),
            "4096, Workstation / Server"
        );
    }

    #[test]
    fn test_disabled_user() {
        assert_eq!(
            parse_user_account_control("514").unwrap(),
            "514, Disabled User"
        );
    }

    #[test]
    fn test_krbtgt() {
        assert_eq!(parse_user_account_control("66050").unwrap(), "66050, Krbtgt");
    }

    #[test]
    fn test_normal_user() {
        assert_eq!(parse_user_account_control("512").unwrap(), "512, User");
    }

    #[test]
    fn test_unmatched_falls_through_to_unknown() {
        assert_eq!(parse_user_account_control("2080").unwrap(), "2080, Unknown");
        assert_eq!(
            parse_user_account_control("66048").unwrap(),
            "66048, Unknown"
        );
    }

    #[test]
    fn test_invalid_input() {
        assert!(parse_user_account_control("").is_err());
        assert!(parse_user_account_control("abc").is_err());
        assert!(parse_user_account_control("-1").is_err());
    }

    #[test]
    fn test_compound_constants() {
        assert_eq!(UAC_DOMAIN_CONTROLLER, 532480);
        assert_eq!(UAC_WORKSTATION_OR_SERVER, 12288);
        assert_eq!(UAC_DISABLED_USER, 514);
    }

    #[test]
    fn test_flag_names() {
        let names = uac_flag_names(UAC_NORMAL_ACCOUNT | UAC_DONT_REQUIRE_PREAUTH);
        assert_eq!(names, vec!["NORMAL_ACCOUNT", "DONT_REQUIRE_PREAUTH"]);
        assert!(uac_flag_names(0).is_empty());
    }
}
