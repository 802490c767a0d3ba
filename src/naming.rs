//! DN and principal name helpers
//!
//! Derives bind names and the DNS domain from the configured Base DN, plus
//! the well-known group DNs the privileged-access filters are built from.

use chrono::Local;

use crate::config::{ConnectionConfig, LoginNameFormat};
use crate::errors::{AdError, Result};

/// Formats the username for the simple bind according to the configured
/// login name format.
///
/// `sAMAccountName` binds send the trimmed username unchanged; UPN binds
/// derive `user@domain` from the Base DN when the username carries no `@`.
pub fn bind_username(config: &ConnectionConfig) -> Result<String> {
    let username = config.username.trim();
    if username.is_empty() {
        return Err(AdError::ConfigInvalid(
            "LDAP username is not configured".to_string(),
        ));
    }

    match config.login_name {
        LoginNameFormat::SamAccountName => Ok(username.to_string()),
        LoginNameFormat::UserPrincipalName => user_principal(&config.base_dn, username),
    }
}

/// Generates a User Principal Name.
///
/// A username already containing `@` must be structurally valid as a mail
/// address; otherwise the domain comes from the Base DN.
pub fn user_principal(base_dn: &str, username: &str) -> Result<String> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AdError::ConfigInvalid(
            "username cannot be empty".to_string(),
        ));
    }

    if username.contains('@') {
        if !is_valid_mail_address(username) {
            return Err(AdError::ConfigInvalid(format!(
                "username {} looks like UPN but is invalid",
                username
            )));
        }
        return Ok(username.to_string());
    }

    let domain = base_dn_to_domain(base_dn)?;
    Ok(format!("{}@{}", username, domain))
}

/// Structural mail-address check: exactly one `@`, non-empty local part,
/// dotted domain with no whitespace
fn is_valid_mail_address(addr: &str) -> bool {
    let mut parts = addr.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let domain = parts.next().unwrap_or("");
    if local.is_empty() || domain.is_empty() {
        return false;
    }
    if domain.contains('@') || addr.chars().any(char::is_whitespace) {
        return false;
    }
    !domain.starts_with('.') && !domain.ends_with('.')
}

/// Converts a Base DN to a DNS domain name.
///
/// Takes the lowercased value of each `DC=` RDN in order, joined by `.`:
/// `DC=sec,DC=lab` becomes `sec.lab`. RDN values containing `\,`-escaped
/// commas are honored.
pub fn base_dn_to_domain(base_dn: &str) -> Result<String> {
    let base_dn = base_dn.trim();
    if base_dn.is_empty() {
        return Err(AdError::ConfigInvalid("empty baseDN".to_string()));
    }

    let mut domain_parts = Vec::new();
    for part in split_dn(base_dn) {
        let part = part.trim();
        let lower = part.to_lowercase();
        if let Some(value) = lower.strip_prefix("dc=") {
            if !value.is_empty() {
                domain_parts.push(value.to_string());
            }
        }
    }

    if domain_parts.is_empty() {
        return Err(AdError::ConfigInvalid(format!(
            "no DC components found in baseDN: {}",
            base_dn
        )));
    }

    Ok(domain_parts.join("."))
}

/// Splits a DN on commas, honoring backslash escapes inside RDN values
pub fn split_dn(dn: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut escaped = false;

    for c in dn.chars() {
        if escaped {
            current.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == ',' {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// Generates a CSV output filename: `<domain>-<YYYYMMDD-HHMMSS>.csv`.
/// Falls back to `ad` when the Base DN yields no domain.
pub fn generate_filename(base_dn: &str) -> String {
    let domain = base_dn_to_domain(base_dn).unwrap_or_else(|_| "ad".to_string());
    let timestamp = Local::now().format("%Y%m%d-%H%M%S");
    format!("{}-{}.csv", domain, timestamp)
}

/// DN of the Domain Admins group
pub fn domain_admins_dn(base_dn: &str) -> String {
    format!("CN=Domain Admins,CN=Users,{}", base_dn)
}

/// DN of the Enterprise Admins group
pub fn enterprise_admins_dn(base_dn: &str) -> String {
    format!("CN=Enterprise Admins,CN=Users,{}", base_dn)
}

/// DN of the Schema Admins group
pub fn schema_admins_dn(base_dn: &str) -> String {
    format!("CN=Schema Admins,CN=Users,{}", base_dn)
}

/// DN of the built-in Administrators group
pub fn administrators_dn(base_dn: &str) -> String {
    format!("CN=Administrators,CN=Builtin,{}", base_dn)
}

/// DN of the Domain Controllers group
pub fn domain_controllers_dn(base_dn: &str) -> String {
    format!("CN=Domain Controllers,CN=Users,{}", base_dn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionConfig;

    #[test]
    fn test_base_dn_to_domain() {
        assert_eq!(
            base_dn_to_domain("DC=corp,DC=example,DC=com").unwrap(),
            "corp.example.com"
        );
        assert_eq!(base_dn_to_domain("DC=sec,DC=lab").unwrap(), "sec.lab");
        assert_eq!(
            base_dn_to_domain("CN=Users,DC=Corp,DC=Local").unwrap(),
            "corp.local"
        );
    }

    #[test]
    fn test_base_dn_to_domain_with_escaped_comma() {
        assert_eq!(
            base_dn_to_domain("OU=Sales\\, EMEA,DC=corp,DC=example,DC=com").unwrap(),
            "corp.example.com"
        );
    }

    #[test]
    fn test_base_dn_to_domain_errors() {
        assert!(base_dn_to_domain("").is_err());
        assert!(base_dn_to_domain("CN=Users,OU=Staff").is_err());
    }

    #[test]
    fn test_user_principal_derivation() {
        assert_eq!(
            user_principal("DC=corp,DC=example,DC=com", "alice").unwrap(),
            "alice@corp.example.com"
        );
    }

    #[test]
    fn test_user_principal_passthrough() {
        assert_eq!(
            user_principal("DC=ignored,DC=lab", "bob@other.example.org").unwrap(),
            "bob@other.example.org"
        );
    }

    #[test]
    fn test_user_principal_invalid_upn() {
        assert!(user_principal("DC=sec,DC=lab", "@nodomain").is_err());
        assert!(user_principal("DC=sec,DC=lab", "user@").is_err());
        assert!(user_principal("DC=sec,DC=lab", "a b@sec.lab").is_err());
    }

    #[test]
    fn test_user_principal_empty() {
        assert!(user_principal("DC=sec,DC=lab", "  ").is_err());
    }

    #[test]
    fn test_bind_username_formats() {
        let mut cfg = ConnectionConfig {
            server: "dc01".to_string(),
            base_dn: "DC=corp,DC=example,DC=com".to_string(),
            username: "alice".to_string(),
            ..Default::default()
        };

        cfg.login_name = LoginNameFormat::UserPrincipalName;
        assert_eq!(bind_username(&cfg).unwrap(), "alice@corp.example.com");

        cfg.login_name = LoginNameFormat::SamAccountName;
        assert_eq!(bind_username(&cfg).unwrap(), "alice");
    }

    #[test]
    fn test_bind_username_trims() {
        let cfg = ConnectionConfig {
            base_dn: "DC=sec,DC=lab".to_string(),
            username: " alice ".to_string(),
            login_name: LoginNameFormat::SamAccountName,
            ..Default::default()
        };
        assert_eq!(bind_username(&cfg).unwrap(), "alice");
    }

    #[test]
    fn test_split_dn_escapes() {
        let parts = split_dn("CN=Smith\\, John,CN=Users,DC=corp");
        assert_eq!(parts, vec!["CN=Smith, John", "CN=Users", "DC=corp"]);
    }

    #[test]
    fn test_generate_filename_shape() {
        let name = generate_filename("DC=corp,DC=example,DC=com");
        assert!(name.starts_with("corp.example.com-"));
        assert!(name.ends_with(".csv"));
        // domain + '-' + YYYYMMDD-HHMMSS + .csv
        assert_eq!(name.len(), "corp.example.com-".len() + 15 + 4);

        let fallback = generate_filename("OU=nothing");
        assert!(fallback.starts_with("ad-"));
    }

    #[test]
    fn test_group_dns() {
        let base = "DC=corp,DC=example,DC=com";
        assert_eq!(
            domain_admins_dn(base),
            "CN=Domain Admins,CN=Users,DC=corp,DC=example,DC=com"
        );
        assert_eq!(
            administrators_dn(base),
            "CN=Administrators,CN=Builtin,DC=corp,DC=example,DC=com"
        );
        assert_eq!(
            domain_controllers_dn(base),
            "CN=Domain Controllers,CN=Users,DC=corp,DC=example,DC=com"
        );
    }
}
