//! Input validation for filters, DNs, and attribute names
//!
//! Catches malformed input locally before it reaches the DC, where the same
//! mistakes would surface as opaque server-side syntax errors.

use crate::errors::{AdError, Result};

/// Maximum accepted DN length
pub const MAX_DN_LENGTH: usize = 2048;
/// Maximum accepted LDAP filter length
pub const MAX_FILTER_LENGTH: usize = 4096;

fn validation_err(field: &str, value: &str, reason: &str) -> AdError {
    AdError::ConfigInvalid(format!(
        "{} validation failed: {} (value: {})",
        field, reason, value
    ))
}

/// Validates an LDAP search filter: balanced parentheses, wrapped in a
/// parenthesized expression, within the length bound.
pub fn validate_filter(filter: &str) -> Result<()> {
    if filter.is_empty() {
        return Err(validation_err("filter", filter, "cannot be empty"));
    }

    if filter.len() > MAX_FILTER_LENGTH {
        return Err(validation_err("filter", filter, "exceeds maximum length"));
    }

    let open = filter.bytes().filter(|&b| b == b'(').count();
    let close = filter.bytes().filter(|&b| b == b')').count();
    if open != close {
        return Err(validation_err(
            "filter",
            filter,
            "contains unbalanced parentheses",
        ));
    }

    if !filter.starts_with('(') {
        return Err(validation_err("filter", filter, "must start with '('"));
    }
    if !filter.ends_with(')') {
        return Err(validation_err("filter", filter, "must end with ')'"));
    }

    Ok(())
}

/// Validates an LDAP Distinguished Name. Empty DNs are allowed (RootDSE).
pub fn validate_dn(dn: &str) -> Result<()> {
    if dn.is_empty() {
        return Ok(());
    }

    if dn.len() > MAX_DN_LENGTH {
        return Err(validation_err("DN", dn, "exceeds maximum length"));
    }

    let upper = dn.to_uppercase();
    let valid_prefix = ["CN=", "OU=", "DC="]
        .iter()
        .any(|p| upper.starts_with(p));
    if !valid_prefix {
        return Err(validation_err(
            "DN",
            dn,
            "must start with a valid prefix (CN=, OU=, DC=)",
        ));
    }

    Ok(())
}

/// Validates a Base DN: must carry at least one DC= component
pub fn validate_base_dn(dn: &str) -> Result<()> {
    if dn.is_empty() {
        return Ok(());
    }

    if !dn.to_uppercase().contains("DC=") {
        return Err(validation_err(
            "BaseDN",
            dn,
            "should contain 'DC=' components",
        ));
    }

    Ok(())
}

/// Validates an LDAP attribute name: starts with a letter, then letters,
/// digits, or hyphens
pub fn validate_attribute(attr: &str) -> Result<()> {
    if attr.is_empty() {
        return Err(validation_err("attribute", attr, "cannot be empty"));
    }

    let mut chars = attr.chars();
    let first_ok = chars.next().map(|c| c.is_ascii_alphabetic()).unwrap_or(false);
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '-');
    if !first_ok || !rest_ok {
        return Err(validation_err(
            "attribute",
            attr,
            "contains invalid characters (must start with letter, contain only letters, numbers, hyphens)",
        ));
    }

    Ok(())
}

/// Validates a list of attribute names
pub fn validate_attributes(attrs: &[&str]) -> Result<()> {
    for attr in attrs {
        validate_attribute(attr)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_filters() {
        assert!(validate_filter("(objectClass=user)").is_ok());
        assert!(validate_filter(
            "(&(objectClass=user)(userAccountControl:1.2.840.113556.1.4.803:=2))"
        )
        .is_ok());
    }

    #[test]
    fn test_filter_empty() {
        assert!(validate_filter("").is_err());
    }

    #[test]
    fn test_filter_unbalanced() {
        assert!(validate_filter("(objectClass=user").is_err());
        assert!(validate_filter("objectClass=user)").is_err());
        assert!(validate_filter("((objectClass=user)").is_err());
    }

    #[test]
    fn test_filter_not_wrapped() {
        assert!(validate_filter("objectClass=(user)").is_err());
        assert!(validate_filter("(objectClass=user)x").is_err());
    }

    #[test]
    fn test_filter_too_long() {
        let long = format!("({}=x)", "a".repeat(MAX_FILTER_LENGTH));
        assert!(validate_filter(&long).is_err());
    }

    #[test]
    fn test_valid_dns() {
        assert!(validate_dn("").is_ok());
        assert!(validate_dn("DC=corp,DC=example,DC=com").is_ok());
        assert!(validate_dn("CN=Users,DC=corp,DC=example,DC=com").is_ok());
        assert!(validate_dn("ou=Staff,dc=corp,dc=local").is_ok());
    }

    #[test]
    fn test_invalid_dn_prefix() {
        assert!(validate_dn("corp.example.com").is_err());
        assert!(validate_dn("X=foo").is_err());
    }

    #[test]
    fn test_dn_too_long() {
        let dn = format!("CN={}", "a".repeat(MAX_DN_LENGTH));
        assert!(validate_dn(&dn).is_err());
    }

    #[test]
    fn test_base_dn() {
        assert!(validate_base_dn("DC=corp,DC=example,DC=com").is_ok());
        assert!(validate_base_dn("dc=corp,dc=local").is_ok());
        assert!(validate_base_dn("CN=Users").is_err());
    }

    #[test]
    fn test_attribute_names() {
        assert!(validate_attribute("sAMAccountName").is_ok());
        assert!(validate_attribute("msDS-AllowedToDelegateTo").is_ok());
        assert!(validate_attribute("").is_err());
        assert!(validate_attribute("1badStart").is_err());
        assert!(validate_attribute("has space").is_err());
        assert!(validate_attribute("semi;colon").is_err());
    }

    #[test]
    fn test_attribute_list() {
        assert!(validate_attributes(&["cn", "objectSid"]).is_ok());
        assert!(validate_attributes(&["cn", "bad attr"]).is_err());
    }
}
