//! Connection configuration
//!
//! Immutable per-session settings supplied by the config collaborator.
//! Scheme and default port derive from the security mode; see
//! [`SecurityMode`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::attributes::{DEFAULT_CONNECTION_TIMEOUT_SECS, DEFAULT_LDAPS_PORT, DEFAULT_LDAP_PORT};
use crate::errors::{AdError, Result};
use crate::validation::validate_base_dn;

/// Connection security mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SecurityMode {
    /// Plain LDAP, no encryption
    None,
    /// LDAPS with certificate verification
    Tls,
    /// Plain connect upgraded via StartTLS, certificate verified
    StartTls,
    /// LDAPS without certificate verification
    InsecureTls,
    /// StartTLS without certificate verification
    InsecureStartTls,
}

impl SecurityMode {
    /// True for any mode that negotiates TLS
    pub fn uses_tls(self) -> bool {
        !matches!(self, SecurityMode::None)
    }

    /// True for the StartTLS upgrade modes
    pub fn uses_starttls(self) -> bool {
        matches!(self, SecurityMode::StartTls | SecurityMode::InsecureStartTls)
    }

    /// True when certificate verification is disabled
    pub fn skips_verification(self) -> bool {
        matches!(
            self,
            SecurityMode::InsecureTls | SecurityMode::InsecureStartTls
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            SecurityMode::None => "None",
            SecurityMode::Tls => "TLS",
            SecurityMode::StartTls => "StartTLS",
            SecurityMode::InsecureTls => "InsecureTLS",
            SecurityMode::InsecureStartTls => "InsecureStartTLS",
        }
    }
}

impl Default for SecurityMode {
    fn default() -> Self {
        SecurityMode::None
    }
}

impl TryFrom<u8> for SecurityMode {
    type Error = AdError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(SecurityMode::None),
            1 => Ok(SecurityMode::Tls),
            2 => Ok(SecurityMode::StartTls),
            3 => Ok(SecurityMode::InsecureTls),
            4 => Ok(SecurityMode::InsecureStartTls),
            other => Err(AdError::ConfigInvalid(format!(
                "invalid security mode: {}",
                other
            ))),
        }
    }
}

impl From<SecurityMode> for u8 {
    fn from(mode: SecurityMode) -> u8 {
        match mode {
            SecurityMode::None => 0,
            SecurityMode::Tls => 1,
            SecurityMode::StartTls => 2,
            SecurityMode::InsecureTls => 3,
            SecurityMode::InsecureStartTls => 4,
        }
    }
}

/// Username format used for the simple bind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoginNameFormat {
    #[serde(rename = "userPrincipalName")]
    UserPrincipalName,
    #[serde(rename = "sAMAccountName")]
    SamAccountName,
}

impl Default for LoginNameFormat {
    fn default() -> Self {
        LoginNameFormat::UserPrincipalName
    }
}

/// LDAP connection configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ConnectionConfig {
    /// LDAP server address
    pub server: String,
    /// LDAP server port; 0 selects the default for the security mode
    pub port: u16,
    /// Search base DN
    #[serde(rename = "baseDN")]
    pub base_dn: String,
    /// Bind username
    pub username: String,
    /// Bind password
    pub password: String,
    /// Username format for authentication
    #[serde(rename = "loginName")]
    pub login_name: LoginNameFormat,
    /// Connection security mode
    pub security: SecurityMode,
    /// Connection timeout in seconds; 0 selects the default (30)
    pub timeout: u64,
    /// Maximum number of entries to return; 0 means unlimited
    #[serde(rename = "sizeLimit")]
    pub size_limit: i32,
}

impl ConnectionConfig {
    /// URL scheme for the configured security mode
    pub fn scheme(&self) -> &'static str {
        match self.security {
            SecurityMode::Tls | SecurityMode::InsecureTls => "ldaps",
            _ => "ldap",
        }
    }

    /// Port with the security-mode default applied
    pub fn effective_port(&self) -> u16 {
        if self.port != 0 {
            return self.port;
        }
        match self.security {
            SecurityMode::Tls | SecurityMode::InsecureTls => DEFAULT_LDAPS_PORT,
            _ => DEFAULT_LDAP_PORT,
        }
    }

    /// Dial timeout with the default applied
    pub fn effective_timeout(&self) -> Duration {
        let secs = if self.timeout == 0 {
            DEFAULT_CONNECTION_TIMEOUT_SECS
        } else {
            self.timeout
        };
        Duration::from_secs(secs)
    }

    /// Connection URL, e.g. `ldaps://dc01.corp.example.com:636`
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.scheme(), self.server, self.effective_port())
    }

    /// Checks the configuration invariants before a connection attempt
    pub fn validate(&self) -> Result<()> {
        if self.server.is_empty() {
            return Err(AdError::ConfigInvalid(
                "LDAP server is not configured".to_string(),
            ));
        }
        if self.username.trim().is_empty() {
            return Err(AdError::ConfigInvalid(
                "LDAP username is not configured".to_string(),
            ));
        }
        if self.base_dn.is_empty() {
            return Err(AdError::ConfigInvalid(
                "LDAP base DN is not configured".to_string(),
            ));
        }
        validate_base_dn(&self.base_dn)?;
        Ok(())
    }
}

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
    BloodHound,
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Text
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = AdError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" | "card" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            "bloodhound" | "bh" => Ok(OutputFormat::BloodHound),
            other => Err(AdError::ConfigInvalid(format!(
                "unsupported output format: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> ConnectionConfig {
        ConnectionConfig {
            server: "dc01.corp.example.com".to_string(),
            base_dn: "DC=corp,DC=example,DC=com".to_string(),
            username: "alice".to_string(),
            password: "hunter2".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_scheme_and_port_defaults() {
        let mut cfg = base_config();

        cfg.security = SecurityMode::None;
        assert_eq!(cfg.scheme(), "ldap");
        assert_eq!(cfg.effective_port(), 389);

        cfg.security = SecurityMode::Tls;
        assert_eq!(cfg.scheme(), "ldaps");
        assert_eq!(cfg.effective_port(), 636);

        cfg.security = SecurityMode::StartTls;
        assert_eq!(cfg.scheme(), "ldap");
        assert_eq!(cfg.effective_port(), 389);

        cfg.security = SecurityMode::InsecureTls;
        assert_eq!(cfg.scheme(), "ldaps");
        assert_eq!(cfg.effective_port(), 636);

        cfg.security = SecurityMode::InsecureStartTls;
        assert_eq!(cfg.scheme(), "ldap");
        assert_eq!(cfg.effective_port(), 389);
    }

    #[test]
    fn test_explicit_port_wins() {
        let mut cfg = base_config();
        cfg.port = 3269;
        cfg.security = SecurityMode::Tls;
        assert_eq!(cfg.effective_port(), 3269);
        assert_eq!(cfg.url(), "ldaps://dc01.corp.example.com:3269");
    }

    #[test]
    fn test_timeout_default() {
        let mut cfg = base_config();
        assert_eq!(cfg.effective_timeout(), Duration::from_secs(30));
        cfg.timeout = 5;
        assert_eq!(cfg.effective_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_validate() {
        assert!(base_config().validate().is_ok());

        let mut cfg = base_config();
        cfg.server = String::new();
        assert!(cfg.validate().is_err());

        let mut cfg = base_config();
        cfg.username = "  ".to_string();
        assert!(cfg.validate().is_err());

        let mut cfg = base_config();
        cfg.base_dn = "CN=NotADomain".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_security_mode_from_u8() {
        assert_eq!(SecurityMode::try_from(0).unwrap(), SecurityMode::None);
        assert_eq!(SecurityMode::try_from(2).unwrap(), SecurityMode::StartTls);
        assert_eq!(
            SecurityMode::try_from(4).unwrap(),
            SecurityMode::InsecureStartTls
        );
        assert!(SecurityMode::try_from(5).is_err());
    }

    #[test]
    fn test_security_mode_predicates() {
        assert!(!SecurityMode::None.uses_tls());
        assert!(SecurityMode::Tls.uses_tls());
        assert!(SecurityMode::InsecureStartTls.uses_starttls());
        assert!(!SecurityMode::Tls.uses_starttls());
        assert!(SecurityMode::InsecureTls.skips_verification());
        assert!(!SecurityMode::StartTls.skips_verification());
    }

    #[test]
    fn test_config_deserializes_wire_names() {
        let json = r#"{
            "server": "dc01",
            "port": 0,
            "baseDN": "DC=corp,DC=example,DC=com",
            "username": "alice",
            "password": "x",
            "loginName": "sAMAccountName",
            "security": 3,
            "timeout": 10,
            "sizeLimit": 500
        }"#;
        let cfg: ConnectionConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.base_dn, "DC=corp,DC=example,DC=com");
        assert_eq!(cfg.login_name, LoginNameFormat::SamAccountName);
        assert_eq!(cfg.security, SecurityMode::InsecureTls);
        assert_eq!(cfg.size_limit, 500);
    }

    #[test]
    fn test_output_format_parse() {
        use std::str::FromStr;
        assert_eq!(OutputFormat::from_str("text").unwrap(), OutputFormat::Text);
        assert_eq!(OutputFormat::from_str("bh").unwrap(), OutputFormat::BloodHound);
        assert_eq!(
            OutputFormat::from_str("bloodhound").unwrap(),
            OutputFormat::BloodHound
        );
        assert!(OutputFormat::from_str("xml").is_err());
    }
}
