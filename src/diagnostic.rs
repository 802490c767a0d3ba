//! Operator-facing error diagnosis
//!
//! Wraps an [`AdError`] with a diagnosis and suggested fixes keyed to the
//! failure category. This is a user-experience layer: nothing here drives
//! control flow.

use std::fmt;

use crate::errors::AdError;

/// Maximum filter length shown in diagnostic details
const MAX_FILTER_DISPLAY: usize = 50;

/// An error annotated with a diagnosis, suggested fixes, and structured
/// details
#[derive(Debug)]
pub struct DiagnosticError {
    pub error: AdError,
    pub diagnosis: String,
    pub solutions: Vec<String>,
    pub details: Vec<(String, String)>,
}

impl fmt::Display for DiagnosticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[ERROR] {}", self.error)?;

        if !self.diagnosis.is_empty() {
            writeln!(f, "\n[DIAGNOSIS] {}", self.diagnosis)?;
        }

        if !self.details.is_empty() {
            writeln!(f, "\n[DETAILS]")?;
            for (k, v) in &self.details {
                writeln!(f, "  {}: {}", k, v)?;
            }
        }

        if !self.solutions.is_empty() {
            writeln!(f, "\n[SUGGESTED FIXES]")?;
            for (i, solution) in self.solutions.iter().enumerate() {
                writeln!(f, "  {}. {}", i + 1, solution)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for DiagnosticError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Truncates a string for display in error messages
fn truncate_display(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

/// Annotates a connection failure with likely causes and fixes.
pub fn analyze_connect_error(server: &str, error: AdError) -> DiagnosticError {
    let text = error.to_string().to_lowercase();

    let (diagnosis, solutions): (&str, Vec<String>) = if text.contains("connection refused") {
        (
            "The LDAP server refused the connection",
            vec![
                format!("Verify the server address '{}' is correct", server),
                "Check if the LDAP service is running on the target".to_string(),
                "Verify network connectivity to the server".to_string(),
                "Check firewall rules allow connections to the LDAP port".to_string(),
                "Try using ldaps:// (port 636) instead of ldap:// (port 389)".to_string(),
            ],
        )
    } else if text.contains("timeout") || text.contains("i/o timeout") {
        (
            "Connection attempt timed out",
            vec![
                "Check network connectivity to the server".to_string(),
                "Verify the server is responsive".to_string(),
                "Check if a firewall is blocking the connection".to_string(),
                "Try increasing the connection timeout".to_string(),
                "Test basic connectivity with ping or telnet".to_string(),
            ],
        )
    } else if text.contains("no route to host") || text.contains("network is unreachable") {
        (
            "Network route to the host is not available",
            vec![
                "Check your network connection".to_string(),
                "Verify the server address is correct".to_string(),
                "Check if VPN is required to reach the network".to_string(),
                "Verify routing table and gateway configuration".to_string(),
            ],
        )
    } else if text.contains("tls") || text.contains("certificate") {
        (
            "TLS handshake or certificate error",
            vec![
                "Try security mode 3 (InsecureTLS) to bypass certificate validation".to_string(),
                "Verify the server's certificate is valid".to_string(),
                "Check if the server name matches the certificate".to_string(),
                "Ensure the certificate chain is properly configured".to_string(),
            ],
        )
    } else {
        (
            "Failed to connect to LDAP server",
            vec![
                "Verify the server address and port are correct".to_string(),
                "Check if the LDAP service is running".to_string(),
                "Test network connectivity".to_string(),
                "Review firewall and network security policies".to_string(),
            ],
        )
    };

    DiagnosticError {
        error,
        diagnosis: diagnosis.to_string(),
        solutions,
        details: vec![("server".to_string(), server.to_string())],
    }
}

/// Annotates a bind failure.
pub fn analyze_bind_error(username: &str, error: AdError) -> DiagnosticError {
    let text = error.to_string().to_lowercase();

    let (diagnosis, solutions): (&str, Vec<&str>) = if text.contains("invalid credentials")
        || text.contains("invalid dn")
        || text.contains("rc=49")
    {
        (
            "Authentication failed - invalid credentials",
            vec![
                "Verify the username is correct",
                "Check if the password is correct",
                "Ensure the account is not locked or disabled",
                "Try switching between sAMAccountName and userPrincipalName login formats",
                "Verify the account has permission to bind to the LDAP server",
            ],
        )
    } else if text.contains("password") || text.contains("credential") {
        (
            "Credential validation failed",
            vec![
                "Double-check the password",
                "Ensure the password doesn't contain special characters that need escaping",
                "Try a different account to verify the issue is account-specific",
            ],
        )
    } else if text.contains("timeout") {
        (
            "Bind operation timed out",
            vec![
                "Check if the LDAP server is under heavy load",
                "Verify network stability",
                "Try increasing the timeout value",
            ],
        )
    } else {
        (
            "Failed to authenticate to LDAP server",
            vec![
                "Verify credentials are correct",
                "Check if the account is active and not locked",
                "Try switching between sAMAccountName and userPrincipalName login formats",
                "Verify the account has LDAP bind permissions",
            ],
        )
    };

    DiagnosticError {
        error,
        diagnosis: diagnosis.to_string(),
        solutions: solutions.into_iter().map(String::from).collect(),
        details: vec![("username".to_string(), username.to_string())],
    }
}

/// Annotates a search failure.
pub fn analyze_search_error(base_dn: &str, filter: &str, error: AdError) -> DiagnosticError {
    let text = error.to_string().to_lowercase();

    let (diagnosis, solutions): (&str, Vec<&str>) = if text.contains("size limit exceeded")
        || text.contains("rc=4")
    {
        (
            "Search returned more results than the size limit allows",
            vec![
                "Increase or remove the configured size limit",
                "Narrow your search filter to be more specific",
                "Consider using pagination to retrieve results in batches",
            ],
        )
    } else if text.contains("time limit exceeded") {
        (
            "Search took too long and exceeded the time limit",
            vec![
                "Narrow your search filter to reduce processing time",
                "Check if the LDAP server is under heavy load",
                "Try searching a smaller subset of the directory",
            ],
        )
    } else if text.contains("no such object") || text.contains("invalid dn") {
        (
            "The specified Base DN does not exist",
            vec![
                "Verify the Base DN is correct (e.g., DC=domain,DC=com)",
                "Use a tool like ldapsearch to verify the Base DN exists",
                "Check if you have permission to search this Base DN",
                "Ensure the domain name is spelled correctly",
            ],
        )
    } else if text.contains("insufficient access") || text.contains("unauthorized") {
        (
            "You don't have permission to perform this search",
            vec![
                "Verify your account has permission to search the specified attributes",
                "Try searching with fewer attributes",
                "Check if the search filter requires elevated privileges",
                "Contact your domain administrator if permissions appear incorrect",
            ],
        )
    } else if text.contains("filter") || text.contains("syntax") {
        (
            "The search filter contains a syntax error",
            vec![
                "Verify the LDAP filter syntax is correct",
                "Ensure all parentheses are balanced",
                "Check for proper escaping of special characters",
                "Try the filter with a simpler query first",
            ],
        )
    } else {
        (
            "LDAP search operation failed",
            vec![
                "Verify the Base DN is correct",
                "Check the search filter syntax",
                "Ensure you have permissions to search",
                "Verify the LDAP server is functioning properly",
            ],
        )
    };

    DiagnosticError {
        error,
        diagnosis: diagnosis.to_string(),
        solutions: solutions.into_iter().map(String::from).collect(),
        details: vec![
            ("baseDN".to_string(), base_dn.to_string()),
            (
                "filter".to_string(),
                truncate_display(filter, MAX_FILTER_DISPLAY),
            ),
        ],
    }
}
