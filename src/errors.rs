//! Error types for LDAP reconnaissance operations
//!
//! Every boundary-crossing operation returns `Result<T, AdError>`. The enum
//! distinguishes the error kinds the retry layer cares about, so callers can
//! classify on the variant instead of matching error text.

use thiserror::Error;

/// Main error type for Active Directory operations
#[derive(Error, Debug)]
pub enum AdError {
    /// Connection configuration is missing or malformed
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// Dial or TLS handshake failed before any LDAP exchange
    #[error("connection to {server} failed: {message}")]
    ConnectFailed { server: String, message: String },

    /// LDAP bind rejected (credentials, account state, name format)
    #[error("bind failed for {username}: {message}")]
    BindFailed { username: String, message: String },

    /// Unexpected response shape, or a required control was missing
    #[error("unexpected LDAP response: {0}")]
    ProtocolFailure(String),

    /// Terminal search result codes: bad filter, no such object,
    /// insufficient access, size/time limit exceeded
    #[error("search rejected (rc={code}): {message}")]
    SearchRejected { code: u32, message: String },

    /// Retryable network/busy/unavailable failure
    #[error("transient LDAP failure: {0}")]
    Transient(String),

    /// Caller-initiated termination
    #[error("operation cancelled")]
    Cancelled,

    /// An attribute value could not be parsed; per-attribute and
    /// non-fatal to the stream
    #[error("failed to decode {attribute}: {message}")]
    DecodeFailed { attribute: String, message: String },

    /// Query name is not present in the registry
    #[error("unknown query: {0}")]
    QueryNotFound(String),

    /// Operation attempted on a closed session
    #[error("session is closed")]
    SessionClosed,

    /// Checkout attempted on a closed pool
    #[error("connection pool is closed")]
    PoolClosed,

    /// All retry attempts exhausted; preserves the last underlying error
    #[error("{operation} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        operation: &'static str,
        attempts: usize,
        #[source]
        source: Box<AdError>,
    },
}

/// LDAP result codes the classifier recognizes (RFC 4511 / MS-ADTS)
#[allow(dead_code)]
pub(crate) mod result_codes {
    pub const TIME_LIMIT_EXCEEDED: u32 = 3;
    pub const SIZE_LIMIT_EXCEEDED: u32 = 4;
    pub const NO_SUCH_OBJECT: u32 = 32;
    pub const INVALID_CREDENTIALS: u32 = 49;
    pub const INSUFFICIENT_ACCESS: u32 = 50;
    pub const BUSY: u32 = 51;
    pub const UNAVAILABLE: u32 = 52;
    pub const UNWILLING_TO_PERFORM: u32 = 53;
    pub const LOOP_DETECT: u32 = 54;
}

impl AdError {
    /// Maps an LDAP result code to an error kind.
    ///
    /// Busy and unavailable are transient; everything else that reaches this
    /// path is a terminal search rejection. Invalid credentials surface here
    /// too when a session dies mid-search; `Session::open` intercepts the
    /// bind path and attaches the username before this mapping applies.
    pub(crate) fn from_result_code(rc: u32, text: &str) -> Self {
        match rc {
            result_codes::BUSY => AdError::Transient(format!("server busy: {}", text)),
            result_codes::UNAVAILABLE => {
                AdError::Transient(format!("server unavailable: {}", text))
            }
            _ => AdError::SearchRejected {
                code: rc,
                message: text.to_string(),
            },
        }
    }
}

impl From<ldap3::LdapError> for AdError {
    fn from(err: ldap3::LdapError) -> Self {
        match err {
            ldap3::LdapError::LdapResult { result } => {
                AdError::from_result_code(result.rc, &result.text)
            }
            ldap3::LdapError::EndOfStream => {
                AdError::Transient("connection closed unexpectedly".to_string())
            }
            ldap3::LdapError::Io { source } => {
                AdError::Transient(format!("i/o error: {}", source))
            }
            ldap3::LdapError::Timeout { elapsed: _ } => {
                AdError::Transient("ldap operation timed out: timeout".to_string())
            }
            other => AdError::ProtocolFailure(other.to_string()),
        }
    }
}

/// Result type alias for AD operations
pub type Result<T> = std::result::Result<T, AdError>;

const RETRYABLE_PATTERNS: &[&str] = &[
    "connection refused",
    "connection reset",
    "timeout",
    "i/o timeout",
    "network is unreachable",
    "no route to host",
    "temporary failure",
    "ldap server down",
    "server busy",
    "unavailable",
];

const CONNECTION_PATTERNS: &[&str] = &[
    "broken pipe",
    "connection reset",
    "use of closed network connection",
    "ldap server down",
    "connection lost",
];

/// Returns true when the error is worth another attempt.
///
/// The variant decides first; text matching is the fallback for errors that
/// arrive without a structured result code.
pub fn is_retryable(err: &AdError) -> bool {
    match err {
        AdError::Transient(_) => true,
        AdError::Cancelled
        | AdError::ConfigInvalid(_)
        | AdError::BindFailed { .. }
        | AdError::SearchRejected { .. }
        | AdError::QueryNotFound(_)
        | AdError::SessionClosed
        | AdError::PoolClosed
        | AdError::DecodeFailed { .. } => false,
        AdError::RetriesExhausted { source, .. } => is_retryable(source),
        other => is_retryable_message(&other.to_string()),
    }
}

/// Text-level retryability check for raw error messages
pub fn is_retryable_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    RETRYABLE_PATTERNS.iter().any(|p| lower.contains(p))
}

/// Returns true when the error indicates the underlying connection is gone
/// and a reconnect is warranted between retries.
pub fn is_connection_error(err: &AdError) -> bool {
    let lower = err.to_string().to_lowercase();
    CONNECTION_PATTERNS.iter().any(|p| lower.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AdError::ConfigInvalid("missing server".to_string());
        assert_eq!(err.to_string(), "invalid configuration: missing server");

        let err = AdError::ConnectFailed {
            server: "dc01.corp.example.com".to_string(),
            message: "connection refused".to_string(),
        };
        assert!(err.to_string().contains("dc01.corp.example.com"));

        let err = AdError::Cancelled;
        assert_eq!(err.to_string(), "operation cancelled");
    }

    #[test]
    fn test_result_code_mapping() {
        assert!(matches!(
            AdError::from_result_code(result_codes::BUSY, "busy"),
            AdError::Transient(_)
        ));
        assert!(matches!(
            AdError::from_result_code(result_codes::UNAVAILABLE, "down for maintenance"),
            AdError::Transient(_)
        ));
        assert!(matches!(
            AdError::from_result_code(result_codes::NO_SUCH_OBJECT, "no such object"),
            AdError::SearchRejected { code: 32, .. }
        ));
        assert!(matches!(
            AdError::from_result_code(result_codes::SIZE_LIMIT_EXCEEDED, ""),
            AdError::SearchRejected { code: 4, .. }
        ));
    }

    #[test]
    fn test_retryable_transient() {
        assert!(is_retryable(&AdError::Transient("i/o error".to_string())));
    }

    #[test]
    fn test_not_retryable_terminal_kinds() {
        assert!(!is_retryable(&AdError::Cancelled));
        assert!(!is_retryable(&AdError::SearchRejected {
            code: 50,
            message: "insufficient access".to_string(),
        }));
        assert!(!is_retryable(&AdError::BindFailed {
            username: "alice".to_string(),
            message: "invalid credentials".to_string(),
        }));
        assert!(!is_retryable(&AdError::QueryNotFound("nope".to_string())));
    }

    #[test]
    fn test_retryable_message_patterns() {
        assert!(is_retryable_message("dial tcp: connection refused"));
        assert!(is_retryable_message("read: Connection Reset by peer"));
        assert!(is_retryable_message("i/o timeout while reading"));
        assert!(!is_retryable_message("invalid credentials"));
    }

    #[test]
    fn test_connection_error_patterns() {
        assert!(is_connection_error(&AdError::Transient(
            "write: broken pipe".to_string()
        )));
        assert!(is_connection_error(&AdError::Transient(
            "ldap server down".to_string()
        )));
        assert!(!is_connection_error(&AdError::Transient(
            "server busy".to_string()
        )));
    }

    #[test]
    fn test_retries_exhausted_preserves_source() {
        let err = AdError::RetriesExhausted {
            operation: "search",
            attempts: 3,
            source: Box::new(AdError::Transient("connection refused".to_string())),
        };
        assert!(err.to_string().contains("after 3 attempts"));
        assert!(err.to_string().contains("connection refused"));
    }
}
