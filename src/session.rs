//! Authenticated LDAP session
//!
//! A `Session` owns one bound connection to a Domain Controller. Opening a
//! session derives the URL from the security mode, negotiates TLS with
//! progressive version fallback, performs a simple bind, and probes RootDSE
//! for paging support. The `ldap3` connection is driven by a spawned task;
//! the handle here multiplexes requests onto it.

use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry, SearchOptions};
use native_tls::{Protocol, TlsConnector};
use tracing::{debug, info, warn};

use crate::attributes::{
    ATTR_SUPPORTED_CONTROL, ATTR_SUPPORTED_EXTENSIONS, ATTR_SUPPORTED_LDAP_VERSION,
    ATTR_VENDOR_NAME, OID_CONTROL_PAGED_RESULTS,
};
use crate::config::{ConnectionConfig, SecurityMode};
use crate::errors::{AdError, Result};
use crate::naming::bind_username;

/// One TLS version to try during negotiation
struct TlsCandidate {
    name: &'static str,
    min: Option<Protocol>,
    max: Option<Protocol>,
}

/// Versions in order of preference. Modern DCs take the first rung; the
/// 1.1/1.0 rungs exist for legacy DCs (Win2003/2008). native-tls has no
/// TLS 1.3 pin, so the first rung runs at the platform maximum; the
/// remaining rungs pin both ends to stop version jumping.
const TLS_CANDIDATES: &[TlsCandidate] = &[
    TlsCandidate {
        name: "TLS 1.3",
        min: None,
        max: None,
    },
    TlsCandidate {
        name: "TLS 1.2",
        min: Some(Protocol::Tlsv12),
        max: Some(Protocol::Tlsv12),
    },
    TlsCandidate {
        name: "TLS 1.1",
        min: Some(Protocol::Tlsv11),
        max: Some(Protocol::Tlsv11),
    },
    TlsCandidate {
        name: "TLS 1.0",
        min: Some(Protocol::Tlsv10),
        max: Some(Protocol::Tlsv10),
    },
];

const TLS_ERROR_PATTERNS: &[&str] = &[
    "tls",
    "handshake failure",
    "protocol version",
    "unsupported protocol",
    "no supported versions",
    "connection reset by peer",
];

/// Checks whether an error looks like a TLS version incompatibility rather
/// than a plain network failure
fn is_tls_error(message: &str) -> bool {
    let lower = message.to_lowercase();
    TLS_ERROR_PATTERNS.iter().any(|p| lower.contains(p))
}

/// An authenticated connection to one Domain Controller.
///
/// Not safe for concurrent searches; callers serialize per session or use
/// [`crate::pool::SessionPool`].
pub struct Session {
    config: ConnectionConfig,
    ldap: Ldap,
    paging_supported: bool,
    closed: bool,
}

impl Session {
    /// Opens, binds, and probes a new session.
    pub async fn open(config: ConnectionConfig) -> Result<Session> {
        config.validate()?;

        let username = bind_username(&config)?;
        let url = config.url();

        info!(
            server = %config.server,
            url = %url,
            security = config.security.name(),
            "connecting to LDAP server"
        );

        let mut ldap = if config.security.uses_tls() {
            connect_with_tls_negotiation(&config, &url).await?
        } else {
            connect_plain(&config, &url).await?
        };

        ldap.simple_bind(&username, &config.password)
            .await
            .map_err(|e| AdError::BindFailed {
                username: username.clone(),
                message: e.to_string(),
            })?
            .success()
            .map_err(|e| AdError::BindFailed {
                username: username.clone(),
                message: e.to_string(),
            })?;

        info!(username = %username, server = %config.server, "LDAP bind successful");

        let paging_supported = probe_paging_support(&mut ldap).await;
        if !paging_supported {
            warn!("server does not advertise the paged-results control; paging disabled");
        }

        Ok(Session {
            config,
            ldap,
            paging_supported,
            closed: false,
        })
    }

    /// The configuration this session was opened with
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Whether the server advertised the paged-results control
    pub fn paging_supported(&self) -> bool {
        self.paging_supported
    }

    pub(crate) fn ldap_handle(&self) -> Ldap {
        self.ldap.clone()
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(AdError::SessionClosed);
        }
        Ok(())
    }

    /// Health check against RootDSE with a size limit of 1.
    pub async fn ping(&mut self) -> Result<()> {
        self.ensure_open()?;

        let (entries, _res) = self
            .ldap
            .with_search_options(SearchOptions::new().sizelimit(1))
            .search(
                "",
                Scope::Base,
                "(objectClass=*)",
                vec![
                    ATTR_VENDOR_NAME,
                    ATTR_SUPPORTED_LDAP_VERSION,
                    ATTR_SUPPORTED_EXTENSIONS,
                ],
            )
            .await
            .map_err(AdError::from)?
            .success()
            .map_err(AdError::from)?;

        if entries.is_empty() {
            return Err(AdError::ProtocolFailure(
                "no entries returned from RootDSE".to_string(),
            ));
        }

        Ok(())
    }

    /// Closes the session. Idempotent; every later operation fails with
    /// [`AdError::SessionClosed`].
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.ldap.unbind().await {
            debug!("unbind on close failed: {}", e);
        }
    }
}

async fn connect_plain(config: &ConnectionConfig, url: &str) -> Result<Ldap> {
    let settings = LdapConnSettings::new().set_conn_timeout(config.effective_timeout());

    let (conn, ldap) = LdapConnAsync::with_settings(settings, url)
        .await
        .map_err(|e| AdError::ConnectFailed {
            server: config.server.clone(),
            message: e.to_string(),
        })?;

    spawn_driver(conn);
    Ok(ldap)
}

/// Spawns the task that drives the connection; the `Ldap` handle is dead
/// without it.
fn spawn_driver(conn: LdapConnAsync) {
    tokio::spawn(async move {
        if let Err(e) = conn.drive().await {
            warn!("LDAP connection driver error: {}", e);
        }
    });
}

/// Connects with progressive TLS version fallback.
///
/// Tries 1.3 first; a handshake failure that looks version-related moves to
/// the next rung, anything else aborts the cascade. A connection below
/// TLS 1.2 is allowed but logged loudly.
async fn connect_with_tls_negotiation(config: &ConnectionConfig, url: &str) -> Result<Ldap> {
    let insecure = config.security.skips_verification();
    let starttls = config.security.uses_starttls();
    let mut last_err = String::new();

    for (i, candidate) in TLS_CANDIDATES.iter().enumerate() {
        let connector = TlsConnector::builder()
            .min_protocol_version(candidate.min)
            .max_protocol_version(candidate.max)
            .danger_accept_invalid_certs(insecure)
            .danger_accept_invalid_hostnames(insecure)
            .build()
            .map_err(|e| AdError::ConnectFailed {
                server: config.server.clone(),
                message: format!("building TLS connector: {}", e),
            })?;

        let settings = LdapConnSettings::new()
            .set_conn_timeout(config.effective_timeout())
            .set_connector(connector)
            .set_starttls(starttls);

        debug!(version = candidate.name, url = %url, "attempting TLS connection");

        match LdapConnAsync::with_settings(settings, url).await {
            Ok((conn, ldap)) => {
                spawn_driver(conn);
                if i > 1 {
                    warn!(
                        version = candidate.name,
                        "connected using a legacy TLS version below 1.2"
                    );
                } else if i == 1 {
                    info!(version = candidate.name, "connected after TLS 1.3 fallback");
                }
                return Ok(ldap);
            }
            Err(e) => {
                last_err = e.to_string();
                if is_tls_error(&last_err) {
                    debug!(
                        version = candidate.name,
                        error = %last_err,
                        "TLS handshake failed, trying next version"
                    );
                    continue;
                }
                // Network-level failures will not improve with an older TLS version
                break;
            }
        }
    }

    Err(AdError::ConnectFailed {
        server: config.server.clone(),
        message: format!(
            "TLS version negotiation failed (tried TLS 1.3, 1.2, 1.1, 1.0): {}",
            last_err
        ),
    })
}

/// Queries RootDSE for supported controls. Failure is non-fatal: the
/// session still works, just without paging.
async fn probe_paging_support(ldap: &mut Ldap) -> bool {
    let result = ldap
        .search(
            "",
            Scope::Base,
            "(objectClass=*)",
            vec![ATTR_SUPPORTED_CONTROL],
        )
        .await;

    let entries = match result {
        Ok(r) => match r.success() {
            Ok((entries, _)) => entries,
            Err(e) => {
                debug!("capability probe rejected: {}", e);
                return false;
            }
        },
        Err(e) => {
            debug!("capability probe failed: {}", e);
            return false;
        }
    };

    entries
        .into_iter()
        .next()
        .map(SearchEntry::construct)
        .and_then(|entry| entry.attrs.get(ATTR_SUPPORTED_CONTROL).cloned())
        .map(|controls| controls.iter().any(|c| c == OID_CONTROL_PAGED_RESULTS))
        .unwrap_or(false)
}

/// Mirror of [`SecurityMode`] checks used when the caller only has a mode
/// number from configuration
pub fn security_mode_name(mode: u8) -> Result<&'static str> {
    SecurityMode::try_from(mode).map(SecurityMode::name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tls_error_classification() {
        assert!(is_tls_error("TLS handshake failure"));
        assert!(is_tls_error("unsupported protocol version"));
        assert!(is_tls_error("server chose no supported versions"));
        assert!(is_tls_error("read: connection reset by peer"));
        assert!(!is_tls_error("connection refused"));
        assert!(!is_tls_error("no route to host"));
    }

    #[test]
    fn test_tls_candidates_order() {
        assert_eq!(TLS_CANDIDATES.len(), 4);
        assert_eq!(TLS_CANDIDATES[0].name, "TLS 1.3");
        assert_eq!(TLS_CANDIDATES[3].name, "TLS 1.0");
        // Rungs below the first pin both ends
        for candidate in &TLS_CANDIDATES[1..] {
            assert!(candidate.min.is_some());
            assert_eq!(
                format!("{:?}", candidate.min),
                format!("{:?}", candidate.max)
            );
        }
    }

    #[test]
    fn test_security_mode_name() {
        assert_eq!(security_mode_name(0).unwrap(), "None");
        assert_eq!(security_mode_name(2).unwrap(), "StartTLS");
        assert!(security_mode_name(9).is_err());
    }

    #[tokio::test]
    async fn test_open_rejects_invalid_config() {
        let config = ConnectionConfig::default();
        match Session::open(config).await {
            Err(AdError::ConfigInvalid(_)) => {}
            other => panic!("expected ConfigInvalid, got {:?}", other.map(|_| ())),
        }
    }
}
