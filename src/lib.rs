//! Active Directory reconnaissance over LDAP.
//!
//! The crate turns a named security-audit query (e.g. "find all
//! Kerberoastable users") into a live, back-pressured stream of decoded
//! directory objects:
//!
//! - [`queries`]: the name-keyed catalog of audit filters, with `{domain}`
//!   parameter substitution
//! - [`session`]: authenticated connection to one DC, with TLS negotiation,
//!   progressive version fallback, simple bind, and the RootDSE capability
//!   probe
//! - [`stream`]: paged searches streamed over bounded channels with
//!   cooperative cancellation
//! - [`resilient`]: exponential-backoff retry with reconnect on
//!   connection loss
//! - [`decode`]: pure formatting of Windows-typed attribute values (SIDs,
//!   GUIDs, FILETIMEs, UAC masks, security descriptors)
//! - [`output`]: the text/JSON/CSV/BloodHound report encoders
//!
//! ```no_run
//! use adrecon::config::ConnectionConfig;
//! use adrecon::resilient::{ResilientClient, RetryPolicy};
//! use adrecon::queries;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> adrecon::errors::Result<()> {
//! let config = ConnectionConfig {
//!     server: "dc01.corp.example.com".to_string(),
//!     base_dn: "DC=corp,DC=example,DC=com".to_string(),
//!     username: "auditor".to_string(),
//!     password: "...".to_string(),
//!     ..Default::default()
//! };
//!
//! let client = ResilientClient::connect(config, RetryPolicy::default()).await?;
//! let query = queries::get("kerberoasting")?;
//! let attrs: Vec<&str> = query.attributes.iter().map(String::as_str).collect();
//!
//! let cancel = CancellationToken::new();
//! let (mut entries, mut err) = client.stream_search(cancel, &query.filter, &attrs);
//! while let Some(entry) = entries.recv().await {
//!     println!("{}", entry.dn);
//! }
//! if let Some(e) = err.recv().await {
//!     return Err(e);
//! }
//! # Ok(())
//! # }
//! ```

pub mod acl;
pub mod attributes;
mod catalog;
pub mod config;
pub mod decode;
pub mod diagnostic;
pub mod errors;
pub mod escape;
pub mod identity;
pub mod naming;
pub mod output;
pub mod pool;
pub mod queries;
pub mod resilient;
pub mod security;
pub mod session;
pub mod stream;
pub mod timestamps;
pub mod uac;
pub mod validation;

pub use config::{ConnectionConfig, LoginNameFormat, OutputFormat, SecurityMode};
pub use errors::{AdError, Result};
pub use queries::{Query, QueryBuilder, QueryCategory};
pub use resilient::{ResilientClient, RetryPolicy};
pub use session::Session;
