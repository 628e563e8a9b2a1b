//! Synchronous LDAP client façade.
//!
//! This crate exposes connection setup, authentication and search on a [`Connection`] while the
//! protocol work itself is delegated to a pluggable [`DirectoryEngine`]. [`Ldap3Engine`] is the
//! production engine; tests substitute their own.
//!
//! ```no_run
//! use std::sync::Arc;
//! use ldap_client::{Connection, Ldap3Engine, ProtocolVersion, SearchScope};
//!
//! # fn main() -> ldap_client::Result<()> {
//! let engine = Arc::new(Ldap3Engine::new());
//! let mut conn = Connection::open(engine, "ldap://ldap.example.com", ProtocolVersion::V3)?;
//! conn.simple_bind("cn=reader,dc=example,dc=com", "secret")?;
//! let result = conn.search_with_attributes(
//!     "dc=example,dc=com",
//!     SearchScope::Subtree,
//!     "(uid=alice)",
//!     &["cn", "mail"],
//! )?;
//! for entry in &result {
//!     println!("{}: {:?}", entry.dn, entry.first("mail"));
//! }
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

mod connection;
mod engine;
mod ldap3_engine;
mod options;
mod result;
mod translate;

pub use connection::{Connection, ALL_ATTRIBUTES};
pub use engine::{
    AttributeList, BindMechanism, DirectoryEngine, EngineOption, EngineResult, RawAttribute,
    RawEntry, SearchRequest, SessionHandle,
};
pub use ldap3_engine::Ldap3Engine;
pub use options::{set_ca_certificate, set_debug_level};
pub use result::{LdapEntry, SearchResult};

pub use ldap_client_core::{
    BindCredentials, ConnectionConfig, Error, ErrorKind, ProtocolVersion, ResultCode,
    SearchScope, Timeval, DEFAULT_SEARCH_TIMEOUT_MS,
};

/// Convenient result alias that reuses the core error type.
pub type Result<T> = ldap_client_core::Result<T>;
