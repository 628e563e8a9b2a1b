//! # ldap-client-core
//!
//! Core types shared by the `ldap-client` façade and any directory engine that plugs into it.
//!
//! ## Modules
//!
//! - [`error`] - Engine result codes and the typed error taxonomy
//! - [`types`] - Protocol version, search scope and timeout primitives
//! - [`config`] - Connection configuration with validation

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{BindCredentials, ConnectionConfig};
pub use error::{Error, ErrorKind, Result, ResultCode};
pub use types::{ProtocolVersion, SearchScope, Timeval, DEFAULT_SEARCH_TIMEOUT_MS};
