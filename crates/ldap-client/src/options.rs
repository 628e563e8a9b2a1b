//! Process-wide engine options.
//!
//! These options are not tied to a session: once set they apply to every session the engine opens
//! afterwards, and nothing resets them.

use crate::engine::{DirectoryEngine, EngineOption};
use crate::translate::translate;
use crate::Result;
use ldap_client_core::ErrorKind;
use std::path::Path;
use tracing::debug;

/// Sets the engine's protocol and encoder debug levels.
///
/// # Errors
///
/// Returns [`ldap_client_core::Error::Connection`] with the engine code if either option is
/// rejected. The encoder level is not touched when the protocol level fails.
pub fn set_debug_level(engine: &dyn DirectoryEngine, level: i32) -> Result<()> {
    let outcome = engine.set_option(None, EngineOption::DebugLevel(level));
    translate(engine, None, outcome, ErrorKind::Connection)?;

    let outcome = engine.set_option(None, EngineOption::EncoderDebugLevel(level));
    translate(engine, None, outcome, ErrorKind::Connection)?;

    debug!(level, "engine debug level set");
    Ok(())
}

/// Sets the CA certificate file used to verify TLS sessions.
///
/// # Errors
///
/// Returns [`ldap_client_core::Error::Connection`] if the engine rejects the path.
pub fn set_ca_certificate(engine: &dyn DirectoryEngine, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let outcome = engine.set_option(None, EngineOption::CaCertificateFile(path.to_path_buf()));
    translate(engine, None, outcome, ErrorKind::Connection)?;

    debug!("CA certificate set to {}", path.display());
    Ok(())
}
