//! Directory connection: session lifecycle, options, binds and searches.

use crate::engine::{
    AttributeList, BindMechanism, DirectoryEngine, EngineOption, SearchRequest, SessionHandle,
};
use crate::options;
use crate::result::SearchResult;
use crate::translate::translate;
use crate::Result;
use ldap_client_core::{
    ConnectionConfig, ErrorKind, ProtocolVersion, SearchScope, Timeval,
    DEFAULT_SEARCH_TIMEOUT_MS,
};
use secrecy::SecretString;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Attribute selection meaning "all user attributes".
pub const ALL_ATTRIBUTES: &[&str] = &[];

const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_millis(DEFAULT_SEARCH_TIMEOUT_MS);

/// An open session with a directory server.
///
/// Every operation blocks until the engine answers. The session is released exactly once, by
/// [`Connection::close`] or on drop, and release failures are never reported.
pub struct Connection {
    engine: Arc<dyn DirectoryEngine>,
    session: SessionHandle,
    version: ProtocolVersion,
    uri: String,
    released: bool,
}

impl Connection {
    /// Opens a session to `uri` speaking `version`.
    ///
    /// # Errors
    ///
    /// Returns [`ldap_client_core::Error::Connection`] if the engine cannot create the session or
    /// refuses the protocol version. In the latter case the session is released before returning.
    pub fn open(
        engine: Arc<dyn DirectoryEngine>,
        uri: &str,
        version: ProtocolVersion,
    ) -> Result<Self> {
        let outcome = engine.initialize(uri);
        let session = translate(engine.as_ref(), None, outcome, ErrorKind::Connection)?;
        debug!(uri, session = session.id(), "directory session initialized");

        let mut connection = Self {
            engine,
            session,
            version,
            uri: uri.to_owned(),
            released: false,
        };
        // On failure `connection` drops here and releases the session.
        connection.set_protocol_version(version)?;
        Ok(connection)
    }

    /// Opens and optionally authenticates a connection from configuration.
    ///
    /// Process-wide options in the configuration are applied before the session is created.
    ///
    /// # Errors
    ///
    /// Returns [`ldap_client_core::Error::Configuration`] for invalid settings (before any engine
    /// call), or the error of the first failing step.
    pub fn from_config(engine: Arc<dyn DirectoryEngine>, config: &ConnectionConfig) -> Result<Self> {
        config.check()?;
        let version = config.protocol_version()?;

        if let Some(path) = &config.ca_certificate {
            options::set_ca_certificate(engine.as_ref(), path)?;
        }
        if let Some(level) = config.debug_level {
            options::set_debug_level(engine.as_ref(), level)?;
        }

        let mut connection = Self::open(engine, &config.uri, version)?;
        if let Some(credentials) = &config.bind {
            connection.bind_with(credentials.dn(), &credentials.password)?;
        }
        Ok(connection)
    }

    /// Server URI this connection was opened with.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Protocol version currently in use.
    #[must_use]
    pub const fn protocol_version(&self) -> ProtocolVersion {
        self.version
    }

    /// Engine session handle.
    #[must_use]
    pub const fn session(&self) -> SessionHandle {
        self.session
    }

    /// Sets the engine-wide debug level (protocol and encoder tracing).
    ///
    /// This is process-wide state shared by every connection of the engine.
    ///
    /// # Errors
    ///
    /// Returns [`ldap_client_core::Error::Connection`] if the engine rejects either level.
    pub fn set_debug_level(&self, level: i32) -> Result<()> {
        options::set_debug_level(self.engine.as_ref(), level)
    }

    /// Sets the engine-wide CA certificate file for TLS sessions.
    ///
    /// # Errors
    ///
    /// Returns [`ldap_client_core::Error::Connection`] if the engine rejects the path.
    pub fn set_ca_certificate(&self, path: impl AsRef<Path>) -> Result<()> {
        options::set_ca_certificate(self.engine.as_ref(), path)
    }

    /// Changes the protocol version of this session.
    ///
    /// # Errors
    ///
    /// Returns [`ldap_client_core::Error::Connection`] if the engine refuses the version.
    pub fn set_protocol_version(&mut self, version: ProtocolVersion) -> Result<()> {
        let outcome = self
            .engine
            .set_option(Some(self.session), EngineOption::ProtocolVersion(version));
        translate(self.engine.as_ref(), Some(self.session), outcome, ErrorKind::Connection)?;
        self.version = version;
        Ok(())
    }

    /// Most recent diagnostic message the engine recorded for this session.
    ///
    /// # Errors
    ///
    /// Returns [`ldap_client_core::Error::Connection`] if the engine cannot report it.
    pub fn last_error(&self) -> Result<String> {
        let outcome = self.engine.last_diagnostic(self.session);
        translate(self.engine.as_ref(), Some(self.session), outcome, ErrorKind::Connection)
    }

    /// Authenticates with a DN and cleartext password.
    ///
    /// # Errors
    ///
    /// Returns [`ldap_client_core::Error::Authentication`] carrying the engine code and message.
    pub fn simple_bind(&mut self, user: &str, password: &str) -> Result<()> {
        let credential = SecretString::from(password.to_owned());
        self.bind_with(user, &credential)
    }

    /// Performs a SASL bind.
    ///
    /// No mechanism negotiation takes place: this issues the same plain credential exchange as
    /// [`Connection::simple_bind`].
    ///
    /// # Errors
    ///
    /// Returns [`ldap_client_core::Error::Authentication`] carrying the engine code and message.
    pub fn sasl_bind(&mut self, user: &str, password: &str) -> Result<()> {
        self.simple_bind(user, password)
    }

    fn bind_with(&mut self, user: &str, credential: &SecretString) -> Result<()> {
        let outcome = self
            .engine
            .bind(self.session, user, credential, BindMechanism::Simple);
        translate(
            self.engine.as_ref(),
            Some(self.session),
            outcome,
            ErrorKind::Authentication,
        )?;
        info!(uri = %self.uri, user, "bound to directory");
        Ok(())
    }

    /// Searches below `base` and returns every matching entry.
    ///
    /// An empty `attributes` slice (see [`ALL_ATTRIBUTES`]) requests all attributes. `timeout`
    /// is handed to the engine as the search deadline.
    ///
    /// # Errors
    ///
    /// Returns [`ldap_client_core::Error::Search`] for any non-success engine code, including
    /// partial results, referrals and an expired deadline.
    pub fn search<S: AsRef<str>>(
        &self,
        base: &str,
        scope: SearchScope,
        filter: &str,
        attributes: &[S],
        timeout: Duration,
    ) -> Result<SearchResult<'_>> {
        let request = SearchRequest {
            base: base.to_owned(),
            scope,
            filter: filter.to_owned(),
            attributes: AttributeList::new(attributes),
            timeout: Timeval::from(timeout),
        };
        debug!(base, ?scope, filter, "searching directory");

        let outcome = self.engine.search(self.session, &request);
        let entries = translate(
            self.engine.as_ref(),
            Some(self.session),
            outcome,
            ErrorKind::Search,
        )?;
        debug!(base, entries = entries.len(), "search complete");
        Ok(SearchResult::new(self, entries))
    }

    /// [`Connection::search`] with the default 30 second timeout.
    ///
    /// # Errors
    ///
    /// See [`Connection::search`].
    pub fn search_with_attributes<S: AsRef<str>>(
        &self,
        base: &str,
        scope: SearchScope,
        filter: &str,
        attributes: &[S],
    ) -> Result<SearchResult<'_>> {
        self.search(base, scope, filter, attributes, DEFAULT_SEARCH_TIMEOUT)
    }

    /// [`Connection::search`] requesting all attributes.
    ///
    /// # Errors
    ///
    /// See [`Connection::search`].
    pub fn search_all_with_timeout(
        &self,
        base: &str,
        scope: SearchScope,
        filter: &str,
        timeout: Duration,
    ) -> Result<SearchResult<'_>> {
        self.search(base, scope, filter, ALL_ATTRIBUTES, timeout)
    }

    /// [`Connection::search`] requesting all attributes with the default timeout.
    ///
    /// # Errors
    ///
    /// See [`Connection::search`].
    pub fn search_all(
        &self,
        base: &str,
        scope: SearchScope,
        filter: &str,
    ) -> Result<SearchResult<'_>> {
        self.search(base, scope, filter, ALL_ATTRIBUTES, DEFAULT_SEARCH_TIMEOUT)
    }

    /// Subtree [`Connection::search`] requesting all attributes.
    ///
    /// # Errors
    ///
    /// See [`Connection::search`].
    pub fn search_subtree_with_timeout(
        &self,
        base: &str,
        filter: &str,
        timeout: Duration,
    ) -> Result<SearchResult<'_>> {
        self.search(base, SearchScope::Subtree, filter, ALL_ATTRIBUTES, timeout)
    }

    /// Subtree [`Connection::search`] requesting all attributes with the default timeout.
    ///
    /// # Errors
    ///
    /// See [`Connection::search`].
    pub fn search_subtree(&self, base: &str, filter: &str) -> Result<SearchResult<'_>> {
        self.search(
            base,
            SearchScope::Subtree,
            filter,
            ALL_ATTRIBUTES,
            DEFAULT_SEARCH_TIMEOUT,
        )
    }

    /// Releases the session. Never fails.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        match self.engine.unbind(self.session) {
            Ok(()) => debug!(uri = %self.uri, session = self.session.id(), "directory session closed"),
            Err(code) => warn!(
                uri = %self.uri,
                session = self.session.id(),
                rc = code.value(),
                "ignoring failure while closing directory session"
            ),
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("uri", &self.uri)
            .field("session", &self.session)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}
