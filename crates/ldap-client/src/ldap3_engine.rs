//! Directory engine backed by `ldap3`.

use crate::engine::{
    BindMechanism, DirectoryEngine, EngineOption, EngineResult, RawAttribute, RawEntry,
    SearchRequest, SessionHandle,
};
use ldap3::{LdapConn, LdapConnSettings, LdapError, Scope, SearchEntry};
use ldap_client_core::config::DEFAULT_CONNECT_TIMEOUT_SECS;
use ldap_client_core::{ConnectionConfig, ProtocolVersion, ResultCode, SearchScope};
use native_tls::{Certificate, TlsConnector};
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;
use tracing::trace;

/// Options shared by every `Ldap3Engine` in the process.
struct GlobalOptions {
    debug_level: i32,
    encoder_debug_level: i32,
    ca_certificate: Option<PathBuf>,
}

static GLOBAL_OPTIONS: RwLock<GlobalOptions> = RwLock::new(GlobalOptions {
    debug_level: 0,
    encoder_debug_level: 0,
    ca_certificate: None,
});

fn debug_enabled() -> bool {
    read_globals().debug_level != 0
}

fn encoder_debug_enabled() -> bool {
    read_globals().encoder_debug_level != 0
}

fn read_globals() -> std::sync::RwLockReadGuard<'static, GlobalOptions> {
    GLOBAL_OPTIONS.read().unwrap_or_else(PoisonError::into_inner)
}

const fn ldap3_scope(scope: SearchScope) -> Scope {
    match scope {
        SearchScope::Base => Scope::Base,
        SearchScope::OneLevel => Scope::OneLevel,
        SearchScope::Subtree => Scope::Subtree,
    }
}

/// Production engine speaking LDAPv3 through `ldap3`'s synchronous connection.
///
/// Sessions connect lazily on their first bind or search, so process-wide options set after
/// [`DirectoryEngine::initialize`] still apply. Debug levels and the CA certificate are shared by
/// every instance in the process.
pub struct Ldap3Engine {
    sessions: Mutex<HashMap<SessionHandle, Arc<Mutex<Ldap3Session>>>>,
    next_id: AtomicU64,
    connect_timeout: Duration,
}

impl Ldap3Engine {
    /// Creates an engine with the default connect timeout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    /// Creates an engine using the connect timeout from `config`.
    #[must_use]
    pub fn from_config(config: &ConnectionConfig) -> Self {
        Self::new().with_connect_timeout(config.connect_timeout())
    }

    /// Overrides the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    fn table(&self) -> MutexGuard<'_, HashMap<SessionHandle, Arc<Mutex<Ldap3Session>>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn session(&self, handle: SessionHandle) -> EngineResult<Arc<Mutex<Ldap3Session>>> {
        self.table()
            .get(&handle)
            .cloned()
            .ok_or(ResultCode::PARAM_ERROR)
    }
}

impl Default for Ldap3Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectoryEngine for Ldap3Engine {
    fn initialize(&self, uri: &str) -> EngineResult<SessionHandle> {
        let url = url::Url::parse(uri).map_err(|_| ResultCode::PARAM_ERROR)?;
        if !matches!(url.scheme(), "ldap" | "ldaps" | "ldapi") {
            return Err(ResultCode::PARAM_ERROR);
        }

        let handle = SessionHandle::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let session = Ldap3Session {
            url: uri.to_owned(),
            version: ProtocolVersion::V3,
            conn: None,
            broken: false,
            diagnostic: String::new(),
        };
        self.table().insert(handle, Arc::new(Mutex::new(session)));
        if debug_enabled() {
            trace!(uri, session = handle.id(), "ldap3 session registered");
        }
        Ok(handle)
    }

    fn set_option(&self, session: Option<SessionHandle>, option: EngineOption) -> EngineResult<()> {
        if debug_enabled() {
            trace!(?session, ?option, "ldap3 set option");
        }
        match (session, option) {
            (None, EngineOption::DebugLevel(level)) => {
                write_globals().debug_level = level;
                Ok(())
            }
            (None, EngineOption::EncoderDebugLevel(level)) => {
                write_globals().encoder_debug_level = level;
                Ok(())
            }
            (None, EngineOption::CaCertificateFile(path)) => {
                if path.as_os_str().is_empty() {
                    return Err(ResultCode::PARAM_ERROR);
                }
                write_globals().ca_certificate = Some(path);
                Ok(())
            }
            (Some(handle), EngineOption::ProtocolVersion(version)) => {
                let session = self.session(handle)?;
                let mut session = lock(&session);
                match version {
                    ProtocolVersion::V3 => {
                        session.version = version;
                        session.diagnostic.clear();
                        Ok(())
                    }
                    ProtocolVersion::V2 => {
                        session.diagnostic = format!("{version} is not supported");
                        Err(ResultCode::NOT_SUPPORTED)
                    }
                }
            }
            _ => Err(ResultCode::PARAM_ERROR),
        }
    }

    fn bind(
        &self,
        session: SessionHandle,
        dn: &str,
        credential: &SecretString,
        mechanism: BindMechanism,
    ) -> EngineResult<()> {
        match mechanism {
            BindMechanism::Simple => {}
        }
        let session = self.session(session)?;
        let mut session = lock(&session);
        if debug_enabled() {
            trace!(url = %session.url, version = %session.version, dn, "ldap3 simple bind");
        }

        let conn = session.connection(self.connect_timeout)?;
        let outcome = conn.simple_bind(dn, credential.expose_secret());
        match outcome {
            Ok(result) => session.settle(result.rc, result.text),
            Err(err) => Err(session.record(&err)),
        }
    }

    fn search(&self, session: SessionHandle, request: &SearchRequest) -> EngineResult<Vec<RawEntry>> {
        let session = self.session(session)?;
        let mut session = lock(&session);
        if debug_enabled() {
            trace!(
                url = %session.url,
                base = %request.base,
                filter = %request.filter,
                ?request.scope,
                "ldap3 search"
            );
        }

        let attributes: Vec<&str> = request.attributes.names().collect();
        let conn = session.connection(self.connect_timeout)?;
        let outcome = conn
            .with_timeout(request.timeout.as_duration())
            .search(&request.base, ldap3_scope(request.scope), &request.filter, attributes);
        let ldap3::SearchResult(entries, result) = match outcome {
            Ok(search) => search,
            Err(err) => return Err(session.record(&err)),
        };
        session.settle(result.rc, result.text)?;

        let entries: Vec<RawEntry> = entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(raw_entry)
            .collect();
        if encoder_debug_enabled() {
            for entry in &entries {
                trace!(dn = %entry.dn, attributes = entry.attributes.len(), "ldap3 decoded entry");
            }
        }
        Ok(entries)
    }

    fn error_string(&self, session: Option<SessionHandle>, code: ResultCode) -> String {
        let diagnostic = session
            .and_then(|handle| self.session(handle).ok())
            .map(|session| {
                // The guard must drop before `session` does.
                let guard = lock(&session);
                guard.diagnostic.clone()
            })
            .filter(|text| !text.is_empty());
        diagnostic.unwrap_or_else(|| code.name().to_string())
    }

    fn last_diagnostic(&self, session: SessionHandle) -> EngineResult<String> {
        let session = self.session(session)?;
        let text = lock(&session).diagnostic.clone();
        Ok(text)
    }

    fn unbind(&self, session: SessionHandle) -> EngineResult<()> {
        let removed = self.table().remove(&session);
        let session = removed.ok_or(ResultCode::PARAM_ERROR)?;
        let mut session = lock(&session);
        if debug_enabled() {
            trace!(url = %session.url, connected = session.conn.is_some(), "ldap3 unbind");
        }
        match session.conn.take() {
            Some(mut conn) => conn.unbind().map_err(|err| session.record(&err)),
            None => Ok(()),
        }
    }
}

/// Per-session state. The transport is opened once; after it fails the session stays down.
struct Ldap3Session {
    url: String,
    version: ProtocolVersion,
    conn: Option<LdapConn>,
    broken: bool,
    diagnostic: String,
}

const CONNECTION_LOST: &str = "connection to the directory server was lost";

impl Ldap3Session {
    fn connection(&mut self, timeout: Duration) -> EngineResult<&mut LdapConn> {
        self.diagnostic.clear();
        if self.broken {
            self.diagnostic = CONNECTION_LOST.to_string();
            return Err(ResultCode::SERVER_DOWN);
        }
        if self.conn.is_none() {
            let conn = connect(&self.url, timeout).map_err(|(code, text)| {
                self.diagnostic = text;
                code
            })?;
            self.conn = Some(conn);
        }
        self.conn.as_mut().ok_or(ResultCode::LOCAL_ERROR)
    }

    fn settle(&mut self, rc: u32, text: String) -> EngineResult<()> {
        self.diagnostic = text;
        let code = i32::try_from(rc).map_or(ResultCode::OTHER, ResultCode::new);
        if code.is_success() {
            Ok(())
        } else {
            Err(code)
        }
    }

    fn record(&mut self, err: &LdapError) -> ResultCode {
        let (code, text) = match err {
            LdapError::LdapResult { result } => (
                i32::try_from(result.rc).map_or(ResultCode::OTHER, ResultCode::new),
                result.text.clone(),
            ),
            other => (map_ldap_error(other), other.to_string()),
        };
        self.diagnostic = text;
        // Never reconnect: a new transport would silently drop the bind identity.
        if code == ResultCode::SERVER_DOWN {
            self.conn = None;
            self.broken = true;
        }
        code
    }
}

fn connect(url: &str, timeout: Duration) -> Result<LdapConn, (ResultCode, String)> {
    let settings = build_ldap_settings(timeout)?;
    LdapConn::with_settings(settings, url).map_err(|err| (map_ldap_error(&err), err.to_string()))
}

fn build_ldap_settings(timeout: Duration) -> Result<LdapConnSettings, (ResultCode, String)> {
    let mut settings = LdapConnSettings::new().set_conn_timeout(timeout);

    let ca_certificate = read_globals().ca_certificate.clone();
    if let Some(cert_path) = ca_certificate {
        let pem = fs::read(&cert_path).map_err(|err| {
            (
                ResultCode::CONNECT_ERROR,
                format!(
                    "failed to read CA certificate {}: {err}",
                    cert_path.display()
                ),
            )
        })?;
        let certificate = Certificate::from_pem(&pem).map_err(|err| {
            (
                ResultCode::CONNECT_ERROR,
                format!("invalid CA certificate: {err}"),
            )
        })?;
        let connector = TlsConnector::builder()
            .add_root_certificate(certificate)
            .build()
            .map_err(|err| {
                (
                    ResultCode::CONNECT_ERROR,
                    format!("failed to load CA certificate: {err}"),
                )
            })?;
        settings = settings.set_connector(connector);
    }

    Ok(settings)
}

fn map_ldap_error(err: &LdapError) -> ResultCode {
    match err {
        LdapError::LdapResult { result } => {
            i32::try_from(result.rc).map_or(ResultCode::OTHER, ResultCode::new)
        }
        LdapError::Timeout { .. } => ResultCode::TIMEOUT,
        LdapError::Io { .. } => ResultCode::SERVER_DOWN,
        LdapError::UrlParsing { .. } | LdapError::UnknownScheme { .. } => ResultCode::PARAM_ERROR,
        LdapError::FilterParsing { .. } => ResultCode::FILTER_ERROR,
        _ => ResultCode::LOCAL_ERROR,
    }
}

fn raw_entry(entry: SearchEntry) -> RawEntry {
    let text = entry.attrs.into_iter().map(|(name, values)| RawAttribute {
        name,
        values: values.into_iter().map(String::into_bytes).collect(),
    });
    let binary = entry
        .bin_attrs
        .into_iter()
        .map(|(name, values)| RawAttribute { name, values });
    RawEntry {
        dn: entry.dn,
        attributes: text.chain(binary).collect(),
    }
}

fn write_globals() -> std::sync::RwLockWriteGuard<'static, GlobalOptions> {
    GLOBAL_OPTIONS.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock(session: &Mutex<Ldap3Session>) -> MutexGuard<'_, Ldap3Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}
