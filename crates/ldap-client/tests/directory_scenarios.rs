//! End-to-end connection scenarios against an in-memory directory engine.
//!
//! The fake engine records every primitive it receives so the tests can check both what the
//! caller sees and what reached the engine.

use ldap_client::{
    BindMechanism, Connection, ConnectionConfig, DirectoryEngine, EngineOption, EngineResult,
    ErrorKind, ProtocolVersion, RawEntry, ResultCode, SearchRequest, SearchScope, SessionHandle,
    Timeval,
};
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const URI: &str = "ldap://ldap.example.com:389";
const READER_DN: &str = "cn=reader,dc=example,dc=com";
const READER_PASSWORD: &str = "reader-secret";

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Initialize(String),
    SetOption(Option<SessionHandle>, EngineOption),
    Bind(SessionHandle, String),
    Search(SessionHandle, SearchRequest),
    Unbind(SessionHandle),
}

/// Directory engine serving a fixed set of entries.
#[derive(Default)]
struct InMemoryDirectory {
    next_id: AtomicU64,
    accounts: HashMap<String, String>,
    entries: Vec<RawEntry>,
    refuse_version_two: bool,
    fail_unbind: bool,
    calls: Mutex<Vec<Call>>,
    diagnostics: Mutex<HashMap<SessionHandle, String>>,
}

impl InMemoryDirectory {
    fn new() -> Self {
        let mut accounts = HashMap::new();
        accounts.insert(READER_DN.to_string(), READER_PASSWORD.to_string());
        Self {
            accounts,
            entries: vec![RawEntry::new("uid=alice,dc=example,dc=com")
                .with_attribute("cn", ["Alice Liddell"])
                .with_attribute("mail", ["alice@example.com", "alice@wonderland.example"])],
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn diagnose(&self, session: SessionHandle, text: &str) {
        self.diagnostics
            .lock()
            .unwrap()
            .insert(session, text.to_string());
    }
}

impl DirectoryEngine for InMemoryDirectory {
    fn initialize(&self, uri: &str) -> EngineResult<SessionHandle> {
        self.record(Call::Initialize(uri.to_string()));
        if !uri.starts_with("ldap://") && !uri.starts_with("ldaps://") {
            return Err(ResultCode::PARAM_ERROR);
        }
        Ok(SessionHandle::new(
            self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
        ))
    }

    fn set_option(&self, session: Option<SessionHandle>, option: EngineOption) -> EngineResult<()> {
        self.record(Call::SetOption(session, option.clone()));
        match (session, option) {
            (Some(handle), EngineOption::ProtocolVersion(ProtocolVersion::V2))
                if self.refuse_version_two =>
            {
                self.diagnose(handle, "protocol version 2 disabled");
                Err(ResultCode::NOT_SUPPORTED)
            }
            _ => Ok(()),
        }
    }

    fn bind(
        &self,
        session: SessionHandle,
        dn: &str,
        credential: &SecretString,
        _mechanism: BindMechanism,
    ) -> EngineResult<()> {
        self.record(Call::Bind(session, dn.to_string()));
        match self.accounts.get(dn) {
            Some(password) if password == credential.expose_secret() => Ok(()),
            _ => {
                self.diagnose(session, "Invalid credentials");
                Err(ResultCode::INVALID_CREDENTIALS)
            }
        }
    }

    fn search(&self, session: SessionHandle, request: &SearchRequest) -> EngineResult<Vec<RawEntry>> {
        self.record(Call::Search(session, request.clone()));
        if request.filter.is_empty() || !request.filter.starts_with('(') {
            self.diagnose(session, "Bad search filter");
            return Err(ResultCode::FILTER_ERROR);
        }
        if request.base == "dc=missing,dc=com" {
            self.diagnose(session, "No such object");
            return Err(ResultCode::NO_SUCH_OBJECT);
        }
        Ok(self
            .entries
            .iter()
            .map(|entry| {
                let requested: Vec<&str> = request.attributes.names().collect();
                let mut out = RawEntry::new(entry.dn.clone());
                for attribute in &entry.attributes {
                    if requested.is_empty() || requested.contains(&attribute.name.as_str()) {
                        out = out.with_attribute(attribute.name.clone(), attribute.values.clone());
                    }
                }
                out
            })
            .collect())
    }

    fn error_string(&self, session: Option<SessionHandle>, code: ResultCode) -> String {
        session
            .and_then(|handle| self.diagnostics.lock().unwrap().get(&handle).cloned())
            .unwrap_or_else(|| code.name().to_string())
    }

    fn last_diagnostic(&self, session: SessionHandle) -> EngineResult<String> {
        Ok(self
            .diagnostics
            .lock()
            .unwrap()
            .get(&session)
            .cloned()
            .unwrap_or_default())
    }

    fn unbind(&self, session: SessionHandle) -> EngineResult<()> {
        self.record(Call::Unbind(session));
        if self.fail_unbind {
            Err(ResultCode::SERVER_DOWN)
        } else {
            Ok(())
        }
    }
}

fn fixture_config() -> ConnectionConfig {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("connection_config.json");
    let json = fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture at {}: {}", path.display(), e));
    ConnectionConfig::from_json(&json).unwrap()
}

#[test]
fn bind_then_search_returns_requested_attributes() {
    let directory = Arc::new(InMemoryDirectory::new());
    let mut conn = Connection::open(directory.clone(), URI, ProtocolVersion::V3).unwrap();
    conn.simple_bind(READER_DN, READER_PASSWORD).unwrap();

    let result = conn
        .search(
            "dc=example,dc=com",
            SearchScope::Subtree,
            "(uid=alice)",
            &["cn", "mail"],
            Duration::from_millis(5000),
        )
        .unwrap();

    assert_eq!(result.len(), 1);
    let alice = &result.entries()[0];
    assert_eq!(alice.dn, "uid=alice,dc=example,dc=com");
    assert_eq!(alice.first("cn"), Some("Alice Liddell"));
    assert_eq!(
        alice.values("mail").unwrap(),
        &[
            "alice@example.com".to_string(),
            "alice@wonderland.example".to_string()
        ]
    );

    let request = directory
        .calls()
        .into_iter()
        .find_map(|call| match call {
            Call::Search(_, request) => Some(request),
            _ => None,
        })
        .unwrap();
    assert_eq!(request.attributes.as_slice().len(), 3);
    assert_eq!(request.attributes.as_slice()[2], None);
    assert_eq!(request.timeout, Timeval::from_millis(5000));
}

#[test]
fn rejected_bind_reports_engine_code_and_message() {
    let directory = Arc::new(InMemoryDirectory::new());
    let mut conn = Connection::open(directory, URI, ProtocolVersion::V3).unwrap();

    let err = conn.simple_bind(READER_DN, "wrong").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert_eq!(err.code(), ResultCode::INVALID_CREDENTIALS);
    assert_eq!(err.message(), "Invalid credentials");
    assert_eq!(conn.last_error().unwrap(), "Invalid credentials");
}

#[test]
fn sasl_bind_behaves_like_simple_bind() {
    let directory = Arc::new(InMemoryDirectory::new());
    let mut conn = Connection::open(directory.clone(), URI, ProtocolVersion::V3).unwrap();

    conn.sasl_bind(READER_DN, READER_PASSWORD).unwrap();
    let err = conn.sasl_bind("cn=nobody", "x").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authentication);

    let binds = directory
        .calls()
        .into_iter()
        .filter(|call| matches!(call, Call::Bind(..)))
        .count();
    assert_eq!(binds, 2);
}

#[test]
fn both_protocol_versions_open() {
    for version in [ProtocolVersion::V2, ProtocolVersion::V3] {
        let directory = Arc::new(InMemoryDirectory::new());
        let conn = Connection::open(directory.clone(), URI, version).unwrap();
        assert_eq!(conn.protocol_version(), version);
        assert!(directory.calls().contains(&Call::SetOption(
            Some(conn.session()),
            EngineOption::ProtocolVersion(version)
        )));
    }
}

#[test]
fn refused_version_is_a_connection_error_and_releases_the_session() {
    let directory = Arc::new(InMemoryDirectory {
        refuse_version_two: true,
        ..InMemoryDirectory::new()
    });

    let err = Connection::open(directory.clone(), URI, ProtocolVersion::V2).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert_eq!(err.code(), ResultCode::NOT_SUPPORTED);
    assert_eq!(err.message(), "protocol version 2 disabled");

    let unbinds = directory
        .calls()
        .into_iter()
        .filter(|call| matches!(call, Call::Unbind(_)))
        .count();
    assert_eq!(unbinds, 1);
}

#[test]
fn unsupported_version_in_config_fails_before_the_engine() {
    let directory = Arc::new(InMemoryDirectory::new());
    let config = fixture_config().with_protocol_version(4);

    let err = Connection::from_config(directory.clone(), &config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(directory.calls().is_empty());
}

#[test]
fn config_fixture_opens_and_binds() {
    let directory = Arc::new(InMemoryDirectory::new());
    let config = fixture_config();
    assert_eq!(config.connect_timeout(), Duration::from_secs(5));

    let conn = Connection::from_config(directory.clone(), &config).unwrap();
    assert_eq!(conn.uri(), URI);

    let calls = directory.calls();
    assert_eq!(
        calls[0],
        Call::SetOption(None, EngineOption::DebugLevel(0))
    );
    assert_eq!(
        calls[1],
        Call::SetOption(None, EngineOption::EncoderDebugLevel(0))
    );
    assert_eq!(calls[2], Call::Initialize(URI.to_string()));
    assert!(calls.contains(&Call::Bind(conn.session(), READER_DN.to_string())));
}

#[test]
fn unsupported_scheme_is_a_connection_error() {
    let directory = Arc::new(InMemoryDirectory::new());
    let err = Connection::open(directory, "gopher://ldap.example.com", ProtocolVersion::V3)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert_eq!(err.code(), ResultCode::PARAM_ERROR);
    assert_eq!(err.message(), "paramError");
}

#[test]
fn search_failures_are_search_errors() {
    let directory = Arc::new(InMemoryDirectory::new());
    let conn = Connection::open(directory, URI, ProtocolVersion::V3).unwrap();

    let err = conn
        .search_all("dc=example,dc=com", SearchScope::Base, "uid=alice")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Search);
    assert_eq!(err.code(), ResultCode::FILTER_ERROR);
    assert_eq!(err.message(), "Bad search filter");

    let err = conn
        .search_subtree("dc=missing,dc=com", "(objectClass=*)")
        .unwrap_err();
    assert_eq!(err.code(), ResultCode::NO_SUCH_OBJECT);
}

#[test]
fn convenience_searches_use_defaults() {
    let directory = Arc::new(InMemoryDirectory::new());
    let conn = Connection::open(directory.clone(), URI, ProtocolVersion::V3).unwrap();

    let all = conn.search_subtree("dc=example,dc=com", "(objectClass=*)").unwrap();
    assert_eq!(all.entries()[0].attributes.len(), 2);
    let bounded = conn
        .search_subtree_with_timeout("dc=example,dc=com", "(uid=*)", Duration::from_millis(1500))
        .unwrap();
    assert_eq!(bounded.len(), 1);

    let timeouts: Vec<Timeval> = directory
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            Call::Search(_, request) => Some(request.timeout),
            _ => None,
        })
        .collect();
    assert_eq!(
        timeouts,
        vec![
            Timeval {
                seconds: 30,
                microseconds: 0
            },
            Timeval {
                seconds: 1,
                microseconds: 500_000
            },
        ]
    );
}

#[test]
fn entries_survive_close_once_taken() {
    let directory = Arc::new(InMemoryDirectory::new());
    let conn = Connection::open(directory, URI, ProtocolVersion::V3).unwrap();
    let result = conn
        .search_with_attributes("dc=example,dc=com", SearchScope::Subtree, "(uid=alice)", &["cn"])
        .unwrap();
    assert_eq!(result.connection().uri(), URI);

    let entries = result.into_entries();
    conn.close();
    assert_eq!(entries[0].first("cn"), Some("Alice Liddell"));
    assert!(entries[0].values("mail").is_none());
}

#[test]
fn close_swallows_unbind_failures() {
    let directory = Arc::new(InMemoryDirectory {
        fail_unbind: true,
        ..InMemoryDirectory::new()
    });
    let conn = Connection::open(directory.clone(), URI, ProtocolVersion::V3).unwrap();
    conn.close();

    let unbinds = directory
        .calls()
        .into_iter()
        .filter(|call| matches!(call, Call::Unbind(_)))
        .count();
    assert_eq!(unbinds, 1);
}
