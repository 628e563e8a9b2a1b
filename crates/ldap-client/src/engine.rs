//! Boundary between the façade and the directory protocol engine.
//!
//! The engine performs all network I/O, framing and transport security. The façade only marshals
//! parameters into the types below and checks the [`ResultCode`] of every primitive it calls.

use ldap_client_core::{ProtocolVersion, ResultCode, SearchScope, Timeval};
use secrecy::SecretString;
use std::path::PathBuf;

/// Outcome of an engine primitive; the error side never carries [`ResultCode::SUCCESS`].
pub type EngineResult<T> = std::result::Result<T, ResultCode>;

/// Opaque identifier of an engine session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionHandle(u64);

impl SessionHandle {
    /// Wraps an engine-assigned identifier.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Engine-assigned identifier.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }
}

/// Option understood by [`DirectoryEngine::set_option`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineOption {
    /// Protocol debug tracing level.
    DebugLevel(i32),
    /// Encoding-layer debug tracing level.
    EncoderDebugLevel(i32),
    /// CA certificate file used to verify TLS peers.
    CaCertificateFile(PathBuf),
    /// Protocol version spoken on a session.
    ProtocolVersion(ProtocolVersion),
}

/// Credential exchange used by [`DirectoryEngine::bind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum BindMechanism {
    /// DN plus cleartext password.
    Simple,
}

/// Requested attribute names followed by a terminating `None`.
///
/// An empty list (only the terminator) asks the engine for all user attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeList {
    slots: Vec<Option<String>>,
}

impl AttributeList {
    /// Copies `names` in order and appends the terminator.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut slots: Vec<Option<String>> = names
            .into_iter()
            .map(|name| Some(name.as_ref().to_owned()))
            .collect();
        slots.push(None);
        Self { slots }
    }

    /// A list requesting every attribute.
    #[must_use]
    pub fn all() -> Self {
        Self { slots: vec![None] }
    }

    /// All slots, terminator included.
    #[must_use]
    pub fn as_slice(&self) -> &[Option<String>] {
        &self.slots
    }

    /// Attribute names up to the terminator.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.slots.iter().map_while(Option::as_deref)
    }

    /// Number of attribute names, terminator excluded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len() - 1
    }

    /// True when no names were requested, meaning all attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Arguments of one search primitive call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Search base DN.
    pub base: String,
    /// Search scope.
    pub scope: SearchScope,
    /// Filter expression.
    pub filter: String,
    /// Terminated attribute list.
    pub attributes: AttributeList,
    /// Deadline handed to the engine.
    pub timeout: Timeval,
}

/// Entry as returned by the engine, before decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    /// Distinguished name.
    pub dn: String,
    /// Attributes in engine order.
    pub attributes: Vec<RawAttribute>,
}

/// Attribute with its raw values in engine order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawAttribute {
    /// Attribute description.
    pub name: String,
    /// Values as returned by the engine.
    pub values: Vec<Vec<u8>>,
}

impl RawEntry {
    /// Creates an entry without attributes.
    #[must_use]
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: Vec::new(),
        }
    }

    /// Appends an attribute with the given values.
    #[must_use]
    pub fn with_attribute<I, V>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Vec<u8>>,
    {
        self.attributes.push(RawAttribute {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }
}

/// Primitives of a directory protocol engine.
///
/// Implementations must be safe to share between connections. Options set without a session are
/// process-wide for that engine and have no reset hook.
#[cfg_attr(test, mockall::automock)]
pub trait DirectoryEngine: Send + Sync {
    /// Creates a session for `uri`.
    fn initialize(&self, uri: &str) -> EngineResult<SessionHandle>;

    /// Sets an option on a session, or engine-wide when `session` is `None`.
    fn set_option(&self, session: Option<SessionHandle>, option: EngineOption)
        -> EngineResult<()>;

    /// Authenticates the session.
    fn bind(
        &self,
        session: SessionHandle,
        dn: &str,
        credential: &SecretString,
        mechanism: BindMechanism,
    ) -> EngineResult<()>;

    /// Runs a blocking search bounded by `request.timeout`.
    fn search(&self, session: SessionHandle, request: &SearchRequest)
        -> EngineResult<Vec<RawEntry>>;

    /// Message for `code`, using the session's diagnostic text when one is available.
    fn error_string(&self, session: Option<SessionHandle>, code: ResultCode) -> String;

    /// The most recent diagnostic message recorded for the session.
    fn last_diagnostic(&self, session: SessionHandle) -> EngineResult<String>;

    /// Releases the session.
    fn unbind(&self, session: SessionHandle) -> EngineResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_list_appends_terminator() {
        let list = AttributeList::new(["cn", "mail", "uid"]);
        let slots = list.as_slice();
        assert_eq!(slots.len(), 4);
        assert_eq!(slots[0].as_deref(), Some("cn"));
        assert_eq!(slots[1].as_deref(), Some("mail"));
        assert_eq!(slots[2].as_deref(), Some("uid"));
        assert_eq!(slots[3], None);
        assert_eq!(list.len(), 3);
        assert_eq!(list.names().collect::<Vec<_>>(), vec!["cn", "mail", "uid"]);
    }

    #[test]
    fn attribute_list_keeps_duplicates_and_order() {
        let names = vec!["mail".to_string(), "cn".to_string(), "mail".to_string()];
        let list = AttributeList::new(&names);
        assert_eq!(list.names().collect::<Vec<_>>(), vec!["mail", "cn", "mail"]);
        assert_eq!(list.as_slice().len(), names.len() + 1);
    }

    #[test]
    fn empty_attribute_list_requests_everything() {
        let empty: [&str; 0] = [];
        let list = AttributeList::new(empty);
        assert_eq!(list, AttributeList::all());
        assert!(list.is_empty());
        assert_eq!(list.as_slice(), &[None]);
    }

    #[test]
    fn raw_entry_builder() {
        let entry = RawEntry::new("uid=alice,dc=example,dc=com")
            .with_attribute("cn", ["Alice"])
            .with_attribute("jpegPhoto", [vec![0xffu8, 0xd8]]);
        assert_eq!(entry.attributes.len(), 2);
        assert_eq!(entry.attributes[0].values, vec![b"Alice".to_vec()]);
        assert_eq!(entry.attributes[1].values, vec![vec![0xff, 0xd8]]);
    }
}
