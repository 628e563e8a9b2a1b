//! Configuration structures for directory connections.
//!
//! A [`ConnectionConfig`] describes everything needed to open and authenticate a session: the
//! server URI, the protocol version, the process-wide options to apply first, and optional bind
//! credentials.

use crate::types::ProtocolVersion;
use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;
use validator::Validate;

/// Default connection establishment timeout (seconds).
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Configuration for a directory connection.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ConnectionConfig {
    /// Server URI (`ldap://`, `ldaps://` or `ldapi://`)
    #[validate(url)]
    pub uri: String,

    /// Protocol version number, 2 or 3
    #[serde(default = "default_protocol_version")]
    pub protocol_version: i32,

    /// Optional CA certificate file used to verify TLS sessions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_certificate: Option<PathBuf>,

    /// Optional process-wide engine debug level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_level: Option<i32>,

    /// Connection establishment timeout in seconds
    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Credentials for an initial simple bind
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<BindCredentials>,
}

const fn default_protocol_version() -> i32 {
    ProtocolVersion::V3.number()
}

const fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

impl ConnectionConfig {
    /// Create a new configuration for the given server URI.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the URI cannot be parsed.
    pub fn new(uri: impl Into<String>) -> Result<Self> {
        let uri = uri.into();
        Url::parse(&uri)?;

        Ok(Self {
            uri,
            protocol_version: default_protocol_version(),
            ca_certificate: None,
            debug_level: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            bind: None,
        })
    }

    /// Parse a configuration from JSON and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the document is malformed or fails validation.
    pub fn from_json(input: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the protocol version number.
    #[must_use]
    pub const fn with_protocol_version(mut self, version: i32) -> Self {
        self.protocol_version = version;
        self
    }

    /// Set the CA certificate file.
    #[must_use]
    pub fn with_ca_certificate(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_certificate = Some(path.into());
        self
    }

    /// Set the process-wide engine debug level.
    #[must_use]
    pub const fn with_debug_level(mut self, level: i32) -> Self {
        self.debug_level = Some(level);
        self
    }

    /// Set the connection timeout in seconds.
    #[must_use]
    pub const fn with_connect_timeout_secs(mut self, seconds: u64) -> Self {
        self.connect_timeout_secs = seconds;
        self
    }

    /// Bind with these credentials right after opening.
    #[must_use]
    pub fn with_bind(mut self, credentials: BindCredentials) -> Self {
        self.bind = Some(credentials);
        self
    }

    /// Get the connect timeout as a Duration.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Convert the numeric protocol version.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] unless the version is 2 or 3.
    pub fn protocol_version(&self) -> Result<ProtocolVersion> {
        ProtocolVersion::try_from(self.protocol_version)
    }

    /// Validate field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] describing the first failing constraints.
    pub fn check(&self) -> Result<()> {
        self.validate().map_err(Error::from)
    }
}

/// Simple bind credentials.
#[derive(Debug, Serialize, Deserialize)]
pub struct BindCredentials {
    /// Bind DN
    pub dn: String,

    /// Bind password
    #[serde(skip_serializing)]
    pub password: SecretString,
}

impl BindCredentials {
    /// Create new bind credentials.
    #[must_use]
    pub fn new(dn: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// Get the bind DN.
    #[must_use]
    pub fn dn(&self) -> &str {
        &self.dn
    }

    /// Get the bind password.
    #[must_use]
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, ResultCode};

    #[test]
    fn test_connection_config_new() {
        let config = ConnectionConfig::new("ldap://ldap.example.com").unwrap();
        assert_eq!(config.uri, "ldap://ldap.example.com");
        assert_eq!(config.protocol_version, 3);
        assert_eq!(config.connect_timeout_secs, DEFAULT_CONNECT_TIMEOUT_SECS);
        assert!(config.ca_certificate.is_none());
        assert!(config.bind.is_none());
    }

    #[test]
    fn test_connection_config_invalid_uri() {
        let err = ConnectionConfig::new("not a uri").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_connection_config_builder() {
        let config = ConnectionConfig::new("ldaps://ldap.example.com:636")
            .unwrap()
            .with_protocol_version(2)
            .with_ca_certificate("/etc/ssl/certs/ca.pem")
            .with_debug_level(1)
            .with_connect_timeout_secs(20)
            .with_bind(BindCredentials::new("cn=admin,dc=example,dc=com", "secret"));

        assert_eq!(config.protocol_version().unwrap(), ProtocolVersion::V2);
        assert_eq!(
            config.ca_certificate,
            Some(PathBuf::from("/etc/ssl/certs/ca.pem"))
        );
        assert_eq!(config.debug_level, Some(1));
        assert_eq!(config.connect_timeout(), Duration::from_secs(20));
        let bind = config.bind.as_ref().unwrap();
        assert_eq!(bind.dn(), "cn=admin,dc=example,dc=com");
        assert_eq!(bind.password(), "secret");
    }

    #[test]
    fn test_protocol_version_rejected() {
        let config = ConnectionConfig::new("ldap://localhost")
            .unwrap()
            .with_protocol_version(4);
        let err = config.protocol_version().unwrap_err();
        assert_eq!(err.code(), ResultCode::PARAM_ERROR);
    }

    #[test]
    fn test_from_json_defaults() {
        let config = ConnectionConfig::from_json(
            r#"{"uri": "ldap://ldap.example.com", "bind": {"dn": "cn=reader", "password": "pw"}}"#,
        )
        .unwrap();
        assert_eq!(config.protocol_version, 3);
        assert_eq!(config.connect_timeout_secs, 10);
        assert_eq!(config.bind.unwrap().password(), "pw");
    }

    #[test]
    fn test_from_json_validation() {
        let err =
            ConnectionConfig::from_json(r#"{"uri": "ldap://localhost", "connect_timeout_secs": 0}"#)
                .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let err = ConnectionConfig::from_json("{oops}").unwrap_err();
        assert_eq!(err.code(), ResultCode::DECODING_ERROR);
    }

    #[test]
    fn test_password_not_serialized() {
        let config = ConnectionConfig::new("ldap://localhost")
            .unwrap()
            .with_bind(BindCredentials::new("cn=admin", "hunter2"));
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("cn=admin"));
        assert!(!json.contains("hunter2"));
        assert!(!json.contains("ca_certificate"));
    }

    #[test]
    fn test_check_timeout_range() {
        let mut config = ConnectionConfig::new("ldap://localhost").unwrap();
        assert!(config.check().is_ok());

        config.connect_timeout_secs = 301;
        assert!(config.check().is_err());
    }
}
