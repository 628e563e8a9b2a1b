//! Error types for directory operations.
//!
//! Every engine primitive reports a numeric [`ResultCode`]. The façade converts each non-success
//! code into an [`Error`] whose variant names the operation family that failed, while keeping the
//! original code and the engine's message available for programmatic matching.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Numeric status code reported by a directory engine.
///
/// Non-negative values are LDAP result codes as defined by
/// [RFC 4511, Appendix A.1](https://tools.ietf.org/html/rfc4511#appendix-A.1). Negative values are
/// client-side conditions raised by the engine itself (lost connection, timeout, bad parameter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ResultCode(i32);

impl ResultCode {
    /// Operation completed successfully.
    pub const SUCCESS: Self = Self(0);
    /// Server-side operations error.
    pub const OPERATIONS_ERROR: Self = Self(1);
    /// Protocol error.
    pub const PROTOCOL_ERROR: Self = Self(2);
    /// Server time limit exceeded.
    pub const TIME_LIMIT_EXCEEDED: Self = Self(3);
    /// Server size limit exceeded.
    pub const SIZE_LIMIT_EXCEEDED: Self = Self(4);
    /// Authentication method not supported.
    pub const AUTH_METHOD_NOT_SUPPORTED: Self = Self(7);
    /// Stronger authentication required.
    pub const STRONGER_AUTH_REQUIRED: Self = Self(8);
    /// Partial results and referral received.
    pub const PARTIAL_RESULTS: Self = Self(9);
    /// Referral returned instead of a result.
    pub const REFERRAL: Self = Self(10);
    /// Administrative limit exceeded.
    pub const ADMIN_LIMIT_EXCEEDED: Self = Self(11);
    /// Confidentiality (TLS) required.
    pub const CONFIDENTIALITY_REQUIRED: Self = Self(13);
    /// Search base does not exist.
    pub const NO_SUCH_OBJECT: Self = Self(32);
    /// Malformed distinguished name.
    pub const INVALID_DN_SYNTAX: Self = Self(34);
    /// Inappropriate authentication.
    pub const INAPPROPRIATE_AUTHENTICATION: Self = Self(48);
    /// Credentials rejected by the server.
    pub const INVALID_CREDENTIALS: Self = Self(49);
    /// Insufficient access rights.
    pub const INSUFFICIENT_ACCESS_RIGHTS: Self = Self(50);
    /// Server busy.
    pub const BUSY: Self = Self(51);
    /// Server unavailable.
    pub const UNAVAILABLE: Self = Self(52);
    /// Server unwilling to perform.
    pub const UNWILLING_TO_PERFORM: Self = Self(53);
    /// Unspecified server error.
    pub const OTHER: Self = Self(80);
    /// Cannot contact the server.
    pub const SERVER_DOWN: Self = Self(-1);
    /// Local engine error.
    pub const LOCAL_ERROR: Self = Self(-2);
    /// Request encoding failed.
    pub const ENCODING_ERROR: Self = Self(-3);
    /// Response decoding failed.
    pub const DECODING_ERROR: Self = Self(-4);
    /// Client-side deadline expired.
    pub const TIMEOUT: Self = Self(-5);
    /// Unknown authentication method.
    pub const AUTH_UNKNOWN: Self = Self(-6);
    /// Malformed search filter.
    pub const FILTER_ERROR: Self = Self(-7);
    /// Operation cancelled by the user.
    pub const USER_CANCELLED: Self = Self(-8);
    /// Bad parameter passed to an engine routine.
    pub const PARAM_ERROR: Self = Self(-9);
    /// Out of memory.
    pub const NO_MEMORY: Self = Self(-10);
    /// Connection could not be established.
    pub const CONNECT_ERROR: Self = Self(-11);
    /// Requested feature not supported by the engine.
    pub const NOT_SUPPORTED: Self = Self(-12);

    /// Wraps a raw engine status.
    #[must_use]
    pub const fn new(code: i32) -> Self {
        Self(code)
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn value(self) -> i32 {
        self.0
    }

    /// Returns true for [`ResultCode::SUCCESS`].
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }

    /// Symbolic name of the code, or `"unknown"`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self.0 {
            0 => "success",
            1 => "operationsError",
            2 => "protocolError",
            3 => "timeLimitExceeded",
            4 => "sizeLimitExceeded",
            5 => "compareFalse",
            6 => "compareTrue",
            7 => "authMethodNotSupported",
            8 => "strongerAuthRequired",
            9 => "partialResults",
            10 => "referral",
            11 => "adminLimitExceeded",
            12 => "unavailableCriticalExtension",
            13 => "confidentialityRequired",
            14 => "saslBindInProgress",
            16 => "noSuchAttribute",
            17 => "undefinedAttributeType",
            18 => "inappropriateMatching",
            19 => "constraintViolation",
            20 => "attributeOrValueExists",
            21 => "invalidAttributeSyntax",
            32 => "noSuchObject",
            33 => "aliasProblem",
            34 => "invalidDNSyntax",
            36 => "aliasDereferencingProblem",
            48 => "inappropriateAuthentication",
            49 => "invalidCredentials",
            50 => "insufficientAccessRights",
            51 => "busy",
            52 => "unavailable",
            53 => "unwillingToPerform",
            54 => "loopDetect",
            64 => "namingViolation",
            65 => "objectClassViolation",
            66 => "notAllowedOnNonLeaf",
            67 => "notAllowedOnRDN",
            68 => "entryAlreadyExists",
            69 => "objectClassModsProhibited",
            71 => "affectsMultipleDSAs",
            80 => "other",
            88 => "abandoned",
            -1 => "serverDown",
            -2 => "localError",
            -3 => "encodingError",
            -4 => "decodingError",
            -5 => "timeout",
            -6 => "authUnknown",
            -7 => "filterError",
            -8 => "userCancelled",
            -9 => "paramError",
            -10 => "noMemory",
            -11 => "connectError",
            -12 => "notSupported",
            _ => "unknown",
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for ResultCode {
    fn from(code: i32) -> Self {
        Self(code)
    }
}

impl From<ResultCode> for i32 {
    fn from(code: ResultCode) -> Self {
        code.0
    }
}

/// Operation family an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad input detected before any engine call.
    Configuration,
    /// Session initialization, teardown or option failures.
    Connection,
    /// Bind failures.
    Authentication,
    /// Search execution failures.
    Search,
}

/// Main error type for directory operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Invalid input rejected before touching the engine
    #[error("Configuration error: {message} (rc={code})")]
    Configuration {
        /// Originating result code
        code: ResultCode,
        /// Human-readable message
        message: String,
    },

    /// Session or option failure
    #[error("Connection error: {message} (rc={code})")]
    Connection {
        /// Originating result code
        code: ResultCode,
        /// Human-readable message
        message: String,
    },

    /// Bind failure
    #[error("Authentication failed: {message} (rc={code})")]
    Authentication {
        /// Originating result code
        code: ResultCode,
        /// Human-readable message
        message: String,
    },

    /// Search failure
    #[error("Search failed: {message} (rc={code})")]
    Search {
        /// Originating result code
        code: ResultCode,
        /// Human-readable message
        message: String,
    },
}

/// Specialized result type for directory operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Builds an error of the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind, code: ResultCode, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            ErrorKind::Configuration => Self::Configuration { code, message },
            ErrorKind::Connection => Self::Connection { code, message },
            ErrorKind::Authentication => Self::Authentication { code, message },
            ErrorKind::Search => Self::Search { code, message },
        }
    }

    /// Shorthand for a configuration error with [`ResultCode::PARAM_ERROR`].
    #[must_use]
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, ResultCode::PARAM_ERROR, message)
    }

    /// The operation family of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration { .. } => ErrorKind::Configuration,
            Self::Connection { .. } => ErrorKind::Connection,
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::Search { .. } => ErrorKind::Search,
        }
    }

    /// The engine result code carried by this error.
    #[must_use]
    pub const fn code(&self) -> ResultCode {
        match self {
            Self::Configuration { code, .. }
            | Self::Connection { code, .. }
            | Self::Authentication { code, .. }
            | Self::Search { code, .. } => *code,
        }
    }

    /// The human-readable message carried by this error.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Configuration { message, .. }
            | Self::Connection { message, .. }
            | Self::Authentication { message, .. }
            | Self::Search { message, .. } => message,
        }
    }

    /// Returns the error code string for this error type.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::Connection { .. } => "CONNECTION_ERROR",
            Self::Authentication { .. } => "AUTHENTICATION_ERROR",
            Self::Search { .. } => "SEARCH_ERROR",
        }
    }

    /// Returns true if this error should be logged as a serious error.
    ///
    /// Rejected credentials and empty searches are routine; lost sessions and bad configuration are
    /// not.
    #[must_use]
    pub const fn should_log(&self) -> bool {
        matches!(self, Self::Configuration { .. } | Self::Connection { .. })
    }
}

// Conversions from external error types
impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::invalid_parameter(format!("invalid server URI: {err}"))
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::invalid_parameter(format!("invalid configuration: {err}"))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::new(
            ErrorKind::Configuration,
            ResultCode::DECODING_ERROR,
            format!("failed to parse configuration: {err}"),
        )
    }
}
