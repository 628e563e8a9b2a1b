//! Conversion of engine status codes into typed errors.

use crate::engine::{DirectoryEngine, EngineResult, SessionHandle};
use crate::Result;
use ldap_client_core::{Error, ErrorKind, ResultCode};

/// Checks an engine status code.
///
/// Success passes; any other code becomes an error of `kind` whose message comes from the engine,
/// scoped to `session` when one exists.
pub(crate) fn check(
    engine: &dyn DirectoryEngine,
    session: Option<SessionHandle>,
    code: ResultCode,
    kind: ErrorKind,
) -> Result<()> {
    if code.is_success() {
        Ok(())
    } else {
        Err(failure(engine, session, code, kind))
    }
}

/// Lifts an engine outcome through [`check`].
pub(crate) fn translate<T>(
    engine: &dyn DirectoryEngine,
    session: Option<SessionHandle>,
    outcome: EngineResult<T>,
    kind: ErrorKind,
) -> Result<T> {
    match outcome {
        Ok(value) => Ok(value),
        Err(code) => {
            check(engine, session, code, kind)?;
            // The engine failed but reported the success code.
            Err(failure(engine, session, ResultCode::LOCAL_ERROR, kind))
        }
    }
}

fn failure(
    engine: &dyn DirectoryEngine,
    session: Option<SessionHandle>,
    code: ResultCode,
    kind: ErrorKind,
) -> Error {
    let message = engine.error_string(session, code);
    Error::new(kind, code, message)
}
