//! Input checks applied before any store call

use crate::models::SessionRef;
use ai4ng_common::{Error, Result};

/// Reject a missing caller identity
///
/// An empty identity means the request was not authenticated upstream; it
/// must never be read as "no owner filter".
pub fn require_user(user_id: &str) -> Result<()> {
    if user_id.trim().is_empty() {
        return Err(Error::validation("user id is required"));
    }
    Ok(())
}

pub fn require_positive(value: i64, what: &str) -> Result<()> {
    if value <= 0 {
        return Err(Error::validation(format!("{} must be positive, got {}", what, value)));
    }
    Ok(())
}

pub fn require_session(session: &SessionRef) -> Result<()> {
    match session {
        SessionRef::Numeric(id) => require_positive(*id, "session id"),
        SessionRef::Name(name) if name.trim().is_empty() => {
            Err(Error::validation("session id is required"))
        }
        SessionRef::Name(_) => Ok(()),
    }
}

pub fn require_name(name: &str, what: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::validation(format!("{} is required", what)));
    }
    Ok(())
}
