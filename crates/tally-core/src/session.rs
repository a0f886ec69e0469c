//! # Session Context
//!
//! The authenticated caller, passed explicitly to every operation that needs
//! authorization instead of being looked up from ambient state.
//!
//! ```text
//! Bearer token ──► server auth extractor ──► SessionContext
//!                                               │
//!                        ensure_active(now) ◄───┘  (before any store access)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    /// Stable caller id from the token subject.
    pub subject: String,
    pub username: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionContext {
    /// Expiry is exclusive: a session expiring at `now` is already expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn ensure_active(&self, now: DateTime<Utc>) -> CoreResult<()> {
        if self.is_expired_at(now) {
            return Err(CoreError::SessionExpired);
        }
        Ok(())
    }

    /// Label for log fields.
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.subject)
    }
}
