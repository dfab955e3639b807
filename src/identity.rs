//! User and session identity stamped on every telemetry event.
//!
//! The user id is minted once and persisted in the local store; the session id
//! is minted once per process and never written anywhere.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::store::{LocalStore, load_json, save_json};

pub const USER_ID_KEY: &str = "uml_agent.user_id";

/// Long-lived user identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

/// Per-process session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub session_id: SessionId,
}

impl Identity {
    /// Reuse the persisted user id or mint and persist a new one, then mint a
    /// fresh session id.
    ///
    /// A failed write is logged and the freshly minted id is used for this
    /// process only; identity is never fatal.
    #[must_use]
    pub fn load_or_create(store: &dyn LocalStore) -> Self {
        let user_id = match load_json::<UserId>(store, USER_ID_KEY) {
            Some(id) => id,
            None => {
                let id = UserId(Uuid::new_v4());
                match save_json(store, USER_ID_KEY, &id) {
                    Ok(()) => info!(user_id = %id, "minted new user id"),
                    Err(e) => warn!(user_id = %id, error = %e, "user id not persisted"),
                }
                id
            }
        };
        Self { user_id, session_id: SessionId(Uuid::new_v4()) }
    }

    /// Identity not backed by any store.
    #[must_use]
    pub fn ephemeral() -> Self {
        Self { user_id: UserId(Uuid::new_v4()), session_id: SessionId(Uuid::new_v4()) }
    }
}

#[cfg(test)]
#[path = "identity_test.rs"]
mod tests;
