//! Credential gate consulted before any generation request.
//!
//! The gate only answers present/absent. Holding a [`Credential`] is the only
//! way to build a generation request, so "no network call without a
//! credential" is enforced by the generation client's signatures.

use std::fmt;
use std::sync::Arc;

use tracing::info;

use crate::store::{LocalStore, StoreError};

pub const CREDENTIAL_KEY: &str = "uml_agent.api_key";

/// An API credential. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw key. Blank keys are treated as absent.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into().trim().to_owned();
        if raw.is_empty() { None } else { Some(Self(raw)) }
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialStatus {
    Present(Credential),
    Absent,
}

impl CredentialStatus {
    #[must_use]
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }
}

pub trait CredentialGate: Send + Sync {
    fn check(&self) -> CredentialStatus;
}

// =============================================================================
// STORED CREDENTIAL
// =============================================================================

/// Credential persisted in the local store.
pub struct StoredCredential {
    store: Arc<dyn LocalStore>,
}

impl StoredCredential {
    #[must_use]
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    /// Persist a new credential. Blank input clears it instead.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be written.
    pub fn set(&self, raw: &str) -> Result<CredentialStatus, StoreError> {
        let Some(credential) = Credential::new(raw) else {
            self.clear()?;
            return Ok(CredentialStatus::Absent);
        };
        self.store.set(CREDENTIAL_KEY, credential.expose())?;
        info!("credential stored");
        Ok(CredentialStatus::Present(credential))
    }

    /// Forget the stored credential.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be written.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(CREDENTIAL_KEY)
    }
}

impl CredentialGate for StoredCredential {
    fn check(&self) -> CredentialStatus {
        match self.store.get(CREDENTIAL_KEY).and_then(Credential::new) {
            Some(credential) => CredentialStatus::Present(credential),
            None => CredentialStatus::Absent,
        }
    }
}

/// Fixed credential, e.g. from a command-line flag.
pub struct StaticCredential(Option<Credential>);

impl StaticCredential {
    #[must_use]
    pub fn new(raw: Option<String>) -> Self {
        Self(raw.and_then(Credential::new))
    }
}

impl CredentialGate for StaticCredential {
    fn check(&self) -> CredentialStatus {
        match &self.0 {
            Some(credential) => CredentialStatus::Present(credential.clone()),
            None => CredentialStatus::Absent,
        }
    }
}

#[cfg(test)]
#[path = "credential_test.rs"]
mod tests;
