//! Operator identity gate.
//!
//! The monitoring session only runs while an identity is established.
//! The gate is deliberately opaque: it knows nothing about sensors or
//! credentials, it just owns the saved identity entry in the state
//! store so a restart restores the previous session.

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::persist::{StateStore, IDENTITY_KEY};

/// An established operator identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub name: String,
}

/// Owns the identity lifecycle: restore on startup, sign in, sign out.
#[derive(Debug)]
pub struct AuthGate {
    store: StateStore,
    identity: Option<Identity>,
}

impl AuthGate {
    /// Restore any saved identity from the state store.
    pub fn restore(store: &StateStore) -> Self {
        let identity = store.get::<Identity>(IDENTITY_KEY);
        if let Some(ref id) = identity {
            tracing::info!(uid = %id.uid, name = %id.name, "restored saved identity");
        }
        Self {
            store: store.clone(),
            identity,
        }
    }

    /// The current identity, if one is established.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Establish and persist a new identity.
    pub fn sign_in(&mut self, name: &str) -> Result<&Identity> {
        let identity = Identity {
            uid: Utc::now().timestamp_millis().to_string(),
            name: name.to_string(),
        };
        self.store.put(IDENTITY_KEY, &identity)?;
        tracing::info!(uid = %identity.uid, name = %identity.name, "signed in");
        Ok(self.identity.insert(identity))
    }

    /// Clear the identity and remove the persisted entry.
    pub fn sign_out(&mut self) {
        if let Some(id) = self.identity.take() {
            tracing::info!(uid = %id.uid, "signed out");
        }
        self.store.remove(IDENTITY_KEY);
    }
}
