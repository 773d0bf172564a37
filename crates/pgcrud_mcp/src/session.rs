//! Agent session table.
//!
//! A session is created at initialize, carries the claims presented on the
//! initializing request, and is addressed by the session id header on every
//! later call. Closing the transport (or `DELETE /mcp`) removes the entry.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use pgcrud_auth::TokenClaims;
use uuid::Uuid;

/// One live agent session.
#[derive(Debug)]
pub struct Session {
    pub id: String,
    /// Claims bound at initialize; every call in the session runs under
    /// them.
    pub claims: TokenClaims,
    pub created_at: DateTime<Utc>,
}

/// Concurrent map of live sessions keyed by session id.
#[derive(Default)]
pub struct SessionTable {
    inner: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session bound to the given claims.
    pub fn create(&self, claims: TokenClaims) -> Arc<Session> {
        let session = Arc::new(Session {
            id: Uuid::new_v4().to_string(),
            claims,
            created_at: Utc::now(),
        });
        self.inner
            .write()
            .expect("session table lock")
            .insert(session.id.clone(), session.clone());
        session
    }

    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.inner.read().expect("session table lock").get(id).cloned()
    }

    /// Remove a session; true when it existed.
    pub fn remove(&self, id: &str) -> bool {
        self.inner
            .write()
            .expect("session table lock")
            .remove(id)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("session table lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every session; used at shutdown.
    pub fn clear(&self) {
        self.inner.write().expect("session table lock").clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_get_remove() {
        let table = SessionTable::new();
        let session = table.create(TokenClaims::FullAccess);
        assert_eq!(table.len(), 1);

        let fetched = table.get(&session.id).unwrap();
        assert_eq!(fetched.claims, TokenClaims::FullAccess);

        assert!(table.remove(&session.id));
        assert!(!table.remove(&session.id));
        assert!(table.is_empty());
    }

    #[test]
    fn test_ids_are_unique() {
        let table = SessionTable::new();
        let a = table.create(TokenClaims::FullAccess);
        let b = table.create(TokenClaims::FullAccess);
        assert_ne!(a.id, b.id);
    }
}
