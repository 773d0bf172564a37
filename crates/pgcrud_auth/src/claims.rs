//! Per-namespace permission claims.
//!
//! Claims map a namespace (or the `*` wildcard) to a read/write grant. The
//! canonical serialization is a JSON object with lexicographically ordered
//! keys: claims live in a `BTreeMap`, so the generator and the verifier
//! always produce the same bytes for the same logical claims.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Claims key that acts as a fallback for namespaces without an entry.
pub const WILDCARD_NAMESPACE: &str = "*";

/// The access a request needs on an entity's namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
}

/// The grant attached to one namespace entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Access {
    #[serde(rename = "r")]
    Read,
    #[serde(rename = "w")]
    Write,
    #[serde(rename = "rw")]
    ReadWrite,
}

impl Access {
    pub fn permits(self, mode: AccessMode) -> bool {
        match (self, mode) {
            (Access::ReadWrite, _) => true,
            (Access::Read, AccessMode::Read) => true,
            (Access::Write, AccessMode::Write) => true,
            _ => false,
        }
    }

    /// Parse the CLI / config spelling.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "r" => Some(Access::Read),
            "w" => Some(Access::Write),
            "rw" => Some(Access::ReadWrite),
            _ => None,
        }
    }
}

/// The verified capability attached to a request.
///
/// Absence of credentials (auth disabled) is represented as `FullAccess`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenClaims {
    /// Legacy token form: no claims segment, permits everything.
    FullAccess,
    /// Scoped token: explicit per-namespace grants.
    Scoped(BTreeMap<String, Access>),
}

impl TokenClaims {
    /// Whether this capability allows `mode` on `namespace`.
    ///
    /// Scoped lookup: the namespace's own entry wins; `*` is the fallback;
    /// no entry denies.
    pub fn permits(&self, namespace: &str, mode: AccessMode) -> bool {
        match self {
            TokenClaims::FullAccess => true,
            TokenClaims::Scoped(grants) => grants
                .get(namespace)
                .or_else(|| grants.get(WILDCARD_NAMESPACE))
                .map(|grant| grant.permits(mode))
                .unwrap_or(false),
        }
    }

    /// Whether the capability allows anything at all on the namespace.
    pub fn permits_any(&self, namespace: &str) -> bool {
        self.permits(namespace, AccessMode::Read) || self.permits(namespace, AccessMode::Write)
    }
}
