//! Per-identity TTL cache for dashboard aggregates
//!
//! A small synchronous cache over [`Storage`] for numbers where an hour
//! of staleness is acceptable. Each namespace carries a write timestamp
//! and a fingerprint of the identity that wrote it; a read under a
//! different identity, or past the TTL, misses. Storage keys follow the
//! `billing_*` convention: `{ns}_{key}`, `{ns}_cacheTimestamp`,
//! `{ns}_cachedUser`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::session::SessionManager;
use crate::storage::Storage;

/// Cache namespaces used by the SDK.
pub mod namespaces {
    /// Invoice dashboard: `invoices`, `totalInvoices`, `revenueStats`.
    pub const BILLING: &str = "billing";
    /// First page of the doctors list: `page1`.
    pub const DOCTORS_LIST: &str = "doctorsList";
    /// First page of the patients list: `page1`.
    pub const PATIENTS_LIST: &str = "patientsList";
    /// Current-month revenue widget: `currentMonth`.
    pub const DASHBOARD_REVENUE: &str = "dashboardRevenue";
    /// Compliance rate widget: `rate`.
    pub const DASHBOARD_COMPLIANCE_RATE: &str = "dashboardComplianceRate";

    pub const ALL: &[&str] = &[
        BILLING,
        DOCTORS_LIST,
        PATIENTS_LIST,
        DASHBOARD_REVENUE,
        DASHBOARD_COMPLIANCE_RATE,
    ];
}

/// Namespaced per-identity cache with explicit invalidation.
#[derive(Clone)]
pub struct TtlCache {
    storage: Storage,
    session: Arc<SessionManager>,
    ttl: Duration,
}

impl TtlCache {
    pub fn new(storage: Storage, session: Arc<SessionManager>, ttl: Duration) -> Self {
        Self {
            storage,
            session,
            ttl,
        }
    }

    /// Read a fresh value. Misses when the namespace timestamp is
    /// absent or older than the TTL, when the namespace was written by
    /// a different identity, or when nobody is signed in.
    pub fn get<T: DeserializeOwned>(&self, namespace: &str, key: &str) -> Option<T> {
        let fingerprint = self.current_fingerprint()?;
        if !self.namespace_fresh(namespace, &fingerprint) {
            return None;
        }
        let raw = self.storage.get(&entry_key(namespace, key))?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(namespace, key, error = %e, "Discarding unreadable cache entry");
                None
            }
        }
    }

    /// Write a value and refresh the namespace timestamp and
    /// fingerprint. A write while anonymous is dropped; storage errors
    /// are logged and swallowed, the cache is never load-bearing.
    pub fn put<T: Serialize>(&self, namespace: &str, key: &str, value: &T) {
        let Some(fingerprint) = self.current_fingerprint() else {
            debug!(namespace, key, "Cache write dropped: no identity");
            return;
        };
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(namespace, key, error = %e, "Cache value not serializable");
                return;
            }
        };
        let now = Utc::now().timestamp().to_string();
        let result = self
            .storage
            .set(&entry_key(namespace, key), &raw)
            .and_then(|_| self.storage.set(&timestamp_key(namespace), &now))
            .and_then(|_| self.storage.set(&fingerprint_key(namespace), &fingerprint));
        if let Err(e) = result {
            warn!(namespace, key, error = %e, "Cache write failed");
        }
    }

    /// Clear every key in the namespace.
    pub fn invalidate(&self, namespace: &str) {
        for key in self.storage.keys_with_prefix(&format!("{namespace}_")) {
            if let Err(e) = self.storage.remove(&key) {
                warn!(namespace, key = %key, error = %e, "Cache invalidation failed");
            }
        }
    }

    /// Clear every namespace. Called on any identity transition.
    pub fn invalidate_all(&self) {
        for namespace in namespaces::ALL {
            self.invalidate(namespace);
        }
    }

    fn namespace_fresh(&self, namespace: &str, fingerprint: &str) -> bool {
        let Some(written) = self
            .storage
            .get(&timestamp_key(namespace))
            .and_then(|raw| raw.parse::<i64>().ok())
        else {
            return false;
        };
        let age = Utc::now().timestamp().saturating_sub(written);
        if age < 0 || age as u64 >= self.ttl.as_secs() {
            return false;
        }
        self.storage.get(&fingerprint_key(namespace)).as_deref() == Some(fingerprint)
    }

    fn current_fingerprint(&self) -> Option<String> {
        self.session
            .current_identity()
            .map(|identity| identity_fingerprint(&identity.id))
    }
}

fn entry_key(namespace: &str, key: &str) -> String {
    format!("{namespace}_{key}")
}

fn timestamp_key(namespace: &str) -> String {
    format!("{namespace}_cacheTimestamp")
}

fn fingerprint_key(namespace: &str) -> String {
    format!("{namespace}_cachedUser")
}

/// Short stable fingerprint of an identity id.
pub fn identity_fingerprint(id: &str) -> String {
    let digest = Sha256::digest(id.as_bytes());
    hex::encode(&digest[..8])
}
