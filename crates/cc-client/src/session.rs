//! Authenticated session state
//!
//! [`SessionManager`] is the authoritative holder of the signed-in
//! identity and its bearer credential. It persists both to [`Storage`]
//! under the `authUser`/`authToken` keys, mirrors them in memory so
//! `get_token()` stays synchronous on the request hot path, and
//! observes storage mutations made through another SDK instance sharing
//! the same storage (the cross-tab case): those surface as a single
//! change event per identity transition.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::roles::Role;
use crate::storage::{keys, ObserverGuard, Storage};

/// The signed-in user's profile as known to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    /// Display name; the service sends either `name` or `fullName`.
    #[serde(alias = "fullName")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinic_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_clinic: Option<bool>,
}

/// Opaque bearer credential with an optional expiry instant.
#[derive(Debug, Clone, PartialEq)]
pub struct Credential {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Successful sign-in response from the auth endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub token: String,
    pub user: Identity,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutReason {
    /// The user chose to sign out.
    User,
    /// The service rejected the credential (401).
    Expired,
    /// An administrator or policy forced the sign-out.
    Forced,
}

impl std::fmt::Display for SignOutReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Expired => write!(f, "expired"),
            Self::Forced => write!(f, "forced"),
        }
    }
}

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated,
    /// Transient: a 401 arrived and the session is being torn down.
    Expiring,
}

struct Snapshot {
    identity: Option<Identity>,
    credential: Option<Credential>,
    state: SessionState,
}

type Listener = Box<dyn Fn(Option<&Identity>) + Send + Sync>;

struct SessionInner {
    storage: Storage,
    snapshot: RwLock<Snapshot>,
    listeners: RwLock<Vec<(u64, Listener)>>,
    next_listener_id: AtomicU64,
    /// Set while this instance writes auth keys, so its own storage
    /// events are not mistaken for another tab's.
    self_write: AtomicBool,
}

/// Process-wide holder of the authenticated identity and credential.
pub struct SessionManager {
    inner: Arc<SessionInner>,
    _storage_guard: ObserverGuard,
}

impl SessionManager {
    /// Create a session manager over the given storage, restoring any
    /// persisted identity. Unreadable persisted state degrades to
    /// anonymous.
    pub fn new(storage: Storage) -> Arc<Self> {
        let (identity, credential) = load_persisted(&storage);
        let state = if identity.is_some() {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        };

        let inner = Arc::new(SessionInner {
            storage: storage.clone(),
            snapshot: RwLock::new(Snapshot {
                identity,
                credential,
                state,
            }),
            listeners: RwLock::new(Vec::new()),
            next_listener_id: AtomicU64::new(0),
            self_write: AtomicBool::new(false),
        });

        // Cross-tab coherence: another instance writing authUser through
        // the shared storage surfaces here as one change event.
        let weak: Weak<SessionInner> = Arc::downgrade(&inner);
        let guard = storage.subscribe(move |change| {
            if change.key != keys::AUTH_USER {
                return;
            }
            let Some(inner) = weak.upgrade() else { return };
            if inner.self_write.load(Ordering::SeqCst) {
                return;
            }
            Self::absorb_external_change(&inner);
        });

        Arc::new(Self {
            inner,
            _storage_guard: guard,
        })
    }

    /// Current bearer credential, if any. Synchronous: reads the
    /// in-memory mirror, never storage or the network.
    pub fn get_token(&self) -> Option<String> {
        self.inner
            .snapshot
            .read()
            .credential
            .as_ref()
            .map(|c| c.token.clone())
    }

    /// Current identity, if signed in.
    pub fn current_identity(&self) -> Option<Identity> {
        self.inner.snapshot.read().identity.clone()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.inner.snapshot.read().state
    }

    /// Persist the identity and credential from a sign-in response and
    /// notify listeners. Persistence failures surface as `Unknown`.
    pub fn sign_in(&self, response: SignInResponse) -> Result<Identity> {
        let identity = response.user;
        let expires_at = response
            .expires_in
            .map(|secs| Utc::now() + chrono::Duration::seconds(secs as i64));

        let user_json = serde_json::to_string(&identity)?;

        self.inner.self_write.store(true, Ordering::SeqCst);
        let persisted = self
            .inner
            .storage
            .set(keys::AUTH_TOKEN, &response.token)
            .and_then(|_| self.inner.storage.set(keys::AUTH_USER, &user_json));
        self.inner.self_write.store(false, Ordering::SeqCst);
        persisted.map_err(|e| Error::Unknown(format!("failed to persist session: {e}")))?;

        {
            let mut snapshot = self.inner.snapshot.write();
            snapshot.identity = Some(identity.clone());
            snapshot.credential = Some(Credential {
                token: response.token,
                expires_at,
            });
            snapshot.state = SessionState::Authenticated;
        }

        info!(user_id = %identity.id, role = %identity.role, "Signed in");
        self.notify(Some(&identity));
        Ok(identity)
    }

    /// Clear the persisted identity and credential and notify listeners
    /// exactly once. A sign-out on an anonymous session is a no-op, so
    /// concurrent 401s collapse into a single transition.
    pub fn sign_out(&self, reason: SignOutReason) {
        {
            let mut snapshot = self.inner.snapshot.write();
            if snapshot.state == SessionState::Anonymous {
                debug!(%reason, "Sign-out ignored: already anonymous");
                return;
            }
            snapshot.state = SessionState::Expiring;
            snapshot.identity = None;
            snapshot.credential = None;
            snapshot.state = SessionState::Anonymous;
        }

        self.inner.self_write.store(true, Ordering::SeqCst);
        if let Err(e) = self
            .inner
            .storage
            .remove(keys::AUTH_TOKEN)
            .and_then(|_| self.inner.storage.remove(keys::AUTH_USER))
        {
            // Best effort: in-memory state is already cleared.
            warn!(error = %e, "Failed to clear persisted session");
        }
        self.inner.self_write.store(false, Ordering::SeqCst);

        info!(%reason, "Signed out");
        self.notify(None);
    }

    /// Tear down the session after the service rejected the credential.
    /// Safe to call from concurrent request failures.
    pub fn expire(&self) {
        self.sign_out(SignOutReason::Expired);
    }

    /// Register a listener for identity transitions, including those
    /// originating in another instance sharing this storage. Dropping
    /// the guard unsubscribes.
    pub fn on_change(
        &self,
        listener: impl Fn(Option<&Identity>) + Send + Sync + 'static,
    ) -> ListenerGuard {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners.write().push((id, Box::new(listener)));
        ListenerGuard {
            inner: Arc::downgrade(&self.inner),
            id,
        }
    }

    fn notify(&self, identity: Option<&Identity>) {
        Self::notify_inner(&self.inner, identity);
    }

    fn notify_inner(inner: &SessionInner, identity: Option<&Identity>) {
        for (_, listener) in inner.listeners.read().iter() {
            listener(identity);
        }
    }

    fn absorb_external_change(inner: &Arc<SessionInner>) {
        let (identity, credential) = load_persisted(&inner.storage);
        let changed = {
            let mut snapshot = inner.snapshot.write();
            if snapshot.identity == identity {
                false
            } else {
                snapshot.identity = identity.clone();
                snapshot.credential = credential;
                snapshot.state = if snapshot.identity.is_some() {
                    SessionState::Authenticated
                } else {
                    SessionState::Anonymous
                };
                true
            }
        };
        if changed {
            debug!("Session state changed in another tab");
            Self::notify_inner(inner, identity.as_ref());
        }
    }
}

/// Unsubscribes its listener when dropped.
pub struct ListenerGuard {
    inner: Weak<SessionInner>,
    id: u64,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.listeners.write().retain(|(id, _)| *id != self.id);
        }
    }
}

/// Read `authUser`/`authToken` from storage. Any parse failure degrades
/// to anonymous; the absence of a credential implies the absence of an
/// identity.
fn load_persisted(storage: &Storage) -> (Option<Identity>, Option<Credential>) {
    let token = storage.get(keys::AUTH_TOKEN);
    let identity = storage
        .get(keys::AUTH_USER)
        .and_then(|raw| match serde_json::from_str::<Identity>(&raw) {
            Ok(identity) => Some(identity),
            Err(e) => {
                warn!(error = %e, "Persisted identity unreadable, starting anonymous");
                None
            }
        });

    match (identity, token) {
        (Some(identity), Some(token)) => (
            Some(identity),
            Some(Credential {
                token,
                expires_at: None,
            }),
        ),
        _ => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn ana() -> SignInResponse {
        SignInResponse {
            token: "T".to_string(),
            user: Identity {
                id: "U1".to_string(),
                name: "Ana".to_string(),
                email: None,
                role: Role::Clinic,
                specialty: None,
                clinic_id: None,
                is_clinic: Some(true),
            },
            expires_in: None,
        }
    }

    #[test]
    fn sign_in_then_sign_out_round_trip() {
        let session = SessionManager::new(Storage::in_memory());
        assert_eq!(session.state(), SessionState::Anonymous);

        let identity = session.sign_in(ana()).unwrap();
        assert_eq!(identity.id, "U1");
        assert_eq!(session.get_token().as_deref(), Some("T"));
        assert_eq!(session.state(), SessionState::Authenticated);

        session.sign_out(SignOutReason::User);
        assert_eq!(session.get_token(), None);
        assert_eq!(session.current_identity(), None);
        assert_eq!(session.state(), SessionState::Anonymous);
    }

    #[test]
    fn restores_persisted_session() {
        let storage = Storage::in_memory();
        {
            let session = SessionManager::new(storage.clone());
            session.sign_in(ana()).unwrap();
        }
        let restored = SessionManager::new(storage);
        assert_eq!(restored.get_token().as_deref(), Some("T"));
        assert_eq!(restored.current_identity().unwrap().name, "Ana");
    }

    #[test]
    fn token_without_user_degrades_to_anonymous() {
        let storage = Storage::in_memory();
        storage.set(keys::AUTH_TOKEN, "orphan").unwrap();
        let session = SessionManager::new(storage);
        assert_eq!(session.get_token(), None);
        assert_eq!(session.state(), SessionState::Anonymous);
    }

    #[test]
    fn corrupt_persisted_user_degrades_to_anonymous() {
        let storage = Storage::in_memory();
        storage.set(keys::AUTH_TOKEN, "T").unwrap();
        storage.set(keys::AUTH_USER, "not json").unwrap();
        let session = SessionManager::new(storage);
        assert_eq!(session.state(), SessionState::Anonymous);
        assert_eq!(session.get_token(), None);
    }

    #[test]
    fn expire_fires_listeners_exactly_once() {
        let session = SessionManager::new(Storage::in_memory());
        session.sign_in(ana()).unwrap();

        let fired = Arc::new(Mutex::new(0u32));
        let sink = fired.clone();
        let _guard = session.on_change(move |identity| {
            if identity.is_none() {
                *sink.lock() += 1;
            }
        });

        // Concurrent 401s arrive; only the first transition notifies.
        session.expire();
        session.expire();
        session.expire();

        assert_eq!(*fired.lock(), 1);
    }

    #[test]
    fn cross_tab_sign_out_observed_once() {
        let storage = Storage::in_memory();
        let tab_a = SessionManager::new(storage.clone());
        let tab_b = SessionManager::new(storage);
        tab_a.sign_in(ana()).unwrap();

        // Tab B picked up the sign-in through storage.
        assert_eq!(tab_b.get_token().as_deref(), Some("T"));

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let _guard = tab_b.on_change(move |identity| {
            sink.lock().push(identity.map(|i| i.id.clone()));
        });

        tab_a.sign_out(SignOutReason::User);

        assert_eq!(tab_b.get_token(), None);
        assert_eq!(*events.lock(), vec![None]);
    }

    #[test]
    fn identity_accepts_full_name_alias() {
        let raw = r#"{"id":"U2","fullName":"Dr. Velasquez","role":"doctor","specialty":"cardiology"}"#;
        let identity: Identity = serde_json::from_str(raw).unwrap();
        assert_eq!(identity.name, "Dr. Velasquez");
        assert_eq!(identity.role, Role::Doctor);
    }

    #[test]
    fn dropped_listener_guard_unsubscribes() {
        let session = SessionManager::new(Storage::in_memory());
        let fired = Arc::new(Mutex::new(0u32));
        let sink = fired.clone();
        let guard = session.on_change(move |_| *sink.lock() += 1);

        session.sign_in(ana()).unwrap();
        drop(guard);
        session.sign_out(SignOutReason::User);

        assert_eq!(*fired.lock(), 1);
    }
}
