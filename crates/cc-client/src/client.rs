//! SDK composition root
//!
//! [`Client`] wires configuration, storage, the session, the transport
//! and the per-resource facades together. One `Client` models one
//! browser tab; two clients sharing a [`Storage`] model two tabs over
//! the same localStorage.

use std::sync::Arc;

use tracing::info;

use crate::api;
use crate::api::parse_item;
use crate::audit::AuditHook;
use crate::cache::TtlCache;
use crate::config::Config;
use crate::error::Result;
use crate::roles::RoleGate;
use crate::session::{Identity, ListenerGuard, SessionManager, SignInResponse, SignOutReason};
use crate::storage::{keys, Storage};
use crate::transport::{ApiRequest, Transport};

/// Top-level handle to the clinic service.
pub struct Client {
    config: Config,
    storage: Storage,
    session: Arc<SessionManager>,
    transport: Arc<Transport>,
    cache: TtlCache,
    audit: AuditHook,
    // Invalidate every cache namespace on identity transitions,
    // including cross-tab ones.
    _cache_listener: ListenerGuard,
}

impl Client {
    /// Build a client with in-memory storage. Must be called inside a
    /// Tokio runtime: the audit drain task is spawned here.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_storage(config, Storage::in_memory())
    }

    /// Build a client over explicit storage, e.g. a [`JsonFileStore`]
    /// for persistence across restarts or a shared [`Storage`] to model
    /// a second tab.
    ///
    /// [`JsonFileStore`]: crate::storage::JsonFileStore
    pub fn with_storage(config: Config, storage: Storage) -> Result<Self> {
        let session = SessionManager::new(storage.clone());
        let transport = Arc::new(Transport::new(&config, session.clone())?);
        let cache = TtlCache::new(storage.clone(), session.clone(), config.cache_ttl);
        let audit = AuditHook::new(
            api::activity_log::ActivityLogs::new(transport.clone()),
            session.clone(),
        );

        let listener_cache = cache.clone();
        let cache_listener = session.on_change(move |_identity| {
            listener_cache.invalidate_all();
        });

        Ok(Self {
            config,
            storage,
            session,
            transport,
            cache,
            audit,
            _cache_listener: cache_listener,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn audit(&self) -> &AuditHook {
        &self.audit
    }

    pub fn roles(&self) -> RoleGate {
        RoleGate::new(self.session.clone())
    }

    /// Authenticate against the service and establish the session.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity> {
        let value = self
            .transport
            .request_json(ApiRequest::post("/auth/login").json(serde_json::json!({
                "email": email,
                "password": password,
            })))
            .await?;
        let response: SignInResponse = parse_item(value, None)?;
        let identity = self.session.sign_in(response)?;
        info!(user = %identity.id, "Signed in");
        Ok(identity)
    }

    /// End the session: emit the logout audit event, flush the audit
    /// queue while the credential is still valid, then tear down.
    pub async fn sign_out(&self) {
        if self.session.current_identity().is_none() {
            return;
        }
        self.audit.log_sign_out(&SignOutReason::User.to_string());
        self.audit.flush().await;
        self.session.sign_out(SignOutReason::User);
    }

    /// Persisted dark-mode preference; absent means light.
    pub fn dark_mode(&self) -> bool {
        self.storage.get(keys::DARK_MODE).as_deref() == Some("true")
    }

    pub fn set_dark_mode(&self, enabled: bool) -> Result<()> {
        self.storage
            .set(keys::DARK_MODE, if enabled { "true" } else { "false" })
            .map_err(|e| crate::error::Error::Unknown(format!("failed to persist preference: {e}")))
    }

    /// Persisted page size for a named list view, keyed
    /// `{page}_pageSize`.
    pub fn page_size(&self, page: &str) -> Option<u32> {
        self.storage
            .get(&format!("{page}_pageSize"))
            .and_then(|raw| raw.parse().ok())
    }

    pub fn set_page_size(&self, page: &str, size: u32) -> Result<()> {
        self.storage
            .set(&format!("{page}_pageSize"), &size.to_string())
            .map_err(|e| crate::error::Error::Unknown(format!("failed to persist preference: {e}")))
    }

    pub fn patients(&self) -> api::patient::Patients {
        api::patient::Patients::new(self.transport.clone(), self.cache.clone())
    }

    pub fn appointments(&self) -> api::appointment::Appointments {
        api::appointment::Appointments::new(self.transport.clone())
    }

    pub fn doctors(&self) -> api::doctor::Doctors {
        api::doctor::Doctors::new(self.transport.clone(), self.cache.clone())
    }

    pub fn nurses(&self) -> api::nurse::Nurses {
        api::nurse::Nurses::new(self.transport.clone())
    }

    pub fn prescriptions(&self) -> api::prescription::Prescriptions {
        api::prescription::Prescriptions::new(self.transport.clone())
    }

    pub fn invoices(&self) -> api::invoice::Invoices {
        api::invoice::Invoices::new(self.transport.clone(), self.cache.clone())
    }

    pub fn appointment_invoices(&self) -> api::appointment_invoice::AppointmentInvoices {
        api::appointment_invoice::AppointmentInvoices::new(self.transport.clone())
    }

    pub fn teleconsultations(&self) -> api::teleconsultation::Teleconsultations {
        api::teleconsultation::Teleconsultations::new(self.transport.clone())
    }

    pub fn referrals(&self) -> api::referral::Referrals {
        api::referral::Referrals::new(self.transport.clone())
    }

    pub fn vitals(&self) -> api::vitals::Vitals {
        api::vitals::Vitals::new(self.transport.clone())
    }

    pub fn compliance_alerts(&self) -> api::compliance::ComplianceAlerts {
        api::compliance::ComplianceAlerts::new(self.transport.clone(), self.cache.clone())
    }

    pub fn activity_logs(&self) -> api::activity_log::ActivityLogs {
        api::activity_log::ActivityLogs::new(self.transport.clone())
    }

    pub fn clinic(&self) -> api::clinic::Clinic {
        api::clinic::Clinic::new(self.transport.clone())
    }

    pub fn revenue(&self) -> api::revenue::Revenue {
        api::revenue::Revenue::new(
            self.transport.clone(),
            self.cache.clone(),
            self.config.aggregate_timeout,
        )
    }

    pub fn carousel(&self) -> api::carousel::Carousel {
        api::carousel::Carousel::new(self.transport.clone())
    }

    pub fn payments(&self) -> api::payments::Payments {
        api::payments::Payments::new(self.transport.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn preferences_persist_through_storage() {
        let storage = Storage::in_memory();
        let client =
            Client::with_storage(Config::default(), storage.clone()).expect("client builds");

        assert!(!client.dark_mode());
        client.set_dark_mode(true).unwrap();
        assert!(client.dark_mode());
        assert_eq!(storage.get("darkMode").as_deref(), Some("true"));

        assert_eq!(client.page_size("patients"), None);
        client.set_page_size("patients", 50).unwrap();
        assert_eq!(client.page_size("patients"), Some(50));
        assert_eq!(storage.get("patients_pageSize").as_deref(), Some("50"));
    }

    #[tokio::test]
    async fn two_clients_share_one_storage_like_two_tabs() {
        let storage = Storage::in_memory();
        let tab_a = Client::with_storage(Config::default(), storage.clone()).unwrap();
        let tab_b = Client::with_storage(Config::default(), storage).unwrap();

        tab_a
            .session()
            .sign_in(crate::session::SignInResponse {
                token: "T".to_string(),
                user: Identity {
                    id: "U1".to_string(),
                    name: "Ana".to_string(),
                    email: None,
                    role: crate::roles::Role::Clinic,
                    specialty: None,
                    clinic_id: None,
                    is_clinic: None,
                },
                expires_in: None,
            })
            .unwrap();

        assert_eq!(tab_b.session().get_token().as_deref(), Some("T"));
        tab_a.session().sign_out(SignOutReason::User);
        assert_eq!(tab_b.session().get_token(), None);
    }
}
