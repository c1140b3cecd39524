//! Fire-and-forget activity signals
//!
//! UI handlers hand events to a bounded queue and move on; a
//! background task drains the queue into the activity-log facade.
//! Nothing here ever surfaces an error to the caller: a full queue
//! drops the event and a failed POST is logged at debug and forgotten.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::api::activity_log::{ActivityLogs, NewActivityLog};
use crate::session::SessionManager;

const QUEUE_CAPACITY: usize = 256;
const FLUSH_DEADLINE: Duration = Duration::from_secs(2);

/// An event headed for the activity log.
#[derive(Debug, Clone)]
pub enum AuditEvent {
    ComponentAccess {
        component: String,
        mode: String,
    },
    FormSubmission {
        resource: String,
        action: String,
        resource_id: Option<String>,
        subject_id: Option<String>,
    },
    ResourceAccess {
        resource: String,
        resource_id: String,
        subject_id: String,
        action: String,
    },
    SignOut {
        reason: String,
    },
}

impl AuditEvent {
    fn into_payload(self, user_id: Option<String>) -> NewActivityLog {
        let (activity_type, description) = match self {
            Self::ComponentAccess { component, mode } => (
                "componentAccess".to_string(),
                format!("Accessed {component} ({mode})"),
            ),
            Self::FormSubmission {
                resource,
                action,
                resource_id,
                subject_id,
            } => {
                let mut description = format!("{action} {resource}");
                if let Some(id) = resource_id {
                    description.push_str(&format!(" {id}"));
                }
                if let Some(subject) = subject_id {
                    description.push_str(&format!(" for {subject}"));
                }
                ("formSubmission".to_string(), description)
            }
            Self::ResourceAccess {
                resource,
                resource_id,
                subject_id,
                action,
            } => (
                format!("{resource}Access"),
                format!("{action} {resource} {resource_id} for patient {subject_id}"),
            ),
            Self::SignOut { reason } => ("signOut".to_string(), format!("Signed out ({reason})")),
        };
        NewActivityLog {
            activity_type,
            description,
            user_id,
        }
    }
}

enum Message {
    Event(NewActivityLog),
    Flush(oneshot::Sender<()>),
}

/// Bounded queue in front of the activity-log facade.
#[derive(Clone)]
pub struct AuditHook {
    tx: mpsc::Sender<Message>,
    session: Arc<SessionManager>,
}

impl AuditHook {
    /// Spawns the drain task on the current runtime.
    pub fn new(logs: ActivityLogs, session: Arc<SessionManager>) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        tokio::spawn(drain(rx, logs));
        Self { tx, session }
    }

    pub fn log_component_access(&self, component: &str, mode: &str) {
        self.enqueue(AuditEvent::ComponentAccess {
            component: component.to_string(),
            mode: mode.to_string(),
        });
    }

    pub fn log_form_submission(
        &self,
        resource: &str,
        action: &str,
        resource_id: Option<&str>,
        subject_id: Option<&str>,
    ) {
        self.enqueue(AuditEvent::FormSubmission {
            resource: resource.to_string(),
            action: action.to_string(),
            resource_id: resource_id.map(str::to_string),
            subject_id: subject_id.map(str::to_string),
        });
    }

    /// Per-resource access log. The first caller was prescription
    /// viewing; any resource with a patient subject fits.
    pub fn log_resource_access(
        &self,
        resource: &str,
        resource_id: &str,
        patient_id: &str,
        action: &str,
    ) {
        self.enqueue(AuditEvent::ResourceAccess {
            resource: resource.to_string(),
            resource_id: resource_id.to_string(),
            subject_id: patient_id.to_string(),
            action: action.to_string(),
        });
    }

    pub fn log_sign_out(&self, reason: &str) {
        self.enqueue(AuditEvent::SignOut {
            reason: reason.to_string(),
        });
    }

    /// Wait for everything already queued to reach the service, up to
    /// a short deadline. Best-effort, called on sign-out.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.try_send(Message::Flush(done_tx)).is_err() {
            debug!("Audit flush skipped: queue full or closed");
            return;
        }
        if tokio::time::timeout(FLUSH_DEADLINE, done_rx).await.is_err() {
            debug!("Audit flush deadline elapsed");
        }
    }

    fn enqueue(&self, event: AuditEvent) {
        let user_id = self.session.current_identity().map(|identity| identity.id);
        let payload = event.into_payload(user_id);
        if let Err(e) = self.tx.try_send(Message::Event(payload)) {
            debug!(error = %e, "Audit event dropped");
        }
    }
}

async fn drain(mut rx: mpsc::Receiver<Message>, logs: ActivityLogs) {
    while let Some(message) = rx.recv().await {
        match message {
            Message::Event(payload) => {
                if let Err(e) = logs.record(payload).await {
                    debug!(error = %e, "Audit event delivery failed");
                }
            }
            Message::Flush(done) => {
                // Messages ahead of the flush marker are already
                // delivered; acknowledge and keep draining.
                let _ = done.send(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_access_payload() {
        let payload = AuditEvent::ComponentAccess {
            component: "billing-dashboard".to_string(),
            mode: "view".to_string(),
        }
        .into_payload(Some("U1".to_string()));
        assert_eq!(payload.activity_type, "componentAccess");
        assert_eq!(payload.description, "Accessed billing-dashboard (view)");
        assert_eq!(payload.user_id.as_deref(), Some("U1"));
    }

    #[test]
    fn resource_access_payload_names_the_patient() {
        let payload = AuditEvent::ResourceAccess {
            resource: "prescription".to_string(),
            resource_id: "RX9".to_string(),
            subject_id: "P3".to_string(),
            action: "Viewed".to_string(),
        }
        .into_payload(None);
        assert_eq!(payload.activity_type, "prescriptionAccess");
        assert_eq!(payload.description, "Viewed prescription RX9 for patient P3");
    }

    #[test]
    fn form_submission_payload_is_terse_without_ids() {
        let payload = AuditEvent::FormSubmission {
            resource: "invoice".to_string(),
            action: "Created".to_string(),
            resource_id: None,
            subject_id: None,
        }
        .into_payload(None);
        assert_eq!(payload.description, "Created invoice");
    }
}
