//! Role and route access policy
//!
//! Pure, synchronous predicates over the current identity. Route
//! decisions come from a static table; a route not listed there is open
//! to every authenticated identity.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::session::SessionManager;

/// Roles the platform issues to console users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    Clinic,
    Doctor,
    Nurse,
    HeadNurse,
    Supervisor,
}

impl Role {
    /// Nursing staff share one access column in the route table.
    pub fn is_nursing(self) -> bool {
        matches!(self, Role::Nurse | Role::HeadNurse | Role::Supervisor)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Clinic => "clinic",
            Self::Doctor => "doctor",
            Self::Nurse => "nurse",
            Self::HeadNurse => "headNurse",
            Self::Supervisor => "supervisor",
        };
        write!(f, "{name}")
    }
}

/// A navigable console route and the roles that may open it.
#[derive(Debug, Clone, Copy)]
pub struct RouteDescriptor {
    pub name: &'static str,
    pub path: &'static str,
    pub allowed_roles: &'static [Role],
}

const ALL: &[Role] = &[
    Role::Clinic,
    Role::Doctor,
    Role::Nurse,
    Role::HeadNurse,
    Role::Supervisor,
];
const CLINIC_AND_DOCTOR: &[Role] = &[Role::Clinic, Role::Doctor];
const CLINIC_ONLY: &[Role] = &[Role::Clinic];

/// The route access table. Normative: the sidebar renders exactly the
/// rows the current role passes.
pub const ROUTES: &[RouteDescriptor] = &[
    RouteDescriptor { name: "dashboard", path: "/dashboard", allowed_roles: ALL },
    RouteDescriptor { name: "patient-management", path: "/patients", allowed_roles: ALL },
    RouteDescriptor { name: "appointment-management", path: "/appointments", allowed_roles: ALL },
    RouteDescriptor { name: "slot-management", path: "/slots", allowed_roles: CLINIC_AND_DOCTOR },
    RouteDescriptor { name: "doctors-management", path: "/doctors", allowed_roles: CLINIC_ONLY },
    RouteDescriptor { name: "nurses-management", path: "/nurses", allowed_roles: CLINIC_ONLY },
    RouteDescriptor { name: "prescriptions", path: "/prescriptions", allowed_roles: ALL },
    RouteDescriptor { name: "lab-reports", path: "/lab-reports", allowed_roles: ALL },
    RouteDescriptor { name: "teleconsultation", path: "/teleconsultation", allowed_roles: ALL },
    RouteDescriptor { name: "referral-system", path: "/referrals", allowed_roles: CLINIC_AND_DOCTOR },
    RouteDescriptor { name: "invoice-management", path: "/invoices", allowed_roles: CLINIC_ONLY },
    RouteDescriptor { name: "community-hub", path: "/community", allowed_roles: ALL },
    RouteDescriptor { name: "audit-logs", path: "/audit-logs", allowed_roles: CLINIC_ONLY },
];

/// Policy decisions derived solely from session state.
#[derive(Clone)]
pub struct RoleGate {
    session: Arc<SessionManager>,
}

impl RoleGate {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }

    fn role(&self) -> Option<Role> {
        self.session.current_identity().map(|i| i.role)
    }

    pub fn is_clinic(&self) -> bool {
        self.role() == Some(Role::Clinic)
    }

    pub fn is_doctor(&self) -> bool {
        self.role() == Some(Role::Doctor)
    }

    pub fn is_nurse(&self) -> bool {
        self.role() == Some(Role::Nurse)
    }

    pub fn is_head_nurse(&self) -> bool {
        self.role() == Some(Role::HeadNurse)
    }

    pub fn is_supervisor(&self) -> bool {
        self.role() == Some(Role::Supervisor)
    }

    /// Whether the current identity may open the named route. Anonymous
    /// sessions may open nothing; unlisted routes are open to any
    /// authenticated identity.
    pub fn can_access_route(&self, route_name: &str) -> bool {
        let Some(role) = self.role() else {
            return false;
        };
        match ROUTES.iter().find(|r| r.name == route_name) {
            Some(route) => route.allowed_roles.contains(&role),
            None => true,
        }
    }

    /// The routes the current identity may see, in table order. The nav
    /// renders exactly these.
    pub fn accessible_routes(&self) -> Vec<RouteDescriptor> {
        let Some(role) = self.role() else {
            return Vec::new();
        };
        ROUTES
            .iter()
            .filter(|r| r.allowed_roles.contains(&role))
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Identity, SignInResponse};
    use crate::storage::Storage;

    fn gate_for(role: Role) -> RoleGate {
        let session = SessionManager::new(Storage::in_memory());
        session
            .sign_in(SignInResponse {
                token: "T".to_string(),
                user: Identity {
                    id: "U1".to_string(),
                    name: "Test".to_string(),
                    email: None,
                    role,
                    specialty: None,
                    clinic_id: None,
                    is_clinic: None,
                },
                expires_in: None,
            })
            .unwrap();
        RoleGate::new(session)
    }

    #[test]
    fn role_wire_names() {
        assert_eq!(serde_json::to_string(&Role::HeadNurse).unwrap(), r#""headNurse""#);
        assert_eq!(serde_json::from_str::<Role>(r#""clinic""#).unwrap(), Role::Clinic);
    }

    #[test]
    fn doctor_cannot_manage_doctors() {
        let gate = gate_for(Role::Doctor);
        assert!(!gate.can_access_route("doctors-management"));
        assert!(!gate.can_access_route("invoice-management"));
        assert!(!gate.can_access_route("audit-logs"));
        assert!(gate.can_access_route("slot-management"));
        assert!(gate.can_access_route("referral-system"));
        assert!(gate.can_access_route("prescriptions"));
    }

    #[test]
    fn nursing_column_shared_across_nurse_roles() {
        for role in [Role::Nurse, Role::HeadNurse, Role::Supervisor] {
            assert!(role.is_nursing());
            let gate = gate_for(role);
            assert!(gate.can_access_route("dashboard"));
            assert!(gate.can_access_route("patient-management"));
            assert!(!gate.can_access_route("slot-management"));
            assert!(!gate.can_access_route("referral-system"));
            assert!(!gate.can_access_route("doctors-management"));
        }
    }

    #[test]
    fn clinic_accesses_everything() {
        let gate = gate_for(Role::Clinic);
        for route in ROUTES {
            assert!(gate.can_access_route(route.name), "route {}", route.name);
        }
    }

    #[test]
    fn unlisted_route_open_to_authenticated() {
        let gate = gate_for(Role::Nurse);
        assert!(gate.can_access_route("profile-settings"));
    }

    #[test]
    fn anonymous_session_sees_no_routes() {
        let gate = RoleGate::new(SessionManager::new(Storage::in_memory()));
        assert!(!gate.can_access_route("dashboard"));
        assert!(gate.accessible_routes().is_empty());
    }

    #[test]
    fn rendered_nav_satisfies_gate() {
        let gate = gate_for(Role::Doctor);
        let nav = gate.accessible_routes();
        assert!(nav.iter().all(|item| gate.can_access_route(item.name)));
        assert!(!nav.iter().any(|item| item.name == "doctors-management"));
    }
}
