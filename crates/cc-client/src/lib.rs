//! # ClinicCore SDK for Rust
//!
//! Client data-access and session layer for the ClinicCore platform -
//! a multi-tenant clinic service with role-scoped access to patients,
//! appointments, staff, prescriptions, billing and compliance data.
//!
//! ## Features
//!
//! - **Session management**: persisted bearer credential with cross-instance
//!   change propagation and exactly-once expiry on 401
//! - **Role gating**: route-level access decisions from the signed-in role
//! - **Resource facades**: one typed facade per resource with uniform
//!   pagination and a closed error taxonomy
//! - **TTL cache**: per-identity cached dashboard aggregates with explicit
//!   invalidation
//! - **Audit trail**: fire-and-forget activity log emission for sensitive
//!   operations
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cc_client::{Client, Config, ListQuery};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     cc_client::logging::init_default_logging();
//!
//!     let config = Config::new("https://api.cliniccore.example/api");
//!     let client = Client::new(config)?;
//!
//!     client.sign_in("admin@clinic.example", "secret").await?;
//!
//!     let patients = client.patients().list(1, 20, ListQuery::default()).await?;
//!     println!("{} patients across {} pages", patients.total_items, patients.total_pages);
//!
//!     client.sign_out().await;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod audit;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod roles;
pub mod session;
pub mod storage;
pub mod transport;

// Logging bootstrap shared with the rest of the workspace
pub use cc_common::logging;

// Re-export main types
pub use api::{ImageFile, ListQuery, Page, SortOrder};
pub use audit::AuditHook;
pub use cache::TtlCache;
pub use client::Client;
pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use roles::{Role, RoleGate};
pub use session::{Identity, SessionManager, SessionState, SignOutReason};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore, Storage};
pub use transport::{ApiRequest, CancelToken, Transport};
