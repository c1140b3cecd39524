//! Facade integration tests
//!
//! Tests for:
//! - Sign-in against the auth endpoint
//! - Pagination envelope normalization
//! - Cached first pages and dashboard aggregates
//! - Cache invalidation on billing writes
//! - Revenue fallback to the cached value on transient failure
//! - Audit queue flush

use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cc_client::session::SignInResponse;
use cc_client::{Client, Config, Identity, ListQuery, Role};

fn client_for(server: &MockServer) -> Client {
    Client::new(Config::new(server.uri())).expect("client should build")
}

fn sign_in(client: &Client, id: &str) {
    client
        .session()
        .sign_in(SignInResponse {
            token: format!("token-{id}"),
            user: Identity {
                id: id.to_string(),
                name: "Test User".to_string(),
                email: None,
                role: Role::Clinic,
                specialty: None,
                clinic_id: None,
                is_clinic: None,
            },
            expires_in: None,
        })
        .expect("sign-in should persist");
}

#[tokio::test]
async fn sign_in_establishes_the_session() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_partial_json(serde_json::json!({
            "email": "admin@clinic.example"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "token": "tok-123",
            "user": {
                "id": "U1",
                "fullName": "Ana Admin",
                "role": "clinic"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let identity = client
        .sign_in("admin@clinic.example", "secret")
        .await
        .expect("sign-in should succeed");

    assert_eq!(identity.name, "Ana Admin");
    assert_eq!(identity.role, Role::Clinic);
    assert_eq!(client.session().get_token().as_deref(), Some("tok-123"));
    assert!(client.roles().is_clinic());
}

#[tokio::test]
async fn pagination_drift_is_normalized() {
    let server = MockServer::start().await;

    // Resource-named rows key and resource-named total counter.
    Mock::given(method("GET"))
        .and(path("/patients"))
        .and(query_param("page", "1"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "patients": [
                { "id": "P1", "name": "A" },
                { "id": "P2", "name": "B" },
                { "id": "P3", "name": "C" },
                { "id": "P4", "name": "D" },
                { "id": "P5", "name": "E" }
            ],
            "pagination": { "totalPages": 3, "totalPatients": 23 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    sign_in(&client, "U1");

    let page = client
        .patients()
        .list(1, 5, ListQuery::default())
        .await
        .expect("list should succeed");

    assert_eq!(page.items.len(), 5);
    assert_eq!(page.page, 1);
    assert_eq!(page.page_size, 5);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.total_items, 23);
}

#[tokio::test]
async fn single_page_doctor_list_is_served_from_cache() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "doctors": [ { "id": "D1", "name": "Dr. A", "specialty": "cardiology" } ],
            "totalPages": 1,
            "totalItems": 1
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    sign_in(&client, "U1");
    let doctors = client.doctors();

    let first = doctors.list(1, 20, ListQuery::default()).await.expect("network fetch");
    let second = doctors.list(1, 20, ListQuery::default()).await.expect("cache hit");
    assert_eq!(first.items, second.items);
}

#[tokio::test]
async fn approving_an_invoice_invalidates_the_revenue_cache() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/revenue/current-month"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "currentMonthRevenue": 10000.0,
            "percentageChange": 4.2
        })))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/invoices/I7/approve"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "invoice": {
                "id": "I7",
                "patientId": "P1",
                "items": [],
                "status": "Approved"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    sign_in(&client, "U1");

    // Fetch twice: the second is cache-served, so still one request.
    client.revenue().get_current_month().await.expect("fetch");
    client.revenue().get_current_month().await.expect("cached");

    client.invoices().approve("I7").await.expect("approve");

    // Invalidation forces a fresh fetch, the second network hit.
    client.revenue().get_current_month().await.expect("refetch");
}

#[tokio::test]
async fn revenue_falls_back_to_cache_on_transient_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/revenue/current-month"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "currentMonthRevenue": 8200.0,
            "percentageChange": -1.5
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/revenue/current-month"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = client_for(&server);
    sign_in(&client, "U1");
    let revenue = client.revenue();

    let fresh = revenue.get_current_month().await.expect("write-through");
    let stale = revenue.get_current_month().await.expect("cache fallback");
    assert_eq!(fresh, stale);
    assert_eq!(stale.current_month_revenue, 8200.0);
}

#[tokio::test]
async fn compliance_rate_is_cached_until_resolution() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/compliance-alerts/rate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "complianceRate": 80.0 })),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/compliance-alerts/rate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "complianceRate": 90.0 })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/compliance-alerts/C1/resolve"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "alert": { "id": "C1", "message": "late vitals", "resolved": true }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    sign_in(&client, "U1");
    let alerts = client.compliance_alerts();

    assert_eq!(alerts.get_compliance_rate().await.expect("fetch"), 80.0);
    assert_eq!(alerts.get_compliance_rate().await.expect("cached"), 80.0);

    alerts.resolve("C1", "chased the ward").await.expect("resolve");
    assert_eq!(alerts.get_compliance_rate().await.expect("refetch"), 90.0);
}

#[tokio::test]
async fn audit_events_drain_before_sign_out_completes() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/activity-logs"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "activityLog": {
                "id": "L1",
                "activityType": "signOut",
                "description": "Signed out (user)"
            }
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    sign_in(&client, "U1");

    client.audit().log_component_access("billing-dashboard", "view");
    client.sign_out().await;

    let requests = server.received_requests().await.expect("recording enabled");
    let log_posts: Vec<_> = requests
        .iter()
        .filter(|r| r.url.path() == "/activity-logs")
        .collect();
    // The component access and the sign-out event both made it out.
    assert_eq!(log_posts.len(), 2);
    assert!(client.session().current_identity().is_none());
}

#[tokio::test]
async fn export_returns_raw_bytes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/activity-logs/export"))
        .and(query_param("format", "csv"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/csv")
                .set_body_string("id,type\nL1,signOut\n"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    sign_in(&client, "U1");

    let bytes = client
        .activity_logs()
        .export(cc_client::api::activity_log::ExportQuery {
            activity_type: None,
            start_date: "2025-01-01".parse().unwrap(),
            format: cc_client::api::activity_log::ExportFormat::Csv,
        })
        .await
        .expect("export should succeed");
    assert_eq!(bytes, b"id,type\nL1,signOut\n");
}
