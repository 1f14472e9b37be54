#![allow(clippy::unwrap_used)]
// Integration tests for `HttpPortal` using wiremock.

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_string_contains, method, path, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use alarmsync_api::{
    ArmState, Credentials, Error, HttpPortal, Portal, SensorInfo, TransportConfig,
};

const VERSION: &str = "27.0.0-140";

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, HttpPortal) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let portal = HttpPortal::with_base_url(base_url, &TransportConfig::default()).unwrap();
    (server, portal)
}

fn page(suffix: &str) -> String {
    format!("/myhome/{VERSION}/{suffix}")
}

fn credentials() -> Credentials {
    Credentials::new("owner@example.com", "hunter2", "fp-abc123")
}

fn redirect_to(location: &str) -> ResponseTemplate {
    ResponseTemplate::new(302).insert_header("Location", location)
}

/// Root redirects to the versioned sign-in page, which renders a form.
async fn mount_landing(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(redirect_to(&page("access/signin.jsp")))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(page("access/signin.jsp")))
        .respond_with(ResponseTemplate::new(200).set_body_string("<form>sign in</form>"))
        .mount(server)
        .await;
}

async fn mount_successful_signin(server: &MockServer) {
    mount_landing(server).await;
    Mock::given(method("POST"))
        .and(path(page("access/signin.jsp")))
        .respond_with(redirect_to(&page("summary/summary.jsp")))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(page("summary/summary.jsp")))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>summary</html>"))
        .mount(server)
        .await;
}

async fn signed_in() -> (MockServer, HttpPortal) {
    let (server, portal) = setup().await;
    mount_successful_signin(&server).await;
    portal.authenticate(&credentials()).await.unwrap();
    (server, portal)
}

// ── Authentication tests ────────────────────────────────────────────

#[tokio::test]
async fn test_login_success() {
    let (server, portal) = setup().await;
    mount_successful_signin(&server).await;

    assert!(!portal.is_authenticated());
    let session = portal.authenticate(&credentials()).await.unwrap();

    assert_eq!(session.portal_version, VERSION);
    assert!(portal.is_authenticated());
}

#[tokio::test]
async fn test_login_posts_credentials_form() {
    let (server, portal) = setup().await;
    mount_landing(&server).await;

    Mock::given(method("POST"))
        .and(path(page("access/signin.jsp")))
        .and(body_string_contains("usernameForm=owner%40example.com"))
        .and(body_string_contains("passwordForm=hunter2"))
        .and(body_string_contains("fingerprint=fp-abc123"))
        .respond_with(redirect_to(&page("summary/summary.jsp")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(page("summary/summary.jsp")))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    portal.authenticate(&credentials()).await.unwrap();
}

#[tokio::test]
async fn test_login_rejected_lands_on_signin() {
    let (server, portal) = setup().await;
    mount_landing(&server).await;

    Mock::given(method("POST"))
        .and(path(page("access/signin.jsp")))
        .respond_with(redirect_to(&format!("{}?e=ns", page("access/signin.jsp"))))
        .mount(&server)
        .await;

    let result = portal.authenticate(&credentials()).await;

    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
    assert!(!portal.is_authenticated());
}

#[tokio::test]
async fn test_login_without_version_in_landing_url() {
    let (server, portal) = setup().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let result = portal.authenticate(&credentials()).await;

    assert!(
        matches!(result, Err(Error::UnexpectedResponse { .. })),
        "expected UnexpectedResponse, got: {result:?}"
    );
}

#[tokio::test]
async fn test_logout_drops_session() {
    let (server, portal) = signed_in().await;

    Mock::given(method("GET"))
        .and(path(page("access/signout.jsp")))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    portal.end_session().await.unwrap();
    assert!(!portal.is_authenticated());

    // Second sign-out is a local no-op.
    portal.end_session().await.unwrap();
}

// ── Session-scoped calls ────────────────────────────────────────────

#[tokio::test]
async fn test_calls_before_login_are_rejected() {
    let (_server, portal) = setup().await;

    let result = portal.perform_heartbeat().await;
    assert!(matches!(result, Err(Error::NotAuthenticated)));

    let result = portal.fetch_gateway_info().await;
    assert!(matches!(result, Err(Error::NotAuthenticated)));
}

#[tokio::test]
async fn test_heartbeat() {
    let (server, portal) = signed_in().await;

    Mock::given(method("POST"))
        .and(path(page("KeepAlive")))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    portal.perform_heartbeat().await.unwrap();
}

#[tokio::test]
async fn test_change_check_returns_revision_code() {
    let (server, portal) = signed_in().await;

    Mock::given(method("GET"))
        .and(path(page("Ajax/SyncCheckServ")))
        .respond_with(ResponseTemplate::new(200).set_body_string("2310-14-3\n"))
        .mount(&server)
        .await;

    let code = portal.perform_change_check().await.unwrap();
    assert_eq!(code, "2310-14-3");
}

#[tokio::test]
async fn test_change_check_rejects_malformed_body() {
    let (server, portal) = signed_in().await;

    Mock::given(method("GET"))
        .and(path(page("Ajax/SyncCheckServ")))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let result = portal.perform_change_check().await;
    assert!(
        matches!(result, Err(Error::UnexpectedResponse { .. })),
        "expected UnexpectedResponse, got: {result:?}"
    );
    // A malformed body is not a session problem.
    assert!(portal.is_authenticated());
}

#[tokio::test]
async fn test_redirect_to_signin_invalidates_session() {
    let (server, portal) = signed_in().await;

    Mock::given(method("POST"))
        .and(path(page("KeepAlive")))
        .respond_with(redirect_to(&page("access/signin.jsp")))
        .mount(&server)
        .await;

    let result = portal.perform_heartbeat().await;

    assert!(matches!(result, Err(Error::SessionInvalidated)));
    assert!(result.unwrap_err().is_auth_expired());
    assert!(!portal.is_authenticated());
}

#[tokio::test]
async fn test_server_error_is_unexpected_response() {
    let (server, portal) = signed_in().await;

    Mock::given(method("GET"))
        .and(path(page("api/panel-status.json")))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = portal.fetch_panel_status().await;
    assert!(matches!(result, Err(Error::UnexpectedResponse { .. })));
    assert!(portal.is_authenticated());
}

// ── Resource documents ──────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_gateway_info() {
    let (server, portal) = signed_in().await;

    Mock::given(method("GET"))
        .and(path(page("api/gateway.json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "manufacturer": "ADT",
            "model": "PGZNG1",
            "serialNumber": "5U02-00A1",
            "firmwareVersion": "24.0.0-9",
            "broadbandStatus": "Active"
        })))
        .mount(&server)
        .await;

    let gateway = portal.fetch_gateway_info().await.unwrap();

    assert_eq!(gateway.model.as_deref(), Some("PGZNG1"));
    assert_eq!(gateway.serial_number.as_deref(), Some("5U02-00A1"));
    assert_eq!(gateway.cellular_status, None);
}

#[tokio::test]
async fn test_fetch_panel_status() {
    let (server, portal) = signed_in().await;

    Mock::given(method("GET"))
        .and(path(page("api/panel-status.json")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "state": "stay", "status": "All Quiet" })),
        )
        .mount(&server)
        .await;

    let status = portal.fetch_panel_status().await.unwrap();
    assert_eq!(status.state, ArmState::Stay);
    assert_eq!(status.status.as_deref(), Some("All Quiet"));
}

#[tokio::test]
async fn test_fetch_sensors_info() {
    let (server, portal) = signed_in().await;

    Mock::given(method("GET"))
        .and(path(page("api/sensors.json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "deviceId": "17", "name": "Front Door", "zone": 1, "deviceType": "sensor,doorWindow" },
            { "deviceId": "22", "name": "Hallway", "zone": 5, "deviceType": "sensor,motion", "status": "Online" }
        ])))
        .mount(&server)
        .await;

    let sensors: Vec<SensorInfo> = portal.fetch_sensors_info().await.unwrap();

    assert_eq!(sensors.len(), 2);
    assert_eq!(sensors[0].device_id, "17");
    assert_eq!(sensors[0].zone, 1);
    assert_eq!(sensors[1].device_type, "sensor,motion");
    assert_eq!(sensors[1].status.as_deref(), Some("Online"));
}

#[tokio::test]
async fn test_malformed_resource_json() {
    let (server, portal) = signed_in().await;

    Mock::given(method("GET"))
        .and(path(page("api/sensors-status.json")))
        .respond_with(ResponseTemplate::new(200).set_body_string("{ not json"))
        .mount(&server)
        .await;

    let result = portal.fetch_sensors_status().await;
    assert!(
        matches!(&result, Err(Error::UnexpectedResponse { body, .. }) if body == "{ not json"),
        "expected UnexpectedResponse carrying the body, got: {result:?}"
    );
}

// ── Arm / disarm ────────────────────────────────────────────────────

#[tokio::test]
async fn test_arm_sends_command() {
    let (server, portal) = signed_in().await;

    Mock::given(method("POST"))
        .and(path(page("quickcontrol/armDisarm.jsp")))
        .and(body_string_contains("armstate=off"))
        .and(body_string_contains("arm=away"))
        .and(query_param_is_missing("t"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    portal
        .set_panel_status(ArmState::Off, ArmState::Away)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_invalid_transition_sends_nothing() {
    let (server, portal) = signed_in().await;

    Mock::given(method("POST"))
        .and(path(page("quickcontrol/armDisarm.jsp")))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = portal.set_panel_status(ArmState::Away, ArmState::Stay).await;

    assert!(
        matches!(
            result,
            Err(Error::InvalidStateTransition {
                from: ArmState::Away,
                to: ArmState::Stay
            })
        ),
        "expected InvalidStateTransition, got: {result:?}"
    );
}
