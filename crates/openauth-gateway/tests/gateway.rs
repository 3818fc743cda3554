//! End-to-end tests driving the gateway router over HTTP.

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::{TestRequest, TestServer};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use openauth_auth::{AllowList, IdentityGate, StaticIdentityAuthority, TokenIssuer};
use openauth_engine::{ConfigController, FilterEnvironment};
use openauth_gateway::{create_router, handlers, GatewayConfig, GatewayState};

const ADMIN: &str = "Bearer test-token:default:config-updater";
const INTRUDER: &str = "Bearer test-token:other:intruder";

fn server() -> TestServer {
    let mut config = GatewayConfig::with_secret("integration-secret");
    config.token.required_fields = vec!["role".to_string()];

    let issuer = Arc::new(TokenIssuer::new(config.token.clone()).unwrap());
    let gate = Arc::new(IdentityGate::new(
        Arc::new(StaticIdentityAuthority::default()),
        AllowList::default(),
    ));
    let env = FilterEnvironment::new(config.filter_timeout()).unwrap();
    let controller = ConfigController::new(gate, handlers::registry(&issuer), env).unwrap();

    TestServer::new(create_router(GatewayState::new(Arc::new(controller), config))).unwrap()
}

fn with_header(request: TestRequest, name: &'static str, value: &str) -> TestRequest {
    request.add_header(
        HeaderName::from_static(name),
        HeaderValue::from_str(value).unwrap(),
    )
}

async fn publish(server: &TestServer, bearer: &str, document: &str) -> axum_test::TestResponse {
    with_header(server.post("/config"), "authorization", bearer)
        .text(document.to_string())
        .await
}

async fn generation(server: &TestServer) -> u64 {
    server.get("/health").await.json::<Value>()["generation"]
        .as_u64()
        .unwrap()
}

const SIGNUP_DOCUMENT: &str = r"
routes:
  - method: POST
    path: /signup
    handler: signup
    filters:
      - kind: condition
        name: test-header
        conditions:
          - subject: header
            operator: equals
            key: X-Test-Header
            value: X-Test-Header
";

#[tokio::test]
async fn health_reports_initial_generation() {
    let server = server();
    let response = server.get("/health").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["generation"], 0);
}

#[tokio::test]
async fn published_routes_are_served() {
    let server = server();

    let response = publish(&server, ADMIN, SIGNUP_DOCUMENT).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["message"], "Configuration updated");
    assert_eq!(body["generation"], 1);

    let allowed = with_header(server.post("/signup"), "x-test-header", "X-Test-Header").await;
    allowed.assert_status_ok();
    assert_eq!(allowed.json::<Value>()["message"], "Signup successful");

    let denied = with_header(server.post("/signup"), "x-test-header", "wrong-value").await;
    denied.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(denied.json::<Value>()["error"]["code"], "forbidden");
}

#[tokio::test]
async fn gate_rejections_are_uniform() {
    let server = server();

    let missing = server.post("/config").text(SIGNUP_DOCUMENT.to_string()).await;
    let intruder = publish(&server, INTRUDER, SIGNUP_DOCUMENT).await;
    let unknown = publish(&server, "Bearer garbage", SIGNUP_DOCUMENT).await;

    for response in [&missing, &intruder, &unknown] {
        response.assert_status(StatusCode::UNAUTHORIZED);
    }
    assert_eq!(missing.text(), intruder.text());
    assert_eq!(missing.text(), unknown.text());
    assert_eq!(generation(&server).await, 0);
}

#[tokio::test]
async fn malformed_document_keeps_previous_table() {
    let server = server();
    publish(&server, ADMIN, SIGNUP_DOCUMENT).await.assert_status_ok();

    let bad = publish(
        &server,
        ADMIN,
        "routes:\n  - method: POST\n    path: /signup\n    handler: missing\n",
    )
    .await;
    bad.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(bad.json::<Value>()["error"]["code"], "bad_request");

    assert_eq!(generation(&server).await, 1);
    with_header(server.post("/signup"), "x-test-header", "X-Test-Header")
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn reserved_paths_cannot_be_claimed() {
    let server = server();
    let response = publish(
        &server,
        ADMIN,
        "routes:\n  - method: GET\n    path: /health\n    handler: signup\n",
    )
    .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_then_verify() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/validate"))
        .and(body_json(json!({ "username": "testuser" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "allow": true,
            "role": "member",
        })))
        .mount(&upstream)
        .await;

    let server = server();
    let document = format!(
        r"
routes:
  - method: POST
    path: /login
    handler: login
    filters:
      - kind: request
        remote_endpoint: {}/validate
        fields_to_forward: [username]
  - method: POST
    path: /verify
    handler: verify
",
        upstream.uri()
    );
    publish(&server, ADMIN, &document).await.assert_status_ok();

    let login = server
        .post("/login")
        .json(&json!({ "username": "testuser", "password": "secret" }))
        .await;
    login.assert_status_ok();
    let token = login.json::<Value>()["token"].as_str().unwrap().to_string();

    let verify = server.post("/verify").json(&json!({ "token": token })).await;
    verify.assert_status_ok();
    let claims = &verify.json::<Value>()["claims"];
    assert_eq!(claims["sub"], "testuser");
    assert_eq!(claims["role"], "member");
    assert_eq!(claims["iss"], "OpenAuth");

    let garbage = server.post("/verify").json(&json!({ "token": "garbage" })).await;
    garbage.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_without_required_field_is_bad_request() {
    let server = server();
    publish(
        &server,
        ADMIN,
        "routes:\n  - method: POST\n    path: /login\n    handler: login\n",
    )
    .await
    .assert_status_ok();

    let response = server
        .post("/login")
        .json(&json!({ "username": "testuser" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn denied_by_remote_validation() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&upstream)
        .await;

    let server = server();
    let document = format!(
        "routes:\n  - method: POST\n    path: /signup\n    handler: signup\n    filters:\n      - kind: request\n        remote_endpoint: {}\n        fields_to_forward: [username]\n",
        upstream.uri()
    );
    publish(&server, ADMIN, &document).await.assert_status_ok();

    server
        .post("/signup")
        .json(&json!({ "username": "testuser" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let server = server();
    let response = server.get("/nowhere").await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["error"]["code"], "not_found");
}

#[tokio::test]
async fn path_params_feed_conditions() {
    let server = server();
    publish(
        &server,
        ADMIN,
        r"
routes:
  - method: GET
    path: /tenants/:tenant/signup
    handler: signup
    filters:
      - kind: condition
        conditions:
          - {subject: param, operator: prefix, key: tenant, value: acme}
",
    )
    .await
    .assert_status_ok();

    server.get("/tenants/acme-eu/signup").await.assert_status_ok();
    server
        .get("/tenants/globex/signup")
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn allow_list_can_be_replaced() {
    let server = server();

    let response = with_header(server.put("/config/allow-list"), "authorization", ADMIN)
        .json(&json!({ "ops": ["deployer"] }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["accounts"], 1);

    publish(&server, ADMIN, SIGNUP_DOCUMENT)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    publish(&server, "Bearer test-token:ops:deployer", SIGNUP_DOCUMENT)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn rate_limit_rejects_with_429() {
    let server = server();
    publish(
        &server,
        ADMIN,
        r"
routes:
  - method: POST
    path: /signup
    handler: signup
    filters:
      - kind: rate_limit
        name: signup
        requests_per_second: 1
        burst: 2
",
    )
    .await
    .assert_status_ok();

    let attempt = || with_header(server.post("/signup"), "x-forwarded-for", "203.0.113.9");
    attempt().await.assert_status_ok();
    attempt().await.assert_status_ok();

    let limited = attempt().await;
    limited.assert_status(StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(limited.json::<Value>()["error"]["code"], "rate_limited");

    // Other callers have their own bucket.
    with_header(server.post("/signup"), "x-forwarded-for", "198.51.100.4")
        .await
        .assert_status_ok();
}
