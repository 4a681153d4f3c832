#![allow(clippy::unwrap_used)]
// Integration tests for `EcmClient` using wiremock.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures_util::TryStreamExt;
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{
    body_json, body_partial_json, body_string_contains, header, header_regex, method, path,
    query_param,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ecmcli_api::resources::{AppIdent, AuthorizationFilter, Beneficiary};
use ecmcli_api::{ApiEvent, EcmClient, Error, Query, RouterSelection, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, EcmClient) {
    let server = MockServer::start().await;
    let base = Url::parse(&server.uri()).unwrap();
    let client = EcmClient::with_client(reqwest::Client::new(), base.clone(), base);
    (server, client)
}

async fn setup_with_jar() -> (MockServer, EcmClient) {
    let server = MockServer::start().await;
    let base = Url::parse(&server.uri()).unwrap();
    let client = EcmClient::new(base.clone(), base, &TransportConfig::default()).unwrap();
    (server, client)
}

async fn setup_with_timeout(timeout: Duration) -> (MockServer, EcmClient) {
    let server = MockServer::start().await;
    let base = Url::parse(&server.uri()).unwrap();
    let transport = TransportConfig {
        timeout,
        ..TransportConfig::default()
    };
    let client = EcmClient::new(base.clone(), base, &transport).unwrap();
    (server, client)
}

async fn hits(server: &MockServer, verb: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.as_str() == verb)
        .count()
}

fn ok(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": data }))
}

fn page(data: Value, next: Option<&str>, total: u64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "success": true,
        "data": data,
        "meta": { "next": next, "total_count": total }
    }))
}

// ── Authentication ──────────────────────────────────────────────────

#[tokio::test]
async fn test_login_sets_session_and_identifies() {
    let (server, client) = setup_with_jar().await;

    Mock::given(method("POST"))
        .and(path("/api/internal/v1/users/login"))
        .and(header("content-type", "application/vnd.api+json"))
        .and(body_partial_json(json!({
            "data": { "type": "login", "attributes": { "email": "bob@example.com" } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "attributes": { "state": "st8" } }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/internal/v1/users/oidc_authorize"))
        .and(query_param("state", "st8"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("set-cookie", "cpAccountsJwt=jwt-123; Path=/")
                .insert_header("location", "/"),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/login/"))
        .respond_with(ok(json!({
            "user": { "id": "9", "username": "bob@example.com", "first_name": "Bob" },
            "account": { "id": 77, "name": "Root" }
        })))
        .mount(&server)
        .await;

    let sessions = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&sessions);
    client.add_listener(Arc::new(move |event: &ApiEvent| {
        if let ApiEvent::SessionChanged { token, .. } = event {
            seen.lock().unwrap().push(token.clone());
        }
    }));

    let secret: secrecy::SecretString = "hunter2".to_string().into();
    let ident = client.login("bob@example.com", &secret).await.unwrap();

    assert_eq!(ident.user.username, "bob@example.com");
    assert_eq!(ident.account_id().as_deref(), Some("77"));
    assert_eq!(client.session_token().as_deref(), Some("jwt-123"));
    assert_eq!(
        *sessions.lock().unwrap(),
        vec![Some("jwt-123".to_owned())]
    );
}

#[tokio::test]
async fn test_login_rejected() {
    let (server, client) = setup_with_jar().await;

    Mock::given(method("POST"))
        .and(path("/api/internal/v1/users/login"))
        .respond_with(ResponseTemplate::new(401).set_body_string("nope"))
        .mount(&server)
        .await;

    let secret: secrecy::SecretString = "wrong".to_string().into();
    let result = client.login("bob@example.com", &secret).await;

    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
    assert!(client.session_token().is_none());
}

#[tokio::test]
async fn test_login_without_jwt_cookie_fails() {
    let (server, client) = setup_with_jar().await;

    Mock::given(method("POST"))
        .and(path("/api/internal/v1/users/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "attributes": { "state": "st8" } }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/internal/v1/users/oidc_authorize"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let secret: secrecy::SecretString = "pw".to_string().into();
    let result = client.login("bob@example.com", &secret).await;
    assert!(matches!(result, Err(Error::Authentication { .. })));
}

#[tokio::test]
async fn test_identify_with_empty_session_is_unauthorized() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/login/"))
        .respond_with(ok(Value::Null))
        .mount(&server)
        .await;

    let result = client.identify().await;
    assert!(matches!(result, Err(Error::Unauthorized { .. })));
}

// ── Error envelopes ─────────────────────────────────────────────────

#[tokio::test]
async fn test_tos_precondition_maps_to_tos_required() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/routers/"))
        .respond_with(ResponseTemplate::new(412).set_body_json(json!({
            "success": false,
            "exception": "precondition_failed",
            "message": "must_accept_tos"
        })))
        .mount(&server)
        .await;

    let result = client.get_value("routers", &Query::new()).await;
    assert!(matches!(result, Err(Error::TosRequired)), "got {result:?}");
}

#[tokio::test]
async fn test_unauthorized_envelope_resets_session() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/routers/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "success": false,
            "exception": "unauthorized",
            "message": "Authentication required"
        })))
        .mount(&server)
        .await;

    let result = client.get_value("routers", &Query::new()).await;
    assert!(result.as_ref().is_err_and(Error::is_auth_failure), "got {result:?}");
    assert!(client.ident().is_none());
}

#[tokio::test]
async fn test_api_error_envelope() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/accounts/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "success": false,
            "exception": "validation_error",
            "message": "name: This field is required."
        })))
        .mount(&server)
        .await;

    let result = client.create_account("", None).await;
    match result {
        Err(Error::Api {
            exception, status, ..
        }) => {
            assert_eq!(exception, "validation_error");
            assert_eq!(status, 400);
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

// ── Decoding & scope ────────────────────────────────────────────────

#[tokio::test]
async fn test_html_entities_are_decoded() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/groups/"))
        .respond_with(page(
            json!([{ "id": "1", "name": "Tom &amp; Jerry", "statistics": {
                "synched_count": 2, "online_count": 1, "offline_count": 1
            }}]),
            None,
            1,
        ))
        .mount(&server)
        .await;

    let groups = client.list_groups().await.unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].name, "Tom & Jerry");
    assert_eq!(groups[0].statistics.as_ref().unwrap().online_count, 1);
}

#[tokio::test]
async fn test_parent_account_scope_is_sent() {
    let (server, client) = setup().await;
    client.set_parent_account(Some("55".into()));

    Mock::given(method("GET"))
        .and(path("/api/v1/routers/"))
        .and(query_param("parentAccount", "55"))
        .respond_with(page(json!([{ "id": "1", "name": "hq" }]), None, 1))
        .expect(1)
        .mount(&server)
        .await;

    let routers = client.list_routers(&[], Query::new()).await.unwrap();
    assert_eq!(routers[0].name, "hq");
}

#[tokio::test]
async fn test_non_json_error_page_keeps_multibyte_preview() {
    let (server, client) = setup().await;
    let body = format!("{}’ bad gateway", "x".repeat(199));

    Mock::given(method("GET"))
        .and(path("/api/v1/routers/"))
        .respond_with(ResponseTemplate::new(502).set_body_string(body))
        .mount(&server)
        .await;

    let err = client.list_routers(&[], Query::new()).await.unwrap_err();
    match err {
        Error::Api {
            status, message, ..
        } => {
            assert_eq!(status, 502);
            assert_eq!(message.chars().count(), 200);
            assert!(message.ends_with('’'));
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

// ── Retries ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_read_is_retried_after_timeout() {
    let (server, client) = setup_with_timeout(Duration::from_millis(300)).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/routers/"))
        .respond_with(
            page(json!([{ "id": "1", "name": "slow" }]), None, 1)
                .set_delay(Duration::from_millis(900)),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/routers/"))
        .respond_with(page(json!([{ "id": "1", "name": "hq" }]), None, 1))
        .mount(&server)
        .await;

    let routers = client.list_routers(&[], Query::new()).await.unwrap();
    assert_eq!(routers[0].name, "hq");
    assert_eq!(hits(&server, "GET").await, 2);
}

#[tokio::test]
async fn test_post_is_not_resent_after_timeout() {
    let (server, client) = setup_with_timeout(Duration::from_millis(300)).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/accounts/"))
        .respond_with(ok(json!({ "id": 9 })).set_delay(Duration::from_millis(900)))
        .mount(&server)
        .await;

    let err = client
        .post("accounts", &json!({ "name": "Branch" }), &Query::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout { .. }), "got: {err:?}");
    assert_eq!(err.to_string(), "Request timed out after 300ms");
    assert_eq!(hits(&server, "POST").await, 1);
}

#[tokio::test]
async fn test_put_is_not_resent_after_timeout() {
    let (server, client) = setup_with_timeout(Duration::from_millis(300)).await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/remote/config/system/desc/"))
        .respond_with(ok(json!([])).set_delay(Duration::from_millis(900)))
        .mount(&server)
        .await;

    let query = Query::new().with("id__in", "1,2");
    let err = client
        .put("remote/config/system/desc", &json!("lobby"), &query)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout { .. }), "got: {err:?}");
    assert_eq!(hits(&server, "PUT").await, 1);
}

#[tokio::test]
async fn test_connection_failure_is_retried_with_backoff() {
    // Reserve a port, then close it so every connect is refused.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let base = Url::parse(&format!("http://127.0.0.1:{port}")).unwrap();
    let client = EcmClient::with_client(reqwest::Client::new(), base.clone(), base);

    let started = Instant::now();
    let err = client
        .post("accounts", &json!({ "name": "Branch" }), &Query::new())
        .await
        .unwrap_err();

    assert!(err.is_unsent(), "got: {err:?}");
    // Three retries back off 250ms, 500ms and 750ms.
    assert!(started.elapsed() >= Duration::from_millis(1500));
}

// ── Paging ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_pager_follows_next_until_exhausted() {
    let (server, client) = setup().await;
    client.set_page_size(2);

    Mock::given(method("GET"))
        .and(path("/api/v1/routers/"))
        .and(query_param("offset", "0"))
        .respond_with(page(
            json!([{ "id": "1" }, { "id": "2" }]),
            Some("/api/v1/routers/?offset=2"),
            3,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/routers/"))
        .and(query_param("offset", "2"))
        .respond_with(page(json!([{ "id": "3" }]), None, 3))
        .mount(&server)
        .await;

    let records: Vec<Value> = client
        .pager("routers", Query::new())
        .try_collect()
        .await
        .unwrap();
    let ids: Vec<&str> = records.iter().map(|r| r["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
}

#[tokio::test]
async fn test_aberrant_pager_grows_window_until_empty() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/activity_logs/"))
        .and(query_param("limit", "2"))
        .and(query_param("offset", "0"))
        .respond_with(page(
            json!([{ "activity_type": 6 }, { "activity_type": 7 }]),
            None,
            1,
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/activity_logs/"))
        .and(query_param("limit", "4"))
        .and(query_param("offset", "2"))
        .respond_with(page(json!([{ "activity_type": 3 }]), None, 1))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/activity_logs/"))
        .and(query_param("limit", "5"))
        .and(query_param("offset", "3"))
        .respond_with(page(json!([]), None, 1))
        .expect(1)
        .mount(&server)
        .await;

    let query = Query::new().with("limit", 2);
    let records: Vec<Value> = client
        .pager("activity_logs", query)
        .try_collect()
        .await
        .unwrap();
    assert_eq!(records.len(), 3);
}

// ── Lookups ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_by_id_or_name_falls_back_to_name() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/routers/"))
        .and(query_param("id__exact", "42"))
        .respond_with(page(json!([]), None, 0))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/routers/"))
        .and(query_param("name__exact", "42"))
        .respond_with(page(json!([{ "id": "7", "name": "42" }]), None, 1))
        .mount(&server)
        .await;

    let router = client.get_router("42").await.unwrap();
    assert_eq!(router.id, "7");
}

#[tokio::test]
async fn test_get_by_glob_checks_client_side() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/routers/"))
        .and(query_param("name__startswith", "hq-"))
        .respond_with(page(
            json!([{ "id": "1", "name": "hq" }, { "id": "2", "name": "hq-east" }]),
            None,
            2,
        ))
        .mount(&server)
        .await;

    let router = client.get_router("hq-*").await.unwrap();
    assert_eq!(router.id, "2");
}

#[tokio::test]
async fn test_glob_list_sends_or_prefilter_and_checks_client_side() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/routers/"))
        .and(query_param("_or", "name__startswith=hq|name__startswith=lab"))
        .respond_with(page(
            json!([
                { "id": "1", "name": "hq-east" },
                { "id": "2", "name": "lab" },
                { "id": "3", "name": "HQ-west" },
                { "id": "4", "name": "lab-9" }
            ]),
            None,
            4,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let patterns = vec!["hq*".to_owned(), "lab?*".to_owned()];
    let routers = client.list_routers(&patterns, Query::new()).await.unwrap();
    let names: Vec<&str> = routers.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["hq-east", "lab-9"]);
}

#[tokio::test]
async fn test_missing_record_is_not_found() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/accounts/"))
        .respond_with(page(json!([]), None, 0))
        .mount(&server)
        .await;

    let err = client.get_account("nowhere").await.unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
    assert_eq!(err.to_string(), "Account not found: nowhere");
}

// ── Remote ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_remote_get_expands_globs_and_keeps_failures() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/routers/"))
        .and(query_param("product__series", "3"))
        .respond_with(page(
            json!([
                { "id": "1", "name": "a", "product": { "series": 3 } },
                { "id": "2", "name": "b", "product": { "series": 3 } }
            ]),
            None,
            2,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/remote/config/wan/rules/"))
        .and(query_param("id", "1"))
        .respond_with(ok(json!([{
            "id": 1,
            "success": true,
            "data": [{ "enabled": true }, { "enabled": false }]
        }])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/remote/config/wan/rules/"))
        .and(query_param("id", "2"))
        .respond_with(ok(json!([{
            "id": 2,
            "success": false,
            "exception": "timeout",
            "reason": "router offline"
        }])))
        .mount(&server)
        .await;

    let routers = client
        .select_routers(&RouterSelection::default())
        .await
        .unwrap();
    let rows = client
        .remote_get("config.wan.rules.*.enabled", &routers, 4)
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].router.name, "a");
    let paths: Vec<&str> = rows[0].hits.iter().map(|h| h.path.as_str()).collect();
    assert_eq!(
        paths,
        vec!["config.wan.rules.0.enabled", "config.wan.rules.1.enabled"]
    );
    assert!(!rows[1].result.success);
    assert_eq!(rows[1].result.failure(), "timeout (router offline)");
}

#[tokio::test]
async fn test_reboot_puts_true_with_zero_timeout() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/remote/control/system/reboot/"))
        .and(query_param("id__in", "1,2"))
        .and(query_param("timeout", "0"))
        .respond_with(ok(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    client
        .reboot(&["1".to_owned(), "2".to_owned()])
        .await
        .unwrap();
}

// ── Features ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_feature_router_binding_posts_and_deletes_urn_list() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/featurebindings/3/routers/"))
        .and(body_json(json!(["/api/v1/routers/9/"])))
        .respond_with(ok(json!(null)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/featurebindings/3/routers/"))
        .and(body_json(json!(["/api/v1/routers/9/"])))
        .respond_with(ok(json!(null)))
        .expect(1)
        .mount(&server)
        .await;

    client
        .add_feature_router("3", "/api/v1/routers/9/")
        .await
        .unwrap();
    client
        .remove_feature_router("3", "/api/v1/routers/9/")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_feature_list_hides_internal_features() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/featurebindings/"))
        .and(query_param("feature.category__nin", "internal"))
        .and(query_param("expand", "account,feature"))
        .respond_with(page(
            json!([{ "id": 1, "enabled": true, "feature": { "name": "vpn" } }]),
            None,
            1,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let bindings = client.list_feature_bindings(false).await.unwrap();
    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0].feature_name(), "vpn");
}

// ── Authorizations ──────────────────────────────────────────────────

#[tokio::test]
async fn test_authorization_filters_become_query_params() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/authorizations/"))
        .and(query_param("_or", "user__username=ops|securitytoken.label=ops"))
        .and(query_param("role__name", "Admin"))
        .and(query_param("account__name", "Branch"))
        .respond_with(page(
            json!([{ "id": 5, "active": false, "user": { "username": "ops" } }]),
            None,
            1,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let filter = AuthorizationFilter {
        beneficiary: Some("ops".into()),
        role: Some("Admin".into()),
        rights_on: Some("Branch".into()),
        inactive: false,
    };
    let auths = client.list_authorizations(&filter).await.unwrap();
    assert_eq!(auths.len(), 1);
    assert!(!auths[0].active);
}

#[tokio::test]
async fn test_foreign_authorization_posts_username() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/foreign_authorizations/"))
        .and(body_json(json!({
            "cascade": false,
            "role": "/api/v1/roles/2/",
            "account": "/api/v1/accounts/7/",
            "username": "guest@example.com",
        })))
        .respond_with(ok(json!({ "id": 11 })))
        .expect(1)
        .mount(&server)
        .await;

    let created = client
        .create_authorization(
            &Beneficiary::Foreign("guest@example.com".into()),
            "/api/v1/roles/2/",
            "/api/v1/accounts/7/",
            false,
        )
        .await
        .unwrap();
    assert_eq!(created["id"], 11);
}

// ── Apps ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_app_upload_sends_archive_and_waits_for_ready() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/router_sdk_app_versions/"))
        .and(header_regex("content-type", "^multipart/form-data"))
        .and(body_string_contains("name=\"archive\"; filename=\"hello.tar.gz\""))
        .respond_with(ok(json!({ "id": 12 })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/router_sdk_app_versions/"))
        .and(query_param("id__exact", "12"))
        .respond_with(page(
            json!([{ "id": 12, "state": "uploading", "app": { "name": "hello" } }]),
            None,
            1,
        ))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/router_sdk_app_versions/"))
        .and(query_param("id__exact", "12"))
        .respond_with(page(
            json!([{
                "id": 12, "state": "ready", "major_version": 1, "minor_version": 0,
                "app": { "name": "hello" }
            }]),
            None,
            1,
        ))
        .mount(&server)
        .await;

    let app = client.upload_app("hello.tar.gz", b"package").await.unwrap();
    assert_eq!(app.state, "ready");
    assert_eq!(app.ident(), "hello:1.0");
    assert_eq!(hits(&server, "GET").await, 2);
}

#[tokio::test]
async fn test_rejected_app_upload_is_deleted() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/router_sdk_app_versions/"))
        .respond_with(ok(json!({ "id": 13 })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/router_sdk_app_versions/"))
        .respond_with(page(
            json!([{ "id": 13, "state": "error", "state_details": "bad manifest" }]),
            None,
            1,
        ))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/router_sdk_app_versions/13/"))
        .respond_with(ok(json!(null)))
        .expect(1)
        .mount(&server)
        .await;

    let err = client.upload_app("bad.tar.gz", b"junk").await.unwrap_err();
    assert!(err.to_string().contains("bad manifest"), "{err}");
}

#[tokio::test]
async fn test_app_version_lookup_by_ident() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/router_sdk_app_versions/"))
        .and(query_param("app__name", "hello"))
        .and(query_param("major_version", "2"))
        .and(query_param("minor_version", "1"))
        .respond_with(page(json!([]), None, 0))
        .mount(&server)
        .await;

    let ident: AppIdent = "hello:2.1".parse().unwrap();
    let err = client.get_app_version(&ident).await.unwrap_err();
    assert_eq!(err.to_string(), "App not found: hello:2.1");
}

// ── Clients ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_lan_clients_merge_addresses_and_hostnames() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/routers/"))
        .and(query_param("state", "online"))
        .respond_with(page(
            json!([{ "id": "1", "name": "hq", "state": "online" }]),
            None,
            1,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/remote/status/lan/clients/"))
        .respond_with(ok(json!([{
            "id": 1,
            "success": true,
            "data": [
                { "mac": "aa:bb", "ip_address": "fe80::5" },
                { "mac": "aa:bb", "ip_address": "10.0.0.5" }
            ]
        }])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/remote/status/dhcpd/leases/"))
        .respond_with(ok(json!([{
            "id": 1,
            "success": true,
            "data": [{ "mac": "aa:bb", "hostname": "printer" }]
        }])))
        .mount(&server)
        .await;

    let selection = RouterSelection {
        skip_offline: true,
        ..RouterSelection::default()
    };
    let routers = client.select_routers(&selection).await.unwrap();
    let clients = client.lan_clients(&routers, false, 4).await.unwrap();

    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0].router, "hq");
    assert_eq!(clients[0].ip_addresses, vec!["10.0.0.5", "fe80::5"]);
    assert_eq!(clients[0].hostname.as_deref(), Some("printer"));
    assert!(clients[0].wifi.is_none());
}
