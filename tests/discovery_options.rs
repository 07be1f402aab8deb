use payload_dynamic::errors::ErrorKind;
use payload_dynamic::managers::options::OptionKind;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{api_key_bundle, app, login_bundle};

#[tokio::test]
async fn collection_options_come_from_the_reflection_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/permissions"))
        .and(header("authorization", "users API-Key test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "collections": {"posts": {"fields": true, "read": true}},
            "globals": {}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let app = app();
    let options = app
        .options
        .load(&api_key_bundle(&server.uri()), &OptionKind::Collections)
        .await
        .expect("load options");
    assert_eq!(
        serde_json::to_value(&options).expect("serialize"),
        json!([{"name": "posts", "value": "posts"}])
    );
}

#[tokio::test]
async fn missing_reflection_endpoint_is_a_discovery_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/permissions"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({"errors": [{"message": "Route not found \"/api/permissions\""}]})),
        )
        .mount(&server)
        .await;

    let app = app();
    let err = app
        .discovery
        .discover_schema(&api_key_bundle(&server.uri()))
        .await
        .expect_err("discovery must fail");
    assert_eq!(err.kind, ErrorKind::Discovery);
    assert_eq!(err.status, Some(404));
    assert!(err.hint.as_deref().unwrap_or("").contains("GET /api/permissions"));
}

#[tokio::test]
async fn non_json_reflection_body_is_a_discovery_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/permissions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html>admin</html>", "text/html"))
        .mount(&server)
        .await;

    let err = app()
        .discovery
        .discover_schema(&api_key_bundle(&server.uri()))
        .await
        .expect_err("discovery must fail");
    assert_eq!(err.kind, ErrorKind::Discovery);
    assert!(err.message.contains("unexpected response shape"));
}

#[tokio::test]
async fn custom_discovery_endpoint_is_used() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cms/reflect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "collections": {},
            "globals": {"footer": {"read": true, "fields": true}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let bundle = api_key_bundle(&server.uri()).with_discovery_endpoint("/cms/reflect");
    let options = app()
        .options
        .load(&bundle, &OptionKind::Globals)
        .await
        .expect("load globals");
    assert_eq!(options.len(), 1);
    assert_eq!(options[0].name, "footer");
}

#[tokio::test]
async fn fallback_probing_is_opt_in() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/media"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"docs": []})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/globals/settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let app = app();
    let strict = app
        .discovery
        .discover_schema(&api_key_bundle(&server.uri()))
        .await;
    assert_eq!(strict.expect_err("strict mode fails").kind, ErrorKind::Discovery);

    let bundle = api_key_bundle(&server.uri()).with_discovery_fallback(true);
    let graph = app.discovery.discover_schema(&bundle).await.expect("probe");
    assert_eq!(graph.collections.keys().collect::<Vec<_>>(), vec!["media"]);
    assert_eq!(graph.globals.keys().collect::<Vec<_>>(), vec!["settings"]);
}

#[tokio::test]
async fn login_mode_discovery_reuses_the_cached_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/users/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "jwt-1"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/permissions"))
        .and(header("authorization", "Bearer jwt-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "collections": {"users": {"read": true, "fields": {"email": {"read": true}}}},
            "globals": {}
        })))
        .expect(2)
        .mount(&server)
        .await;

    let app = app();
    let bundle = login_bundle(&server.uri());
    let auth = app
        .options
        .load(&bundle, &OptionKind::AuthCollections)
        .await
        .expect("auth collections");
    assert_eq!(auth[0].name, "users");

    let fields = app
        .options
        .load(&bundle, &OptionKind::CollectionFields("users".to_string()))
        .await
        .expect("fields");
    assert_eq!(fields[0].name, "email");
    assert_eq!(app.auth.cache().len(), 1);

    app.shutdown();
    assert!(app.auth.cache().is_empty());
}
