use payload_dynamic::errors::ErrorKind;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{api_key_bundle, app, login_bundle};

#[tokio::test]
async fn find_sends_limit_and_canonical_where() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/posts"))
        .and(query_param("limit", "5"))
        .and(query_param("where", r#"{"title":{"equals":"x"}}"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"docs": [{"id": 1}]})))
        .expect(1)
        .mount(&server)
        .await;

    let items = vec![json!({
        "resource": "collection",
        "operation": "find",
        "collection": "posts",
        "additionalOptions": {"limit": 5, "where": "{\"title\": {\"equals\": \"x\"}}"}
    })];
    let results = app()
        .executor
        .execute(&api_key_bundle(&server.uri()), &items, false)
        .await
        .expect("execute");
    assert_eq!(results[0].json, json!({"docs": [{"id": 1}]}));
    assert_eq!(results[0].paired_item.item, 0);
}

#[tokio::test]
async fn bulk_delete_sends_where_in_body_only() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/posts"))
        .and(body_json(json!({"where": {"status": {"equals": "draft"}}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"docs": [], "errors": []})))
        .expect(1)
        .mount(&server)
        .await;

    let items = vec![json!({
        "operation": "delete",
        "collection": "posts",
        "additionalOptions": {"where": {"status": {"equals": "draft"}}}
    })];
    app()
        .executor
        .execute(&api_key_bundle(&server.uri()), &items, false)
        .await
        .expect("execute");

    let requests = server.received_requests().await.expect("recorded requests");
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url.query(), None);
}

#[tokio::test]
async fn login_happens_once_per_batch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/users/login"))
        .and(body_json(json!({"email": "ed@example.com", "password": "pw"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "jwt-9", "exp": 0})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/posts"))
        .and(header("authorization", "Bearer jwt-9"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"doc": {"id": 7}})))
        .expect(2)
        .mount(&server)
        .await;

    let items = vec![
        json!({"operation": "create", "collection": "posts", "data": {"title": "a"}}),
        json!({"operation": "create", "collection": "posts", "data": "{\"title\": \"b\"}"}),
    ];
    let results = app()
        .executor
        .execute(&login_bundle(&server.uri()), &items, false)
        .await
        .expect("execute");
    assert_eq!(results.len(), 2);
    assert_eq!(results[1].json["doc"]["id"], 7);
}

#[tokio::test]
async fn continue_on_fail_passes_server_errors_through() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/posts/1"))
        .respond_with(ResponseTemplate::new(403).set_body_json(
            json!({"errors": [{"message": "You are not allowed to perform this action."}]}),
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/posts/count"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"totalDocs": 3})))
        .mount(&server)
        .await;

    let items = vec![
        json!({"operation": "updateById", "collection": "posts", "documentId": "1", "data": {"title": "x"}}),
        json!({"operation": "count", "collection": "posts"}),
    ];
    let bundle = api_key_bundle(&server.uri());
    let app = app();

    let results = app
        .executor
        .execute(&bundle, &items, true)
        .await
        .expect("execute");
    assert!(results[0].json["error"]
        .as_str()
        .unwrap_or("")
        .contains("You are not allowed to perform this action."));
    assert_eq!(results[1].json, json!({"totalDocs": 3}));

    let err = app
        .executor
        .execute(&bundle, &items, false)
        .await
        .expect_err("must stop on first failure");
    assert_eq!(err.kind, ErrorKind::Request);
    assert_eq!(err.status, Some(403));
}

#[tokio::test]
async fn auth_resource_targets_the_auth_collection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/admins/forgot-password"))
        .and(body_json(json!({"email": "ops@example.com"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Success"})))
        .expect(1)
        .mount(&server)
        .await;

    let items = vec![json!({
        "resource": "auth",
        "operation": "forgotPassword",
        "authCollection": "admins",
        "email": "ops@example.com"
    })];
    let results = app()
        .executor
        .execute(&api_key_bundle(&server.uri()), &items, false)
        .await
        .expect("execute");
    assert_eq!(results[0].json["message"], "Success");
}
