//! `ApiService` end to end: headers, error normalization and status mapping.

use assert2::{check, let_assert};
use brx::{
    AUTH_REQUIRED_MESSAGE, ApiErrorKind, ApiService, Error, Form, HyperClient, RequestBody,
    RequestConfig,
};
use serde_json::{Value, json};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header, header_exists, method, path},
};

fn public(server: &MockServer) -> ApiService {
    ApiService::new(RequestConfig::public(server.uri()), HyperClient::new())
}

fn protected(server: &MockServer, token: Option<&str>) -> ApiService {
    ApiService::new(
        RequestConfig::authenticated(server.uri(), token.map(str::to_string)),
        HyperClient::new(),
    )
}

async fn failing_with(body: ResponseTemplate) -> Error {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts"))
        .respond_with(body)
        .mount(&server)
        .await;

    public(&server)
        .get::<Value>("/posts", &[], None)
        .await
        .expect_err("non-2xx response")
}

#[tokio::test]
async fn backend_message_field_becomes_the_error_message() {
    for (status, body) in [
        (400, json!({ "message": "title is required" })),
        (409, json!({ "message": "title is required", "error": "Conflict" })),
        (500, json!({ "message": "title is required", "detail": "trace" })),
    ] {
        let error = failing_with(ResponseTemplate::new(status).set_body_json(&body)).await;
        let_assert!(Error::Api(err) = error);
        check!(err.message() == "title is required");
        check!(err.status() == status);
        check!(err.kind() == ApiErrorKind::Http);
        check!(err.body() == body.as_object());
    }
}

#[tokio::test]
async fn error_and_detail_fields_are_fallbacks() {
    let error = failing_with(
        ResponseTemplate::new(422).set_body_json(json!({ "message": "", "error": "Unprocessable" })),
    )
    .await;
    let_assert!(Error::Api(err) = error);
    check!(err.message() == "Unprocessable");

    let error = failing_with(
        ResponseTemplate::new(422).set_body_json(json!({ "detail": "limit must be positive" })),
    )
    .await;
    let_assert!(Error::Api(err) = error);
    check!(err.message() == "limit must be positive");
}

#[tokio::test]
async fn unparsable_error_body_falls_back_to_unknown_error() {
    for body in ["<html>Bad Gateway</html>", "", "[1, 2, 3]", "\"oops\""] {
        let error = failing_with(ResponseTemplate::new(502).set_body_string(body)).await;
        let_assert!(Error::Api(err) = error);
        check!(err.message() == "Unknown error");
        check!(err.body().is_some_and(serde_json::Map::is_empty), "body: {body}");
        check!(err.response().is_some());
    }
}

#[tokio::test]
async fn custom_message_wins_over_backend_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "no such post" })))
        .mount(&server)
        .await;

    let error = public(&server)
        .get::<Value>("/posts", &[], Some("Could not load posts"))
        .await
        .expect_err("404");

    let_assert!(Error::Api(err) = error);
    insta::assert_snapshot!(err.error_message(), @"Not Found: Could not load posts");
}

#[tokio::test]
async fn missing_token_never_reaches_the_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    for token in [None, Some("")] {
        let error = protected(&server, token)
            .get::<Value>("/posts", &[], None)
            .await
            .expect_err("token required");

        check!(error.is_unauthenticated());
        let_assert!(Error::Api(err) = error);
        check!(err.kind() == ApiErrorKind::AuthRequired);
        check!(err.response().is_none());
        check!(err.message() == AUTH_REQUIRED_MESSAGE);
    }

    server.verify().await;
}

#[tokio::test]
async fn token_is_sent_as_bearer_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tasks"))
        .and(header("Authorization", "Bearer token"))
        .and(header("X-Client", "brx"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let tasks: Vec<Value> = protected(&server, Some("token"))
        .get("/tasks", &[("X-Client", "brx")], None)
        .await
        .expect("tasks");
    check!(tasks.is_empty());
}

#[tokio::test]
async fn public_service_never_sends_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let service = ApiService::new(
        RequestConfig {
            base_url: server.uri(),
            token: Some("secret".to_string()),
            bypass: true,
        },
        HyperClient::new(),
    );
    let _: Vec<Value> = service.get("/posts", &[], None).await.expect("posts");
    let _: Vec<Value> = public(&server).get("/posts", &[], None).await.expect("posts");

    let requests = server.received_requests().await.expect("recording enabled");
    check!(requests.len() == 2);
    for request in requests {
        check!(!request.headers.contains_key("authorization"));
    }
}

#[tokio::test]
async fn json_bodies_are_sent_with_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/tasks/t1"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({ "isCompleted": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let body = RequestBody::json(&json!({ "isCompleted": true })).expect("object");
    let ack: Value = protected(&server, Some("token"))
        .patch("/tasks/t1", &[], Some(body), None)
        .await
        .expect("ack");
    check!(ack == json!({ "success": true }));
}

#[tokio::test]
async fn multipart_bodies_keep_their_boundary() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/uploads"))
        .and(header(
            "Content-Type",
            "multipart/form-data; boundary=test-boundary",
        ))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "u1" })))
        .expect(1)
        .mount(&server)
        .await;

    let form = Form::with_boundary("test-boundary").text("title", "avatar");
    let created: Value = public(&server)
        .post("/uploads", &[], Some(RequestBody::from(form)), None)
        .await
        .expect("created");
    check!(created["id"] == "u1");
}

#[tokio::test]
async fn no_content_decodes_as_unit() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/tasks/t1"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    protected(&server, Some("token"))
        .delete::<()>("/tasks/t1", &[], None)
        .await
        .expect("no content");
}

#[tokio::test]
async fn unreachable_backend_has_status_zero() {
    let service = ApiService::new(
        RequestConfig::public("http://127.0.0.1:1"),
        HyperClient::new(),
    );

    let error = service
        .get::<Value>("/posts", &[], None)
        .await
        .expect_err("connection refused");
    let_assert!(Error::Api(err) = error);
    check!(err.status() == 0);
    check!(err.kind() == ApiErrorKind::Transport);
    check!(!err.is_unauthenticated());
    insta::assert_snapshot!(err.error_message(), @"Network error occurred");
}

#[tokio::test]
async fn status_prefixes() {
    for status in [400_u16, 401, 403, 404, 500, 503, 418] {
        let error = failing_with(
            ResponseTemplate::new(status).set_body_json(json!({ "message": "boom" })),
        )
        .await;
        let_assert!(Error::Api(err) = error);
        check!(err.is_unauthenticated() == (status == 401));

        let expected = match status {
            400 => "Bad Request: boom",
            401 => "Unauthorized: boom",
            403 => "Forbidden: boom",
            404 => "Not Found: boom",
            500 => "Internal Server Error: boom",
            503 => "Service Unavailable: boom",
            _ => "boom",
        };
        check!(err.error_message() == expected);
    }
}
