//! Integration tests for ReqwestTransport using wiremock.

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use valdora_core::{
    ApiError, ApiRequest, ApiResponse, ErrorStatus, ListParams, Method, Resource, Transport,
};
use valdora_reqwest::{ReqwestTransport, SessionToken, StaticToken};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport(server: &MockServer) -> ReqwestTransport {
    ReqwestTransport::builder(format!("{}/api", server.uri()))
        .timeout(Duration::from_secs(5))
        .build()
}

/// Bearer token and JSON headers reach the server
#[tokio::test]
async fn test_auth_and_content_type_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tenants/1"))
        .and(header("authorization", "Bearer secret-token"))
        .and(header("content-type", "application/json"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "1"})))
        .expect(1)
        .mount(&server)
        .await;

    let transport = ReqwestTransport::builder(format!("{}/api", server.uri()))
        .token_provider(StaticToken::new("secret-token"))
        .build();

    let data = transport
        .send(ApiRequest::get(Resource::Tenant, "1"))
        .await
        .unwrap();
    assert_eq!(data, json!({"id": "1"}));
}

/// Without a session token no Authorization header is sent
#[tokio::test]
async fn test_signed_out_session_sends_no_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/roles/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "3"})))
        .mount(&server)
        .await;

    let session = SessionToken::default();
    let transport = ReqwestTransport::builder(format!("{}/api", server.uri()))
        .token_provider(session.clone())
        .build();

    transport
        .send(ApiRequest::get(Resource::Role, "3"))
        .await
        .unwrap();
    session.set("after-login");
    transport
        .send(ApiRequest::get(Resource::Role, "3"))
        .await
        .unwrap();

    let received = server.received_requests().await.unwrap_or_default();
    assert_eq!(received.len(), 2);
    assert!(!received[0].headers.contains_key("authorization"));
    assert_eq!(
        received[1]
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok()),
        Some("Bearer after-login")
    );
}

/// Non-2xx responses become Http errors carrying the server message
#[tokio::test]
async fn test_not_found_maps_to_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/tenants/unknown-id"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"message": "Tenant not found"})),
        )
        .mount(&server)
        .await;

    let error = transport(&server)
        .send(ApiRequest::delete(Resource::Tenant, "unknown-id"))
        .await
        .unwrap_err();

    assert_eq!(
        error,
        ApiError::Http {
            status: 404,
            message: "Tenant not found".into(),
        }
    );
    assert!(error.is_not_found());
    assert_eq!(
        serde_json::to_value(ApiResponse::from(&error)).unwrap(),
        json!({"error": {"status": 404, "message": "Tenant not found"}})
    );
}

/// Exceeding the timeout yields Timeout, not Network
#[tokio::test]
async fn test_slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/orders"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let transport = ReqwestTransport::builder(format!("{}/api", server.uri()))
        .timeout(Duration::from_millis(50))
        .build();

    let error = transport
        .send(ApiRequest::list(Resource::Order, ListParams::new()))
        .await
        .unwrap_err();
    assert_eq!(error, ApiError::Timeout(Duration::from_millis(50)));
    assert_eq!(error.status(), ErrorStatus::label("timeout"));
}

/// No listener at all yields Network
#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}/api", listener.local_addr().unwrap());
    drop(listener);

    let transport = ReqwestTransport::builder(base)
        .timeout(Duration::from_secs(5))
        .build();
    let error = transport
        .send(ApiRequest::get(Resource::Tenant, "1"))
        .await
        .unwrap_err();
    assert!(matches!(error, ApiError::Network(_)), "{error:?}");
}

/// Hydra collections are normalized using the request's pagination
#[tokio::test]
async fn test_hydra_collection_is_normalized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .and(query_param("status", "active"))
        .and(query_param("page", "2"))
        .and(query_param("limit", "5"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({
                "@context": "/api/contexts/User",
                "hydra:member": [{"id": "6"}, {"id": "7"}],
                "hydra:totalItems": 7,
            })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let data = transport(&server)
        .send(ApiRequest::list(
            Resource::User,
            ListParams::new().status("active").page(2).limit(5),
        ))
        .await
        .unwrap();

    assert_eq!(
        data,
        json!({"items": [{"id": "6"}, {"id": "7"}], "total": 7, "page": 2, "limit": 5})
    );
}

/// JSON bodies are sent for writes
#[tokio::test]
async fn test_create_sends_json_body() {
    let server = MockServer::start().await;
    let payload = json!({"name": "Acme", "email": "a@acme.test"});
    Mock::given(method("POST"))
        .and(path("/api/tenants"))
        .and(body_json(&payload))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "10", "name": "Acme"})))
        .expect(1)
        .mount(&server)
        .await;

    let data = transport(&server)
        .send(ApiRequest::create(Resource::Tenant, payload))
        .await
        .unwrap();
    assert_eq!(data["id"], "10");
}

/// Non-JSON bodies come back as strings, empty bodies as null
#[tokio::test]
async fn test_text_and_empty_bodies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/analytics"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/users/1/roles/2"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let transport = transport(&server);
    let text = transport
        .send(ApiRequest::new(Resource::Analytics, Method::Get))
        .await
        .unwrap();
    assert_eq!(text, Value::String("ok".into()));

    let empty = transport
        .send(
            ApiRequest::new(Resource::User, Method::Delete)
                .with_id("1")
                .with_nested(Resource::Role, Some("2".into())),
        )
        .await
        .unwrap();
    assert_eq!(empty, Value::Null);
}

/// Plain-text error bodies are used as the message
#[tokio::test]
async fn test_text_error_body() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/orders/3"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database unavailable"))
        .mount(&server)
        .await;

    let error = transport(&server)
        .send(ApiRequest::update(
            Resource::Order,
            "3",
            json!({"status": "shipped"}),
        ))
        .await
        .unwrap_err();
    assert_eq!(
        error,
        ApiError::Http {
            status: 500,
            message: "database unavailable".into(),
        }
    );
}
