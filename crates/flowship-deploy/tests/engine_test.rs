// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HttpEngineClient against a mock engine.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use flowship_deploy::engine::{EngineConfig, EngineError, HttpEngineClient, ProcessEngineClient};

const REVIEW: &str = include_str!("../../flowship-bpmn/tests/fixtures/review.bpmn");

fn client(server: &MockServer, token: Option<&str>) -> HttpEngineClient {
    HttpEngineClient::new(&EngineConfig {
        url: format!("{}/", server.uri()),
        token: token.map(str::to_string),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

#[tokio::test]
async fn test_deploy_definition_uploads_resource() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/deployments"))
        .and(header("authorization", "Bearer engine-token"))
        .and(body_string_contains("document-review.bpmn"))
        .and(body_string_contains("Document Review"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "deploymentKey": 2251799813685249u64,
            "deployments": [],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let key = client(&server, Some("engine-token"))
        .deploy_definition(REVIEW.as_bytes(), "document-review.bpmn")
        .await
        .unwrap();
    assert_eq!(key, "2251799813685249");
}

#[tokio::test]
async fn test_rejection_carries_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/deployments"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Expected to deploy a valid BPMN"))
        .mount(&server)
        .await;

    let err = client(&server, None)
        .deploy_definition(b"<broken", "x.bpmn")
        .await
        .unwrap_err();
    match err {
        EngineError::Rejected { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("valid BPMN"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_key_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/process-instances"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let err = client(&server, None)
        .create_instance("document-review", json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_instance_lifecycle_and_messages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/process-instances"))
        .and(body_partial_json(json!({
            "processDefinitionId": "document-review",
            "variables": { "documentId": "D-7" },
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "processInstanceKey": "2251799813690001",
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2/process-instances/2251799813690001/cancellation"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2/messages/publication"))
        .and(body_partial_json(json!({
            "name": "document-updated",
            "correlationKey": "D-7",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "messageKey": 1 })))
        .expect(1)
        .mount(&server)
        .await;

    let engine = client(&server, None);
    let key = engine
        .create_instance("document-review", json!({ "documentId": "D-7" }))
        .await
        .unwrap();
    assert_eq!(key, "2251799813690001");

    engine.cancel_instance(&key).await.unwrap();
    engine
        .publish_message("document-updated", "D-7", json!({ "revision": 2 }))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_unreachable_engine_is_http_error() {
    let engine = HttpEngineClient::new(&EngineConfig {
        url: "http://127.0.0.1:1".to_string(),
        token: None,
        timeout: Duration::from_secs(2),
    })
    .unwrap();

    let err = engine.cancel_instance("1").await.unwrap_err();
    assert!(matches!(err, EngineError::Http(_)));
}
