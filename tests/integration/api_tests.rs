// Copyright (c) 2025 Harvestrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::test_settings;
use axum_test::TestServer;
use harvestrs::engines::orchestrator::ScraperService;
use harvestrs::presentation::routes;
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_server() -> TestServer {
    let service = Arc::new(ScraperService::from_settings(&test_settings()));
    let metrics = PrometheusBuilder::new().build_recorder().handle();
    let app = routes::build_router(service, metrics);
    TestServer::new(app).unwrap()
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let server = test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.json::<serde_json::Value>()["status"], "ok");
}

#[tokio::test]
async fn scrape_with_no_modules_is_a_bad_request() {
    let server = test_server();
    let response = server
        .post("/scrape")
        .json(&json!({
            "url": "https://example.com",
            "modules": []
        }))
        .await;
    response.assert_status_bad_request();
    let body = response.json::<serde_json::Value>();
    assert_eq!(body["kind"], "invalid_request");
}

#[tokio::test]
async fn scrape_endpoint_returns_sparse_result() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><head><title>Hello</title></head><body><main>\
             <p>A paragraph long enough to be kept by the extractor.</p>\
             </main></body></html>",
        ))
        .mount(&upstream)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&upstream)
        .await;

    let server = test_server();
    let response = server
        .post("/scrape")
        .json(&json!({
            "url": format!("{}/page", upstream.uri()),
            "modules": ["text"]
        }))
        .await;
    response.assert_status_ok();

    let body = response.json::<serde_json::Value>();
    assert_eq!(body["text"]["title"], "Hello");
    // Sparse result: unrequested modules are absent, not null
    assert!(body.get("images").is_none());
    assert!(body.get("products").is_none());
}

#[tokio::test]
async fn unreachable_upstream_maps_to_bad_gateway() {
    let server = test_server();
    let response = server
        .post("/scrape")
        .json(&json!({
            // Reserved TEST-NET address, nothing listens there
            "url": "http://192.0.2.1:9/page",
            "modules": ["text"]
        }))
        .await;
    response.assert_status(axum::http::StatusCode::BAD_GATEWAY);
    let body = response.json::<serde_json::Value>();
    assert_eq!(body["kind"], "fetch_failed");
}
