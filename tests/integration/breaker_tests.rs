// Copyright (c) 2025 Harvestrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::test_settings;
use harvestrs::domain::models::scrape_request::{ScrapeModule, ScrapeRequest};
use harvestrs::engines::orchestrator::ScraperService;
use harvestrs::engines::traits::ScrapeError;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn breaker_opens_after_four_failures_and_rejects_without_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let service = ScraperService::from_settings(&test_settings());
    let url = format!("{}/page", server.uri());

    for _ in 0..4 {
        let err = service
            .scrape(ScrapeRequest::new(url.clone(), vec![ScrapeModule::Text]))
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::UpstreamStatus(500)));
    }

    let err = service
        .scrape(ScrapeRequest::new(url.clone(), vec![ScrapeModule::Text]))
        .await
        .unwrap_err();
    match err {
        ScrapeError::CircuitOpen { host, retry_after_ms } => {
            assert!(host.starts_with("127.0.0.1"));
            assert!(retry_after_ms > 0);
            assert!(retry_after_ms <= 120_000);
        }
        other => panic!("expected CircuitOpen, got {other}"),
    }

    // The rejected request never reached the upstream page
    let page_hits = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/page")
        .count();
    assert_eq!(page_hits, 4);
}

#[tokio::test]
async fn failures_below_threshold_keep_the_circuit_closed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<html><title>Back</title></html>"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let service = ScraperService::from_settings(&test_settings());
    let url = format!("{}/flaky", server.uri());

    for _ in 0..3 {
        let err = service
            .scrape(ScrapeRequest::new(url.clone(), vec![ScrapeModule::Text]))
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::UpstreamStatus(502)));
    }

    // Fourth request succeeds, which also resets the failure count
    let result = service
        .scrape(ScrapeRequest::new(url.clone(), vec![ScrapeModule::Text]))
        .await
        .unwrap();
    assert_eq!(result.text.unwrap().title, "Back");
}
