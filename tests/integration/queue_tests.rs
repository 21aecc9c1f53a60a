// Copyright (c) 2025 Harvestrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::test_settings;
use harvestrs::domain::models::scrape_request::{ScrapeModule, ScrapeRequest};
use harvestrs::engines::orchestrator::ScraperService;
use harvestrs::engines::traits::ScrapeError;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn saturated_queue_rejects_once_wait_budget_expires() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><title>Slow</title></html>")
                .set_delay(Duration::from_millis(800)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut settings = test_settings();
    settings.scraper.max_concurrent = 1;
    settings.scraper.queue_wait_secs = 0;
    let service = Arc::new(ScraperService::from_settings(&settings));
    let url = format!("{}/slow", server.uri());

    let blocker = {
        let service = service.clone();
        let url = url.clone();
        tokio::spawn(async move {
            service
                .scrape(ScrapeRequest::new(url, vec![ScrapeModule::Text]))
                .await
        })
    };
    // Let the first request claim the only slot
    tokio::time::sleep(Duration::from_millis(200)).await;

    let err = service
        .scrape(ScrapeRequest::new(url.clone(), vec![ScrapeModule::Text]))
        .await
        .unwrap_err();
    assert!(matches!(err, ScrapeError::QueueTimeout { .. }));

    let first = blocker.await.unwrap().unwrap();
    assert_eq!(first.text.unwrap().title, "Slow");
}

#[tokio::test]
async fn queued_requests_run_when_capacity_frees_up() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><title>Ok</title></html>")
                .set_delay(Duration::from_millis(100)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut settings = test_settings();
    settings.scraper.max_concurrent = 1;
    settings.scraper.queue_wait_secs = 5;
    let service = Arc::new(ScraperService::from_settings(&settings));
    let url = format!("{}/page", server.uri());

    let mut handles = Vec::new();
    for _ in 0..3 {
        let service = service.clone();
        let url = url.clone();
        handles.push(tokio::spawn(async move {
            service
                .scrape(ScrapeRequest::new(url, vec![ScrapeModule::Text]))
                .await
        }));
    }

    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.text.unwrap().title, "Ok");
    }
}
