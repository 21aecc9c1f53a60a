// Copyright (c) 2025 Harvestrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::test_settings;
use harvestrs::domain::models::scrape_request::{ScrapeModule, ScrapeRequest};
use harvestrs::engines::orchestrator::ScraperService;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn empty_crawl_backfills_from_sitemap_same_host_only() {
    let server = MockServer::start().await;
    let base = server.uri();

    // Page with no anchors at all
    Mock::given(method("GET"))
        .and(path("/lonely"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><p>No links here at all today.</p></body></html>"),
        )
        .mount(&server)
        .await;

    let sitemap = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
    <url><loc>{base}/products/a</loc></url>
    <url><loc>{base}/products/b</loc></url>
    <url><loc>https://elsewhere.example.com/stolen</loc></url>
</urlset>"#
    );
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(sitemap)
                .insert_header("content-type", "application/xml"),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let service = ScraperService::from_settings(&test_settings());
    let request = ScrapeRequest::new(format!("{base}/lonely"), vec![ScrapeModule::Crawl]);
    let result = service.scrape(request).await.unwrap();

    let crawl = result.crawl.unwrap();
    assert_eq!(
        crawl,
        vec![format!("{base}/products/a"), format!("{base}/products/b")]
    );
}

#[tokio::test]
async fn live_dom_links_win_over_sitemap() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/hub"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><a href="/a">A</a><a href="/b">B</a></body></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<urlset><url><loc>https://never.example.com/x</loc></url></urlset>"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let service = ScraperService::from_settings(&test_settings());
    let request = ScrapeRequest::new(format!("{base}/hub"), vec![ScrapeModule::Crawl]);
    let result = service.scrape(request).await.unwrap();

    let crawl = result.crawl.unwrap();
    assert_eq!(crawl, vec![format!("{base}/a"), format!("{base}/b")]);

    // Sitemap never consulted when the DOM produced links
    let sitemap_hits = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/sitemap.xml")
        .count();
    assert_eq!(sitemap_hits, 0);
}
