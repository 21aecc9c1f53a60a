// Copyright (c) 2025 Harvestrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::test_settings;
use harvestrs::domain::models::scrape_request::{ScrapeModule, ScrapeRequest};
use harvestrs::engines::orchestrator::ScraperService;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SHOP_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Acme Shop</title>
    <meta name="description" content="Quality widgets since 1999.">
    <script type="application/ld+json">
    {
        "@context": "https://schema.org",
        "@type": "Product",
        "name": "Blue Widget",
        "url": "/products/blue-widget",
        "image": "/img/widget-hero.jpg",
        "offers": {"@type": "Offer", "price": "19.99", "priceCurrency": "USD"}
    }
    </script>
</head>
<body>
    <main>
        <h1>Welcome to Acme</h1>
        <p>We build the finest widgets available anywhere on the market.</p>
        <img src="/img/a.jpg" alt="A">
        <img src="/img/b.jpg" alt="B">
        <img src="/img/c.jpg" alt="C">
        <img src="/img/tiny-icon.gif" width="10" height="10">
        <img src="/img/mini.png" width="16" height="16">
        <a href="mailto:hello@acme.test">Contact us</a>
    </main>
</body>
</html>"#;

async fn serve_shop_page() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/shop"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(SHOP_PAGE)
                .insert_header("content-type", "text/html"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn scrape_extracts_products_and_filters_tiny_images() {
    let server = serve_shop_page().await;
    let service = ScraperService::from_settings(&test_settings());

    let request = ScrapeRequest::new(
        format!("{}/shop", server.uri()),
        vec![ScrapeModule::Images, ScrapeModule::Products],
    );
    let result = service.scrape(request).await.unwrap();

    let products = result.products.unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].title, "Blue Widget");
    assert_eq!(products[0].price, "19.99");

    // Five img tags, two below 20x20
    let images = result.images.unwrap();
    assert_eq!(images.len(), 3);
    assert!(images.iter().all(|i| i.url.contains("/img/")));

    // Unrequested modules stay absent
    assert!(result.text.is_none());
    assert!(result.contacts.is_none());
}

#[tokio::test]
async fn scrape_without_browser_still_yields_text_and_contacts() {
    let server = serve_shop_page().await;
    let service = ScraperService::from_settings(&test_settings());

    let request = ScrapeRequest::new(
        format!("{}/shop", server.uri()),
        vec![ScrapeModule::Text, ScrapeModule::Contacts],
    );
    let result = service.scrape(request).await.unwrap();

    let text = result.text.unwrap();
    assert_eq!(text.title, "Acme Shop");
    assert_eq!(text.headings, vec!["Welcome to Acme"]);

    let contacts = result.contacts.unwrap();
    assert_eq!(contacts.emails, vec!["hello@acme.test"]);
}

#[tokio::test]
async fn scrape_honors_declared_crawl_delay() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nCrawl-delay: 1\n"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/shop"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(SHOP_PAGE)
                .insert_header("content-type", "text/html"),
        )
        .mount(&server)
        .await;

    let service = ScraperService::from_settings(&test_settings());
    let request = ScrapeRequest::new(
        format!("{}/shop", server.uri()),
        vec![ScrapeModule::Text],
    );

    let started = std::time::Instant::now();
    let result = service.scrape(request).await.unwrap();
    assert!(result.text.is_some());
    assert!(started.elapsed() >= std::time::Duration::from_secs(1));
}

#[tokio::test]
async fn scrape_missing_page_is_an_error() {
    let server = serve_shop_page().await;
    let service = ScraperService::from_settings(&test_settings());

    let request = ScrapeRequest::new(
        format!("{}/no-such-page", server.uri()),
        vec![ScrapeModule::Text],
    );
    let err = service.scrape(request).await.unwrap_err();
    assert!(matches!(
        err,
        harvestrs::engines::traits::ScrapeError::UpstreamStatus(404)
    ));
}
