mod helpers;

use chrono::{TimeZone, Utc};
use helpers::site;
use pingback::{
    entities::{ContentItem, ContentStatus},
    fetcher::HttpFetcher,
    pingback::{DirectoryPinger, EndpointDiscoverer, ExternalUrlsPinger},
    xmlrpc::{Value, fault_xml, response_xml},
};
use std::{collections::BTreeMap, sync::Arc};
use url::Url;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_string_contains, method, path},
};

fn item(body_html: String) -> ContentItem {
    ContentItem {
        id: 1,
        title: "My nodetype".into(),
        slug: "my-nodetype".into(),
        body_html,
        status: ContentStatus::Published,
        pingback_enabled: true,
        categories: vec!["Gstudio".into(), "Test".into()],
        creation_date: Utc.with_ymd_and_hms(2010, 1, 1, 0, 0, 0).unwrap(),
    }
}

async fn remote_blog() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/linked/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "text/html")
                .set_body_string(r#"<html><head><link rel="pingback" href="/xmlrpc/"></head></html>"#),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/header/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "text/html")
                .insert_header("X-Pingback", "/header-rpc/"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/quiet/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "text/html")
                .set_body_string("<p>no endpoint</p>"),
        )
        .mount(&server)
        .await;
    server
}

fn url(server: &MockServer, route: &str) -> Url {
    Url::parse(&format!("{}{route}", server.uri())).unwrap()
}

#[tokio::test]
async fn discovers_endpoints_from_headers_and_markup() {
    let server = remote_blog().await;
    let discoverer = EndpointDiscoverer::new(Arc::new(HttpFetcher::shared()));

    assert_eq!(
        discoverer.discover(&url(&server, "/linked/")).await,
        Some(url(&server, "/xmlrpc/"))
    );
    assert_eq!(
        discoverer.advertised(&url(&server, "/header/")).await.as_deref(),
        Some("/header-rpc/")
    );
    assert_eq!(discoverer.discover(&url(&server, "/quiet/")).await, None);
    assert_eq!(discoverer.discover(&url(&server, "/gone/")).await, None);
}

#[tokio::test]
async fn pings_every_discovered_endpoint_over_http() {
    let server = remote_blog().await;
    Mock::given(method("POST"))
        .and(path("/xmlrpc/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "text/xml")
                .set_body_string(response_xml(&Value::from("Pingback registered."))),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/header-rpc/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "text/xml")
                .set_body_string(fault_xml(0, "nope")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = Arc::new(HttpFetcher::shared());
    let pinger = ExternalUrlsPinger::new(site(), fetcher.clone(), fetcher);
    let body = ["/linked/", "/header/", "/quiet/"]
        .iter()
        .map(|route| format!(r#"<a href="{}">link</a>"#, url(&server, route)))
        .collect::<String>();

    let outcomes = pinger.ping_item(&item(body)).await;
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].target, url(&server, "/linked/"));
    assert_eq!(outcomes[0].message, "Pingback registered.");
    assert!(!outcomes[0].is_error);
    assert_eq!(
        outcomes[1].message,
        format!("{} cannot be pinged.", url(&server, "/header/"))
    );
    assert!(outcomes[1].is_error);
}

#[tokio::test]
async fn directory_ping_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rpc"))
        .and(body_string_contains("weblogUpdates.extendedPing"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "text/xml")
                .set_body_string(response_xml(&Value::Struct(BTreeMap::from([
                    ("flerror".to_string(), Value::Bool(false)),
                    ("message".to_string(), Value::from("Thanks for the ping.")),
                ])))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let pinger = DirectoryPinger::new(
        format!("{}/rpc", server.uri()),
        site(),
        Arc::new(HttpFetcher::shared()),
    );
    let result = pinger.ping_item(&item(String::new())).await;
    assert_eq!(result.message, "Thanks for the ping.");
    assert!(!result.flerror);

    let offline = DirectoryPinger::new(
        "http://127.0.0.1:9/rpc",
        site(),
        Arc::new(HttpFetcher::shared()),
    );
    let result = offline.ping_item(&item(String::new())).await;
    assert_eq!(result.message, "http://127.0.0.1:9/rpc is an invalid directory.");
    assert!(result.flerror);
}
