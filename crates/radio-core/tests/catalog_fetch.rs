//! Fetcher tests against an in-process directory server.
//!
//! Each test binds an axum router to an ephemeral loopback port and points a
//! `CatalogFetcher` at it, so no external network is needed.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{http::StatusCode, routing::get, Router};
use radio_core::catalog::{CatalogError, CatalogFetcher, CatalogSource};
use radio_core::refresh::{catalog_channel, spawn_refresh_task};

const TWO_STATIONS: &str = r#"{"data":[
    {"server_name":"Lounge","title":"Jazz FM","http_server_url":"http://radio.test/jazz"},
    {"server_name":"Heavy","title":"Rock FM","http_server_url":"http://radio.test/rock"}
]}"#;

async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn fetcher_for(addr: SocketAddr, path: &str) -> CatalogFetcher {
    CatalogFetcher::new(format!("http://{addr}{path}"), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn fetch_returns_stations_in_directory_order() {
    let addr = serve(Router::new().route("/v1/api/genre/all", get(|| async { TWO_STATIONS }))).await;
    let fetcher = fetcher_for(addr, "/v1/api/genre/all");

    let catalog = fetcher.try_fetch().await.unwrap();
    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog[0].display_name, "Lounge");
    assert_eq!(catalog[0].title, "Jazz FM");
    assert_eq!(catalog[1].stream_url, "http://radio.test/rock");
}

#[tokio::test]
async fn server_error_degrades_to_empty() {
    let addr = serve(Router::new().route(
        "/all",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    ))
    .await;
    let fetcher = fetcher_for(addr, "/all");

    let err = fetcher.try_fetch().await.unwrap_err();
    assert!(matches!(err, CatalogError::Status(s) if s == StatusCode::INTERNAL_SERVER_ERROR));
    assert!(!err.is_connect());
    assert!(fetcher.fetch().await.is_empty());
}

#[tokio::test]
async fn malformed_body_degrades_to_empty() {
    let addr = serve(Router::new().route("/all", get(|| async { "{\"data\": [ oops" }))).await;
    let fetcher = fetcher_for(addr, "/all");

    assert!(matches!(
        fetcher.try_fetch().await.unwrap_err(),
        CatalogError::Decode(_)
    ));
    assert!(fetcher.fetch().await.is_empty());
}

#[tokio::test]
async fn slow_directory_times_out_to_empty() {
    let addr = serve(Router::new().route(
        "/all",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            TWO_STATIONS
        }),
    ))
    .await;
    let fetcher = CatalogFetcher::new(format!("http://{addr}/all"), Duration::from_millis(200)).unwrap();

    let err = fetcher.try_fetch().await.unwrap_err();
    assert!(!err.is_connect());
    assert!(fetcher.fetch().await.is_empty());
}

#[tokio::test]
async fn fetcher_drives_refresh_task() {
    let addr = serve(Router::new().route("/all", get(|| async { TWO_STATIONS }))).await;
    let fetcher = fetcher_for(addr, "/all");
    assert_eq!(CatalogSource::fetch(&fetcher).await.len(), 2);

    let (tx, reader) = catalog_channel(radio_core::catalog::empty_catalog());
    let handle = spawn_refresh_task(fetcher, Duration::from_millis(50), tx);

    let mut filled = false;
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        if reader.snapshot().len() == 2 {
            filled = true;
            break;
        }
    }
    handle.abort();
    assert!(filled, "refresh task never published the served catalog");
}
