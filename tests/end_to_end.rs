//! End-to-end tests over a real listener.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use static_export_server::lifecycle::startup;
use static_export_server::lifecycle::Shutdown;
use static_export_server::{HttpServer, ResolvePolicy};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

mod common;

use common::{config_for, site_dir, EXAMPLE_SITE};

async fn spawn_server(
    root: &std::path::Path,
    policy: ResolvePolicy,
    shutdown: &Shutdown,
) -> (SocketAddr, JoinHandle<std::io::Result<()>>) {
    let config = config_for(root, policy);
    let resolver = startup::build_resolver(&config.site).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config, Arc::new(resolver));
    let rx = shutdown.subscribe();
    let handle = tokio::spawn(async move { server.run(listener, rx).await });
    (addr, handle)
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_serves_example_site() {
    let site = site_dir(EXAMPLE_SITE);
    let shutdown = Shutdown::new();
    let (addr, handle) = spawn_server(site.path(), ResolvePolicy::Directory, &shutdown).await;
    let client = client();

    let res = client.get(format!("http://{addr}/abc/abc/page")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers()["content-type"].to_str().unwrap(),
        "text/html; charset=utf-8"
    );
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.text().await.unwrap(), "[arg1]/[arg2]/page.html");

    let res = client.get(format!("http://{addr}/nowhere/at/all")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "index.html");

    shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap();
    assert!(result.unwrap().is_ok());
}

#[tokio::test]
async fn test_canonical_redirect_and_not_found_page() {
    let mut files = EXAMPLE_SITE.to_vec();
    files.push(("404.html", "404.html"));
    let site = site_dir(&files);
    let shutdown = Shutdown::new();
    let (addr, handle) = spawn_server(site.path(), ResolvePolicy::Canonical, &shutdown).await;
    let client = client();

    let res = client.get(format!("http://{addr}/abc/page.html")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::PERMANENT_REDIRECT);
    assert_eq!(res.headers()["location"], "/abc/page");

    let res = client.get(format!("http://{addr}/abc/page")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "[arg1]/page.html");

    let res = client.get(format!("http://{addr}/a/b/c/d")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.text().await.unwrap(), "404.html");

    shutdown.trigger();
    let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
}

#[tokio::test]
async fn test_startup_run_binds_and_stops() {
    let site = site_dir(EXAMPLE_SITE);
    let config = config_for(site.path(), ResolvePolicy::Directory);
    let shutdown = Shutdown::new();

    let task = tokio::spawn(startup::run(config, shutdown.clone()));
    // the server subscribes only once its listener is bound
    while shutdown.trigger() == 0 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let result = tokio::time::timeout(Duration::from_secs(5), task).await.unwrap();
    assert!(result.unwrap().is_ok());
}

#[tokio::test]
async fn test_startup_fails_for_missing_root() {
    let site = site_dir(&[]);
    let config = config_for(&site.path().join("missing"), ResolvePolicy::Directory);

    let err = startup::run(config, Shutdown::new()).await.unwrap_err();
    assert!(err.to_string().contains("cannot open site root"));
}

fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

#[tokio::test]
async fn test_route_gauge_is_exported() {
    let site = site_dir(EXAMPLE_SITE);
    let mut config = config_for(site.path(), ResolvePolicy::Directory);
    let metrics_url = format!("http://127.0.0.1:{}/metrics", free_port());
    config.observability.metrics_enabled = true;
    config.observability.metrics_address = metrics_url
        .trim_start_matches("http://")
        .trim_end_matches("/metrics")
        .to_string();

    let shutdown = Shutdown::new();
    let task = tokio::spawn(startup::run(config, shutdown.clone()));

    let client = client();
    let mut scraped = String::new();
    for _ in 0..100 {
        if let Ok(res) = client.get(&metrics_url).send().await {
            scraped = res.text().await.unwrap_or_default();
            if scraped.contains("site_routes") {
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    while shutdown.trigger() == 0 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let result = tokio::time::timeout(Duration::from_secs(5), task).await.unwrap();
    assert!(result.unwrap().is_ok());

    // five page files in the example export
    let value = scraped
        .lines()
        .find_map(|line| line.strip_prefix("site_routes "))
        .and_then(|v| v.trim().parse::<f64>().ok());
    assert_eq!(value, Some(5.0), "scrape was: {scraped}");
}
