mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Router;
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::get;
use transit_watchdog::cache::{self, BundleCache};
use transit_watchdog::checks::{check_liveness, vehicles};
use transit_watchdog::config::{BasicAuth, ConfigSource, ServerConfig};
use transit_watchdog::fetch::BasicClient;
use transit_watchdog::gtfs_static::StaticBundle;
use transit_watchdog::infra::onebusaway::ObaClient;
use transit_watchdog::metrics::WatchdogMetrics;
use transit_watchdog::services::TransitApi;
use transit_watchdog::WatchdogError;

const CONFIG_JSON: &str = r#"[
    {
        "name": "Test Server", "id": 1,
        "oba_base_url": "https://test.example.com",
        "oba_api_key": "test-key",
        "gtfs_url": "https://gtfs.example.com",
        "trip_update_url": "https://trip.example.com",
        "vehicle_position_url": "https://vehicle.example.com",
        "gtfs_rt_api_key": "x-api-key",
        "gtfs_rt_api_value": "secret",
        "agency_id": "40"
    },
    {
        "name": "Second Server", "id": 2,
        "oba_base_url": "https://second.example.com",
        "oba_api_key": "other-key",
        "gtfs_url": "https://gtfs2.example.com",
        "trip_update_url": "",
        "vehicle_position_url": "",
        "gtfs_rt_api_key": "",
        "gtfs_rt_api_value": "",
        "agency_id": "1"
    }
]"#;

/// base64("user:pass")
const BASIC_USER_PASS: &str = "Basic dXNlcjpwYXNz";

fn config_router() -> Router {
    Router::new()
        .route("/config.json", get(|| async { CONFIG_JSON }))
        .route(
            "/private/config.json",
            get(|headers: HeaderMap| async move {
                match headers.get(header::AUTHORIZATION) {
                    Some(v) if v == BASIC_USER_PASS => (StatusCode::OK, CONFIG_JSON),
                    _ => (StatusCode::UNAUTHORIZED, ""),
                }
            }),
        )
        .route(
            "/broken.json",
            get(|| async { "{ this is not valid JSON }" }),
        )
}

fn url_source(url: String, auth: Option<BasicAuth>) -> ConfigSource {
    ConfigSource::Url { url, auth }
}

#[tokio::test]
async fn test_file_and_url_sources_load_identical_servers() {
    let base = common::spawn(config_router()).await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("servers.json");
    std::fs::write(&path, CONFIG_JSON).unwrap();

    let from_file = ConfigSource::File(path).load().await.unwrap();
    let from_url = url_source(format!("{base}/config.json"), None)
        .load()
        .await
        .unwrap();

    assert_eq!(from_file.len(), 2);
    assert_eq!(from_file, from_url);
    assert_eq!(from_file[0].realtime_auth(), Some(("x-api-key", "secret")));
}

#[tokio::test]
async fn test_remote_config_with_basic_auth() {
    let base = common::spawn(config_router()).await;
    let url = format!("{base}/private/config.json");

    let auth = BasicAuth::from_parts(Some("user".into()), Some("pass".into()));
    let servers = url_source(url.clone(), auth).load().await.unwrap();
    assert_eq!(servers.len(), 2);

    let err = url_source(url, None).load().await.unwrap_err();
    assert!(matches!(err, WatchdogError::Config(msg) if msg.contains("401")));
}

#[tokio::test]
async fn test_remote_config_errors_are_config_errors() {
    let base = common::spawn(config_router()).await;

    let not_found = url_source(format!("{base}/missing.json"), None)
        .load()
        .await
        .unwrap_err();
    assert!(matches!(not_found, WatchdogError::Config(_)));

    let broken = url_source(format!("{base}/broken.json"), None)
        .load()
        .await
        .unwrap_err();
    assert!(matches!(broken, WatchdogError::Config(_)));

    let unreachable = url_source("http://127.0.0.1:1/config.json".to_string(), None)
        .load()
        .await
        .unwrap_err();
    assert!(matches!(unreachable, WatchdogError::Config(_)));
}

#[tokio::test]
async fn test_bundle_store_names_and_overwrites() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let router = Router::new()
        .route(
            "/gtfs.zip",
            get(move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move { format!("mock GTFS data {n}") }
            }),
        )
        .route(
            "/gone.zip",
            get(|| async { (StatusCode::NOT_FOUND, "no such bundle") }),
        );
    let base = common::spawn(router).await;
    let url = format!("{base}/gtfs.zip");

    let dir = tempfile::tempdir().unwrap();
    let bundle_cache = BundleCache::new(dir.path());

    let first = bundle_cache.store(&url, 1).await.unwrap();
    assert_eq!(first, dir.path().join(cache::bundle_file_name(1, &url)));
    assert_eq!(std::fs::read_to_string(&first).unwrap(), "mock GTFS data 0");

    // same server and URL collide on the same file
    let second = bundle_cache.store(&url, 1).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(std::fs::read_to_string(&second).unwrap(), "mock GTFS data 1");

    // another server gets its own file
    let other = bundle_cache.store(&url, 2).await.unwrap();
    assert_ne!(other, first);
    assert_eq!(bundle_cache.freshest(2).unwrap(), other);

    let files = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(files, 2);

    // an error response never lands in the cache
    let err = bundle_cache
        .store(&format!("{base}/gone.zip"), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, WatchdogError::Transport(_)));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    assert_eq!(bundle_cache.freshest(1).unwrap(), first);
}

#[tokio::test]
async fn test_store_all_continues_after_failures() {
    let router = Router::new().route(
        "/gtfs.zip",
        get(|| async { common::sample_bundle() }),
    );
    let base = common::spawn(router).await;
    let dir = tempfile::tempdir().unwrap();
    let bundle_cache = BundleCache::new(dir.path());

    let servers = vec![
        ServerConfig {
            id: 1,
            gtfs_url: "http://127.0.0.1:1/unreachable.zip".to_string(),
            ..Default::default()
        },
        ServerConfig {
            id: 2,
            gtfs_url: format!("{base}/gtfs.zip"),
            ..Default::default()
        },
    ];

    assert_eq!(bundle_cache.store_all(&servers).await, 1);
    assert!(matches!(
        bundle_cache.freshest(1),
        Err(WatchdogError::Cache(_))
    ));

    let bundle = StaticBundle::open(&bundle_cache.freshest(2).unwrap()).unwrap();
    assert_eq!(bundle.agency_count(), 2);
}

fn oba_router(readable_time: &'static str, agencies: usize, vehicles: usize) -> Router {
    Router::new()
        .route(
            "/api/where/current-time.json",
            get(move || async move { common::current_time_json(readable_time) }),
        )
        .route(
            "/api/where/agencies-with-coverage.json",
            get(move || async move { common::list_json(agencies) }),
        )
        .route(
            "/api/where/vehicles-for-agency/{file}",
            get(move || async move { common::list_json(vehicles) }),
        )
}

#[tokio::test]
async fn test_oba_client_reads_live_endpoints() {
    let base = common::spawn(oba_router("2025-01-12T12:16:38-08:00", 2, 7)).await;
    let client = ObaClient::new(&base, "test-key");

    let now = client.current_time().await.unwrap();
    assert!(now.is_readable());
    assert_eq!(now.time, Some(1736712998000));
    assert_eq!(client.agencies_with_coverage().await.unwrap(), 2);
    assert_eq!(client.vehicles_for_agency("40").await.unwrap(), 7);
}

#[tokio::test]
async fn test_oba_client_sends_api_key() {
    let router = Router::new().route(
        "/api/where/agencies-with-coverage.json",
        get(|query: axum::extract::RawQuery| async move {
            if query.0.as_deref() == Some("key=test-key") {
                (StatusCode::OK, common::list_json(3))
            } else {
                (StatusCode::UNAUTHORIZED, String::new())
            }
        }),
    );
    let base = common::spawn(router).await;

    let ok = ObaClient::new(&base, "test-key");
    assert_eq!(ok.agencies_with_coverage().await.unwrap(), 3);

    let wrong = ObaClient::new(&base, "nope");
    assert!(matches!(
        wrong.agencies_with_coverage().await,
        Err(WatchdogError::Transport(_))
    ));
}

#[tokio::test]
async fn test_liveness_is_zero_for_empty_readable_time() {
    let base = common::spawn(oba_router("", 0, 0)).await;
    let server = ServerConfig {
        id: 5,
        base_url: base.clone(),
        ..Default::default()
    };
    let metrics = WatchdogMetrics::new().unwrap();

    let api = ObaClient::for_server(&server, &BasicClient::new());
    let alive = check_liveness(&server, &api, &metrics).await;

    assert!(!alive);
    assert_eq!(
        metrics.api_status.with_label_values(&["5", &base]).get(),
        0.0
    );
}

#[tokio::test]
async fn test_liveness_is_zero_for_malformed_and_error_responses() {
    let router = Router::new().route(
        "/api/where/current-time.json",
        get(|| async { "<html>maintenance</html>" }),
    );
    let malformed = common::spawn(router).await;
    let error_status = common::spawn(Router::new()).await;
    let metrics = WatchdogMetrics::new().unwrap();
    let http = BasicClient::new();

    for (id, base) in [(6, malformed), (7, error_status)] {
        let server = ServerConfig {
            id,
            base_url: base.clone(),
            ..Default::default()
        };
        let api = ObaClient::for_server(&server, &http);
        assert!(!check_liveness(&server, &api, &metrics).await);
        assert_eq!(
            metrics
                .api_status
                .with_label_values(&[&id.to_string(), &base])
                .get(),
            0.0
        );
    }
}

#[tokio::test]
async fn test_realtime_feed_sends_custom_auth_header() {
    let router = Router::new().route(
        "/vehicles.pb",
        get(|headers: HeaderMap| async move {
            match headers.get("x-api-key") {
                Some(v) if v == "secret" => (StatusCode::OK, common::vehicle_feed(4)),
                _ => (StatusCode::FORBIDDEN, Vec::new()),
            }
        }),
    );
    let base = common::spawn(router).await;

    let mut server = ServerConfig {
        id: 1,
        vehicle_position_url: format!("{base}/vehicles.pb"),
        realtime_auth_header: "x-api-key".to_string(),
        realtime_auth_value: "secret".to_string(),
        ..Default::default()
    };
    let http = BasicClient::new();
    assert_eq!(
        vehicles::count_realtime_vehicles(&server, &http)
            .await
            .unwrap(),
        4
    );

    server.realtime_auth_value.clear();
    assert!(matches!(
        vehicles::count_realtime_vehicles(&server, &http).await,
        Err(WatchdogError::Transport(_))
    ));
}

#[tokio::test]
async fn test_realtime_feed_garbage_is_parse_error() {
    let router = Router::new().route(
        "/vehicles.pb",
        get(|| async { vec![0xFFu8, 0xFE, 0x00, 0x01] }),
    );
    let base = common::spawn(router).await;
    let server = ServerConfig {
        vehicle_position_url: format!("{base}/vehicles.pb"),
        ..Default::default()
    };

    assert!(matches!(
        vehicles::count_realtime_vehicles(&server, &BasicClient::new()).await,
        Err(WatchdogError::Parse(_))
    ));
}
