//! End-to-end flow through the public API: search, add, refresh, remove,
//! against a mock weather endpoint and an on-disk store.

use citywatch_core::{
    AddOutcome, CityId, Config, FileStore, PersistentWatchlistStore, RefreshOutcome,
    SearchOutcome, WatchlistController, gateway_from_config,
};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn weather_body(id: u64, name: &str, temp: f64) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "sys": {"country": "FR"},
        "weather": [{"description": "couvert", "icon": "04d"}],
        "main": {"temp": temp, "feels_like": temp - 2.0, "temp_min": temp - 1.5, "temp_max": temp + 1.5}
    })
}

async fn mount(server: &MockServer, id: u64, name: &str, temp: f64) {
    Mock::given(method("GET"))
        .and(path(format!("/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(weather_body(id, name, temp)))
        .mount(server)
        .await;
}

fn open(server: &MockServer, data_dir: &std::path::Path) -> WatchlistController {
    let config = Config {
        feed_root: server.uri(),
        data_dir: Some(data_dir.to_path_buf()),
        ..Config::default()
    };
    let gateway = gateway_from_config(&config).expect("gateway must build");
    let store = PersistentWatchlistStore::new(Arc::new(FileStore::new(data_dir)));
    WatchlistController::open(Arc::new(gateway), store).expect("watchlist must load")
}

#[tokio::test]
async fn search_add_refresh_remove() {
    let mock_server = MockServer::start().await;
    mount(&mock_server, 2980291, "Saint-Étienne", 7.8).await;
    let data = tempfile::tempdir().unwrap();

    let controller = open(&mock_server, data.path());

    let outcome = controller.begin_search("saint etienne").await.unwrap();
    let SearchOutcome::Matches(candidates) = outcome else { panic!("expected matches") };
    let city = candidates.iter().find(|c| c.name == "Saint-Étienne").unwrap().clone();

    let AddOutcome::Added(entry) = controller.add(&city).await.unwrap() else {
        panic!("expected a new entry")
    };
    assert_eq!(entry.current_temp_c, 7);
    assert_eq!(entry.min_temp_c, 6);
    assert_eq!(controller.pending_query(), None);

    // A second process sees the same data.
    let reopened = open(&mock_server, data.path());
    assert_eq!(reopened.entries(), vec![entry.clone()]);

    let refreshed = reopened.refresh(CityId(2980291)).await.unwrap();
    assert!(matches!(refreshed, RefreshOutcome::Updated(_)));

    assert!(reopened.remove(CityId(2980291)).await.unwrap());
    assert!(open(&mock_server, data.path()).is_empty());
}

#[tokio::test]
async fn upstream_failure_is_reported_without_persisting() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;
    let data = tempfile::tempdir().unwrap();

    let controller = open(&mock_server, data.path());
    let outcome = controller.begin_search("lyon").await.unwrap();
    let city = outcome.matches()[0].clone();

    let err = controller.add(&city).await.unwrap_err();
    assert!(err.to_string().contains("500"));
    assert!(!data.path().join("cities.json").exists());
}

#[tokio::test]
async fn corrupt_file_is_recoverable() {
    let mock_server = MockServer::start().await;
    mount(&mock_server, 2996944, "Lyon", 15.0).await;
    let data = tempfile::tempdir().unwrap();
    std::fs::write(data.path().join("cities.json"), "[{").unwrap();

    let config = Config { feed_root: mock_server.uri(), ..Config::default() };
    let gateway = Arc::new(gateway_from_config(&config).unwrap());
    let store = PersistentWatchlistStore::new(Arc::new(FileStore::new(data.path())));

    let (controller, problem) = WatchlistController::open_recovering(gateway, store).unwrap();
    assert!(problem.unwrap().is_storage_corruption());

    let outcome = controller.begin_search("lyon").await.unwrap();
    controller.add(&outcome.matches()[0]).await.unwrap();

    let reopened = open(&mock_server, data.path());
    assert_eq!(reopened.len(), 1);
}
