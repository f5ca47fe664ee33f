//! HTTP catalog client against the fake catalog server.

use std::time::Duration;

use popcorn_search::{CatalogError, CatalogProvider, OmdbCatalog, ResultItem};

use crate::fake_catalog::{API_KEY, BROKEN_TERM, FakeCatalog};

#[tokio::test]
async fn test_search_sends_key_and_term() {
    let server = FakeCatalog::start().await;
    let catalog = OmdbCatalog::new(&server.config()).unwrap();

    let results = catalog.search("inception").await.unwrap();
    assert_eq!(
        results,
        vec![ResultItem {
            id: "tt1375666".to_string(),
            title: "Inception".to_string(),
            year: "2010".to_string(),
            poster_url: "url".to_string(),
        }]
    );

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].get("apikey").map(String::as_str), Some(API_KEY));
    assert_eq!(requests[0].get("s").map(String::as_str), Some("inception"));
}

#[tokio::test]
async fn test_search_term_is_url_encoded() {
    let server = FakeCatalog::start().await;
    let catalog = OmdbCatalog::new(&server.config()).unwrap();

    let results = catalog.search("the matrix").await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(server.searched_terms(), vec!["the matrix"]);
}

#[tokio::test]
async fn test_search_miss_reports_catalog_message() {
    let server = FakeCatalog::start().await;
    let catalog = OmdbCatalog::new(&server.config()).unwrap();

    let error = catalog.search("zzzzzzz").await.unwrap_err();
    assert!(error.is_not_found());
    assert_eq!(error.to_string(), "Movie not found!");
}

#[tokio::test]
async fn test_server_error_is_status_failure() {
    let server = FakeCatalog::start().await;
    let catalog = OmdbCatalog::new(&server.config()).unwrap();

    let error = catalog.search(BROKEN_TERM).await.unwrap_err();
    assert_eq!(error, CatalogError::Status { status: 500 });
    assert_eq!(
        error.to_string(),
        "Something went wrong with fetching movies: HTTP 500"
    );
}

#[tokio::test]
async fn test_missing_api_key_is_rejected() {
    let server = FakeCatalog::start().await;
    let mut config = server.config();
    config.api_key = None;
    let catalog = OmdbCatalog::new(&config).unwrap();

    let error = catalog.search("inception").await.unwrap_err();
    assert_eq!(error, CatalogError::Status { status: 401 });
    assert!(!server.requests()[0].contains_key("apikey"));
}

#[tokio::test]
async fn test_slow_catalog_times_out() {
    let server = FakeCatalog::start().await;
    server.delay("inception", Duration::from_secs(5));
    let mut config = server.config();
    config.request_timeout = Duration::from_millis(200);
    let catalog = OmdbCatalog::new(&config).unwrap();

    let error = catalog.search("inception").await.unwrap_err();
    assert_eq!(
        error,
        CatalogError::Transport {
            reason: "request timed out".to_string()
        }
    );
}

#[tokio::test]
async fn test_details_maps_record() {
    let server = FakeCatalog::start().await;
    let catalog = OmdbCatalog::new(&server.config()).unwrap();

    let details = catalog.details("tt0234215").await.unwrap();
    assert_eq!(details.title, "The Matrix Reloaded");
    assert_eq!(details.runtime_minutes(), Some(138));
    assert_eq!(details.imdb_rating_value(), None);
    assert_eq!(details.director, None);
    assert_eq!(details.poster_url.as_deref(), Some("url"));

    let requests = server.requests();
    assert_eq!(requests[0].get("i").map(String::as_str), Some("tt0234215"));
}

#[tokio::test]
async fn test_unknown_id_reports_catalog_message() {
    let server = FakeCatalog::start().await;
    let catalog = OmdbCatalog::new(&server.config()).unwrap();

    let error = catalog.details("tt0000000").await.unwrap_err();
    assert_eq!(error.to_string(), "Incorrect IMDb ID.");
}
