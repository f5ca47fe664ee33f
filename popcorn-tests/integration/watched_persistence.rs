//! Watched list persisted through the JSON file store.

use std::sync::Arc;

use popcorn_core::{JsonFileStore, KeyValueStore, PopcornConfig, RatingDraft, WatchedList};
use popcorn_search::{CatalogProvider, DevelopmentCatalog};
use tempfile::TempDir;

fn file_store(dir: &TempDir) -> Arc<dyn KeyValueStore> {
    Arc::new(JsonFileStore::new(dir.path()))
}

async fn rated(imdb_id: &str, stars: u8) -> popcorn_core::WatchedMovie {
    let details = DevelopmentCatalog::new().details(imdb_id).await.unwrap();
    let mut draft = RatingDraft::new();
    draft.set_rating(stars).unwrap();
    details.to_watched(&draft).unwrap()
}

#[tokio::test]
async fn test_watched_list_survives_restart() {
    let dir = TempDir::new().unwrap();

    let mut watched = WatchedList::load(file_store(&dir), "watched").await;
    assert!(watched.is_empty());
    watched.add(rated("tt1375666", 9).await).await.unwrap();
    watched.add(rated("tt0133093", 7).await).await.unwrap();
    drop(watched);

    let reloaded = WatchedList::load(file_store(&dir), "watched").await;
    assert_eq!(reloaded.len(), 2);
    assert_eq!(reloaded.find("tt0133093").unwrap().user_rating, 7);

    let summary = reloaded.summary();
    assert_eq!(summary.count, 2);
    assert!((summary.avg_user_rating - 8.0).abs() < f64::EPSILON);
    assert!((summary.avg_imdb_rating - 8.75).abs() < 1e-9);
    assert!((summary.avg_runtime - 142.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_stored_document_uses_watched_field_names() {
    let dir = TempDir::new().unwrap();
    let mut watched = WatchedList::load(file_store(&dir), "watched").await;
    watched.add(rated("tt6751668", 10).await).await.unwrap();

    let raw = std::fs::read_to_string(dir.path().join("watched.json")).unwrap();
    let document: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let entry = &document[0];

    assert_eq!(entry["imdbID"], "tt6751668");
    assert_eq!(entry["userRating"], 10);
    assert_eq!(entry["countRatingDecision"], 1);
    assert_eq!(entry["runtime"], 132);
    assert_eq!(entry["imdbRating"], 8.5);
}

#[tokio::test]
async fn test_existing_document_is_loaded() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("watched.json"),
        r#"[{"imdbID":"tt0088763","title":"Back to the Future","year":"1985","poster":"url","imdbRating":8.5,"runtime":116,"userRating":8,"countRatingDecision":3}]"#,
    )
    .unwrap();

    let mut watched = WatchedList::load(file_store(&dir), "watched").await;
    let entry = watched.find("tt0088763").unwrap();
    assert_eq!(entry.rating_decisions, 3);
    assert!(entry.added_at.is_none());

    assert!(watched.remove("tt0088763").await.unwrap());
    let raw = std::fs::read_to_string(dir.path().join("watched.json")).unwrap();
    assert_eq!(raw, "[]");
}

#[tokio::test]
async fn test_corrupt_document_starts_empty() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("watched.json"), "{not json").unwrap();

    let mut watched = WatchedList::load(file_store(&dir), "watched").await;
    assert!(watched.is_empty());

    watched.add(rated("tt0816692", 8).await).await.unwrap();
    let reloaded = WatchedList::load(file_store(&dir), "watched").await;
    assert_eq!(reloaded.len(), 1);
}

#[test]
fn test_config_points_at_watched_document() {
    let dir = TempDir::new().unwrap();
    let mut config = PopcornConfig::for_testing();
    config.storage.data_dir = dir.path().to_path_buf();

    assert_eq!(config.watched_path(), dir.path().join("watched.json"));
}
