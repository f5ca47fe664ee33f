//! Controllers driving the real HTTP catalog.

use std::sync::Arc;
use std::time::Duration;

use popcorn_core::config::SearchConfig;
use popcorn_core::{MemoryStore, RatingDraft, WatchedList};
use popcorn_search::{
    CatalogProvider, ControllerState, DetailController, FetchState, OmdbCatalog, QueryController,
};
use tokio::sync::watch;

use crate::fake_catalog::{BROKEN_TERM, FakeCatalog};

async fn setup() -> (FakeCatalog, QueryController) {
    let server = FakeCatalog::start().await;
    let catalog: Arc<dyn CatalogProvider> = Arc::new(OmdbCatalog::new(&server.config()).unwrap());
    let controller = QueryController::new(catalog, &SearchConfig::default());
    (server, controller)
}

async fn settled(rx: &mut watch::Receiver<ControllerState>) -> ControllerState {
    rx.wait_for(|state| !state.is_loading())
        .await
        .unwrap()
        .clone()
}

#[tokio::test]
async fn test_short_term_never_reaches_catalog() {
    let (server, mut controller) = setup().await;

    controller.set_search_term("in");
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(controller.state(), FetchState::Idle);
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn test_search_reaches_ready() {
    let (server, mut controller) = setup().await;
    let mut rx = controller.subscribe();

    controller.set_search_term("in");
    controller.set_search_term("inception");
    assert!(controller.state().is_loading());

    let state = settled(&mut rx).await;
    assert_eq!(state.results().len(), 1);
    assert_eq!(state.results()[0].id, "tt1375666");
    assert_eq!(state.results()[0].poster_url, "url");
    assert_eq!(server.searched_terms(), vec!["inception"]);
}

#[tokio::test]
async fn test_not_found_becomes_failed() {
    let (_server, mut controller) = setup().await;
    let mut rx = controller.subscribe();

    controller.set_search_term("zzzzzzz");
    let state = settled(&mut rx).await;

    assert_eq!(
        state,
        FetchState::Failed {
            message: "Movie not found!".to_string()
        }
    );
}

#[tokio::test]
async fn test_server_error_becomes_failed() {
    let (_server, mut controller) = setup().await;
    let mut rx = controller.subscribe();

    controller.set_search_term(BROKEN_TERM);
    let state = settled(&mut rx).await;

    assert_eq!(
        state.error(),
        Some("Something went wrong with fetching movies: HTTP 500")
    );
}

#[tokio::test]
async fn test_slow_response_for_old_term_is_discarded() {
    let (server, mut controller) = setup().await;
    server.delay("matrix", Duration::from_millis(400));
    let mut rx = controller.subscribe();

    controller.set_search_term("matrix");
    tokio::time::sleep(Duration::from_millis(50)).await;
    controller.set_search_term("inception");

    let state = settled(&mut rx).await;
    assert_eq!(state.results()[0].title, "Inception");

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(!rx.has_changed().unwrap());
    assert_eq!(controller.state().results()[0].title, "Inception");
    assert_eq!(server.searched_terms(), vec!["matrix", "inception"]);
}

#[tokio::test]
async fn test_clearing_while_pending_ends_idle() {
    let (server, mut controller) = setup().await;
    server.delay("inception", Duration::from_millis(300));

    controller.set_search_term("inception");
    tokio::time::sleep(Duration::from_millis(50)).await;
    controller.set_search_term("");

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(controller.state(), FetchState::Idle);
}

#[tokio::test]
async fn test_same_term_is_fetched_once() {
    let (server, mut controller) = setup().await;
    let mut rx = controller.subscribe();

    controller.set_search_term("inception");
    controller.set_search_term("inception ");
    settled(&mut rx).await;
    controller.set_search_term(" inception");
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(server.searched_terms(), vec!["inception"]);
}

#[tokio::test]
async fn test_teardown_while_pending_publishes_nothing() {
    let (server, mut controller) = setup().await;
    server.delay("inception", Duration::from_millis(300));
    let mut rx = controller.subscribe();

    controller.set_search_term("inception");
    tokio::time::sleep(Duration::from_millis(50)).await;
    rx.borrow_and_update();
    drop(controller);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(!matches!(rx.has_changed(), Ok(true)));
    assert_eq!(*rx.borrow(), FetchState::Loading);
}

#[tokio::test]
async fn test_select_rate_and_mark_watched() {
    let server = FakeCatalog::start().await;
    let catalog: Arc<dyn CatalogProvider> = Arc::new(OmdbCatalog::new(&server.config()).unwrap());
    let mut details = DetailController::new(catalog);
    let mut watched = WatchedList::load(Arc::new(MemoryStore::new()), "watched").await;
    let mut rx = details.subscribe();

    details.select(Some("tt1375666"));
    let state = rx
        .wait_for(|state| !state.is_loading())
        .await
        .unwrap()
        .clone();
    let record = state.ready().unwrap();
    assert!(details.rated_entry(watched.entries()).is_none());

    let mut draft = RatingDraft::new();
    draft.set_rating(6).unwrap();
    draft.set_rating(9).unwrap();
    watched.add(record.to_watched(&draft).unwrap()).await.unwrap();

    let entry = details.rated_entry(watched.entries()).unwrap();
    assert_eq!(entry.user_rating, 9);
    assert_eq!(entry.rating_decisions, 2);
    assert_eq!(entry.imdb_rating, Some(8.8));

    details.toggle("tt1375666");
    assert!(details.state().is_idle());
    assert!(details.rated_entry(watched.entries()).is_none());
}
