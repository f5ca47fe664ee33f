//! Search query controller.
//!
//! Owns the search term and turns every change into at most one catalog
//! request. Too-short terms go straight to `Idle` without touching the
//! network; anything else supersedes the previous request and publishes
//! `Loading` before returning.

use std::sync::Arc;
use std::time::Duration;

use popcorn_core::config::SearchConfig;
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::lifecycle::FetchLifecycle;
use crate::providers::CatalogProvider;
use crate::types::{ControllerState, RequestGeneration, ResultItem};

/// Drives catalog searches from a user-edited term.
#[derive(Debug)]
pub struct QueryController {
    provider: Arc<dyn CatalogProvider>,
    lifecycle: FetchLifecycle<Vec<ResultItem>>,
    term: String,
    /// Trimmed term of the current request, `None` while idle
    active_query: Option<String>,
    min_query_chars: usize,
    debounce: Duration,
}

impl QueryController {
    pub fn new(provider: Arc<dyn CatalogProvider>, config: &SearchConfig) -> Self {
        Self {
            provider,
            lifecycle: FetchLifecycle::new("search"),
            term: String::new(),
            active_query: None,
            min_query_chars: config.min_query_chars.max(1),
            debounce: config.debounce,
        }
    }

    /// Updates the term and re-evaluates the request.
    ///
    /// The resulting transition is published before this returns. Setting a
    /// term whose trimmed form matches the current request does nothing.
    ///
    /// # Panics
    ///
    /// Panics if a request has to start outside a Tokio runtime.
    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.term = term.into();
        let query = self.term.trim();

        if query.chars().count() < self.min_query_chars {
            // A cancelled request can leave `Loading` published with nothing in flight
            if self.active_query.take().is_some() || !self.state().is_idle() {
                self.lifecycle.reset();
            } else {
                trace!(term = %self.term, "Term below minimum length");
            }
            return;
        }

        if self.active_query.as_deref() == Some(query) {
            trace!(query, "Term unchanged, keeping current request");
            return;
        }

        let query = query.to_string();
        self.issue(query);
    }

    /// Re-issues the current query, for example after a failure.
    ///
    /// Does nothing while idle.
    pub fn refresh(&mut self) {
        if let Some(query) = self.active_query.clone() {
            debug!(query, "Refreshing search");
            self.issue(query);
        }
    }

    fn issue(&mut self, query: String) {
        let provider = Arc::clone(&self.provider);
        let request = query.clone();
        let generation = self.lifecycle.start(self.debounce, async move {
            provider.search(&request).await
        });
        debug!(query, %generation, "Search issued");
        self.active_query = Some(query);
    }

    /// Raw term as last set, untrimmed.
    pub fn search_term(&self) -> &str {
        &self.term
    }

    /// Trimmed term of the current request.
    pub fn active_query(&self) -> Option<&str> {
        self.active_query.as_deref()
    }

    pub fn state(&self) -> ControllerState {
        self.lifecycle.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<ControllerState> {
        self.lifecycle.subscribe()
    }

    pub fn generation(&self) -> RequestGeneration {
        self.lifecycle.generation()
    }

    pub fn is_in_flight(&self) -> bool {
        self.lifecycle.is_in_flight()
    }

    /// Cancels the pending request, leaving the last published state as is.
    ///
    /// The controller stays usable: the next term change publishes again.
    pub fn shutdown(&mut self) {
        self.lifecycle.cancel();
        self.active_query = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CatalogError;
    use crate::providers::ScriptedCatalog;
    use crate::providers::mock::item;
    use crate::types::FetchState;
    use proptest::prelude::*;

    fn controller(catalog: &Arc<ScriptedCatalog>) -> QueryController {
        QueryController::new(
            Arc::clone(catalog) as Arc<dyn CatalogProvider>,
            &SearchConfig::default(),
        )
    }

    fn inception() -> ResultItem {
        item("tt1375666", "Inception", "2010")
    }

    async fn settled(rx: &mut watch::Receiver<ControllerState>) -> ControllerState {
        rx.wait_for(|state| !state.is_loading())
            .await
            .unwrap()
            .clone()
    }

    const SLOW: Duration = Duration::from_millis(100);
    const FAST: Duration = Duration::from_millis(10);
    // Long enough for a spawned request to reach the catalog
    const TICK: Duration = Duration::from_millis(5);

    #[tokio::test(start_paused = true)]
    async fn test_short_term_goes_idle_without_fetch() {
        let catalog = Arc::new(ScriptedCatalog::new());
        let mut controller = controller(&catalog);

        for term in ["", "in", "  in  ", "ab "] {
            controller.set_search_term(term);
            assert_eq!(controller.state(), FetchState::Idle);
        }

        tokio::time::sleep(TICK).await;
        assert!(catalog.calls().is_empty());
        assert!(!controller.is_in_flight());
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_loads_then_maps_results() {
        let catalog = Arc::new(ScriptedCatalog::new());
        catalog.on_search("inception", FAST, Ok(vec![inception()]));
        let mut controller = controller(&catalog);
        let mut rx = controller.subscribe();

        controller.set_search_term("in");
        assert!(controller.state().is_idle());

        controller.set_search_term("inception");
        assert_eq!(controller.state(), FetchState::Loading);

        let state = settled(&mut rx).await;
        assert_eq!(state.results(), &[inception()]);
        assert_eq!(
            state.results()[0],
            ResultItem {
                id: "tt1375666".to_string(),
                title: "Inception".to_string(),
                year: "2010".to_string(),
                poster_url: "url".to_string(),
            }
        );
        assert_eq!(catalog.calls(), vec!["inception"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_surfaces_catalog_message() {
        let catalog = Arc::new(ScriptedCatalog::new());
        catalog.on_search(
            "zzzzzzz",
            FAST,
            Err(CatalogError::NotFound {
                message: "Movie not found!".to_string(),
            }),
        );
        let mut controller = controller(&catalog);
        let mut rx = controller.subscribe();

        controller.set_search_term("zzzzzzz");
        let state = settled(&mut rx).await;

        assert_eq!(
            state,
            FetchState::Failed {
                message: "Movie not found!".to_string()
            }
        );
        assert!(state.results().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_is_failed_state() {
        let catalog = Arc::new(ScriptedCatalog::new());
        catalog.on_search("matrix", FAST, Err(CatalogError::Status { status: 500 }));
        let mut controller = controller(&catalog);
        let mut rx = controller.subscribe();

        controller.set_search_term("matrix");
        let state = settled(&mut rx).await;

        assert_eq!(
            state.error(),
            Some("Something went wrong with fetching movies: HTTP 500")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_term_cancels_previous_request() {
        let catalog = Arc::new(ScriptedCatalog::new());
        catalog
            .on_search("matrix", SLOW, Ok(vec![item("tt0133093", "The Matrix", "1999")]))
            .on_search("inception", FAST, Ok(vec![inception()]));
        let mut controller = controller(&catalog);
        let mut rx = controller.subscribe();

        controller.set_search_term("matrix");
        tokio::time::sleep(TICK).await;
        controller.set_search_term("inception");

        let state = settled(&mut rx).await;
        assert_eq!(state.results(), &[inception()]);

        tokio::time::sleep(SLOW * 2).await;
        assert_eq!(catalog.calls(), vec!["matrix", "inception"]);
        assert_eq!(catalog.cancelled(), 1);
        assert_eq!(catalog.completed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_response_of_superseded_term_is_ignored() {
        let catalog = Arc::new(ScriptedCatalog::new());
        catalog
            .on_search("matrix", SLOW, Ok(vec![item("tt0133093", "The Matrix", "1999")]))
            .on_search("inception", FAST, Ok(vec![inception()]));
        let mut controller = controller(&catalog);
        let mut rx = controller.subscribe();

        controller.set_search_term("matrix");
        tokio::time::sleep(TICK).await;
        controller.set_search_term("inception");
        settled(&mut rx).await;
        rx.borrow_and_update();

        // Past the point where "matrix" would have answered
        tokio::time::sleep(SLOW * 2).await;
        assert!(!rx.has_changed().unwrap());
        assert_eq!(controller.state().results(), &[inception()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clearing_term_while_pending_stays_idle() {
        let catalog = Arc::new(ScriptedCatalog::new());
        catalog.on_search("inception", SLOW, Ok(vec![inception()]));
        let mut controller = controller(&catalog);

        controller.set_search_term("inception");
        tokio::time::sleep(TICK).await;
        controller.set_search_term("");
        assert_eq!(controller.state(), FetchState::Idle);

        tokio::time::sleep(SLOW * 2).await;
        assert_eq!(controller.state(), FetchState::Idle);
        assert_eq!(catalog.cancelled(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_term_does_not_refetch() {
        let catalog = Arc::new(ScriptedCatalog::new());
        catalog.on_search("inception", FAST, Ok(vec![inception()]));
        let mut controller = controller(&catalog);
        let mut rx = controller.subscribe();

        controller.set_search_term("inception");
        tokio::time::sleep(TICK).await;
        controller.set_search_term(" inception ");
        settled(&mut rx).await;
        controller.set_search_term("inception");

        tokio::time::sleep(SLOW).await;
        assert_eq!(catalog.calls(), vec!["inception"]);
        assert_eq!(controller.search_term(), "inception");
        assert!(controller.state().is_settled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_term_after_idle_fetches_again() {
        let catalog = Arc::new(ScriptedCatalog::new());
        catalog.on_search("inception", FAST, Ok(vec![inception()]));
        let mut controller = controller(&catalog);
        let mut rx = controller.subscribe();

        controller.set_search_term("inception");
        settled(&mut rx).await;
        controller.set_search_term("");
        controller.set_search_term("inception");
        settled(&mut rx).await;

        assert_eq!(catalog.calls(), vec!["inception", "inception"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loading_clears_previous_results() {
        let catalog = Arc::new(ScriptedCatalog::new());
        catalog
            .on_search("inception", FAST, Ok(vec![inception()]))
            .on_search("interstellar", FAST, Ok(Vec::new()));
        let mut controller = controller(&catalog);
        let mut rx = controller.subscribe();

        controller.set_search_term("inception");
        assert_eq!(settled(&mut rx).await.results().len(), 1);

        controller.set_search_term("interstellar");
        let state = controller.state();
        assert!(state.is_loading());
        assert!(state.results().is_empty());
        assert_eq!(state.error(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_reissues_current_query() {
        let catalog = Arc::new(ScriptedCatalog::new());
        let mut controller = controller(&catalog);
        let mut rx = controller.subscribe();

        controller.refresh();
        assert!(controller.state().is_idle());

        controller.set_search_term("  alien ");
        assert!(settled(&mut rx).await.error().is_some());

        catalog.on_search("alien", FAST, Ok(vec![item("tt0078748", "Alien", "1979")]));
        controller.refresh();
        assert!(controller.state().is_loading());

        let state = settled(&mut rx).await;
        assert_eq!(state.results()[0].title, "Alien");
        assert_eq!(catalog.calls(), vec!["alien", "alien"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_skips_intermediate_terms() {
        let catalog = Arc::new(ScriptedCatalog::new());
        catalog.on_search("inception", FAST, Ok(vec![inception()]));
        let config = SearchConfig {
            debounce: Duration::from_millis(300),
            ..Default::default()
        };
        let mut controller =
            QueryController::new(Arc::clone(&catalog) as Arc<dyn CatalogProvider>, &config);
        let mut rx = controller.subscribe();

        controller.set_search_term("ince");
        tokio::time::sleep(Duration::from_millis(100)).await;
        controller.set_search_term("incep");
        tokio::time::sleep(Duration::from_millis(100)).await;
        controller.set_search_term("inception");
        assert!(controller.state().is_loading());

        let state = settled(&mut rx).await;
        assert_eq!(state.results(), &[inception()]);
        assert_eq!(catalog.calls(), vec!["inception"]);
        assert_eq!(catalog.cancelled(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_without_transition() {
        let catalog = Arc::new(ScriptedCatalog::new());
        catalog.on_search("inception", SLOW, Ok(vec![inception()]));
        let mut controller = controller(&catalog);
        let mut rx = controller.subscribe();

        controller.set_search_term("inception");
        tokio::time::sleep(TICK).await;
        rx.borrow_and_update();

        controller.shutdown();
        tokio::time::sleep(SLOW * 2).await;

        assert_eq!(catalog.cancelled(), 1);
        assert_eq!(catalog.completed(), 0);
        assert!(!rx.has_changed().unwrap());
        assert_eq!(*rx.borrow(), FetchState::Loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_term_after_shutdown_goes_idle() {
        let catalog = Arc::new(ScriptedCatalog::new());
        catalog.on_search("inception", SLOW, Ok(vec![inception()]));
        let mut controller = controller(&catalog);

        controller.set_search_term("inception");
        tokio::time::sleep(TICK).await;
        controller.shutdown();
        assert!(controller.state().is_loading());

        controller.set_search_term("in");
        assert_eq!(controller.state(), FetchState::Idle);

        tokio::time::sleep(SLOW * 3).await;
        assert_eq!(controller.state(), FetchState::Idle);
        assert!(!controller.is_in_flight());
        assert_eq!(catalog.calls(), vec!["inception"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_term_after_shutdown_fetches_again() {
        let catalog = Arc::new(ScriptedCatalog::new());
        catalog.on_search("inception", SLOW, Ok(vec![inception()]));
        let mut controller = controller(&catalog);
        let mut rx = controller.subscribe();

        controller.set_search_term("inception");
        tokio::time::sleep(TICK).await;
        controller.shutdown();

        controller.set_search_term("inception");
        let state = settled(&mut rx).await;
        assert_eq!(state.results(), &[inception()]);
        assert_eq!(catalog.calls(), vec!["inception", "inception"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_minimum_still_gates_empty_term() {
        let catalog = Arc::new(ScriptedCatalog::new());
        let config = SearchConfig {
            min_query_chars: 0,
            ..Default::default()
        };
        let mut controller =
            QueryController::new(Arc::clone(&catalog) as Arc<dyn CatalogProvider>, &config);

        controller.set_search_term("   ");
        assert!(controller.state().is_idle());
        controller.set_search_term("x");
        assert!(controller.state().is_loading());

        tokio::time::sleep(TICK).await;
        assert_eq!(catalog.calls(), vec!["x"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending_request() {
        let catalog = Arc::new(ScriptedCatalog::new());
        catalog.on_search("inception", SLOW, Ok(vec![inception()]));
        let mut controller = controller(&catalog);
        let mut rx = controller.subscribe();

        controller.set_search_term("inception");
        tokio::time::sleep(TICK).await;
        rx.borrow_and_update();
        drop(controller);

        tokio::time::sleep(SLOW * 2).await;
        assert_eq!(catalog.cancelled(), 1);
        assert_eq!(catalog.completed(), 0);
        assert!(!matches!(rx.has_changed(), Ok(true)));
        assert_eq!(*rx.borrow(), FetchState::Loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_generation_advances_per_request() {
        let catalog = Arc::new(ScriptedCatalog::new());
        let mut controller = controller(&catalog);

        let start = controller.generation();
        controller.set_search_term("alien");
        let first = controller.generation();
        controller.set_search_term("aliens");
        let second = controller.generation();

        assert!(start < first && first < second);
        assert_eq!(controller.active_query(), Some("aliens"));
    }

    fn run_local<F: std::future::Future>(fut: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(fut)
    }

    proptest! {
        #[test]
        fn test_short_terms_never_fetch(term in "[ \t\n]{0,3}[a-zA-Zé0-9]{0,2}[ \t\n]{0,3}") {
            let calls = run_local(async {
                let catalog = Arc::new(ScriptedCatalog::new());
                let mut controller = controller(&catalog);
                controller.set_search_term(term.clone());
                assert!(controller.state().is_idle());
                tokio::task::yield_now().await;
                catalog.calls()
            });
            prop_assert!(calls.is_empty());
        }

        #[test]
        fn test_long_terms_fetch_trimmed_once(
            pad_left in "[ \t]{0,2}",
            word in "[a-z]{3,12}",
            pad_right in "[ \t]{0,2}",
        ) {
            let calls = run_local(async {
                let catalog = Arc::new(ScriptedCatalog::new());
                let mut controller = controller(&catalog);
                controller.set_search_term(format!("{pad_left}{word}{pad_right}"));
                controller.set_search_term(word.clone());
                assert!(controller.state().is_loading());
                let mut rx = controller.subscribe();
                rx.wait_for(|state| !state.is_loading()).await.unwrap();
                catalog.calls()
            });
            prop_assert_eq!(calls, vec![word]);
        }
    }
}
