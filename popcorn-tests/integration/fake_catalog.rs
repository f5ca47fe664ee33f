//! Local server speaking the OMDb query contract.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{Json, Router};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use parking_lot::Mutex;
use popcorn_core::config::CatalogConfig;
use serde_json::json;

pub const API_KEY: &str = "test-key";

/// Term that makes the server answer 500.
pub const BROKEN_TERM: &str = "server error";

#[derive(Default)]
struct Shared {
    requests: Mutex<Vec<HashMap<String, String>>>,
    delays: Mutex<HashMap<String, Duration>>,
}

/// Handle to a running fake catalog.
pub struct FakeCatalog {
    addr: SocketAddr,
    shared: Arc<Shared>,
}

impl FakeCatalog {
    pub async fn start() -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let shared = Arc::new(Shared::default());
        let app = Router::new()
            .route("/", get(handle))
            .with_state(Arc::clone(&shared));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, shared }
    }

    pub fn config(&self) -> CatalogConfig {
        CatalogConfig {
            base_url: format!("http://{}/", self.addr),
            api_key: Some(API_KEY.to_string()),
            request_timeout: Duration::from_secs(2),
            ..Default::default()
        }
    }

    /// Delays every answer for `lookup` (a search term or an id).
    pub fn delay(&self, lookup: &str, delay: Duration) {
        self.shared.delays.lock().insert(lookup.to_string(), delay);
    }

    /// Query parameters of every request received so far.
    pub fn requests(&self) -> Vec<HashMap<String, String>> {
        self.shared.requests.lock().clone()
    }

    pub fn searched_terms(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter_map(|params| params.get("s").cloned())
            .collect()
    }
}

struct Movie {
    id: &'static str,
    title: &'static str,
    year: &'static str,
    runtime: &'static str,
    rating: &'static str,
}

const MOVIES: &[Movie] = &[
    Movie {
        id: "tt1375666",
        title: "Inception",
        year: "2010",
        runtime: "148 min",
        rating: "8.8",
    },
    Movie {
        id: "tt0133093",
        title: "The Matrix",
        year: "1999",
        runtime: "136 min",
        rating: "8.7",
    },
    Movie {
        id: "tt0234215",
        title: "The Matrix Reloaded",
        year: "2003",
        runtime: "138 min",
        rating: "N/A",
    },
];

fn not_found(message: &str) -> Response {
    Json(json!({ "Response": "False", "Error": message })).into_response()
}

async fn handle(
    State(shared): State<Arc<Shared>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    shared.requests.lock().push(params.clone());

    if params.get("apikey").map(String::as_str) != Some(API_KEY) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "Response": "False", "Error": "Invalid API key!" })),
        )
            .into_response();
    }

    let lookup = params.get("s").or_else(|| params.get("i")).cloned();
    let delay = lookup
        .as_ref()
        .and_then(|lookup| shared.delays.lock().get(lookup).copied());
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    if let Some(term) = params.get("s") {
        return search(term);
    }
    if let Some(id) = params.get("i") {
        return details(id);
    }
    not_found("Incorrect IMDb ID.")
}

fn search(term: &str) -> Response {
    if term == BROKEN_TERM {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let needle = term.to_lowercase();
    let hits: Vec<_> = MOVIES
        .iter()
        .filter(|movie| movie.title.to_lowercase().contains(&needle))
        .map(|movie| {
            json!({
                "Title": movie.title,
                "Year": movie.year,
                "imdbID": movie.id,
                "Type": "movie",
                "Poster": "url",
            })
        })
        .collect();

    if hits.is_empty() {
        return not_found("Movie not found!");
    }
    Json(json!({
        "Search": hits,
        "totalResults": hits.len().to_string(),
        "Response": "True",
    }))
    .into_response()
}

fn details(id: &str) -> Response {
    let Some(movie) = MOVIES.iter().find(|movie| movie.id == id) else {
        return not_found("Incorrect IMDb ID.");
    };

    Json(json!({
        "Title": movie.title,
        "Year": movie.year,
        "Released": "N/A",
        "Runtime": movie.runtime,
        "Genre": "Action, Sci-Fi",
        "Director": "N/A",
        "Actors": "N/A",
        "Plot": "N/A",
        "Poster": "url",
        "imdbRating": movie.rating,
        "imdbID": movie.id,
        "Type": "movie",
        "Response": "True",
    }))
    .into_response()
}
