//! OMDb-compatible HTTP catalog.

use async_trait::async_trait;
use popcorn_core::config::CatalogConfig;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::CatalogProvider;
use crate::errors::CatalogError;
use crate::types::{MovieDetails, ResultItem};

/// Remote catalog speaking the OMDb query contract.
///
/// `GET <base>?apikey=<key>&s=<term>` for searches and
/// `GET <base>?apikey=<key>&i=<id>` for details. Dropping an in-flight call
/// drops the underlying connection.
#[derive(Debug, Clone)]
pub struct OmdbCatalog {
    client: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
}

/// Search response body.
#[derive(Debug, Deserialize)]
struct OmdbSearchResponse {
    #[serde(rename = "Search")]
    search: Option<Vec<OmdbSearchEntry>>,
    #[serde(rename = "Response")]
    response: Option<String>,
    #[serde(rename = "Error")]
    error: Option<String>,
}

/// Single entry of a search response.
#[derive(Debug, Deserialize)]
struct OmdbSearchEntry {
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "Year", default)]
    year: String,
    #[serde(rename = "imdbID")]
    imdb_id: String,
    #[serde(rename = "Poster", default)]
    poster: String,
}

/// Detail response body.
#[derive(Debug, Deserialize)]
struct OmdbDetailResponse {
    #[serde(rename = "Title")]
    title: Option<String>,
    #[serde(rename = "Year")]
    year: Option<String>,
    #[serde(rename = "Released")]
    released: Option<String>,
    #[serde(rename = "Runtime")]
    runtime: Option<String>,
    #[serde(rename = "Genre")]
    genre: Option<String>,
    #[serde(rename = "Director")]
    director: Option<String>,
    #[serde(rename = "Actors")]
    actors: Option<String>,
    #[serde(rename = "Plot")]
    plot: Option<String>,
    #[serde(rename = "Poster")]
    poster: Option<String>,
    #[serde(rename = "imdbRating")]
    imdb_rating: Option<String>,
    #[serde(rename = "imdbID")]
    imdb_id: Option<String>,
    #[serde(rename = "Type")]
    media_type: Option<String>,
    #[serde(rename = "Response")]
    response: Option<String>,
    #[serde(rename = "Error")]
    error: Option<String>,
}

/// Maps a logical failure body to `NotFound`.
fn check_response_flag(response: Option<&str>, error: Option<String>) -> Result<(), CatalogError> {
    if response == Some("False") {
        return Err(CatalogError::NotFound {
            message: error.unwrap_or_else(|| "Unknown error".to_string()),
        });
    }
    Ok(())
}

fn known(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty() && v != "N/A")
}

/// Decodes a search body into result items.
///
/// # Errors
/// - `CatalogError::Parse` - Body is not the expected JSON
/// - `CatalogError::NotFound` - Body carries `Response: "False"`
pub fn parse_search_body(body: &str) -> Result<Vec<ResultItem>, CatalogError> {
    let parsed: OmdbSearchResponse =
        serde_json::from_str(body).map_err(|e| CatalogError::Parse {
            reason: format!("search body: {e}"),
        })?;

    check_response_flag(parsed.response.as_deref(), parsed.error)?;

    Ok(parsed
        .search
        .unwrap_or_default()
        .into_iter()
        .map(|entry| ResultItem {
            id: entry.imdb_id,
            title: entry.title,
            year: entry.year,
            poster_url: entry.poster,
        })
        .collect())
}

/// Decodes a detail body.
///
/// # Errors
/// - `CatalogError::Parse` - Body is not the expected JSON
/// - `CatalogError::NotFound` - Body carries `Response: "False"`
pub fn parse_detail_body(requested_id: &str, body: &str) -> Result<MovieDetails, CatalogError> {
    let parsed: OmdbDetailResponse =
        serde_json::from_str(body).map_err(|e| CatalogError::Parse {
            reason: format!("detail body: {e}"),
        })?;

    check_response_flag(parsed.response.as_deref(), parsed.error)?;

    Ok(MovieDetails {
        imdb_id: parsed.imdb_id.unwrap_or_else(|| requested_id.to_string()),
        title: parsed.title.unwrap_or_else(|| "Unknown".to_string()),
        year: parsed.year.unwrap_or_default(),
        released: known(parsed.released),
        runtime: known(parsed.runtime),
        genre: known(parsed.genre),
        director: known(parsed.director),
        actors: known(parsed.actors),
        plot: known(parsed.plot),
        poster_url: known(parsed.poster),
        imdb_rating: known(parsed.imdb_rating),
        media_type: known(parsed.media_type),
    })
}

impl OmdbCatalog {
    /// Creates a catalog client from configuration.
    ///
    /// # Errors
    /// - `CatalogError::Configuration` - If the base URL is invalid or the HTTP client cannot be built
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| CatalogError::Configuration {
            reason: format!("base URL '{}': {e}", config.base_url),
        })?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| CatalogError::Configuration {
                reason: format!("HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Issues one GET with `lookup` appended after the API key and returns the body.
    async fn fetch(&self, lookup: (&str, &str)) -> Result<String, CatalogError> {
        let mut params: Vec<(&str, &str)> = Vec::with_capacity(2);
        if let Some(api_key) = self.api_key.as_deref() {
            params.push(("apikey", api_key));
        }
        params.push(lookup);

        let response = self
            .client
            .get(self.base_url.clone())
            .query(&params)
            .send()
            .await
            .map_err(|e| CatalogError::Transport {
                reason: if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    e.to_string()
                },
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status {
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| CatalogError::Transport {
            reason: format!("reading body: {e}"),
        })
    }
}

#[async_trait]
impl CatalogProvider for OmdbCatalog {
    async fn search(&self, term: &str) -> Result<Vec<ResultItem>, CatalogError> {
        debug!(term, "Catalog search");
        let body = self.fetch(("s", term)).await?;
        parse_search_body(&body)
    }

    async fn details(&self, imdb_id: &str) -> Result<MovieDetails, CatalogError> {
        debug!(imdb_id, "Catalog detail lookup");
        let body = self.fetch(("i", imdb_id)).await?;
        parse_detail_body(imdb_id, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_success() {
        let body = r#"{"Search":[{"Title":"Inception","Year":"2010","imdbID":"tt1375666","Type":"movie","Poster":"url"}],"totalResults":"1","Response":"True"}"#;

        let results = parse_search_body(body).unwrap();
        assert_eq!(
            results,
            vec![ResultItem {
                id: "tt1375666".to_string(),
                title: "Inception".to_string(),
                year: "2010".to_string(),
                poster_url: "url".to_string(),
            }]
        );
    }

    #[test]
    fn test_parse_search_not_found() {
        let body = r#"{"Response":"False","Error":"Movie not found!"}"#;

        assert_eq!(
            parse_search_body(body),
            Err(CatalogError::NotFound {
                message: "Movie not found!".to_string()
            })
        );
    }

    #[test]
    fn test_parse_search_without_entries_is_empty() {
        assert_eq!(parse_search_body(r#"{"Response":"True"}"#), Ok(Vec::new()));
    }

    #[test]
    fn test_parse_search_garbage() {
        assert!(matches!(
            parse_search_body("<html>bad gateway</html>"),
            Err(CatalogError::Parse { .. })
        ));
    }

    #[test]
    fn test_parse_detail_filters_unknown_fields() {
        let body = r#"{"Title":"Inception","Year":"2010","Released":"16 Jul 2010","Runtime":"148 min","Genre":"Action, Sci-Fi","Director":"Christopher Nolan","Actors":"Leonardo DiCaprio","Plot":"N/A","Poster":"N/A","imdbRating":"8.8","imdbID":"tt1375666","Type":"movie","Response":"True"}"#;

        let details = parse_detail_body("tt1375666", body).unwrap();
        assert_eq!(details.title, "Inception");
        assert_eq!(details.runtime_minutes(), Some(148));
        assert_eq!(details.plot, None);
        assert_eq!(details.poster_url, None);
        assert_eq!(details.imdb_rating_value(), Some(8.8));
    }

    #[test]
    fn test_parse_detail_not_found() {
        let body = r#"{"Response":"False","Error":"Incorrect IMDb ID."}"#;

        let error = parse_detail_body("tt0", body).unwrap_err();
        assert_eq!(error.to_string(), "Incorrect IMDb ID.");
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        let config = CatalogConfig {
            base_url: "://nope".to_string(),
            ..Default::default()
        };

        assert!(matches!(
            OmdbCatalog::new(&config),
            Err(CatalogError::Configuration { .. })
        ));
    }

    #[tokio::test]
    async fn test_unreachable_catalog_is_transport_error() {
        let config = CatalogConfig {
            // Reserved port, nothing listens here
            base_url: "http://127.0.0.1:9/".to_string(),
            ..Default::default()
        };
        let catalog = OmdbCatalog::new(&config).unwrap();

        assert!(matches!(
            catalog.search("inception").await,
            Err(CatalogError::Transport { .. })
        ));
    }
}
