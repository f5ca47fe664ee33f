//! Offline catalog for development.

use async_trait::async_trait;

use super::CatalogProvider;
use crate::errors::CatalogError;
use crate::types::{MovieDetails, ResultItem};

struct Entry {
    imdb_id: &'static str,
    title: &'static str,
    year: &'static str,
    released: &'static str,
    runtime: &'static str,
    genre: &'static str,
    director: &'static str,
    actors: &'static str,
    plot: &'static str,
    imdb_rating: &'static str,
}

const ENTRIES: &[Entry] = &[
    Entry {
        imdb_id: "tt1375666",
        title: "Inception",
        year: "2010",
        released: "16 Jul 2010",
        runtime: "148 min",
        genre: "Action, Adventure, Sci-Fi",
        director: "Christopher Nolan",
        actors: "Leonardo DiCaprio, Joseph Gordon-Levitt, Elliot Page",
        plot: "A thief who steals corporate secrets through dream-sharing technology is given the inverse task of planting an idea.",
        imdb_rating: "8.8",
    },
    Entry {
        imdb_id: "tt0133093",
        title: "The Matrix",
        year: "1999",
        released: "31 Mar 1999",
        runtime: "136 min",
        genre: "Action, Sci-Fi",
        director: "Lana Wachowski, Lilly Wachowski",
        actors: "Keanu Reeves, Laurence Fishburne, Carrie-Anne Moss",
        plot: "A computer hacker learns about the true nature of his reality and his role in the war against its controllers.",
        imdb_rating: "8.7",
    },
    Entry {
        imdb_id: "tt6751668",
        title: "Parasite",
        year: "2019",
        released: "08 Nov 2019",
        runtime: "132 min",
        genre: "Drama, Thriller",
        director: "Bong Joon Ho",
        actors: "Song Kang-ho, Lee Sun-kyun, Cho Yeo-jeong",
        plot: "Greed and class discrimination threaten the newly formed symbiotic relationship between two families.",
        imdb_rating: "8.5",
    },
    Entry {
        imdb_id: "tt0816692",
        title: "Interstellar",
        year: "2014",
        released: "07 Nov 2014",
        runtime: "169 min",
        genre: "Adventure, Drama, Sci-Fi",
        director: "Christopher Nolan",
        actors: "Matthew McConaughey, Anne Hathaway, Jessica Chastain",
        plot: "A team of explorers travel through a wormhole in space in an attempt to ensure humanity's survival.",
        imdb_rating: "8.7",
    },
    Entry {
        imdb_id: "tt0088763",
        title: "Back to the Future",
        year: "1985",
        released: "03 Jul 1985",
        runtime: "116 min",
        genre: "Adventure, Comedy, Sci-Fi",
        director: "Robert Zemeckis",
        actors: "Michael J. Fox, Christopher Lloyd, Lea Thompson",
        plot: "Marty McFly is accidentally sent thirty years into the past in a time-traveling DeLorean.",
        imdb_rating: "8.5",
    },
];

/// Built-in catalog of a handful of well-known movies.
///
/// Mirrors the remote catalog's behaviour closely enough to drive the
/// controllers without network access: case-insensitive title matching and
/// the same "not found" messages.
#[derive(Debug, Default)]
pub struct DevelopmentCatalog;

impl DevelopmentCatalog {
    pub fn new() -> Self {
        Self
    }

    fn poster_for(entry: &Entry) -> String {
        format!("https://posters.popcorn.invalid/{}.jpg", entry.imdb_id)
    }
}

#[async_trait]
impl CatalogProvider for DevelopmentCatalog {
    async fn search(&self, term: &str) -> Result<Vec<ResultItem>, CatalogError> {
        let needle = term.trim().to_lowercase();
        let results: Vec<ResultItem> = ENTRIES
            .iter()
            .filter(|entry| entry.title.to_lowercase().contains(&needle))
            .map(|entry| ResultItem {
                id: entry.imdb_id.to_string(),
                title: entry.title.to_string(),
                year: entry.year.to_string(),
                poster_url: Self::poster_for(entry),
            })
            .collect();

        if results.is_empty() {
            return Err(CatalogError::NotFound {
                message: "Movie not found!".to_string(),
            });
        }
        Ok(results)
    }

    async fn details(&self, imdb_id: &str) -> Result<MovieDetails, CatalogError> {
        let entry = ENTRIES
            .iter()
            .find(|entry| entry.imdb_id == imdb_id)
            .ok_or_else(|| CatalogError::NotFound {
                message: "Incorrect IMDb ID.".to_string(),
            })?;

        Ok(MovieDetails {
            imdb_id: entry.imdb_id.to_string(),
            title: entry.title.to_string(),
            year: entry.year.to_string(),
            released: Some(entry.released.to_string()),
            runtime: Some(entry.runtime.to_string()),
            genre: Some(entry.genre.to_string()),
            director: Some(entry.director.to_string()),
            actors: Some(entry.actors.to_string()),
            plot: Some(entry.plot.to_string()),
            poster_url: Some(Self::poster_for(entry)),
            imdb_rating: Some(entry.imdb_rating.to_string()),
            media_type: Some("movie".to_string()),
        })
    }
}
