//! CLI command implementations

use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use clap::Subcommand;
use popcorn_core::{
    JsonFileStore, KeyValueStore, MemoryStore, PopcornConfig, PopcornError, RatingDraft,
    WatchedError, WatchedList, WatchedMovie, WatchedSummary,
};
use popcorn_search::{
    CatalogProvider, DetailController, FetchState, MovieDetails, QueryController, ResultItem,
    catalog_for,
};
use tokio::sync::watch;
use tracing::info;

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Search the catalog by title
    Search {
        /// Title or fragment, at least three characters
        term: String,
    },
    /// Show the full record of one movie
    Details {
        /// Catalog identifier, e.g. tt1375666
        imdb_id: String,
    },
    /// Rate a movie and add it to the watched list
    Rate {
        /// Catalog identifier, e.g. tt1375666
        imdb_id: String,
        /// Stars from 1 to 10
        stars: u8,
    },
    /// Inspect or edit the watched list
    Watched {
        #[command(subcommand)]
        action: Option<WatchedCommand>,
    },
    /// Line-driven session: type to search, `:help` for commands
    Interactive,
}

/// Watched list subcommands
#[derive(Subcommand)]
pub enum WatchedCommand {
    /// List every watched movie
    List,
    /// Show averages over the watched list
    Summary,
    /// Remove a movie from the watched list
    Remove {
        /// Catalog identifier
        imdb_id: String,
    },
}

/// Services shared by every command.
pub struct App {
    pub config: PopcornConfig,
    pub catalog: Arc<dyn CatalogProvider>,
    pub store: Arc<dyn KeyValueStore>,
}

impl App {
    /// Wires the catalog and storage selected by `config`.
    ///
    /// # Errors
    /// - Catalog configuration errors (invalid base URL)
    pub fn new(config: PopcornConfig, ephemeral: bool) -> Result<Self> {
        let catalog = catalog_for(&config).context("Failed to set up the catalog")?;
        let store: Arc<dyn KeyValueStore> = if ephemeral {
            Arc::new(MemoryStore::new())
        } else {
            Arc::new(JsonFileStore::new(config.storage.data_dir.clone()))
        };
        info!(mode = %config.mode, ephemeral, "Popcorn ready");

        Ok(Self {
            config,
            catalog,
            store,
        })
    }

    pub async fn watched(&self) -> WatchedList {
        WatchedList::load(Arc::clone(&self.store), self.config.storage.watched_key.clone()).await
    }
}

/// Handle the CLI command
///
/// # Errors
/// Returns appropriate error based on the command that fails
pub async fn handle_command(command: Commands, app: &App) -> Result<()> {
    match command {
        Commands::Search { term } => search(app, term).await,
        Commands::Details { imdb_id } => details(app, &imdb_id).await,
        Commands::Rate { imdb_id, stars } => rate(app, &imdb_id, stars).await,
        Commands::Watched { action } => match action.unwrap_or(WatchedCommand::List) {
            WatchedCommand::List => list_watched(app).await,
            WatchedCommand::Summary => show_summary(app).await,
            WatchedCommand::Remove { imdb_id } => remove_watched(app, &imdb_id).await,
        },
        Commands::Interactive => crate::session::run(app).await,
    }
}

/// Waits until the lifecycle behind `updates` leaves `Loading`.
pub(crate) async fn settled<T: Clone>(
    updates: &mut watch::Receiver<FetchState<T>>,
) -> Result<FetchState<T>> {
    let state = updates
        .wait_for(|state| !state.is_loading())
        .await
        .context("Controller stopped before the request settled")?;
    Ok(state.clone())
}

/// Converts watched-list errors into their user-facing wording.
pub(crate) fn user_error(error: WatchedError) -> anyhow::Error {
    anyhow!(PopcornError::from(error).user_message())
}

/// Search the catalog once and print the results
///
/// # Errors
/// - Catalog failures, including "not found"
pub async fn search(app: &App, term: String) -> Result<()> {
    let mut controller = QueryController::new(Arc::clone(&app.catalog), &app.config.search);
    let mut updates = controller.subscribe();
    controller.set_search_term(term);

    match settled(&mut updates).await? {
        FetchState::Ready(results) => {
            print!("{}", format_results(&results));
            Ok(())
        }
        FetchState::Failed { message } => bail!(message),
        FetchState::Idle | FetchState::Loading => {
            println!(
                "Type at least {} characters to search.",
                app.config.search.min_query_chars
            );
            Ok(())
        }
    }
}

/// Fetch one movie's details
///
/// # Errors
/// - Catalog failures, including unknown identifiers
pub async fn details(app: &App, imdb_id: &str) -> Result<()> {
    let details = fetch_details(app, imdb_id).await?;
    print!("{}", format_details(&details));

    let watched = app.watched().await;
    if let Some(entry) = watched.find(&details.imdb_id) {
        println!("You rated this movie {}/10", entry.user_rating);
    }
    Ok(())
}

/// Rate a movie and add it to the watched list
///
/// # Errors
/// - Invalid star count
/// - Catalog failures
/// - Movie already watched or the list could not be saved
pub async fn rate(app: &App, imdb_id: &str, stars: u8) -> Result<()> {
    let mut draft = RatingDraft::new();
    draft.set_rating(stars).map_err(user_error)?;

    let details = fetch_details(app, imdb_id).await?;
    let movie = details.to_watched(&draft).map_err(user_error)?;

    let mut watched = app.watched().await;
    watched.add(movie).await.map_err(user_error)?;

    println!("Added {} ({}) with {stars}/10", details.title, details.year);
    Ok(())
}

async fn fetch_details(app: &App, imdb_id: &str) -> Result<MovieDetails> {
    let mut controller = DetailController::new(Arc::clone(&app.catalog));
    let mut updates = controller.subscribe();
    controller.select(Some(imdb_id));

    match settled(&mut updates).await? {
        FetchState::Ready(details) => Ok(details),
        FetchState::Failed { message } => bail!(message),
        FetchState::Idle | FetchState::Loading => bail!("No movie identifier given"),
    }
}

/// List the watched movies
///
/// # Errors
/// Currently infallible; storage problems fall back to an empty list.
pub async fn list_watched(app: &App) -> Result<()> {
    let watched = app.watched().await;

    println!("Watched Movies");
    println!("{:-<60}", "");
    if watched.is_empty() {
        println!("Nothing watched yet.");
        println!("Use 'popcorn rate <imdb-id> <stars>' to add a movie.");
        return Ok(());
    }

    for movie in watched.entries() {
        println!("{}", format_watched(movie));
    }
    Ok(())
}

/// Print averages over the watched list
///
/// # Errors
/// Currently infallible; storage problems fall back to an empty list.
pub async fn show_summary(app: &App) -> Result<()> {
    let watched = app.watched().await;
    print!("{}", format_summary(&watched.summary()));
    Ok(())
}

/// Remove a movie from the watched list
///
/// # Errors
/// - The list could not be saved
pub async fn remove_watched(app: &App, imdb_id: &str) -> Result<()> {
    let mut watched = app.watched().await;
    if watched.remove(imdb_id).await.map_err(user_error)? {
        println!("Removed {imdb_id}");
    } else {
        println!("{imdb_id} is not in the watched list");
    }
    Ok(())
}

pub(crate) fn format_results(results: &[ResultItem]) -> String {
    let mut out = String::new();
    if results.is_empty() {
        out.push_str("No results.\n");
        return out;
    }
    for (index, item) in results.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>2}. {} ({}) [{}]",
            index + 1,
            item.title,
            item.year,
            item.id
        );
    }
    out
}

pub(crate) fn format_details(details: &MovieDetails) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", details.title, details.year);
    let _ = writeln!(out, "{:-<60}", "");

    let fields = [
        ("Released", details.released.as_deref()),
        ("Runtime", details.runtime.as_deref()),
        ("Genre", details.genre.as_deref()),
        ("Director", details.director.as_deref()),
        ("Starring", details.actors.as_deref()),
        ("IMDb rating", details.imdb_rating.as_deref()),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            let _ = writeln!(out, "{label:<12} {value}");
        }
    }
    if let Some(plot) = details.plot.as_deref() {
        let _ = writeln!(out, "\n{plot}");
    }
    out
}

pub(crate) fn format_watched(movie: &WatchedMovie) -> String {
    let imdb = movie
        .imdb_rating
        .map_or_else(|| "-".to_string(), |rating| format!("{rating:.1}"));
    let runtime = movie
        .runtime
        .map_or_else(|| "-".to_string(), |minutes| format!("{minutes} min"));

    format!(
        "{} ({}) [{}]  imdb {imdb}  you {}/10  {runtime}",
        movie.title, movie.year, movie.imdb_id, movie.user_rating
    )
}

pub(crate) fn format_summary(summary: &WatchedSummary) -> String {
    format!(
        "Movies you watched: {}\n\
         Average IMDb rating: {:.2}\n\
         Average user rating: {:.2}\n\
         Average runtime: {:.0} min\n",
        summary.count, summary.avg_imdb_rating, summary.avg_user_rating, summary.avg_runtime
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> App {
        App::new(PopcornConfig::for_testing(), true).unwrap()
    }

    fn movie(imdb_id: &str, imdb_rating: Option<f64>, runtime: Option<u32>) -> WatchedMovie {
        WatchedMovie {
            imdb_id: imdb_id.to_string(),
            title: "Inception".to_string(),
            year: "2010".to_string(),
            poster: String::new(),
            imdb_rating,
            runtime,
            user_rating: 9,
            rating_decisions: 1,
            added_at: None,
        }
    }

    #[test]
    fn test_format_results_numbers_entries() {
        let results = vec![
            ResultItem {
                id: "tt1375666".to_string(),
                title: "Inception".to_string(),
                year: "2010".to_string(),
                poster_url: "url".to_string(),
            },
            ResultItem {
                id: "tt0133093".to_string(),
                title: "The Matrix".to_string(),
                year: "1999".to_string(),
                poster_url: "url".to_string(),
            },
        ];

        let text = format_results(&results);
        assert!(text.contains(" 1. Inception (2010) [tt1375666]"));
        assert!(text.contains(" 2. The Matrix (1999) [tt0133093]"));
        assert_eq!(format_results(&[]), "No results.\n");
    }

    #[test]
    fn test_format_watched_handles_unknown_values() {
        let line = format_watched(&movie("tt1375666", None, None));
        assert!(line.contains("imdb -"));
        assert!(line.contains("you 9/10"));

        let line = format_watched(&movie("tt1375666", Some(8.8), Some(148)));
        assert!(line.contains("imdb 8.8"));
        assert!(line.contains("148 min"));
    }

    #[test]
    fn test_format_summary() {
        let summary = WatchedSummary::from_entries(&[
            movie("tt1", Some(8.0), Some(100)),
            movie("tt2", Some(7.0), Some(120)),
        ]);

        let text = format_summary(&summary);
        assert!(text.contains("Movies you watched: 2"));
        assert!(text.contains("Average IMDb rating: 7.50"));
        assert!(text.contains("Average runtime: 110 min"));
    }

    #[tokio::test]
    async fn test_rate_adds_to_watched_list() {
        let app = app();

        rate(&app, "tt1375666", 9).await.unwrap();
        let watched = app.watched().await;
        assert_eq!(watched.len(), 1);
        assert_eq!(watched.entries()[0].user_rating, 9);
        assert_eq!(watched.entries()[0].runtime, Some(148));

        let error = rate(&app, "tt1375666", 7).await.unwrap_err();
        assert_eq!(error.to_string(), "You already rated Inception");
    }

    #[tokio::test]
    async fn test_rate_rejects_out_of_range_stars() {
        let app = app();

        let error = rate(&app, "tt1375666", 11).await.unwrap_err();
        assert_eq!(error.to_string(), "Rating must be between 1 and 10, got 11");
        assert!(app.watched().await.is_empty());
    }

    #[tokio::test]
    async fn test_search_surfaces_not_found() {
        let app = app();

        assert!(search(&app, "matrix".to_string()).await.is_ok());
        assert!(search(&app, "in".to_string()).await.is_ok());

        let error = search(&app, "zzzzzzz".to_string()).await.unwrap_err();
        assert_eq!(error.to_string(), "Movie not found!");
    }

    #[tokio::test]
    async fn test_remove_watched() {
        let app = app();
        rate(&app, "tt0133093", 8).await.unwrap();

        remove_watched(&app, "tt0133093").await.unwrap();
        remove_watched(&app, "tt0133093").await.unwrap();
        assert!(app.watched().await.is_empty());
    }
}
