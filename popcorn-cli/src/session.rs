//! Interactive session.
//!
//! Plain lines edit the search term; lines starting with `:` are commands.
//! Controller updates are printed as they arrive, so a slow search never
//! blocks typing the next term.

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use popcorn_core::{RatingDraft, ShortcutGuard, ShortcutRegistry, WatchedList};
use popcorn_search::{
    ControllerState, DetailController, DetailState, FetchState, QueryController, ResultItem,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::commands::{App, format_details, format_results, format_summary, format_watched};

/// One parsed line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Term(String),
    Select(usize),
    Rate(u8),
    Add,
    Watched,
    Remove(String),
    Key(String),
    Refresh,
    Help,
    Quit,
    Invalid(String),
}

pub fn parse_input(line: &str) -> Input {
    let Some(command) = line.trim().strip_prefix(':') else {
        return Input::Term(line.to_string());
    };

    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let argument = parts.next();

    match (name, argument) {
        ("q" | "quit", None) => Input::Quit,
        ("h" | "help", None) => Input::Help,
        ("add", None) => Input::Add,
        ("watched", None) => Input::Watched,
        ("refresh", None) => Input::Refresh,
        ("select" | "s", Some(n)) => match n.parse() {
            Ok(index) if index > 0 => Input::Select(index),
            _ => Input::Invalid(format!("Not a result number: {n}")),
        },
        ("rate" | "r", Some(n)) => match n.parse() {
            Ok(stars) => Input::Rate(stars),
            Err(_) => Input::Invalid(format!("Not a star count: {n}")),
        },
        ("remove", Some(id)) => Input::Remove(id.to_string()),
        ("key", Some(key)) => Input::Key(key.to_string()),
        _ => Input::Invalid(format!("Unknown command: :{command}")),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShortcutAction {
    ClearSearch,
    CloseDetails,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

const HELP: &str = "\
Type a title to search. Commands:
  :select N   open result N (again to close)
  :rate N     rate the open movie, 1-10
  :add        add the open movie to the watched list
  :watched    show the watched list and summary
  :remove ID  remove a movie from the watched list
  :key NAME   press a key (Enter clears the search, Escape closes details)
  :refresh    retry the current search and details
  :quit
";

/// Search, detail and watched-list state of one interactive run.
pub struct Session<W> {
    search: QueryController,
    details: DetailController,
    watched: WatchedList,
    draft: RatingDraft,
    shortcuts: ShortcutRegistry,
    actions: mpsc::UnboundedReceiver<ShortcutAction>,
    _bindings: Vec<ShortcutGuard>,
    results: Vec<ResultItem>,
    out: W,
}

impl<W: Write> Session<W> {
    pub async fn new(app: &App, out: W) -> Self {
        let shortcuts = ShortcutRegistry::new();
        let (tx, actions) = mpsc::unbounded_channel();

        let bind = |key: &str, action: ShortcutAction| {
            let tx = tx.clone();
            shortcuts.bind(key, move || {
                let _ = tx.send(action);
            })
        };
        let bindings = vec![
            bind("Enter", ShortcutAction::ClearSearch),
            bind("NumpadEnter", ShortcutAction::ClearSearch),
            bind("Escape", ShortcutAction::CloseDetails),
        ];

        Self {
            search: QueryController::new(Arc::clone(&app.catalog), &app.config.search),
            details: DetailController::new(Arc::clone(&app.catalog)),
            watched: app.watched().await,
            draft: RatingDraft::new(),
            shortcuts,
            actions,
            _bindings: bindings,
            results: Vec::new(),
            out,
        }
    }

    pub fn search_updates(&self) -> watch::Receiver<ControllerState> {
        self.search.subscribe()
    }

    pub fn detail_updates(&self) -> watch::Receiver<DetailState> {
        self.details.subscribe()
    }

    pub fn watched(&self) -> &WatchedList {
        &self.watched
    }

    /// Applies one line of input.
    ///
    /// # Errors
    /// - Writing to the output failed
    pub async fn handle_input(&mut self, input: Input) -> Result<Flow> {
        match input {
            Input::Term(term) => self.search.set_search_term(term),
            Input::Select(index) => match index.checked_sub(1).and_then(|i| self.results.get(i)) {
                Some(item) => {
                    let id = item.id.clone();
                    self.draft.reset();
                    self.details.toggle(&id);
                }
                None => writeln!(self.out, "No result #{index}")?,
            },
            Input::Rate(stars) => self.rate(stars)?,
            Input::Add => self.add().await?,
            Input::Watched => self.print_watched()?,
            Input::Remove(imdb_id) => match self.watched.remove(&imdb_id).await {
                Ok(true) => writeln!(self.out, "Removed {imdb_id}")?,
                Ok(false) => writeln!(self.out, "{imdb_id} is not in the watched list")?,
                Err(e) => writeln!(self.out, "{}", crate::commands::user_error(e))?,
            },
            Input::Key(key) => {
                if self.shortcuts.dispatch(&key) == 0 {
                    writeln!(self.out, "Nothing bound to {key}")?;
                }
                self.apply_shortcuts();
            }
            Input::Refresh => {
                self.search.refresh();
                self.details.refresh();
            }
            Input::Help => write!(self.out, "{HELP}")?,
            Input::Quit => return Ok(Flow::Quit),
            Input::Invalid(reason) => writeln!(self.out, "{reason}")?,
        }
        Ok(Flow::Continue)
    }

    fn apply_shortcuts(&mut self) {
        while let Ok(action) = self.actions.try_recv() {
            debug!(?action, "Shortcut");
            match action {
                ShortcutAction::ClearSearch => self.search.set_search_term(""),
                ShortcutAction::CloseDetails => {
                    self.draft.reset();
                    self.details.close();
                }
            }
        }
    }

    fn rate(&mut self, stars: u8) -> Result<()> {
        if self.details.state().ready().is_none() {
            writeln!(self.out, "Open a movie first with :select N")?;
            return Ok(());
        }
        if let Some(entry) = self.details.rated_entry(self.watched.entries()) {
            writeln!(self.out, "You rated this movie {}/10", entry.user_rating)?;
            return Ok(());
        }

        match self.draft.set_rating(stars) {
            Ok(()) => writeln!(self.out, "Rating: {stars}/10, :add to save")?,
            Err(e) => writeln!(self.out, "{}", crate::commands::user_error(e))?,
        }
        Ok(())
    }

    async fn add(&mut self) -> Result<()> {
        let Some(details) = self.details.state().ready().cloned() else {
            writeln!(self.out, "Open a movie first with :select N")?;
            return Ok(());
        };

        let added = match details.to_watched(&self.draft) {
            Ok(movie) => self.watched.add(movie).await,
            Err(e) => Err(e),
        };
        match added {
            Ok(()) => {
                writeln!(self.out, "Added {} to the watched list", details.title)?;
                self.draft.reset();
                self.details.close();
            }
            Err(e) => writeln!(self.out, "{}", crate::commands::user_error(e))?,
        }
        Ok(())
    }

    fn print_watched(&mut self) -> Result<()> {
        for movie in self.watched.entries() {
            writeln!(self.out, "{}", format_watched(movie))?;
        }
        write!(self.out, "{}", format_summary(&self.watched.summary()))?;
        Ok(())
    }

    /// Prints a search transition and remembers the selectable results.
    ///
    /// # Errors
    /// - Writing to the output failed
    pub fn on_search_update(&mut self, state: &ControllerState) -> Result<()> {
        self.results = state.results().to_vec();
        match state {
            FetchState::Idle => {}
            FetchState::Loading => writeln!(self.out, "Loading...")?,
            FetchState::Ready(results) => write!(self.out, "{}", format_results(results))?,
            FetchState::Failed { message } => writeln!(self.out, "{message}")?,
        }
        Ok(())
    }

    /// Prints a detail transition.
    ///
    /// # Errors
    /// - Writing to the output failed
    pub fn on_detail_update(&mut self, state: &DetailState) -> Result<()> {
        match state {
            FetchState::Idle => {}
            FetchState::Loading => writeln!(self.out, "Loading details...")?,
            FetchState::Ready(details) => {
                write!(self.out, "{}", format_details(details))?;
                match self.details.rated_entry(self.watched.entries()) {
                    Some(entry) => {
                        writeln!(self.out, "You rated this movie {}/10", entry.user_rating)?
                    }
                    None => writeln!(self.out, "Rate it with :rate N, then :add")?,
                }
            }
            FetchState::Failed { message } => writeln!(self.out, "{message}")?,
        }
        Ok(())
    }

    fn shutdown(&mut self) {
        self.search.shutdown();
        self.details.shutdown();
    }
}

/// Runs the session on stdin and stdout until `:quit` or end of input.
///
/// # Errors
/// - Reading stdin or writing stdout failed
pub async fn run(app: &App) -> Result<()> {
    let mut session = Session::new(app, std::io::stdout()).await;
    let mut search_updates = session.search_updates();
    let mut detail_updates = session.detail_updates();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    info!("Interactive session started");
    session.handle_input(Input::Help).await?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if session.handle_input(parse_input(&line)).await? == Flow::Quit {
                    break;
                }
            }
            Ok(()) = search_updates.changed() => {
                let state = search_updates.borrow_and_update().clone();
                session.on_search_update(&state)?;
            }
            Ok(()) = detail_updates.changed() => {
                let state = detail_updates.borrow_and_update().clone();
                session.on_detail_update(&state)?;
            }
        }
        session.out.flush()?;
    }

    session.shutdown();
    info!("Interactive session ended");
    Ok(())
}
