//! Popcorn Search - Movie catalog access and request lifecycle

#![deny(clippy::missing_errors_doc)]
#![deny(clippy::missing_panics_doc)]
#![warn(clippy::too_many_lines)]
//!
//! Talks to an OMDb-shaped catalog and drives the two request lifecycles of
//! the application: the search query and the selected movie's details. Both
//! keep exactly one request current and drop any response that arrives for a
//! superseded one.

pub mod controller;
pub mod detail;
pub mod errors;
pub mod lifecycle;
pub mod providers;
pub mod types;

// Re-export main types
pub use controller::QueryController;
pub use detail::DetailController;
pub use errors::CatalogError;
pub use lifecycle::FetchLifecycle;
pub use providers::{CatalogProvider, DevelopmentCatalog, OmdbCatalog, catalog_for};
pub use types::{
    ControllerState, DetailState, FetchState, MovieDetails, RequestGeneration, ResultItem,
};

