//! Integration tests for Popcorn
//!
//! Exercise the real HTTP catalog client and both controllers against a
//! local server speaking the catalog contract, plus the watched list on disk.

#[path = "integration/fake_catalog.rs"]
mod fake_catalog;

#[path = "integration/omdb_catalog.rs"]
mod omdb_catalog;
#[path = "integration/search_flow.rs"]
mod search_flow;
#[path = "integration/watched_persistence.rs"]
mod watched_persistence;
