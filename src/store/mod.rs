// src/store/mod.rs
// =============================================================================
// This module saves crawl results to a relational database.
//
// Each discovered link becomes one row keyed by its URL (UNIQUE), with the
// page it was found on. Storing a link that is already there is a no-op,
// so several crawls can share one database.
// =============================================================================

mod sqlite;

pub use sqlite::LinkStore;
