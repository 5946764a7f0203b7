//! Adapters to external systems: the `git` executable and the `SQLite` store.

pub mod db;
pub mod git;
