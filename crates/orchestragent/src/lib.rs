pub mod app;
pub mod domain;
pub mod infra;

// Re-exports for convenience
pub use domain::{agent, session};
pub use infra::{db, git};
