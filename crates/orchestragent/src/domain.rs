//! Domain entities and pure business logic.

pub mod agent;
pub mod session;
