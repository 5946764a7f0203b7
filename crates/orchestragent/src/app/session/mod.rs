//! Session lifecycle use cases.

mod create;
mod list;
mod remove;

pub use create::{CreateSessionRequest, CreateSessionUseCase};
pub use list::{ListSessionsRequest, ListSessionsUseCase};
pub use remove::{RemoveSessionRequest, RemoveSessionUseCase};
