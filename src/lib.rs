pub mod config;
pub mod models;
pub mod normalize;
pub mod orchestrator;
pub mod server;
pub mod tasks;
pub mod tools;

pub use models::{CanonicalResult, Cdp, HealthStatus};
pub use normalize::normalize;
pub use orchestrator::{Dispatch, OpState, Orchestrator, Rejection, UiState};
pub use tools::{ApiClient, ApiError, Gateway};
