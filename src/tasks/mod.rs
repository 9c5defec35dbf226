pub mod health;
mod initialize;
mod query;

pub use health::{PollHandle, DEFAULT_POLL_INTERVAL};
pub use initialize::INITIALIZE_FAILED;
pub use query::{NO_RESULTS, QUERY_FAILED};
