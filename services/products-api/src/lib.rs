//! Products API service library.
//!
//! This module exposes the internal modules for testing purposes.

pub mod handlers;
pub mod listing;
pub mod state;

pub use handlers::build_router;
pub use listing::{latest_batch_keys, latest_records};
pub use state::AppState;
