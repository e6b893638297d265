//! Outbound API calls made on behalf of registered actions.

pub mod executor;

pub use executor::{CallOutcome, HttpExecutor, Method};
