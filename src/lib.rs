//! Custom Reply — keyword-triggered replies and authenticated API actions.

pub mod access;
pub mod actions;
pub mod channels;
pub mod commands;
pub mod config;
pub mod credentials;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod http;
pub mod store;

pub use engine::{Reply, ReplyEngine};
