//! Admin command surface: parsing `/` lines and applying them.

pub mod admin;
pub mod parser;

pub use admin::AdminHandler;
pub use parser::{AdminCommand, CommandParser};
