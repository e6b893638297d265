//! Inbound message dispatch: access gate, keyword matching, action execution.

pub mod dispatcher;
pub mod message;

pub use dispatcher::{Dispatcher, MatchKind, Matched};
pub use message::{InboundMessage, PlainMessage};
