//! Keyword-bound actions and the registry that owns them.

pub mod model;
pub mod registry;

pub use model::{Action, CodeMap, Payload, build_code_map, build_payload, coerce_value, normalize_keyword};
pub use registry::ActionRegistry;
