//! Tools module - dynamic tools discovered from the context server
//!
//! Contains schema translation and the bridge that wraps advertised
//! capabilities as callable tools.

pub mod bridge;
pub mod schema;

pub use bridge::{build_tools, Tool};
pub use schema::{translate, ArgumentError, ArgumentKind, ArgumentRule, ArgumentValidator};
