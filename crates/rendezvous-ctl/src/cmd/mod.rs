//! CLI command modules.

pub mod http;
pub mod signal;
pub mod users;
