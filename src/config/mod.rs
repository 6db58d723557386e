//! Settings schema and loading.
//!
//! The schema mirrors the sections of `tagshelf.ini`; loading merges the
//! file, the environment and defaults.

mod load;
mod schema;

pub use load::{default_config_path, resolve_config_path};
pub use schema::*;

#[cfg(test)]
mod tests;
