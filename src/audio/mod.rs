//! Tag extraction backends and the reader that picks between them.

pub mod asf_backend;
#[cfg(feature = "lofty")]
pub mod lofty_backend;
pub mod metadata;
pub mod symphonia_backend;

use metadata::TagBackend;

#[cfg(feature = "lofty")]
fn native_backend() -> Option<Box<dyn TagBackend>> {
    Some(Box::new(lofty_backend::LoftyBackend))
}

#[cfg(not(feature = "lofty"))]
fn native_backend() -> Option<Box<dyn TagBackend>> {
    None
}
