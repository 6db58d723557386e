//! Path construction and the run that applies it.

pub mod destination;
pub mod pipeline;
pub mod stats;
