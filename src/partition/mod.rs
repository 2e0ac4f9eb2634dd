// Partition Engine - pure squad splitting
//
// No I/O happens here; the random source is injected so callers can seed it.

pub mod engine;

pub use engine::{eligible_participants, partition, validate, Partition, Squad};
