//! Domain layer containing token entities, bus envelopes and command payloads.

pub mod entities;
pub mod value_objects;

// Re-export commonly used domain types
pub use entities::*;
pub use value_objects::*;
