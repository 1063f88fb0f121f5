//! Command bus adapters

pub mod memory;


pub use memory::InMemoryCommandBus;
