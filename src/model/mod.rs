// File: ./src/model/mod.rs
// Aggregates the split model files
pub mod codec;
pub mod item;

// Re-export types so callers can use `crate::model::Event` directly
pub use item::{AdditionalInfo, Event, EventId, Recurrence, RecurrenceInterval};
