//! Application state for the todo contract.
//!
//! This module holds the in-memory view of the contract (an ordered list of todos) and the pure
//! reducer that folds accepted chain actions into it. Nothing here performs I/O; the sync loop
//! owns the only mutable copy and publishes snapshots for readers.

/// Pure state transition function
mod reducer;
/// Todo, action and state type definitions
mod types;

pub use reducer::reduce;
pub use types::*;
