//! Architectural state model.

mod registers;

pub use registers::{ArchitecturalState, Register, REGISTER_COUNT, ZERO_REGISTER_INDEX};
