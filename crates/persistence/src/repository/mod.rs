//! Repository implementations for database operations

pub mod options;

pub use options::*;
