//! Shared types for the place-order workspace.

pub mod types;

pub use types::ProcessId;
