//! Data model shared across the console.

pub mod types;
