//! Reusable rendering pieces.

pub mod theme;
pub mod widgets;
