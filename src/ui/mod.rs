//! Terminal front-end and the view models it renders.

pub mod browser;
pub mod components;
pub mod data;
pub mod inspector;
pub mod shortcuts;
pub mod tui;
pub mod tween;
