//! Client-side session state: the shared result cache and its single writer.

pub mod cache;
pub mod session;

pub use cache::ResultCache;
pub use session::{SessionError, SessionOrchestrator};
