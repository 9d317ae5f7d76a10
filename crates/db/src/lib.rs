//! SQLite archival for terminal query sessions.
//!
//! Sessions live in memory while running; once terminal and past the
//! retention window they are archived here and evicted.

mod error;
pub mod models;
mod pool;
pub mod repositories;

pub use error::*;
pub use models::{ArchivedSession, ArchivedSessionRow};
pub use pool::*;
pub use repositories::*;
