//! Filesystem access module
//!
//! Path resolution with optional root confinement, the error taxonomy shared
//! by both services, and the read-only operations they perform.

mod error;
mod guard;
pub mod ops;

pub use error::FsError;
pub use guard::PathGuard;
