//! Portal - a small company portal
//!
//! This library provides account signup and login, a discussion board and
//! an admin dashboard over a pluggable JSON blob store, for the `portal`
//! REPL and the `portal-server` auth backend.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod navigation;
pub mod password;
pub mod portal;
pub mod server;
pub mod store;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export Args for the binaries
pub use cli::Args;
pub use error::PortalError;
pub use portal::Portal;
