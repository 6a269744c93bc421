//! fakeos core: injectable operating-system capability
//!
//! Callers depend on the [`Driver`] and [`File`] traits instead of calling
//! the operating system directly. [`MemDriver`] implements them entirely in
//! memory: path resolution, metadata, hard and symbolic links, open-handle
//! cursors, environment and process identity, with POSIX-style error
//! classification and no real storage involved.

pub mod config;
pub mod driver;
pub mod env;
pub mod error;
pub mod handle;
pub mod identity;
pub mod mem;
pub mod node;
pub mod path;
pub mod store;
pub mod types;

// Re-export key types for convenience
pub use config::{IdentityConfig, SimConfig};
pub use driver::{Driver, File};
pub use error::{Errno, OsError, Result};
pub use handle::MemFile;
pub use identity::Identity;
pub use mem::MemDriver;
pub use types::*;
