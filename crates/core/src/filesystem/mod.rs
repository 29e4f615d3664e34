//! Filesystem module for the primitives the tree engine consumes.
//!
//! This module provides the `Filesystem` trait (list, create, exists, delete)
//! and a local-disk implementation. Listing preserves whatever order the
//! underlying filesystem returns; callers that need a stable order sort the
//! result themselves.
//!
//! # Example
//!
//! ```ignore
//! use mirrormux_core::filesystem::{Filesystem, LocalFilesystem};
//!
//! let fs = LocalFilesystem::new();
//! fs.create_dir(Path::new("/media/out/show")).await?;
//! for entry in fs.list_dir(Path::new("/media/in/show")).await? {
//!     println!("{} (dir: {})", entry.name, entry.is_dir);
//! }
//! ```

mod error;
mod local;
mod traits;
mod types;

pub use error::FilesystemError;
pub use local::LocalFilesystem;
pub use traits::Filesystem;
pub use types::DirEntry;
