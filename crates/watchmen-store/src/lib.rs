//! Read-only access to blob storage.
//!
//! Checks only ever ask four questions of a store: does a bucket exist, does
//! an object exist, what are its size and last-modified time, and which
//! objects live under a prefix. [`ObjectStore`] captures exactly that, and
//! [`Lister`] walks paginated listings.

pub mod error;
pub mod fs;
pub mod memory;
pub mod store;

pub use error::{Error, Result};
pub use fs::FsStore;
pub use memory::MemoryStore;
pub use store::{ListPage, Lister, ObjectMeta, ObjectStore, list_all};
