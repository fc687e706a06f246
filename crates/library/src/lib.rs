//! kobosync series library
//!
//! Everything that touches a series directory on the computer side: natural
//! ordering of volume files, the metadata text format, and loading, saving
//! and initialising metadata files.

pub mod codec;
pub mod error;
pub mod paths;
pub mod store;

pub use error::{LibraryError, LibraryResult};
pub use paths::{sorted_alphanumeric, EntryKind, ListOptions};
pub use store::{
    discover_volumes, init_document, load_document, metadata_path, save_document, InitOptions,
    DEFAULT_ARCHIVE_EXTENSION, DEFAULT_METADATA_FILE,
};
