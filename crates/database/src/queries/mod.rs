//! Catalog query operations organized by entity
//!
//! Every function takes the connection of an open [`crate::CatalogStore`]
//! session and runs inside its transaction.

pub mod content;
pub mod rows;
pub mod shelves;

// Re-export commonly used query functions
pub use content::{
    content_exists, edit, find_by_filename_suffix, find_by_title, list_books, remove, ContentEdit,
    SeriesSlot,
};
pub use rows::{list_rows, table_fields, CatalogRow, CatalogValue, Filter, FilterMode, RowQuery};
pub use shelves::{
    add_membership, collection_contents, collection_members, create_collection,
    delete_collection, list_collections,
};
