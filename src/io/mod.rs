//! I/O module
//!
//! Handles the snapshot file and CSV input and output.
//!
//! # Components
//!
//! - `snapshot` - Load and save the JSON database export backing the CLI
//! - `csv_format` - CSV format handling (cart files, catalog and sales output)

pub mod csv_format;
pub mod snapshot;

pub use csv_format::{
    convert_cart_record, read_cart_items, write_catalog_csv, write_sales_csv, CartItem,
    CartItemRecord,
};
pub use snapshot::{load_snapshot, save_snapshot, SnapshotError};
