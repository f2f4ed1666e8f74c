//! Document store module
//!
//! - `traits` - The [`DataStore`] collaborator trait and path helpers
//! - `memory` - [`MemoryStore`], the in-process implementation

pub mod memory;
pub mod traits;

pub use memory::MemoryStore;
pub use traits::{children, split_path, to_document, DataStore};

/// Collection holding product documents
pub const PRODUCTS: &str = "products";
/// Collection holding cardholder documents
pub const STUDENT_USERS: &str = "student_users";
/// Collection holding purchase records
pub const PURCHASES: &str = "purchases";
/// Collection holding audit log entries
pub const LOGS: &str = "logs";
