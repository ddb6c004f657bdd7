pub mod core;
pub mod models;
pub mod theme;
pub mod utils;

// Re-export commonly used types and traits
pub use crate::core::{ContentLister, ContentStore, ListerError, MemoryStore};
pub use crate::models::{ContentItem, ContentQuery, ContentType, FieldValue, Fragment, ListResult};
pub use crate::theme::{ThemeRenderer, ViewRegistry, ViewRenderer};
