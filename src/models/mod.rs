pub mod config;
pub mod types;

pub use config::{Config, ListingConfig, SectionConfig, ServerConfig, ViewConfig};
pub use types::{
    Category, CategoryRef, ContentFilter, ContentItem, ContentQuery, ContentType, FieldMap,
    FieldValue, FilterKind, Fragment, ImageRef, ListResult, SortOrder,
};
