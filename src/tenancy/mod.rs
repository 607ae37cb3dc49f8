//! Tenant metadata boundary: record types, the reader contract and a
//! read-through cache in front of it.

pub mod cached;
pub mod traits;

pub use cached::{CachedMetadataReader, DEFAULT_METADATA_CACHE_TTL};
pub use traits::{Assistant, Document, MetadataReader, Source, Tenant};
