pub mod schema;

pub use schema::{Config, MetadataCacheConfig, SessionStoreConfig};
