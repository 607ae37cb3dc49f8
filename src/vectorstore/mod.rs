//! Vector similarity search boundary used for retrieval-augmented answers.

pub mod traits;

pub use traits::{rank_results, SearchFilter, SearchResult, VectorStore};
