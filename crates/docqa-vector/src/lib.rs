//! docqa vector crate - fragmenting, embedding, flat L2 index, retrieval store.
//!
//! The retrieval core of the service: documents are cut into fixed-size
//! fragments, embedded, and appended to an in-memory index whose positions
//! line up with a parallel corpus of fragment texts.

pub mod embedding;
pub mod error;
pub mod fragment;
pub mod index;
pub mod store;

pub use embedding::{
    DynEmbeddingService, EmbeddingService, MockEmbedding, OnnxEmbeddingService, SharedEmbedder,
};
pub use error::RetrievalError;
pub use fragment::{Fragment, Fragmenter};
pub use index::{Neighbor, VectorIndex};
pub use store::{RetrievalStore, RetrievedFragment, StoreStats};
