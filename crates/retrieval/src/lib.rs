#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Moduly Retrieval
//!
//! The RAG retrieval core (spec §4.4): hybrid dense+sparse search with
//! reciprocal rank fusion, optional multi-query expansion and
//! cross-encoder reranking, Fernet-aware chunk decryption, and
//! incremental KB sync keyed by content hash. Sits atop the
//! [`moduly_ports::VectorIndex`]/[`moduly_ports::KeywordIndex`] ports —
//! any storage driver behind those traits works here unchanged.
//!
//! Provider calls (embedding, query rewrite, reranking) and the
//! symmetric encryption envelope are external collaborators per spec
//! §1; [`client`] defines the narrow trait seam this crate calls
//! through rather than hosting them.

pub mod chunk;
pub mod client;
pub mod decrypt;
pub mod rrf;
pub mod search;
pub mod sync;

pub use client::{ContentCipher, EmbeddingClient, QueryExpansionClient, RerankClient};
pub use decrypt::decrypt_content;
pub use search::{search, ChunkStore, QueryExpansion, SearchContext, SearchHit, SearchRequest};
pub use sync::{sync_document, ExistingChunk, NewChunk, SyncReport};
