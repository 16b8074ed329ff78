//! Ragserve - Document Retrieval Service
//!
//! A thin retrieval layer over a remote vector database and a remote embedding
//! endpoint. Queries are embedded over HTTP, searched with dense, keyword
//! (BM25) or hybrid ranking, optionally filtered by document metadata, and
//! multi-page documents are reassembled in page order.

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod retrieval;
pub mod store;

pub use error::{RagError, Result};
