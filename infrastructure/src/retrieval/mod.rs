//! Retrieval backend adapters

pub mod http;

pub use http::HttpRetrievalBackend;
