//! Reasoning backend adapters

pub mod http;

pub use http::HttpReasoningGateway;
