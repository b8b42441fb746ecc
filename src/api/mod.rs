//! REST surface over the person store and the family engine.

pub mod http;
pub mod types;

pub use http::HttpServer;
