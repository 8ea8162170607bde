pub mod allowlist;
pub mod api_key;
pub mod audit;
pub mod client;
pub mod cluster;
pub mod collection;
pub mod error;
pub mod gsi;
pub mod log_streaming;
pub mod pagination;
pub mod project;
pub mod scope;
pub mod user;

pub use client::{Client, EndpointCfg, Payload, Response};
