pub mod allowlist;
pub mod api_key;
pub mod cluster;
pub mod collection;
pub mod gsi;
pub mod log_streaming;
pub mod project;
pub mod scope;
pub mod user;
pub mod utils;
