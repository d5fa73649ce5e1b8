//! ChatStore implementations.
//!
//! - `http`: the external SQL query service
//! - `disabled`: no-op store for deployments without persistence

pub mod disabled;
pub mod http;

pub use disabled::DisabledChatStore;
pub use http::{HttpChatStore, HttpChatStoreConfig};
