//! Request handler module
//!
//! Routes requests to the static file host or the chat proxy.

pub mod chat;
pub mod router;
pub mod static_files;

pub use router::handle_request;
