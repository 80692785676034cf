//! HTTP protocol layer module
//!
//! Protocol helpers shared by the static file host and the chat proxy.

pub mod cache;
pub mod mime;
pub mod response;

pub use response::{
    apply_common_headers, build_304_response, build_405_response, build_file_response,
    build_json_error, build_json_response, build_options_response, build_redirect_response,
    build_text_response,
};
