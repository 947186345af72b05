//! HTTP protocol layer module
//!
//! Provides HTTP response builders shared by the dispatcher and the extension handlers.

pub mod response;

// Re-export commonly used builders
pub use response::{
    build_403_response, build_404_response, build_405_response, build_health_response,
    build_options_response, json_response,
};
