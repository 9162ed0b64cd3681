//! HTTP request handlers
//!
//! - `api` - Status (liveness) endpoint
//! - `shutdown` - Lifecycle control endpoint
//! - `tts` - Text-to-speech synthesis endpoint

pub mod api;
pub mod shutdown;
pub mod tts;

// Re-export commonly used handlers for convenient access
pub use api::status;
pub use shutdown::shutdown;
pub use tts::generate_tts;
