//! Core building blocks for idphoto
//!
//! - **config**: idphoto.toml parsing, validation and registry construction
//! - **error**: Error types with contextual help messages and exit codes
//! - **image**: Validated image buffers and format sniffing

pub mod config;
pub mod error;
pub mod image;
