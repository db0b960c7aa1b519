//! Error code registry for the transport surface.

pub mod error_code;

pub use error_code::ErrorCode;
