//! Server test support utilities
//!
//! Shared helpers for unit and integration tests: unified logging
//! initialization that is safe to call from any number of test binaries.

pub mod logging;
