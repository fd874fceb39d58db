//! CLI command implementations
//!
//! Every command returns the process exit code: 0 success, 1 build finished
//! with dropped entries, 2 configuration or recipe error, 5 fatal error.

pub mod build;
pub mod init;
pub mod recipe;
pub mod validate;
