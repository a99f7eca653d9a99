//! Shared types for the storefront session crates
//!
//! `Secret` keeps bearer credentials out of logs; `Error` covers
//! configuration loading for the binaries.

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::{Secret, SecretString};
