//! # docshare-shared
//!
//! Domain types, constants and the error vocabulary shared by the store,
//! sync and client crates.

pub mod constants;
pub mod error;
pub mod models;
pub mod time;

pub use error::{ModerationError, SyncError};
pub use models::*;
