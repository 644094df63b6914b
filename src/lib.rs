pub mod bing;
pub mod config;
pub mod error;
pub mod setter;

pub use error::{Result, SyncError};
