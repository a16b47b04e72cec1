pub mod chat;
pub mod chunker;
pub mod config;
pub mod error;
pub mod trace;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
