pub mod analysis;
pub mod config;
pub mod error;
pub mod llm;
pub mod server;
pub mod theme;

pub use error::{Error, Result};
