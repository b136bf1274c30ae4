// Utility functions
pub mod config;
pub mod error;
pub mod text;

pub use config::*;
pub use error::*;
