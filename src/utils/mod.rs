// Utility functions
pub mod cache;
pub mod error;
pub mod time;

pub use cache::*;
pub use error::*;
