pub mod types;
pub mod error;
pub mod broker;
pub mod market;
pub mod server;
pub mod display;
pub mod config;

pub use error::{KiteError, Result};
pub use types::*;
