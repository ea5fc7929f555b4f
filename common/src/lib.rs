pub mod clock;
pub mod config;
pub mod error;
pub mod launch;
pub mod lifecycle;
pub mod models;
pub mod session;
pub mod utils;

#[cfg(test)]
mod test_support;

pub use crate::clock::*;
pub use crate::config::*;
pub use crate::error::*;
pub use crate::utils::*;
