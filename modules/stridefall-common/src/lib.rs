pub mod config;
pub mod constants;
pub mod error;
pub mod level;
pub mod types;

pub use config::Config;
pub use constants::*;
pub use error::ClaimError;
pub use level::*;
pub use types::*;
