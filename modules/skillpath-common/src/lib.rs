pub mod config;
pub mod error;
pub mod quality;
pub mod types;
pub mod vector;

pub use config::{Config, Tuning};
pub use error::SkillpathError;
pub use quality::*;
pub use types::*;
