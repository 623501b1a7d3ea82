pub mod errors;
pub mod id;

pub use errors::{BotdeckError, ConfigError};
pub use id::ProjectId;

pub type Result<T> = std::result::Result<T, BotdeckError>;
