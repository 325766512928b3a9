use thiserror::Error;

/// A bot's settings failed validation. Fatal to starting that bot.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("bot '{bot}': invalid `{field}`: {reason}")]
pub struct ConfigurationError {
    pub bot: String,
    pub field: &'static str,
    pub reason: String,
}

impl ConfigurationError {
    pub fn new(bot: impl Into<String>, field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            bot: bot.into(),
            field,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
