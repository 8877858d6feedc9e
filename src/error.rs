use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] libsql::Error),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Theme error: {0}")]
    Theme(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Address parse error: {0}")]
    AddrParse(#[from] std::net::AddrParseError),

    #[error("OpenAI error: {0}")]
    OpenAi(#[from] async_openai::error::OpenAIError),

    #[error("Unknown message role: {role}")]
    UnknownRole { role: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    pub fn theme(msg: impl Into<String>) -> Self {
        Self::Theme(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// The underlying message, without the variant label.
    pub fn message(&self) -> String {
        match self {
            Self::Config(msg) | Self::Llm(msg) | Self::Theme(msg) | Self::Internal(msg) => {
                msg.clone()
            }
            Self::Database(e) => e.to_string(),
            Self::Serialization(e) => e.to_string(),
            Self::Yaml(e) => e.to_string(),
            Self::Io(e) => e.to_string(),
            Self::AddrParse(e) => e.to_string(),
            Self::OpenAi(e) => e.to_string(),
            Self::UnknownRole { role } => format!("Unknown message role: {role}"),
        }
    }
}
