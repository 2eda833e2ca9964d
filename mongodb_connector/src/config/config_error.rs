use crate::error_chain_fmt;

#[derive(thiserror::Error)]
pub enum ConfigError {
    #[error("Either `hosts` or `connection_string` must be supplied")]
    MissingHostsError,
    #[error("Invalid connection string `{value}`")]
    InvalidConnectionString {
        value: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("`{include}` and `{exclude}` can't both be set")]
    ConflictingFilters {
        include: &'static str,
        exclude: &'static str,
    },
    #[error("Invalid filter pattern `{pattern}`")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("Unable to decode connector configuration")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}
impl std::fmt::Debug for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
