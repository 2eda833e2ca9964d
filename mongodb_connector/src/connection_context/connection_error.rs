use crate::error_chain_fmt;

#[derive(thiserror::Error)]
pub enum ConnectionError {
    #[error("The client pool has been shut down")]
    PoolClosed,
    #[error("Operation was interrupted")]
    Interrupted,
    #[error("Error while attempting to {description}")]
    Fatal {
        description: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("Operation failed and connection to '{replica_set}' termination requested")]
    Terminated {
        replica_set: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("Unable to discover the cluster topology: {0}")]
    Discovery(String),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}
impl std::fmt::Debug for ConnectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ConnectionError {
    /// Returns `true` when `error` carries a [`ConnectionError::Interrupted`].
    pub fn is_interrupted(error: &anyhow::Error) -> bool {
        matches!(
            error.downcast_ref::<ConnectionError>(),
            Some(ConnectionError::Interrupted)
        )
    }

    /// Returns `true` when `error` carries a [`ConnectionError::PoolClosed`].
    pub fn is_pool_closed(error: &anyhow::Error) -> bool {
        matches!(
            error.downcast_ref::<ConnectionError>(),
            Some(ConnectionError::PoolClosed)
        )
    }
}
