use domain::RepositoryError;
use thiserror::Error;

use crate::hub::ClientId;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("client {0} is not connected")]
    UnknownClient(ClientId),
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ApplicationError {
    pub fn configuration(message: impl Into<String>) -> Self {
        ApplicationError::Configuration(message.into())
    }
}
