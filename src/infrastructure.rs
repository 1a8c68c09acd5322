pub mod meilisearch;
pub mod memory;

use meilisearch_sdk::errors::Error;

use crate::domain::customer::Connector;
use crate::domain::DataAccessError;
use crate::{Backend, CustdbConfig};

use self::meilisearch::MeiliConnector;
use self::memory::MemoryConnector;

impl From<Error> for DataAccessError {
    fn from(value: Error) -> Self {
        match value {
            Error::UnreachableServer | Error::Timeout => Self::ConnectionError(Box::new(value)),
            Error::Meilisearch(_) => Self::QueryError(Box::new(value)),
            Error::ParseError(_) => Self::ReadError(Box::new(value)),
            _ => Self::ClientSideError(Box::new(value)),
        }
    }
}

/// Picks the storage backend named in the configuration.
pub fn connector(config: &CustdbConfig) -> Box<dyn Connector> {
    match config.storage.backend {
        Backend::Meilisearch => Box::new(MeiliConnector::from(&config.meilisearch)),
        Backend::Memory => Box::new(MemoryConnector::default()),
    }
}
