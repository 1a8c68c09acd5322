//! Storage gateway: the single owner of the customer collection session.
//!
//! Every operation waits for the session to be established, and no storage
//! failure escapes as anything other than a [`GatewayError`].

use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

use crate::domain::customer::{
    Connector, Customer, CustomerId, CustomerRepository, StorageId, SEED_CUSTOMERS,
};
use crate::domain::DataAccessError;

pub const UPDATED: &str = "one record updated";
pub const DELETED: &str = "one record deleted";
pub const INVALID_CUSTOMER: &str = "invalid customer number";
pub const NOTHING_DELETED: &str = "no record deleted";
pub const DELETE_INCONSISTENT: &str = "error deleting records";

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// No document carries the requested id.
    #[error("{0}")]
    NotFound(&'static str),
    /// The collection broke the one-record-per-id assumption.
    #[error("{0}")]
    Inconsistent(&'static str),
    /// Backend failure, message passed through as is.
    #[error("{0}")]
    Storage(String),
    #[error("storage connection is closed")]
    Closed,
}

impl From<DataAccessError> for GatewayError {
    fn from(value: DataAccessError) -> Self {
        error!("{}", value);
        Self::Storage(value.to_string())
    }
}

pub struct CustomerGateway {
    connector: Box<dyn Connector>,
    repository: OnceCell<Box<dyn CustomerRepository>>,
    closed: AtomicBool,
}

impl CustomerGateway {
    pub fn new(connector: Box<dyn Connector>) -> Self {
        Self {
            connector,
            repository: OnceCell::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Establishes the session. Concurrent callers share one attempt; a failed
    /// attempt is retried by the next caller.
    pub async fn connect(&self) -> GatewayResult<()> {
        self.ready().await.map(|_| ())
    }

    async fn ready(&self) -> GatewayResult<&dyn CustomerRepository> {
        if self.closed.load(Ordering::Acquire) {
            return Err(GatewayError::Closed);
        }
        let repository = self
            .repository
            .get_or_try_init(|| async {
                let repository = self.connector.connect().await?;
                info!("storage session established");
                Ok::<_, DataAccessError>(repository)
            })
            .await?;
        Ok(repository.as_ref())
    }

    pub async fn list(&self) -> GatewayResult<Vec<Customer>> {
        Ok(self.ready().await?.all().await?)
    }

    pub async fn find_by_id(&self, raw_id: &str) -> GatewayResult<Customer> {
        let repository = self.ready().await?;
        let Some(id) = CustomerId::coerce(raw_id) else {
            return Err(GatewayError::NotFound(INVALID_CUSTOMER));
        };
        repository
            .find_one(id)
            .await?
            .ok_or(GatewayError::NotFound(INVALID_CUSTOMER))
    }

    pub async fn insert(&self, customer: Customer) -> GatewayResult<StorageId> {
        Ok(self.ready().await?.insert(customer).await?)
    }

    /// Merges `fields` into the record keyed by their `id`.
    ///
    /// Reports success even when no record matched.
    pub async fn update(&self, fields: Customer) -> GatewayResult<&'static str> {
        let repository = self.ready().await?;
        match fields.id() {
            Some(id) => {
                if repository.update_one(id, fields).await? == 0 {
                    debug!("update matched no customer with id {}", id);
                }
            }
            None => debug!("update skipped, customer id is not a number"),
        }
        Ok(UPDATED)
    }

    pub async fn delete_by_id(&self, raw_id: &str) -> GatewayResult<&'static str> {
        let repository = self.ready().await?;
        let Some(id) = CustomerId::coerce(raw_id) else {
            return Err(GatewayError::NotFound(NOTHING_DELETED));
        };
        match repository.delete_one(id).await? {
            0 => Err(GatewayError::NotFound(NOTHING_DELETED)),
            1 => Ok(DELETED),
            count => {
                warn!("{} customers deleted for id {}", count, id);
                Err(GatewayError::Inconsistent(DELETE_INCONSISTENT))
            }
        }
    }

    /// Replaces the whole collection with the seed records.
    ///
    /// The steps are not transactional; readers may see an empty or partial
    /// collection in between.
    pub async fn reset(&self) -> GatewayResult<String> {
        let repository = self.ready().await?;
        repository.delete_all().await?;
        repository.insert_many(SEED_CUSTOMERS.clone()).await?;
        let count = repository.all().await?.len();
        Ok(format!(
            "data was refreshed. There are now {} customer records!",
            count
        ))
    }

    /// Releases the session. Every later operation fails with
    /// [`GatewayError::Closed`].
    pub async fn close(&self) -> GatewayResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if let Some(repository) = self.repository.get() {
            repository.close().await?;
            info!("storage session closed");
        }
        Ok(())
    }
}
