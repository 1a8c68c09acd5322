use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::customer::{
    Connector, Customer, CustomerId, CustomerRepository, StorageId,
};
use crate::domain::DataAccessError;

/// In-process customer collection. Clones share the same documents.
#[derive(Clone, Default)]
pub struct MemoryCustomerRepository {
    documents: Arc<RwLock<Vec<(StorageId, Customer)>>>,
}

impl MemoryCustomerRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored documents with their storage identity, in insertion order.
    pub async fn documents(&self) -> Vec<(StorageId, Customer)> {
        self.documents.read().await.clone()
    }
}

#[async_trait]
impl CustomerRepository for MemoryCustomerRepository {
    async fn all(&self) -> Result<Vec<Customer>, DataAccessError> {
        Ok(self
            .documents
            .read()
            .await
            .iter()
            .map(|(_, customer)| customer.clone())
            .collect())
    }

    async fn find_one(&self, id: CustomerId) -> Result<Option<Customer>, DataAccessError> {
        Ok(self
            .documents
            .read()
            .await
            .iter()
            .find(|(_, customer)| customer.has_id(id))
            .map(|(_, customer)| customer.clone()))
    }

    async fn insert(&self, customer: Customer) -> Result<StorageId, DataAccessError> {
        let storage_id = StorageId::generate();
        self.documents.write().await.push((storage_id, customer));
        Ok(storage_id)
    }

    async fn update_one(&self, id: CustomerId, fields: Customer) -> Result<u64, DataAccessError> {
        let mut documents = self.documents.write().await;
        match documents.iter_mut().find(|(_, customer)| customer.has_id(id)) {
            Some((_, customer)) => {
                customer.merge(fields);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_one(&self, id: CustomerId) -> Result<u64, DataAccessError> {
        let mut documents = self.documents.write().await;
        match documents.iter().position(|(_, customer)| customer.has_id(id)) {
            Some(index) => {
                documents.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_all(&self) -> Result<(), DataAccessError> {
        self.documents.write().await.clear();
        Ok(())
    }

    async fn insert_many(&self, customers: Vec<Customer>) -> Result<(), DataAccessError> {
        self.documents.write().await.extend(
            customers
                .into_iter()
                .map(|customer| (StorageId::generate(), customer)),
        );
        Ok(())
    }

    async fn close(&self) -> Result<(), DataAccessError> {
        Ok(())
    }
}

/// Hands out a shared [`MemoryCustomerRepository`].
#[derive(Clone, Default)]
pub struct MemoryConnector {
    repository: MemoryCustomerRepository,
}

impl MemoryConnector {
    pub fn new(repository: MemoryCustomerRepository) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self) -> Result<Box<dyn CustomerRepository>, DataAccessError> {
        Ok(Box::new(self.repository.clone()))
    }
}
