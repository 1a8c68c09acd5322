use async_trait::async_trait;
use meilisearch_sdk::{
    documents::DocumentsQuery, errors::Error, indexes::Index, task_info::TaskInfo, Client,
};
use serde_json::{Map, Value};
use tracing::debug;

use crate::domain::customer::{
    Connector, Customer, CustomerId, CustomerRepository, StorageId, STORAGE_ID_FIELD,
};
use crate::domain::DataAccessError;
use crate::MeiliSearch;

type Document = Map<String, Value>;

const PAGE_SIZE: usize = 1000;
const MATCH_LIMIT: usize = 100;
const FILTERABLE_ATTRIBUTES: [&str; 3] = ["id", "email", "password"];

#[derive(Clone)]
pub struct MeiliCustomerRepository {
    client: Client,
    index: Index,
}

impl MeiliCustomerRepository {
    pub fn new(client: Client, index: Index) -> Self {
        Self { client, index }
    }

    /// Blocks until the task is processed; a failed task is a write error.
    async fn settle(&self, task: TaskInfo) -> Result<(), DataAccessError> {
        let task = task.wait_for_completion(&self.client, None, None).await?;
        if task.is_failure() {
            return Err(DataAccessError::WriteError(Box::new(Error::Meilisearch(
                task.unwrap_failure(),
            ))));
        }
        Ok(())
    }

    async fn find_document(&self, id: CustomerId) -> Result<Option<Document>, DataAccessError> {
        let filter = format!("id = {}", id);
        let results = self
            .index
            .search()
            .with_filter(&filter)
            .with_limit(MATCH_LIMIT)
            .execute::<Document>()
            .await?;
        Ok(first_with_id(results.hits.into_iter().map(|hit| hit.result), id))
    }
}

/// The filter `id = N` also matches the string `"N"`, so hits are checked again
/// against the numeric id.
fn first_with_id(
    documents: impl IntoIterator<Item = Document>,
    id: CustomerId,
) -> Option<Document> {
    documents
        .into_iter()
        .find(|document| Customer::from_fields(document.clone()).has_id(id))
}

fn storage_key(document: &Document) -> Result<String, DataAccessError> {
    document
        .get(STORAGE_ID_FIELD)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| DataAccessError::ReadError("document has no storage id".into()))
}

#[async_trait]
impl CustomerRepository for MeiliCustomerRepository {
    async fn all(&self) -> Result<Vec<Customer>, DataAccessError> {
        let mut customers = Vec::new();
        let mut offset = 0;
        loop {
            let mut query = DocumentsQuery::new(&self.index);
            query.with_offset(offset).with_limit(PAGE_SIZE);
            let page = self.index.get_documents_with::<Document>(&query).await?;
            let fetched = page.results.len();
            customers.extend(page.results.into_iter().map(Customer::from_fields));
            offset += fetched;
            if fetched < PAGE_SIZE {
                break;
            }
        }
        Ok(customers)
    }

    async fn find_one(&self, id: CustomerId) -> Result<Option<Customer>, DataAccessError> {
        Ok(self.find_document(id).await?.map(Customer::from_fields))
    }

    async fn insert(&self, customer: Customer) -> Result<StorageId, DataAccessError> {
        let storage_id = StorageId::generate();
        let task = self
            .index
            .add_documents(&[customer.with_storage_id(storage_id)], Some(STORAGE_ID_FIELD))
            .await?;
        self.settle(task).await?;
        Ok(storage_id)
    }

    async fn update_one(&self, id: CustomerId, fields: Customer) -> Result<u64, DataAccessError> {
        let Some(document) = self.find_document(id).await? else {
            return Ok(0);
        };
        let mut partial = fields.into_inner();
        partial.insert(STORAGE_ID_FIELD.to_owned(), Value::from(storage_key(&document)?));
        let task = self
            .index
            .add_or_update(&[partial], Some(STORAGE_ID_FIELD))
            .await?;
        self.settle(task).await?;
        Ok(1)
    }

    async fn delete_one(&self, id: CustomerId) -> Result<u64, DataAccessError> {
        let Some(document) = self.find_document(id).await? else {
            return Ok(0);
        };
        let task = self.index.delete_document(storage_key(&document)?).await?;
        self.settle(task).await?;
        Ok(1)
    }

    async fn delete_all(&self) -> Result<(), DataAccessError> {
        let task = self.index.delete_all_documents().await?;
        self.settle(task).await
    }

    async fn insert_many(&self, customers: Vec<Customer>) -> Result<(), DataAccessError> {
        let documents = customers
            .iter()
            .map(|customer| customer.with_storage_id(StorageId::generate()))
            .collect::<Vec<_>>();
        let task = self
            .index
            .add_documents(&documents, Some(STORAGE_ID_FIELD))
            .await?;
        self.settle(task).await
    }

    async fn close(&self) -> Result<(), DataAccessError> {
        // HTTP client, nothing held open between requests.
        debug!("meilisearch index {} released", self.index.uid);
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct MeiliConnector {
    url: String,
    api_key: Option<String>,
    index: String,
}

impl From<&MeiliSearch> for MeiliConnector {
    fn from(value: &MeiliSearch) -> Self {
        Self {
            url: value.url.clone(),
            api_key: value.api_key.clone(),
            index: value.index.clone(),
        }
    }
}

#[async_trait]
impl Connector for MeiliConnector {
    async fn connect(&self) -> Result<Box<dyn CustomerRepository>, DataAccessError> {
        let client = Client::new(&self.url, self.api_key.as_deref().unwrap_or_default());
        client.health().await?;
        let index = client.index(&self.index);
        let repository = MeiliCustomerRepository::new(client, index);
        let task = repository
            .index
            .set_filterable_attributes(&FILTERABLE_ATTRIBUTES)
            .await?;
        repository.settle(task).await?;
        Ok(Box::new(repository))
    }
}
