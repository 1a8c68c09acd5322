pub mod customer;

use std::error::Error;
use thiserror::Error;

pub type BoxError = Box<dyn Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum DataAccessError {
    #[error("Database connection error: {0}")]
    ConnectionError(BoxError),
    #[error("Database query error: {0}")]
    QueryError(BoxError),
    #[error("Data read error: {0}")]
    ReadError(BoxError),
    #[error("Data write error: {0}")]
    WriteError(BoxError),
    #[error("Client side error: {0}")]
    ClientSideError(BoxError),
}
