use std::sync::Arc;

use custdb::gateway::CustomerGateway;

/// Shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<CustomerGateway>,
    pub api_key: Option<Arc<str>>,
}

impl AppState {
    pub fn new(gateway: Arc<CustomerGateway>, api_key: Option<String>) -> Self {
        Self {
            gateway,
            api_key: api_key.map(Arc::from),
        }
    }
}
