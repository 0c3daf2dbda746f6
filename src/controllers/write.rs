//! Write-side controller.

use std::sync::Arc;

use serde_json::Value;

use crate::core::storage::StorageEngine;
use crate::errors::{GatewayError, GatewayResult};
use crate::request::Request;

pub struct WriteController {
    storage: Arc<dyn StorageEngine>,
}

impl WriteController {
    pub fn new(storage: Arc<dyn StorageEngine>) -> Self {
        Self { storage }
    }

    /// Persist a new document.
    ///
    /// An empty content is a validation error before the storage engine
    /// is ever consulted.
    pub async fn create(&self, request: &Request) -> GatewayResult<Value> {
        let content = request.content();
        let empty = match content {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            _ => false,
        };
        if empty {
            return Err(GatewayError::Validation(
                "cannot create a document from an empty body".to_string(),
            ));
        }

        Ok(self.storage.create(request).await?)
    }
}
