use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::Result;

/// Fields captured for one loan application, plus the customer the
/// conversation belongs to.
///
/// Clearing the context drops the captured fields but keeps the customer id,
/// so a session can start a fresh application after a terminal outcome.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    customer_id: String,
    data: BTreeMap<String, Value>,
}

impl Context {
    pub fn new(customer_id: impl Into<String>) -> Self {
        Self {
            customer_id: customer_id.into(),
            data: BTreeMap::new(),
        }
    }

    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Serialize) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.data.insert(key.into(), value);
        Ok(())
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw view of the captured fields, used for session snapshots.
    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.data
    }
}
