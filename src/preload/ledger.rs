//! Ledger read port
//!
//! The saved scene descriptor lives on the container, either under a dynamic
//! field or as a plain object field. Both are tried, dynamic field first.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

/// Field name the descriptor is stored under
pub const SCENE_CONFIG_FIELD: &str = "scene_config";

/// Read access to ledger objects
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Fields of an object, `None` if it does not exist
    async fn get_object_fields(&self, object_id: &str) -> anyhow::Result<Option<Value>>;

    /// Value of a dynamic field, `None` if it is not set
    async fn get_dynamic_field(&self, object_id: &str, key: &str) -> anyhow::Result<Option<Value>>;
}

/// Pull the descriptor text out of a field value
///
/// Ledger reads wrap values to varying depth: a bare string, `{value: ..}`,
/// or `{fields: {value: ..}}`.
fn descriptor_text(value: &Value) -> Option<&str> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.as_str()),
        Value::Object(map) => ["value", "fields", SCENE_CONFIG_FIELD]
            .iter()
            .filter_map(|key| map.get(*key))
            .find_map(descriptor_text),
        _ => None,
    }
}

/// Read the saved descriptor of a container
///
/// `Ok(None)` means no scene has been saved yet.
pub async fn read_descriptor(
    ledger: &dyn LedgerClient,
    container_id: &str,
) -> anyhow::Result<Option<String>> {
    match ledger
        .get_dynamic_field(container_id, SCENE_CONFIG_FIELD)
        .await
    {
        Ok(Some(value)) => {
            if let Some(text) = descriptor_text(&value) {
                return Ok(Some(text.to_string()));
            }
        }
        Ok(None) => {}
        Err(err) => log::debug!("Dynamic field read for {container_id} failed: {err:#}"),
    }

    let fields = ledger.get_object_fields(container_id).await?;
    Ok(fields
        .as_ref()
        .and_then(|f| f.get(SCENE_CONFIG_FIELD))
        .and_then(descriptor_text)
        .map(str::to_string))
}

/// Ledger backed by in-memory maps
#[derive(Debug, Default)]
pub struct MemoryLedger {
    objects: RwLock<HashMap<String, Value>>,
    dynamic_fields: RwLock<HashMap<(String, String), Value>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_object(&self, object_id: impl Into<String>, fields: Value) {
        self.objects.write().insert(object_id.into(), fields);
    }

    pub fn insert_dynamic_field(
        &self,
        object_id: impl Into<String>,
        key: impl Into<String>,
        value: Value,
    ) {
        self.dynamic_fields
            .write()
            .insert((object_id.into(), key.into()), value);
    }
}

#[async_trait]
impl LedgerClient for MemoryLedger {
    async fn get_object_fields(&self, object_id: &str) -> anyhow::Result<Option<Value>> {
        Ok(self.objects.read().get(object_id).cloned())
    }

    async fn get_dynamic_field(&self, object_id: &str, key: &str) -> anyhow::Result<Option<Value>> {
        Ok(self
            .dynamic_fields
            .read()
            .get(&(object_id.to_string(), key.to_string()))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_dynamic_field_wins() {
        let mut ledger = MockLedgerClient::new();
        ledger
            .expect_get_dynamic_field()
            .withf(|id, key| id.to_string() == "0xc" && key.to_string() == SCENE_CONFIG_FIELD)
            .returning(|_, _| Ok(Some(json!({"fields": {"value": "{\"v\":1}"}}))));
        ledger.expect_get_object_fields().never();

        let text = read_descriptor(&ledger, "0xc").await.unwrap();
        assert_eq!(text.as_deref(), Some("{\"v\":1}"));
    }

    #[tokio::test]
    async fn test_falls_back_to_object_fields() {
        let mut ledger = MockLedgerClient::new();
        ledger
            .expect_get_dynamic_field()
            .returning(|_, _| Err(anyhow::anyhow!("field not found")));
        ledger
            .expect_get_object_fields()
            .times(1)
            .returning(|_| Ok(Some(json!({"scene_config": "{\"v\":1}", "owner": "0x1"}))));

        let text = read_descriptor(&ledger, "0xc").await.unwrap();
        assert_eq!(text.as_deref(), Some("{\"v\":1}"));
    }

    #[tokio::test]
    async fn test_nothing_saved() {
        let ledger = MemoryLedger::new();
        ledger.insert_object("0xc", json!({"owner": "0x1"}));
        assert_eq!(read_descriptor(&ledger, "0xc").await.unwrap(), None);
        assert_eq!(read_descriptor(&ledger, "0xmissing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_object_read_error_propagates() {
        let mut ledger = MockLedgerClient::new();
        ledger.expect_get_dynamic_field().returning(|_, _| Ok(None));
        ledger
            .expect_get_object_fields()
            .returning(|_| Err(anyhow::anyhow!("rpc unavailable")));

        assert!(read_descriptor(&ledger, "0xc").await.is_err());
    }
}
