use std::{collections::HashMap, time::Duration};

use log::trace;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::{sync::RwLock, time::Instant};

use crate::{engine::AggregationResult, error::StoreError, row::Row};

/// Upload as kept between the upload and status calls.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredData {
    pub id: String,
    pub filename: String,
    pub data: Vec<Row>,
    pub uploaded_at: String,
}

struct Entry {
    payload: String,
    expires_at: Instant,
}

/// Transient key-value store. Values are kept as JSON text and vanish once
/// their time-to-live has passed.
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
    ttl: Duration,
}

impl MemoryStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub async fn set_json<T: Serialize>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), StoreError> {
        let payload = serde_json::to_string(value).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;

        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let pruned = prune_expired(&mut entries, now);
        if pruned > 0 {
            trace!("pruned {pruned} expired entries");
        }
        entries.insert(
            key.to_string(),
            Entry {
                payload,
                expires_at: now + self.ttl,
            },
        );
        Ok(())
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>, StoreError> {
        let Some(payload) = self.live_payload(key).await else {
            return Ok(None);
        };

        serde_json::from_str(&payload)
            .map(Some)
            .map_err(|source| StoreError::Decode {
                key: key.to_string(),
                source,
            })
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    async fn live_payload(
        &self,
        key: &str,
    ) -> Option<String> {
        {
            let entries = self.entries.read().await;
            let entry = entries.get(key)?;
            if entry.expires_at > Instant::now() {
                return Some(entry.payload.clone());
            }
        }

        trace!("entry '{key}' expired");
        let mut entries = self.entries.write().await;
        if entries
            .get(key)
            .is_some_and(|entry| entry.expires_at <= Instant::now())
        {
            entries.remove(key);
        }
        None
    }

    pub async fn save_data(
        &self,
        data: &StoredData,
    ) -> Result<(), StoreError> {
        self.set_json(&data_key(&data.id), data).await
    }

    pub async fn get_data(
        &self,
        id: &str,
    ) -> Result<Option<StoredData>, StoreError> {
        self.get_json(&data_key(id)).await
    }

    pub async fn save_result(
        &self,
        id: &str,
        result: &AggregationResult,
    ) -> Result<(), StoreError> {
        self.set_json(&result_key(id), result).await
    }

    pub async fn get_result(
        &self,
        id: &str,
    ) -> Result<Option<AggregationResult>, StoreError> {
        self.get_json(&result_key(id)).await
    }
}

// Writes sweep the whole map so keys that are never read again still go.
fn prune_expired(
    entries: &mut HashMap<String, Entry>,
    now: Instant,
) -> usize {
    let before = entries.len();
    entries.retain(|_, entry| entry.expires_at > now);
    before - entries.len()
}

pub fn data_key(id: &str) -> String {
    format!("data:{id}")
}

pub fn result_key(id: &str) -> String {
    format!("result:{id}")
}
