use std::{
    collections::HashMap,
    sync::{Arc, Mutex as StdMutex, PoisonError},
};

use chrono::{SecondsFormat, Utc};
use log::{debug, info};
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    config::Settings,
    engine::{AggregationResult, GroupSums, aggregate, aggregate_per_group},
    error::{ParseError, ServiceError},
    parser::{self, SourceFormat},
    store::{MemoryStore, StoredData},
};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub success: bool,
    pub id: String,
    pub filename: String,
    pub row_count: usize,
    pub format: SourceFormat,
    pub message: String,
}

/// Status payload: the aggregation result plus where it came from.
/// `filename` and `uploadedAt` are only known when the result was freshly
/// computed.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub success: bool,
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<String>,
    #[serde(flatten)]
    pub result: AggregationResult,
}

impl StatusReport {
    fn cached(result: AggregationResult) -> Self {
        Self {
            success: true,
            cached: true,
            filename: None,
            uploaded_at: None,
            result,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    /// Case-insensitive; JSON when no format is given.
    pub fn parse(format: Option<&str>) -> Result<Self, ServiceError> {
        let Some(format) = format.filter(|format| !format.is_empty()) else {
            return Ok(Self::Json);
        };

        match format.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            _ => Err(ServiceError::InvalidExportFormat(format.to_string())),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Json => "application/json",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportPayload {
    pub filename: String,
    pub content_type: &'static str,
    pub body: String,
}

/// Upload, summarize and export workflows over a transient store.
pub struct DatasetService {
    store: Arc<MemoryStore>,
    max_upload_bytes: usize,
    compute_locks: ComputeLocks,
}

type ComputeLocks = StdMutex<HashMap<String, Arc<Mutex<()>>>>;

/// Per-id compute lock handle. The map entry goes away with the last
/// handle, including when the owning future is dropped mid-compute.
struct InFlight<'a> {
    locks: &'a ComputeLocks,
    id: String,
    lock: Arc<Mutex<()>>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let last_handle = locks
            .get(&self.id)
            .is_some_and(|lock| Arc::ptr_eq(lock, &self.lock) && Arc::strong_count(lock) <= 2);
        if last_handle {
            locks.remove(&self.id);
        }
    }
}

impl DatasetService {
    pub fn new(
        store: Arc<MemoryStore>,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            store,
            max_upload_bytes,
            compute_locks: StdMutex::new(HashMap::new()),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            Arc::new(MemoryStore::new(settings.ttl)),
            settings.max_upload_bytes,
        )
    }

    pub async fn upload(
        &self,
        filename: &str,
        mime: Option<&str>,
        bytes: &[u8],
    ) -> Result<UploadReceipt, ServiceError> {
        if bytes.len() > self.max_upload_bytes {
            return Err(ParseError::TooLarge {
                size: bytes.len(),
                limit: self.max_upload_bytes,
            }
            .into());
        }

        let parsed = parser::parse_upload(filename, mime, bytes)?;
        let id = Uuid::new_v4().to_string();
        let row_count = parsed.data.len();

        self.store
            .save_data(&StoredData {
                id: id.clone(),
                filename: parsed.filename.clone(),
                data: parsed.data,
                uploaded_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            })
            .await?;

        info!("stored upload '{}' as {id} ({row_count} rows)", parsed.filename);

        Ok(UploadReceipt {
            success: true,
            id,
            filename: parsed.filename,
            row_count,
            format: parsed.format,
            message: "File uploaded and processed successfully".to_string(),
        })
    }

    /// Cached result when present, otherwise aggregates the stored upload and
    /// caches it. Concurrent calls for one id aggregate at most once.
    pub async fn status(
        &self,
        id: &str,
    ) -> Result<StatusReport, ServiceError> {
        let id = validate_id(id)?;

        if let Some(result) = self.store.get_result(id).await? {
            debug!("result cache hit for {id}");
            return Ok(StatusReport::cached(result));
        }

        let in_flight = self.in_flight(id);
        let _guard = in_flight.lock.lock().await;
        self.compute_status(id).await
    }

    async fn compute_status(
        &self,
        id: &str,
    ) -> Result<StatusReport, ServiceError> {
        if let Some(result) = self.store.get_result(id).await? {
            debug!("result for {id} computed by a concurrent caller");
            return Ok(StatusReport::cached(result));
        }

        let stored = self
            .store
            .get_data(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound { id: id.to_string() })?;

        debug!("result cache miss for {id}; aggregating {} rows", stored.data.len());
        let result = aggregate(&stored.data);
        self.store.save_result(id, &result).await?;

        Ok(StatusReport {
            success: true,
            cached: false,
            filename: Some(stored.filename),
            uploaded_at: Some(stored.uploaded_at),
            result,
        })
    }

    fn in_flight(
        &self,
        id: &str,
    ) -> InFlight<'_> {
        let lock = self
            .compute_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(id.to_string())
            .or_default()
            .clone();

        InFlight {
            locks: &self.compute_locks,
            id: id.to_string(),
            lock,
        }
    }

    #[cfg(test)]
    fn pending_computations(&self) -> usize {
        self.compute_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Per-group sums of `field` over the automatically chosen grouping.
    pub async fn group_sums(
        &self,
        id: &str,
        field: &str,
    ) -> Result<GroupSums, ServiceError> {
        let report = self.status(id).await?;
        Ok(aggregate_per_group(&report.result.grouped_data, field))
    }

    pub async fn export(
        &self,
        id: &str,
        format: Option<&str>,
    ) -> Result<ExportPayload, ServiceError> {
        let id = validate_id(id)?;
        let format = ExportFormat::parse(format)?;

        let stored = self
            .store
            .get_data(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound { id: id.to_string() })?;

        let body = match format {
            ExportFormat::Csv => parser::to_csv(&stored.data)?,
            ExportFormat::Json => serde_json::to_string(&stored.data)?,
        };

        Ok(ExportPayload {
            filename: format!(
                "{}_export.{}",
                strip_extension(&stored.filename),
                format.extension()
            ),
            content_type: format.content_type(),
            body,
        })
    }
}

fn validate_id(id: &str) -> Result<&str, ServiceError> {
    if id.is_empty() {
        return Err(ServiceError::InvalidId);
    }
    Ok(id)
}

/// Drops the last extension of the final path segment.
pub fn strip_extension(filename: &str) -> &str {
    match filename.rsplit_once('.') {
        Some((base, extension)) if !extension.is_empty() && !extension.contains('/') => base,
        _ => filename,
    }
}
