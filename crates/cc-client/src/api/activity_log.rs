//! Activity log facade
//!
//! Read side of the audit trail plus the `record` verb the audit hook
//! drains into. Exports come back as raw bytes in whatever format the
//! caller asked for.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{paged_request, parse_item, parse_page, ListQuery, Page};
use crate::error::Result;
use crate::transport::{ApiRequest, Transport};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: String,
    pub activity_type: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewActivityLog {
    pub activity_type: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Export format accepted by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Pdf,
}

impl ExportFormat {
    fn as_str(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Pdf => "pdf",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportQuery {
    pub activity_type: Option<String>,
    pub start_date: NaiveDate,
    pub format: ExportFormat,
}

#[derive(Clone)]
pub struct ActivityLogs {
    transport: Arc<Transport>,
}

impl ActivityLogs {
    pub(crate) fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    pub async fn list(
        &self,
        page: u32,
        page_size: u32,
        filters: ListQuery,
    ) -> Result<Page<ActivityLog>> {
        let value = self
            .transport
            .request_json(paged_request("/activity-logs", page, page_size, &filters))
            .await?;
        parse_page(value, page, page_size)
    }

    /// Append one entry to the trail. Primary handlers never await
    /// this directly; they go through the audit hook.
    pub async fn record(&self, payload: NewActivityLog) -> Result<ActivityLog> {
        let value = self
            .transport
            .request_json(ApiRequest::post("/activity-logs").json(serde_json::to_value(&payload)?))
            .await?;
        parse_item(value, Some("activityLog"))
    }

    /// Download the trail as raw bytes (CSV or PDF).
    pub async fn export(&self, query: ExportQuery) -> Result<Vec<u8>> {
        self.transport
            .request_bytes(
                ApiRequest::get("/activity-logs/export")
                    .query_opt("activityType", query.activity_type.as_deref())
                    .query("startDate", query.start_date)
                    .query("format", query.format.as_str()),
            )
            .await
    }
}
