//! Teleconsultation facade
//!
//! The console's teleconsultation invoice tab is unpopulated upstream;
//! this facade exposes only the session verbs.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{paged_request, parse_item, parse_page, ListQuery, Page};
use crate::error::Result;
use crate::transport::{ApiRequest, Transport};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Teleconsultation {
    pub id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_link: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTeleconsultation {
    pub patient_id: String,
    pub doctor_id: String,
    pub scheduled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeleconsultationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_link: Option<String>,
}

#[derive(Clone)]
pub struct Teleconsultations {
    transport: Arc<Transport>,
}

impl Teleconsultations {
    pub(crate) fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    pub async fn list(
        &self,
        page: u32,
        page_size: u32,
        filters: ListQuery,
    ) -> Result<Page<Teleconsultation>> {
        let value = self
            .transport
            .request_json(paged_request("/teleconsultations", page, page_size, &filters))
            .await?;
        parse_page(value, page, page_size)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Teleconsultation> {
        let value = self
            .transport
            .request_json(ApiRequest::get(format!("/teleconsultations/{id}")))
            .await?;
        parse_item(value, Some("teleconsultation"))
    }

    pub async fn create(&self, payload: NewTeleconsultation) -> Result<Teleconsultation> {
        let value = self
            .transport
            .request_json(
                ApiRequest::post("/teleconsultations").json(serde_json::to_value(&payload)?),
            )
            .await?;
        parse_item(value, Some("teleconsultation"))
    }

    pub async fn update(&self, id: &str, patch: TeleconsultationPatch) -> Result<Teleconsultation> {
        let value = self
            .transport
            .request_json(
                ApiRequest::put(format!("/teleconsultations/{id}"))
                    .json(serde_json::to_value(&patch)?),
            )
            .await?;
        parse_item(value, Some("teleconsultation"))
    }
}
