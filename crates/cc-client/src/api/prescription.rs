//! Prescription facade

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{paged_request, parse_item, parse_page, ListQuery, Page};
use crate::error::Result;
use crate::transport::{ApiRequest, Transport};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub id: String,
    pub patient_id: String,
    pub doctor_id: String,
    #[serde(default)]
    pub medications: Vec<Medication>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPrescription {
    pub patient_id: String,
    pub doctor_id: String,
    pub medications: Vec<Medication>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medications: Option<Vec<Medication>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Clone)]
pub struct Prescriptions {
    transport: Arc<Transport>,
}

impl Prescriptions {
    pub(crate) fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    pub async fn list(
        &self,
        page: u32,
        page_size: u32,
        filters: ListQuery,
    ) -> Result<Page<Prescription>> {
        let value = self
            .transport
            .request_json(paged_request("/prescriptions", page, page_size, &filters))
            .await?;
        parse_page(value, page, page_size)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Prescription> {
        let value = self
            .transport
            .request_json(ApiRequest::get(format!("/prescriptions/{id}")))
            .await?;
        parse_item(value, Some("prescription"))
    }

    pub async fn create(&self, payload: NewPrescription) -> Result<Prescription> {
        let value = self
            .transport
            .request_json(ApiRequest::post("/prescriptions").json(serde_json::to_value(&payload)?))
            .await?;
        parse_item(value, Some("prescription"))
    }

    pub async fn update(&self, id: &str, patch: PrescriptionPatch) -> Result<Prescription> {
        let value = self
            .transport
            .request_json(
                ApiRequest::put(format!("/prescriptions/{id}")).json(serde_json::to_value(&patch)?),
            )
            .await?;
        parse_item(value, Some("prescription"))
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.transport
            .request_unit(ApiRequest::delete(format!("/prescriptions/{id}")))
            .await
    }
}
