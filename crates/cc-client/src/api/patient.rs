//! Patient facade

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{paged_request, parse_item, parse_page, ListQuery, Page};
use crate::cache::{namespaces, TtlCache};
use crate::error::Result;
use crate::transport::{ApiRequest, Transport};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    /// Human-readable unique id; opaque to the client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uhid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinic_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPatient {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Clone)]
pub struct Patients {
    transport: Arc<Transport>,
    cache: TtlCache,
}

impl Patients {
    pub(crate) fn new(transport: Arc<Transport>, cache: TtlCache) -> Self {
        Self { transport, cache }
    }

    /// List patients. The unfiltered first page is served from the
    /// `patientsList` cache when fresh.
    pub async fn list(&self, page: u32, page_size: u32, filters: ListQuery) -> Result<Page<Patient>> {
        let cacheable = page == 1 && filters.is_empty();
        if cacheable {
            if let Some(items) = self.cache.get::<Vec<Patient>>(namespaces::PATIENTS_LIST, "page1") {
                return Ok(Page {
                    page: 1,
                    page_size,
                    total_pages: 1,
                    total_items: items.len() as u64,
                    items,
                });
            }
        }

        let value = self
            .transport
            .request_json(paged_request("/patients", page, page_size, &filters))
            .await?;
        let result = parse_page(value, page, page_size)?;

        if cacheable && result.total_pages <= 1 {
            self.cache.put(namespaces::PATIENTS_LIST, "page1", &result.items);
        }
        Ok(result)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Patient> {
        let value = self
            .transport
            .request_json(ApiRequest::get(format!("/patients/{id}")))
            .await?;
        parse_item(value, Some("patient"))
    }

    pub async fn create(&self, payload: NewPatient) -> Result<Patient> {
        let value = self
            .transport
            .request_json(ApiRequest::post("/patients").json(serde_json::to_value(&payload)?))
            .await?;
        self.cache.invalidate(namespaces::PATIENTS_LIST);
        parse_item(value, Some("patient"))
    }

    pub async fn update(&self, id: &str, patch: PatientPatch) -> Result<Patient> {
        let value = self
            .transport
            .request_json(
                ApiRequest::put(format!("/patients/{id}")).json(serde_json::to_value(&patch)?),
            )
            .await?;
        self.cache.invalidate(namespaces::PATIENTS_LIST);
        parse_item(value, Some("patient"))
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.transport
            .request_unit(ApiRequest::delete(format!("/patients/{id}")))
            .await?;
        self.cache.invalidate(namespaces::PATIENTS_LIST);
        Ok(())
    }
}
