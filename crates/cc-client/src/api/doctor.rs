//! Doctor facade
//!
//! Creation accepts an optional profile image, sent as multipart with
//! the record under a `data` field and the image under `imageFile`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{
    multipart_with_image, paged_request, parse_item, parse_page, ImageFile, ListQuery, Page,
};
use crate::cache::{namespaces, TtlCache};
use crate::error::Result;
use crate::transport::{ApiRequest, Transport};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uhid: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDoctor {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
}

/// Response shape of a standalone image upload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUpload {
    pub url: String,
}

#[derive(Clone)]
pub struct Doctors {
    transport: Arc<Transport>,
    cache: TtlCache,
}

impl Doctors {
    pub(crate) fn new(transport: Arc<Transport>, cache: TtlCache) -> Self {
        Self { transport, cache }
    }

    /// List doctors. The unfiltered first page is served from the
    /// `doctorsList` cache when fresh.
    pub async fn list(&self, page: u32, page_size: u32, filters: ListQuery) -> Result<Page<Doctor>> {
        let cacheable = page == 1 && filters.is_empty();
        if cacheable {
            if let Some(items) = self.cache.get::<Vec<Doctor>>(namespaces::DOCTORS_LIST, "page1") {
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
            .request_json(paged_request("/doctors", page, page_size, &filters))
            .await?;
        let result = parse_page(value, page, page_size)?;

        if cacheable && result.total_pages <= 1 {
            self.cache.put(namespaces::DOCTORS_LIST, "page1", &result.items);
        }
        Ok(result)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Doctor> {
        let value = self
            .transport
            .request_json(ApiRequest::get(format!("/doctors/{id}")))
            .await?;
        parse_item(value, Some("doctor"))
    }

    /// Create a doctor, optionally with a profile image.
    pub async fn create(&self, payload: NewDoctor, image: Option<ImageFile>) -> Result<Doctor> {
        let form = multipart_with_image(&payload, image)?;
        let value = self
            .transport
            .request_json(ApiRequest::post("/doctors").multipart(form))
            .await?;
        self.cache.invalidate(namespaces::DOCTORS_LIST);
        parse_item(value, Some("doctor"))
    }

    pub async fn update(&self, id: &str, patch: DoctorPatch) -> Result<Doctor> {
        let value = self
            .transport
            .request_json(
                ApiRequest::put(format!("/doctors/{id}")).json(serde_json::to_value(&patch)?),
            )
            .await?;
        self.cache.invalidate(namespaces::DOCTORS_LIST);
        parse_item(value, Some("doctor"))
    }

    pub async fn activate(&self, id: &str) -> Result<Doctor> {
        self.set_active(id, true).await
    }

    pub async fn deactivate(&self, id: &str) -> Result<Doctor> {
        self.set_active(id, false).await
    }

    async fn set_active(&self, id: &str, active: bool) -> Result<Doctor> {
        let verb = if active { "activate" } else { "deactivate" };
        let value = self
            .transport
            .request_json(ApiRequest::patch(format!("/doctors/{id}/{verb}")))
            .await?;
        self.cache.invalidate(namespaces::DOCTORS_LIST);
        parse_item(value, Some("doctor"))
    }

    /// Upload a profile image on its own, returning its URL.
    pub async fn upload_image(&self, image: ImageFile) -> Result<ImageUpload> {
        let form = reqwest::multipart::Form::new().part("imageFile", image.into_part()?);
        let value = self
            .transport
            .request_json(ApiRequest::post("/doctors/upload-image").multipart(form))
            .await?;
        parse_item(value, None)
    }
}
