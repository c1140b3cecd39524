//! Nurse facade
//!
//! Same contract as the doctor facade: multipart creation with an
//! optional profile image, activate/deactivate verbs.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::doctor::ImageUpload;
use super::{
    multipart_with_image, paged_request, parse_item, parse_page, ImageFile, ListQuery, Page,
};
use crate::error::Result;
use crate::transport::{ApiRequest, Transport};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nurse {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// nurse, headNurse, or supervisor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uhid: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNurse {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NursePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,
}

#[derive(Clone)]
pub struct Nurses {
    transport: Arc<Transport>,
}

impl Nurses {
    pub(crate) fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    pub async fn list(&self, page: u32, page_size: u32, filters: ListQuery) -> Result<Page<Nurse>> {
        let value = self
            .transport
            .request_json(paged_request("/nurses", page, page_size, &filters))
            .await?;
        parse_page(value, page, page_size)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Nurse> {
        let value = self
            .transport
            .request_json(ApiRequest::get(format!("/nurses/{id}")))
            .await?;
        parse_item(value, Some("nurse"))
    }

    pub async fn create(&self, payload: NewNurse, image: Option<ImageFile>) -> Result<Nurse> {
        let form = multipart_with_image(&payload, image)?;
        let value = self
            .transport
            .request_json(ApiRequest::post("/nurses").multipart(form))
            .await?;
        parse_item(value, Some("nurse"))
    }

    pub async fn update(&self, id: &str, patch: NursePatch) -> Result<Nurse> {
        let value = self
            .transport
            .request_json(
                ApiRequest::put(format!("/nurses/{id}")).json(serde_json::to_value(&patch)?),
            )
            .await?;
        parse_item(value, Some("nurse"))
    }

    pub async fn activate(&self, id: &str) -> Result<Nurse> {
        self.set_active(id, true).await
    }

    pub async fn deactivate(&self, id: &str) -> Result<Nurse> {
        self.set_active(id, false).await
    }

    async fn set_active(&self, id: &str, active: bool) -> Result<Nurse> {
        let verb = if active { "activate" } else { "deactivate" };
        let value = self
            .transport
            .request_json(ApiRequest::patch(format!("/nurses/{id}/{verb}")))
            .await?;
        parse_item(value, Some("nurse"))
    }

    pub async fn upload_image(&self, image: ImageFile) -> Result<ImageUpload> {
        let form = reqwest::multipart::Form::new().part("imageFile", image.into_part()?);
        let value = self
            .transport
            .request_json(ApiRequest::post("/nurses/upload-image").multipart(form))
            .await?;
        parse_item(value, None)
    }
}
