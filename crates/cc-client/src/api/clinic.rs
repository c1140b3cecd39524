//! Clinic profile facade

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::parse_item;
use crate::error::Result;
use crate::transport::{ApiRequest, Transport};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicProfile {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Clone)]
pub struct Clinic {
    transport: Arc<Transport>,
}

impl Clinic {
    pub(crate) fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    /// Profile of the clinic the signed-in identity belongs to.
    pub async fn get_profile(&self) -> Result<ClinicProfile> {
        let value = self
            .transport
            .request_json(ApiRequest::get("/clinic/profile"))
            .await?;
        parse_item(value, Some("clinic"))
    }

    pub async fn update_profile(&self, patch: ClinicProfilePatch) -> Result<ClinicProfile> {
        let value = self
            .transport
            .request_json(ApiRequest::put("/clinic/profile").json(serde_json::to_value(&patch)?))
            .await?;
        parse_item(value, Some("clinic"))
    }
}
