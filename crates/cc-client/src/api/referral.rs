//! Referral facade

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{paged_request, parse_item, parse_page, ListQuery, Page};
use crate::error::Result;
use crate::transport::{ApiRequest, Transport};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Referral {
    pub id: String,
    pub patient_id: String,
    pub referring_doctor_id: String,
    pub specialty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReferral {
    pub patient_id: String,
    pub referring_doctor_id: String,
    pub specialty: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Clone)]
pub struct Referrals {
    transport: Arc<Transport>,
}

impl Referrals {
    pub(crate) fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    pub async fn list(&self, page: u32, page_size: u32, filters: ListQuery) -> Result<Page<Referral>> {
        let value = self
            .transport
            .request_json(paged_request("/referrals", page, page_size, &filters))
            .await?;
        parse_page(value, page, page_size)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Referral> {
        let value = self
            .transport
            .request_json(ApiRequest::get(format!("/referrals/{id}")))
            .await?;
        parse_item(value, Some("referral"))
    }

    pub async fn create(&self, payload: NewReferral) -> Result<Referral> {
        let value = self
            .transport
            .request_json(ApiRequest::post("/referrals").json(serde_json::to_value(&payload)?))
            .await?;
        parse_item(value, Some("referral"))
    }

    pub async fn update(&self, id: &str, patch: ReferralPatch) -> Result<Referral> {
        let value = self
            .transport
            .request_json(
                ApiRequest::put(format!("/referrals/{id}")).json(serde_json::to_value(&patch)?),
            )
            .await?;
        parse_item(value, Some("referral"))
    }
}
