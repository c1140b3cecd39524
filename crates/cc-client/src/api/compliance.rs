//! Compliance alert facade
//!
//! The dashboard compliance rate is a single number refreshed at most
//! once per TTL window; resolving an alert invalidates it so the next
//! widget render refetches.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{paged_request, parse_item, parse_page, ListQuery, Page};
use crate::cache::{namespaces, TtlCache};
use crate::error::Result;
use crate::transport::{ApiRequest, Transport};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceAlert {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default)]
    pub resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct ComplianceAlerts {
    transport: Arc<Transport>,
    cache: TtlCache,
}

impl ComplianceAlerts {
    pub(crate) fn new(transport: Arc<Transport>, cache: TtlCache) -> Self {
        Self { transport, cache }
    }

    pub async fn list(
        &self,
        page: u32,
        page_size: u32,
        filters: ListQuery,
    ) -> Result<Page<ComplianceAlert>> {
        let value = self
            .transport
            .request_json(paged_request("/compliance-alerts", page, page_size, &filters))
            .await?;
        parse_page(value, page, page_size)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<ComplianceAlert> {
        let value = self
            .transport
            .request_json(ApiRequest::get(format!("/compliance-alerts/{id}")))
            .await?;
        parse_item(value, Some("alert"))
    }

    /// Mark an alert resolved with an operator note.
    pub async fn resolve(&self, id: &str, note: &str) -> Result<ComplianceAlert> {
        let value = self
            .transport
            .request_json(
                ApiRequest::post(format!("/compliance-alerts/{id}/resolve"))
                    .json(serde_json::json!({ "note": note })),
            )
            .await?;
        self.cache.invalidate(namespaces::DASHBOARD_COMPLIANCE_RATE);
        parse_item(value, Some("alert"))
    }

    /// Current compliance rate as a percentage, cached per identity.
    pub async fn get_compliance_rate(&self) -> Result<f64> {
        if let Some(rate) = self
            .cache
            .get::<f64>(namespaces::DASHBOARD_COMPLIANCE_RATE, "rate")
        {
            return Ok(rate);
        }
        let value = self
            .transport
            .request_json(ApiRequest::get("/compliance-alerts/rate"))
            .await?;
        let rate = value
            .get("complianceRate")
            .or_else(|| value.get("rate"))
            .and_then(serde_json::Value::as_f64)
            .or_else(|| value.as_f64())
            .ok_or_else(|| crate::error::Error::Unknown("compliance rate missing".to_string()))?;
        self.cache
            .put(namespaces::DASHBOARD_COMPLIANCE_RATE, "rate", &rate);
        Ok(rate)
    }
}
