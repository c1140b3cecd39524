//! Invoice facade
//!
//! Totals and status aggregates are computed client-side: the service
//! sends line items and a two-value status partition. `Rejected` on the
//! wire also covers "not yet approved"; the SDK models the wire
//! statuses verbatim rather than inventing a third state the service
//! cannot express.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use super::{paged_request, parse_item, parse_page, ListQuery, Page};
use crate::cache::{namespaces, TtlCache};
use crate::error::Result;
use crate::transport::{ApiRequest, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceStatus {
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub description: String,
    pub quantity: u32,
    pub unit_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: String,
    pub patient_id: String,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub discount: f64,
    #[serde(default)]
    pub tax: f64,
    #[serde(default)]
    pub shipping: f64,
    pub status: InvoiceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Invoice {
    /// `Σ(qty · unitPrice) − discount + tax + shipping`
    pub fn total(&self) -> f64 {
        let subtotal: f64 = self
            .items
            .iter()
            .map(|item| f64::from(item.quantity) * item.unit_price)
            .sum();
        subtotal - self.discount + self.tax + self.shipping
    }
}

/// Dashboard aggregates over an Approved/Rejected partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceAggregates {
    /// Sum of approved invoice totals.
    pub total_revenue: f64,
    /// Approved revenue dated in the month containing `now`.
    pub paid_this_month: f64,
    /// Sum of totals still outside the approved partition.
    pub outstanding: f64,
}

/// Compute the billing dashboard numbers from a full invoice set.
pub fn aggregate(invoices: &[Invoice], now: DateTime<Utc>) -> InvoiceAggregates {
    let mut aggregates = InvoiceAggregates {
        total_revenue: 0.0,
        paid_this_month: 0.0,
        outstanding: 0.0,
    };
    for invoice in invoices {
        let total = invoice.total();
        match invoice.status {
            InvoiceStatus::Approved => {
                aggregates.total_revenue += total;
                let same_month = invoice
                    .created_at
                    .map(|at| at.year() == now.year() && at.month() == now.month())
                    .unwrap_or(false);
                if same_month {
                    aggregates.paid_this_month += total;
                }
            }
            InvoiceStatus::Rejected => aggregates.outstanding += total,
        }
    }
    aggregates
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInvoice {
    pub patient_id: String,
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub discount: f64,
    #[serde(default)]
    pub tax: f64,
    #[serde(default)]
    pub shipping: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoicePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<LineItem>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping: Option<f64>,
}

#[derive(Clone)]
pub struct Invoices {
    transport: Arc<Transport>,
    cache: TtlCache,
}

impl Invoices {
    pub(crate) fn new(transport: Arc<Transport>, cache: TtlCache) -> Self {
        Self { transport, cache }
    }

    pub async fn list(&self, page: u32, page_size: u32, filters: ListQuery) -> Result<Page<Invoice>> {
        let value = self
            .transport
            .request_json(paged_request("/invoices", page, page_size, &filters))
            .await?;
        parse_page(value, page, page_size)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Invoice> {
        let value = self
            .transport
            .request_json(ApiRequest::get(format!("/invoices/{id}")))
            .await?;
        parse_item(value, Some("invoice"))
    }

    pub async fn create(&self, payload: NewInvoice) -> Result<Invoice> {
        let value = self
            .transport
            .request_json(ApiRequest::post("/invoices").json(serde_json::to_value(&payload)?))
            .await?;
        self.invalidate_billing();
        parse_item(value, Some("invoice"))
    }

    pub async fn update(&self, id: &str, patch: InvoicePatch) -> Result<Invoice> {
        let value = self
            .transport
            .request_json(
                ApiRequest::put(format!("/invoices/{id}")).json(serde_json::to_value(&patch)?),
            )
            .await?;
        self.invalidate_billing();
        parse_item(value, Some("invoice"))
    }

    /// Billing dashboard numbers, cached in the `billing` namespace.
    /// Computed client-side over the full invoice set; any invoice
    /// write invalidates them.
    pub async fn dashboard(&self) -> Result<InvoiceAggregates> {
        if let Some(stats) = self
            .cache
            .get::<InvoiceAggregates>(namespaces::BILLING, "revenueStats")
        {
            return Ok(stats);
        }
        let value = self
            .transport
            .request_json(paged_request("/invoices", 1, u32::MAX, &ListQuery::default()))
            .await?;
        let page: Page<Invoice> = parse_page(value, 1, u32::MAX)?;
        let stats = aggregate(&page.items, Utc::now());
        self.cache
            .put(namespaces::BILLING, "totalInvoices", &page.total_items);
        self.cache.put(namespaces::BILLING, "revenueStats", &stats);
        Ok(stats)
    }

    /// Approve an invoice. Idempotent at the service: a second call
    /// returns the unchanged invoice or a conflict.
    pub async fn approve(&self, id: &str) -> Result<Invoice> {
        let value = self
            .transport
            .request_json(ApiRequest::post(format!("/invoices/{id}/approve")))
            .await?;
        self.invalidate_billing();
        parse_item(value, Some("invoice"))
    }

    pub async fn reject(&self, id: &str, reason: &str) -> Result<Invoice> {
        let value = self
            .transport
            .request_json(
                ApiRequest::post(format!("/invoices/{id}/reject"))
                    .json(serde_json::json!({ "reason": reason })),
            )
            .await?;
        self.invalidate_billing();
        parse_item(value, Some("invoice"))
    }

    fn invalidate_billing(&self) {
        self.cache.invalidate(namespaces::BILLING);
        self.cache.invalidate(namespaces::DASHBOARD_REVENUE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoice(status: InvoiceStatus, created_at: &str) -> Invoice {
        Invoice {
            id: "I1".to_string(),
            patient_id: "P1".to_string(),
            items: vec![
                LineItem {
                    description: "Consultation".to_string(),
                    quantity: 2,
                    unit_price: 50.0,
                },
                LineItem {
                    description: "Lab panel".to_string(),
                    quantity: 1,
                    unit_price: 30.0,
                },
            ],
            discount: 10.0,
            tax: 5.0,
            shipping: 2.0,
            status,
            created_at: Some(created_at.parse().unwrap()),
        }
    }

    #[test]
    fn total_formula() {
        let inv = invoice(InvoiceStatus::Approved, "2025-01-10T00:00:00Z");
        // 2*50 + 1*30 - 10 + 5 + 2
        assert_eq!(inv.total(), 127.0);
    }

    #[test]
    fn aggregates_partition_by_status() {
        let now: DateTime<Utc> = "2025-01-15T12:00:00Z".parse().unwrap();
        let invoices = vec![
            invoice(InvoiceStatus::Approved, "2025-01-10T00:00:00Z"),
            invoice(InvoiceStatus::Approved, "2024-12-10T00:00:00Z"),
            invoice(InvoiceStatus::Rejected, "2025-01-12T00:00:00Z"),
        ];

        let agg = aggregate(&invoices, now);
        assert_eq!(agg.total_revenue, 254.0);
        assert_eq!(agg.paid_this_month, 127.0);
        assert_eq!(agg.outstanding, 127.0);
    }

    #[test]
    fn status_wire_names() {
        assert_eq!(
            serde_json::to_string(&InvoiceStatus::Approved).unwrap(),
            r#""Approved""#
        );
        assert_eq!(
            serde_json::from_str::<InvoiceStatus>(r#""Rejected""#).unwrap(),
            InvoiceStatus::Rejected
        );
    }
}
