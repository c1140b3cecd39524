//! Appointment invoice facade
//!
//! Separate resource from billing invoices, with a three-state status.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{paged_request, parse_item, parse_page, ListQuery, Page};
use crate::error::Result;
use crate::transport::{ApiRequest, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentInvoiceStatus {
    Unapproved,
    Approved,
    Paid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentInvoice {
    pub id: String,
    pub appointment_id: String,
    pub patient_id: String,
    pub amount: f64,
    pub status: AppointmentInvoiceStatus,
}

#[derive(Clone)]
pub struct AppointmentInvoices {
    transport: Arc<Transport>,
}

impl AppointmentInvoices {
    pub(crate) fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    pub async fn list(
        &self,
        page: u32,
        page_size: u32,
        filters: ListQuery,
    ) -> Result<Page<AppointmentInvoice>> {
        let value = self
            .transport
            .request_json(paged_request(
                "/appointment-invoices",
                page,
                page_size,
                &filters,
            ))
            .await?;
        parse_page(value, page, page_size)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<AppointmentInvoice> {
        let value = self
            .transport
            .request_json(ApiRequest::get(format!("/appointment-invoices/{id}")))
            .await?;
        parse_item(value, Some("invoice"))
    }

    pub async fn approve(&self, id: &str) -> Result<AppointmentInvoice> {
        let value = self
            .transport
            .request_json(ApiRequest::post(format!("/appointment-invoices/{id}/approve")))
            .await?;
        parse_item(value, Some("invoice"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_wire_names() {
        assert_eq!(
            serde_json::to_string(&AppointmentInvoiceStatus::Unapproved).unwrap(),
            r#""unapproved""#
        );
        assert_eq!(
            serde_json::from_str::<AppointmentInvoiceStatus>(r#""paid""#).unwrap(),
            AppointmentInvoiceStatus::Paid
        );
    }
}
