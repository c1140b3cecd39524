//! Payment gateway facade
//!
//! Two-step invoice payment: the service creates a gateway order, the
//! caller completes checkout out of band, then the signed result comes
//! back for verification.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::parse_item;
use crate::error::Result;
use crate::transport::{ApiRequest, Transport};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceOrder {
    pub id: String,
    pub amount: u64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceOrderResponse {
    pub order: InvoiceOrder,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentVerification {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
    pub invoice_id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub verified: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Clone)]
pub struct Payments {
    transport: Arc<Transport>,
}

impl Payments {
    pub(crate) fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    pub async fn create_invoice_order(&self, invoice_id: &str, amount: u64) -> Result<InvoiceOrder> {
        let value = self
            .transport
            .request_json(ApiRequest::post("/payments/invoice-order").json(serde_json::json!({
                "invoiceId": invoice_id,
                "amount": amount,
            })))
            .await?;
        let response: InvoiceOrderResponse = parse_item(value, None)?;
        Ok(response.order)
    }

    pub async fn verify_invoice(&self, verification: PaymentVerification) -> Result<VerificationResult> {
        let value = self
            .transport
            .request_json(
                ApiRequest::post("/payments/verify-invoice")
                    .json(serde_json::to_value(&verification)?),
            )
            .await?;
        parse_item(value, None)
    }
}
