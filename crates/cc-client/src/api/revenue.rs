//! Revenue dashboard facade
//!
//! The widget this serves tolerates stale numbers but not a blank
//! slot, so the fetch runs under the shorter aggregate deadline and a
//! network failure falls back to the last cached value.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::{namespaces, TtlCache};
use crate::error::Result;
use crate::transport::{ApiRequest, Transport};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRevenue {
    pub current_month_revenue: f64,
    pub percentage_change: f64,
}

#[derive(Clone)]
pub struct Revenue {
    transport: Arc<Transport>,
    cache: TtlCache,
    aggregate_timeout: Duration,
}

impl Revenue {
    pub(crate) fn new(
        transport: Arc<Transport>,
        cache: TtlCache,
        aggregate_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            cache,
            aggregate_timeout,
        }
    }

    /// Current-month revenue and month-over-month change. Fresh
    /// responses are written through to the `dashboardRevenue`
    /// namespace; a network error within the TTL serves the cached
    /// value instead.
    pub async fn get_current_month(&self) -> Result<MonthlyRevenue> {
        let result = self
            .transport
            .request_json(
                ApiRequest::get("/revenue/current-month").timeout(self.aggregate_timeout),
            )
            .await;
        match result {
            Ok(value) => {
                let revenue: MonthlyRevenue = serde_json::from_value(
                    value
                        .get("data")
                        .cloned()
                        .unwrap_or(value),
                )?;
                self.cache
                    .put(namespaces::DASHBOARD_REVENUE, "currentMonth", &revenue);
                Ok(revenue)
            }
            Err(e) if e.is_retryable() => {
                match self
                    .cache
                    .get::<MonthlyRevenue>(namespaces::DASHBOARD_REVENUE, "currentMonth")
                {
                    Some(cached) => {
                        debug!(error = %e, "Serving cached monthly revenue after network failure");
                        Ok(cached)
                    }
                    None => Err(e),
                }
            }
            // Forbidden, validation and the rest surface even when a
            // cached value exists.
            Err(e) => Err(e),
        }
    }
}
