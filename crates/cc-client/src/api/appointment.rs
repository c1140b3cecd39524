//! Appointment facade
//!
//! Urgency is a client-side derivation: the service stores only the
//! appointment's date and time, the console colors rows by how close
//! that instant is to now.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::{paged_request, parse_item, parse_page, ListQuery, Page};
use crate::error::Result;
use crate::transport::{ApiRequest, CancelToken, Transport};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Appointment {
    /// How close this appointment is to `now`.
    pub fn urgency(&self, now: DateTime<Utc>) -> Urgency {
        urgency(self.date, self.time, now)
    }
}

/// Client-derived closeness of an appointment to now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    /// The appointment datetime already passed.
    Past,
    /// Less than two hours away.
    Urgent,
    /// Less than a day away.
    Soon,
    Normal,
}

/// Total function of `(date, time, now)`.
pub fn urgency(date: NaiveDate, time: NaiveTime, now: DateTime<Utc>) -> Urgency {
    let at = Utc.from_utc_datetime(&date.and_time(time));
    let until = at - now;
    if until < chrono::Duration::zero() {
        Urgency::Past
    } else if until < chrono::Duration::hours(2) {
        Urgency::Urgent
    } else if until < chrono::Duration::hours(24) {
        Urgency::Soon
    } else {
        Urgency::Normal
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAppointment {
    pub patient_id: String,
    pub doctor_id: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// One day of the appointment-count trend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub appointments: u64,
}

#[derive(Clone)]
pub struct Appointments {
    transport: Arc<Transport>,
}

impl Appointments {
    pub(crate) fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    pub async fn list(
        &self,
        page: u32,
        page_size: u32,
        filters: ListQuery,
    ) -> Result<Page<Appointment>> {
        let value = self
            .transport
            .request_json(paged_request("/appointments", page, page_size, &filters))
            .await?;
        parse_page(value, page, page_size)
    }

    /// `list` with a caller-held cancellation handle, for views that
    /// abandon in-flight fetches on navigation.
    pub async fn list_cancellable(
        &self,
        page: u32,
        page_size: u32,
        filters: ListQuery,
        cancel: CancelToken,
    ) -> Result<Page<Appointment>> {
        let value = self
            .transport
            .request_json(
                paged_request("/appointments", page, page_size, &filters).cancel_token(cancel),
            )
            .await?;
        parse_page(value, page, page_size)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Appointment> {
        let value = self
            .transport
            .request_json(ApiRequest::get(format!("/appointments/{id}")))
            .await?;
        parse_item(value, Some("appointment"))
    }

    pub async fn create(&self, payload: NewAppointment) -> Result<Appointment> {
        let value = self
            .transport
            .request_json(ApiRequest::post("/appointments").json(serde_json::to_value(&payload)?))
            .await?;
        parse_item(value, Some("appointment"))
    }

    pub async fn update(&self, id: &str, patch: AppointmentPatch) -> Result<Appointment> {
        let value = self
            .transport
            .request_json(
                ApiRequest::put(format!("/appointments/{id}")).json(serde_json::to_value(&patch)?),
            )
            .await?;
        parse_item(value, Some("appointment"))
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.transport
            .request_unit(ApiRequest::delete(format!("/appointments/{id}")))
            .await
    }

    /// Daily appointment counts for the last `days` days.
    pub async fn get_trend(&self, days: u32) -> Result<Vec<TrendPoint>> {
        let value = self
            .transport
            .request_json(ApiRequest::get("/appointments/trend").query("days", days))
            .await?;
        parse_page(value, 1, days.max(1)).map(|page| page.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn time(s: &str) -> NaiveTime {
        s.parse().unwrap()
    }

    #[test]
    fn urgency_boundaries() {
        let now: DateTime<Utc> = "2025-01-01T10:00:00Z".parse().unwrap();

        assert_eq!(urgency(date("2025-01-01"), time("09:00:00"), now), Urgency::Past);
        assert_eq!(urgency(date("2025-01-01"), time("11:30:00"), now), Urgency::Urgent);
        assert_eq!(urgency(date("2025-01-01"), time("20:00:00"), now), Urgency::Soon);
        assert_eq!(urgency(date("2025-01-03"), time("09:00:00"), now), Urgency::Normal);
    }

    #[test]
    fn urgency_exact_boundaries() {
        let now: DateTime<Utc> = "2025-01-01T10:00:00Z".parse().unwrap();

        // Exactly now is not yet past.
        assert_eq!(urgency(date("2025-01-01"), time("10:00:00"), now), Urgency::Urgent);
        // Exactly two hours out falls into soon.
        assert_eq!(urgency(date("2025-01-01"), time("12:00:00"), now), Urgency::Soon);
        // Exactly 24 hours out is normal.
        assert_eq!(urgency(date("2025-01-02"), time("10:00:00"), now), Urgency::Normal);
    }

    #[test]
    fn appointment_wire_shape() {
        let raw = r#"{
            "id": "A1",
            "patientId": "P1",
            "doctorId": "D1",
            "date": "2025-01-01",
            "time": "09:30:00",
            "reason": "follow-up"
        }"#;
        let appointment: Appointment = serde_json::from_str(raw).unwrap();
        assert_eq!(appointment.patient_id, "P1");
        assert_eq!(appointment.time, time("09:30:00"));
    }
}
