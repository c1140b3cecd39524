//! Resource facades over the transport layer
//!
//! One submodule per backend resource. Every facade normalizes the
//! service's response envelopes into the stable [`Page`] and item
//! shapes and propagates transport errors unchanged.

pub mod activity_log;
pub mod appointment;
pub mod appointment_invoice;
pub mod carousel;
pub mod clinic;
pub mod compliance;
pub mod doctor;
pub mod invoice;
pub mod nurse;
pub mod patient;
pub mod payments;
pub mod prescription;
pub mod referral;
pub mod revenue;
pub mod teleconsultation;
pub mod vitals;

mod envelope;

pub use envelope::{parse_item, parse_page};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::transport::ApiRequest;

/// Stable pagination shape every `list` call returns.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub total_items: u64,
}

/// Sort direction for list filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Asc => write!(f, "asc"),
            Self::Desc => write!(f, "desc"),
        }
    }
}

/// Client-side filters recognized by `list` endpoints. Facades ignore
/// the fields their resource does not support.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub doctor_id: Option<String>,
    pub patient_id: Option<String>,
    pub activity_type: Option<String>,
}

impl ListQuery {
    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn sort(mut self, by: impl Into<String>, order: SortOrder) -> Self {
        self.sort_by = Some(by.into());
        self.sort_order = Some(order);
        self
    }

    pub fn between(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    pub fn doctor(mut self, id: impl Into<String>) -> Self {
        self.doctor_id = Some(id.into());
        self
    }

    pub fn patient(mut self, id: impl Into<String>) -> Self {
        self.patient_id = Some(id.into());
        self
    }

    pub fn activity_type(mut self, kind: impl Into<String>) -> Self {
        self.activity_type = Some(kind.into());
        self
    }

    /// True when the query carries no filters, i.e. a plain page fetch.
    pub fn is_empty(&self) -> bool {
        self.search.is_none()
            && self.status.is_none()
            && self.sort_by.is_none()
            && self.sort_order.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.doctor_id.is_none()
            && self.patient_id.is_none()
            && self.activity_type.is_none()
    }

    pub(crate) fn apply(&self, request: ApiRequest) -> ApiRequest {
        request
            .query_opt("search", self.search.as_deref())
            .query_opt("status", self.status.as_deref())
            .query_opt("sortBy", self.sort_by.as_deref())
            .query_opt("sortOrder", self.sort_order)
            .query_opt("startDate", self.start_date)
            .query_opt("endDate", self.end_date)
            .query_opt("doctorId", self.doctor_id.as_deref())
            .query_opt("patientId", self.patient_id.as_deref())
            .query_opt("activityType", self.activity_type.as_deref())
    }
}

/// Shorthand for a paged request with the standard `page`/`limit`
/// parameters and optional filters.
pub(crate) fn paged_request(path: &str, page: u32, page_size: u32, filters: &ListQuery) -> ApiRequest {
    filters.apply(
        ApiRequest::get(path)
            .query("page", page)
            .query("limit", page_size),
    )
}

/// An image attached to a multipart create or upload.
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    /// Build the `imageFile` multipart part the service expects.
    pub(crate) fn into_part(self) -> crate::error::Result<reqwest::multipart::Part> {
        reqwest::multipart::Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(&self.content_type)
            .map_err(|e| crate::error::Error::Config(format!("invalid image content type: {e}")))
    }
}

/// Multipart form carrying a JSON payload alongside an optional image.
pub(crate) fn multipart_with_image(
    payload: &impl Serialize,
    image: Option<ImageFile>,
) -> crate::error::Result<reqwest::multipart::Form> {
    let mut form = reqwest::multipart::Form::new().text("data", serde_json::to_string(payload)?);
    if let Some(image) = image {
        form = form.part("imageFile", image.into_part()?);
    }
    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_detection() {
        assert!(ListQuery::default().is_empty());
        assert!(!ListQuery::default().search("ana").is_empty());
        assert!(!ListQuery::default().status("active").is_empty());
    }

    #[test]
    fn sort_order_display() {
        assert_eq!(SortOrder::Asc.to_string(), "asc");
        assert_eq!(SortOrder::Desc.to_string(), "desc");
    }
}
