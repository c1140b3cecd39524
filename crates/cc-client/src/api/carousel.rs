//! Carousel slide facade

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{multipart_with_image, parse_item, parse_page, ImageFile};
use crate::error::Result;
use crate::transport::{ApiRequest, Transport};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarouselSlide {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCarouselSlide {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
}

#[derive(Clone)]
pub struct Carousel {
    transport: Arc<Transport>,
}

impl Carousel {
    pub(crate) fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    pub async fn list(&self) -> Result<Vec<CarouselSlide>> {
        let value = self
            .transport
            .request_json(ApiRequest::get("/carousel"))
            .await?;
        Ok(parse_page(value, 1, u32::MAX)?.items)
    }

    /// Create a slide; the image travels as the `imageFile` multipart
    /// part next to the JSON metadata.
    pub async fn create(&self, payload: NewCarouselSlide, image: ImageFile) -> Result<CarouselSlide> {
        let form = multipart_with_image(&payload, Some(image))?;
        let value = self
            .transport
            .request_json(ApiRequest::post("/carousel").multipart(form))
            .await?;
        parse_item(value, Some("slide"))
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.transport
            .request_unit(ApiRequest::delete(format!("/carousel/{id}")))
            .await
    }
}
