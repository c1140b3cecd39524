//! Response envelope normalization
//!
//! The remote service is not consistent about envelopes: rows arrive
//! under `items`, `data`, or a resource-named key (`patients`, ...),
//! and pagination counters arrive as either
//! `{ totalPages, totalItems }` or `{ pages, total }`, with
//! resource-named totals (`totalPatients`) in the wild as well. The
//! normalizers here collapse all of those into [`Page`] and plain
//! items so facades never leak the drift upward.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::Page;
use crate::error::{Error, Result};

/// Normalize a list response into the stable [`Page`] shape.
///
/// `page` and `page_size` are the requested values, used when the
/// envelope omits them. An envelope without rows is an empty page, not
/// an error.
pub fn parse_page<T: DeserializeOwned>(value: Value, page: u32, page_size: u32) -> Result<Page<T>> {
    let (rows, pagination) = match value {
        // A bare array is a single unpaginated page.
        Value::Array(rows) => (Some(Value::Array(rows)), None),
        Value::Object(mut obj) => {
            let pagination = obj.remove("pagination");
            let rows = obj
                .remove("items")
                .or_else(|| obj.remove("data"))
                .filter(Value::is_array)
                .or_else(|| {
                    // Resource-named key: the single array-valued field.
                    let key = obj
                        .iter()
                        .find(|(_, v)| v.is_array())
                        .map(|(k, _)| k.clone())?;
                    obj.remove(&key)
                });
            (rows, pagination)
        }
        other => {
            return Err(Error::Unknown(format!(
                "unexpected list response shape: {other}"
            )))
        }
    };

    let items: Vec<T> = match rows {
        Some(rows) => serde_json::from_value(rows)?,
        None => Vec::new(),
    };

    let pagination = pagination.unwrap_or(Value::Null);
    let total_items = read_u64(&pagination, &["totalItems", "total"])
        .or_else(|| read_total_prefixed(&pagination))
        .unwrap_or(items.len() as u64);
    let total_pages = read_u64(&pagination, &["totalPages", "pages"])
        .map(|n| n as u32)
        .unwrap_or_else(|| {
            if total_items == 0 {
                1
            } else {
                (total_items as u32).div_ceil(page_size.max(1))
            }
        })
        .max(1);
    let page = read_u64(&pagination, &["page"])
        .map(|n| n as u32)
        .unwrap_or(page);
    let page_size = read_u64(&pagination, &["pageSize", "limit"])
        .map(|n| n as u32)
        .unwrap_or(page_size);

    Ok(Page {
        items,
        page,
        page_size,
        total_pages,
        total_items,
    })
}

/// Normalize an item response: unwrap the named resource key when
/// present, then `data`, else take the root.
pub fn parse_item<T: DeserializeOwned>(value: Value, key: Option<&str>) -> Result<T> {
    let unwrapped = match value {
        Value::Object(mut obj) => {
            let inner = key
                .and_then(|k| obj.remove(k))
                .or_else(|| obj.remove("data"));
            match inner {
                Some(inner) => inner,
                None => Value::Object(obj),
            }
        }
        other => other,
    };
    Ok(serde_json::from_value(unwrapped)?)
}

fn read_u64(pagination: &Value, keys: &[&str]) -> Option<u64> {
    keys.iter()
        .find_map(|key| pagination.get(key).and_then(Value::as_u64))
}

/// Fallback for resource-named totals like `totalPatients`. The page
/// counter also starts with `total` and must not be mistaken for a
/// row count.
fn read_total_prefixed(pagination: &Value) -> Option<u64> {
    pagination.as_object().and_then(|obj| {
        obj.iter()
            .find(|(k, v)| k.starts_with("total") && k.as_str() != "totalPages" && v.is_u64())
            .and_then(|(_, v)| v.as_u64())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq, serde::Deserialize)]
    struct Row {
        id: String,
    }

    #[test]
    fn canonical_envelope() {
        let value = json!({
            "items": [{"id": "a"}, {"id": "b"}],
            "pagination": { "page": 2, "pageSize": 2, "totalPages": 5, "totalItems": 9 }
        });
        let page: Page<Row> = parse_page(value, 1, 10).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.page, 2);
        assert_eq!(page.page_size, 2);
        assert_eq!(page.total_pages, 5);
        assert_eq!(page.total_items, 9);
    }

    #[test]
    fn legacy_pages_total_envelope() {
        let value = json!({
            "data": [{"id": "a"}],
            "pagination": { "pages": 3, "total": 23 }
        });
        let page: Page<Row> = parse_page(value, 1, 10).unwrap();
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.total_items, 23);
    }

    #[test]
    fn resource_named_keys() {
        // The shape the patients endpoint actually sends.
        let value = json!({
            "patients": [{"id": "a"}, {"id": "b"}, {"id": "c"}, {"id": "d"}, {"id": "e"}],
            "pagination": { "totalPages": 3, "totalPatients": 23 }
        });
        let page: Page<Row> = parse_page(value, 1, 10).unwrap();
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, 10);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.total_items, 23);
    }

    #[test]
    fn prefixed_total_skips_the_page_counter() {
        // serde_json orders object keys, so totalPages sorts ahead of
        // totalPatients; the row count must still win.
        let value = json!({
            "patients": [{"id": "a"}],
            "pagination": { "totalPages": 3, "totalPatients": 23 }
        });
        let page: Page<Row> = parse_page(value, 2, 10).unwrap();
        assert_eq!(page.total_items, 23);
        assert_eq!(page.total_pages, 3);

        // A lone page counter is not a row total.
        let only_pages = json!({
            "items": [{"id": "a"}],
            "pagination": { "totalPages": 4 }
        });
        let page: Page<Row> = parse_page(only_pages, 1, 10).unwrap();
        assert_eq!(page.total_items, 1);
        assert_eq!(page.total_pages, 4);
    }

    #[test]
    fn bare_array() {
        let value = json!([{"id": "a"}]);
        let page: Page<Row> = parse_page(value, 1, 10).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total_items, 1);
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn empty_page_is_success_with_one_total_page() {
        let value = json!({
            "items": [],
            "pagination": { "totalItems": 0 }
        });
        let page: Page<Row> = parse_page(value, 1, 10).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total_items, 0);
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn missing_pagination_derives_counts() {
        let value = json!({ "items": [{"id": "a"}, {"id": "b"}] });
        let page: Page<Row> = parse_page(value, 1, 2).unwrap();
        assert_eq!(page.total_items, 2);
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn item_under_data() {
        let row: Row = parse_item(json!({ "data": {"id": "a"} }), None).unwrap();
        assert_eq!(row.id, "a");
    }

    #[test]
    fn item_under_resource_key() {
        let row: Row = parse_item(json!({ "invoice": {"id": "a"} }), Some("invoice")).unwrap();
        assert_eq!(row.id, "a");
    }

    #[test]
    fn item_at_root() {
        let row: Row = parse_item(json!({"id": "a"}), Some("invoice")).unwrap();
        assert_eq!(row.id, "a");
    }
}
