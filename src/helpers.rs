use axum::{
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use common::PageInfo;
use serde::Serialize;
use validator::ValidationErrors;

use crate::templates::{Pager, SortLink};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Encodes pairs as a query string, skipping blank values.
pub fn query_string(pairs: &[(&str, &str)]) -> String {
    let kept: Vec<(&str, &str)> = pairs
        .iter()
        .copied()
        .filter(|(_, value)| !value.trim().is_empty())
        .collect();
    serde_urlencoded::to_string(kept).unwrap_or_default()
}

fn url(path: &str, pairs: &[(&str, &str)]) -> String {
    let query = query_string(pairs);
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, query)
    }
}

/// Column headers that sort by `(key, label)`; clicking the active ascending
/// column flips it to descending.
pub fn sort_links(
    path: &str,
    params: &[(&str, &str)],
    columns: &[(&str, &str)],
    active: &str,
    descending: bool,
) -> Vec<SortLink> {
    columns
        .iter()
        .map(|&(key, label)| {
            let is_active = key == active;
            let next_order = if is_active && !descending { "desc" } else { "asc" };
            let mut pairs = params.to_vec();
            pairs.push(("sort_by", key));
            pairs.push(("sort_order", next_order));
            let arrow = match (is_active, descending) {
                (true, true) => "▼",
                (true, false) => "▲",
                _ => "",
            };
            SortLink {
                label: label.to_string(),
                url: url(path, &pairs),
                arrow: arrow.to_string(),
            }
        })
        .collect()
}

/// Prev/next links keeping `params`.
pub fn pager(path: &str, params: &[(&str, &str)], info: PageInfo) -> Pager {
    let link = |page: u64| {
        let page = page.to_string();
        let mut pairs = params.to_vec();
        pairs.push(("page", page.as_str()));
        url(path, &pairs)
    };
    Pager {
        prev_url: info.has_prev.then(|| link(info.prev_page())),
        next_url: info.has_next.then(|| link(info.next_page())),
        info,
    }
}

/// An `<option>` of a filter dropdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>, current: Option<&str>) -> Self {
        let value = value.into();
        let selected = current == Some(value.as_str());
        Self {
            value,
            label: label.into(),
            selected,
        }
    }

    /// Options whose label equals their value.
    pub fn plain(values: &[String], current: Option<&str>) -> Vec<Self> {
        values
            .iter()
            .map(|value| Self::new(value.as_str(), value.as_str(), current))
            .collect()
    }
}

fn content_disposition(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .map(|c| if c.is_ascii() && c != '"' { c } else { '_' })
        .collect();
    let encoded = serde_urlencoded::to_string([("f", filename)])
        .unwrap_or_default()
        .trim_start_matches("f=")
        .replace('+', "%20");
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii, encoded
    )
}

/// File download response.
pub fn download(bytes: Vec<u8>, filename: &str, content_type: &'static str) -> Response {
    (
        [
            (CONTENT_TYPE, content_type.to_string()),
            (CONTENT_DISPOSITION, content_disposition(filename)),
        ],
        bytes,
    )
        .into_response()
}

/// First message of a failed `validator` check.
pub fn first_message(errors: &ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|errors| errors.iter())
        .find_map(|error| error.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "Невірні дані форми".to_string())
}
