use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use hoplink_analytics::Overview;
use hoplink_core::Link;

#[derive(Debug, Deserialize)]
pub struct CreateLinkRequest {
    pub destination: String,
    pub alias: Option<String>,
    /// Hours from now until the link expires.
    pub expires_in_hours: Option<i64>,
    pub custom_domain: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct LinkResponse {
    pub code: String,
    pub short_url: String,
    pub destination: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_domain: Option<String>,
    pub created_at: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,
    pub active: bool,
    pub clicks: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_accessed_at: Option<Timestamp>,
    pub tags: Vec<String>,
}

impl LinkResponse {
    pub fn from_link(link: &Link, base_url: &str) -> Self {
        let short_url = match &link.custom_domain {
            Some(domain) => format!("{}/{}", domain.trim_end_matches('/'), link.code),
            None => link.code.to_url(base_url),
        };
        Self {
            code: link.code.as_str().to_string(),
            short_url,
            destination: link.destination.clone(),
            alias: link.alias.clone(),
            custom_domain: link.custom_domain.clone(),
            created_at: link.created_at,
            expires_at: link.expires_at,
            active: link.active,
            clicks: link.clicks,
            last_accessed_at: link.last_accessed_at,
            tags: link.tags.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateLinkRequest {
    pub tags: Option<Vec<String>>,
    pub custom_domain: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SummaryParams {
    #[serde(default = "default_window_days")]
    pub days: i64,
}

fn default_window_days() -> i64 {
    7
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub sort_by: SortByParam,
    #[serde(default)]
    pub order: OrderParam,
    pub tag: Option<String>,
}

fn default_page() -> u64 {
    1
}

fn default_limit() -> u64 {
    20
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortByParam {
    #[default]
    CreatedAt,
    Clicks,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderParam {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub links: Vec<LinkResponse>,
    pub pagination: Pagination,
    pub overview: Overview,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
