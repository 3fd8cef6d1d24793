//! Extraction output shapes and caller-facing enums.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error value returned in place of any extraction when the page is not an
/// organization page.
pub const PAGE_NOT_FOUND: &str = "page not found";

/// Organization summary, read once per page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyInfo {
    pub name: Option<String>,
    /// Average rating, e.g. `4.7`. Zero when the page has no rating yet.
    pub rating: f64,
    /// Number of ratings behind the average.
    pub rating_count: u64,
    /// Star widget value, may include a half star.
    pub star_rating: f64,
}

/// One review card.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRecord {
    pub author_name: Option<String>,
    pub avatar_url: Option<String>,
    pub published_date: Option<DateTime<Utc>>,
    pub text: Option<String>,
    /// 0 to 5.
    pub star_rating: u8,
    pub owner_reply: Option<String>,
}

/// Result of one extraction call.
///
/// Serializes either as `{"companyInfo": ..., "reviews": [...]}` (keys present
/// only when requested) or as `{"error": "page not found"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtractionResult {
    Error {
        error: String,
    },
    #[serde(rename_all = "camelCase")]
    Success {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        company_info: Option<CompanyInfo>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reviews: Option<Vec<ReviewRecord>>,
    },
}

impl ExtractionResult {
    pub fn page_not_found() -> Self {
        ExtractionResult::Error {
            error: PAGE_NOT_FOUND.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ExtractionResult::Error { .. })
    }

    pub fn company_info(&self) -> Option<&CompanyInfo> {
        match self {
            ExtractionResult::Success { company_info, .. } => company_info.as_ref(),
            ExtractionResult::Error { .. } => None,
        }
    }

    pub fn reviews(&self) -> Option<&[ReviewRecord]> {
        match self {
            ExtractionResult::Success { reviews, .. } => reviews.as_deref(),
            ExtractionResult::Error { .. } => None,
        }
    }
}

/// Review list ordering offered by the page's sort popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    Default,
    Newest,
    Negative,
    Positive,
}

impl SortMode {
    /// Label of the popup line that selects this order.
    pub fn label(self) -> &'static str {
        match self {
            SortMode::Default => "По умолчанию",
            SortMode::Newest => "По новизне",
            SortMode::Negative => "Сначала отрицательные",
            SortMode::Positive => "Сначала положительные",
        }
    }

    /// Parse a CLI value. `none` yields `Ok(None)`, meaning "leave the order alone".
    pub fn parse_optional(value: &str) -> Result<Option<SortMode>, String> {
        if value.eq_ignore_ascii_case("none") {
            return Ok(None);
        }
        value.parse().map(Some)
    }
}

impl FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "default" => Ok(SortMode::Default),
            "newest" => Ok(SortMode::Newest),
            "negative" => Ok(SortMode::Negative),
            "positive" => Ok(SortMode::Positive),
            other => Err(format!("unknown sort mode: {other}")),
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortMode::Default => "default",
            SortMode::Newest => "newest",
            SortMode::Negative => "negative",
            SortMode::Positive => "positive",
        };
        f.write_str(name)
    }
}

/// Which parts of the page to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    #[default]
    All,
    Company,
    Reviews,
}

impl FromStr for ParseMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" | "default" => Ok(ParseMode::All),
            "company" => Ok(ParseMode::Company),
            "reviews" => Ok(ParseMode::Reviews),
            other => Err(format!("unknown parse mode: {other}")),
        }
    }
}

/// Last qualifying review-fetch request seen on the network log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FetchCorrelation {
    pub business_id: Option<String>,
    pub source_url: String,
    pub request_id: String,
}
