/// Wire models for the Triage v0 API.
///
/// Reports are cached on disk between scrapes, so the report types keep every
/// field the client does not interpret in a flattened `extra` map and survive
/// a parse/serialize round-trip without losing data.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Which slice of the feed to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedSubset {
    Public,
    Owned,
}

impl FeedSubset {
    /// Value of the `subset` query parameter.
    pub fn as_query(self) -> &'static str {
        match self {
            FeedSubset::Public => "public",
            FeedSubset::Owned => "owned",
        }
    }
}

/// One page of the sample feed.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedPage {
    #[serde(default)]
    pub data: Vec<FeedItem>,
    /// Offset token for the next page, absent on the last page.
    pub next: Option<String>,
}

/// A single feed listing entry.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedItem {
    pub id: String,
    pub kind: SampleKind,
    pub filename: Option<String>,
    #[serde(default)]
    pub private: bool,
    pub status: String,
    pub submitted: DateTime<Utc>,
    pub completed: Option<DateTime<Utc>>,
    /// Task list attached to the analysis, passed through untouched.
    pub tasks: Option<Value>,
}

/// Submission kind of a feed entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SampleKind {
    File,
    Url,
    /// Anything the API adds later. The scraper refuses to process these.
    #[serde(other)]
    Unknown,
}

/// Static analysis report. Only the fields the scraper interprets are typed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample: Option<SampleRef>,
    #[serde(default)]
    pub analysis: Analysis,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<ReportFile>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `sample` object of a static report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleRef {
    /// Identifier accepted by the sample download endpoint.
    pub sample: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `analysis` object of a static report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Analysis {
    /// When the analysis was published, absent while still running.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reported: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One file record of a static report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportFile {
    /// Hex digest of the file content, used as the local file name.
    pub sha256: String,
    /// Nesting depth; 0 is the submitted file itself.
    pub depth: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
