use crate::lifecycle::Stage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize)]
pub struct JsonOut<T: Serialize> {
    pub ok: bool,
    pub data: T,
}

#[derive(Serialize)]
pub struct JsonErr {
    pub ok: bool,
    pub error: ErrorBody,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFormat {
    BinaryStl,
    AsciiStl,
    Obj,
}

impl std::fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ModelFormat::BinaryStl => "binary STL",
            ModelFormat::AsciiStl => "ASCII STL",
            ModelFormat::Obj => "OBJ",
        })
    }
}

/// Outcome of a structural check. `count` is triangles for binary STL,
/// facets for ASCII STL and face lines for OBJ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Validation {
    Valid { format: ModelFormat, count: u64 },
    Invalid { reason: String },
}

impl Validation {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Validation::Invalid {
            reason: reason.into(),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid { .. })
    }
}

/// Summary values are integers when the scanner printed only digits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SummaryValue {
    Int(u64),
    Text(String),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    pub entries: Vec<Vec<String>>,
    pub summary: BTreeMap<String, SummaryValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanVerdict {
    Clean,
    Infected,
    Inconclusive,
}

#[derive(Serialize)]
pub struct ScanOut {
    pub file: String,
    pub verdict: ScanVerdict,
    pub report: ScanReport,
}

#[derive(Serialize)]
pub struct CheckReport {
    pub file: String,
    #[serde(flatten)]
    pub validation: Validation,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntakeReport {
    pub file: String,
    pub action: String,
    pub stage: Stage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<ModelFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListedFile {
    pub name: String,
    pub size: u64,
}

/// Body of `GET /scanned`. `files` is additive; older servers only send
/// `scanned_files`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListingResponse {
    pub scanned_files: Vec<String>,
    #[serde(default)]
    pub files: Vec<ListedFile>,
}

impl ListingResponse {
    pub fn size_of(&self, name: &str) -> Option<u64> {
        self.files.iter().find(|f| f.name == name).map(|f| f.size)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scanned_files.iter().any(|n| n == name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveRequest {
    pub remove: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub archived: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AckFailure {
    pub name: String,
    pub error: String,
}

impl std::fmt::Display for AckFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AckStatus {
    Success,
    Failed,
}

/// Per-name result of one acknowledge batch on the tracking server.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AckReport {
    pub archived: Vec<String>,
    pub missing: Vec<String>,
    pub failed: Vec<AckFailure>,
}

impl AckReport {
    /// Failed only when every requested name failed; partial failures ride
    /// along inside a successful status.
    pub fn status(&self) -> AckStatus {
        if !self.failed.is_empty() && self.archived.is_empty() && self.missing.is_empty() {
            AckStatus::Failed
        } else {
            AckStatus::Success
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PullReport {
    pub name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl PullReport {
    pub fn is_durable(&self) -> bool {
        self.status == "downloaded" || self.status == "already_local"
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AckSummary {
    pub acknowledged: Vec<String>,
    pub not_local: Vec<String>,
}

#[derive(Serialize)]
pub struct PullOut {
    pub pulled: Vec<PullReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledged: Option<AckSummary>,
}
