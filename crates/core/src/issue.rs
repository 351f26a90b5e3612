//! Issue records: one WCAG rule violation with severity, criterion, and
//! location metadata. All location fields are optional by contract; absence
//! is tolerated everywhere, never fatal.

use serde::{Deserialize, Serialize};

/// Ordinal severity. Ordering is `Info < Minor < Major < Critical`, used for
/// threshold filtering in batch remediation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Minor,
    Major,
    Critical,
}

impl Default for Severity {
    fn default() -> Self {
        Self::Minor
    }
}

impl Severity {
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "critical" => Self::Critical,
            "major" => Self::Major,
            "info" => Self::Info,
            _ => Self::Minor,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Info => "info",
        }
    }
}

/// Remediation lifecycle. Transitions are one-directional in normal operation;
/// only an explicit undo reverts to `NeedsRemediation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemediationStatus {
    NeedsRemediation,
    Remediated,
    AutoRemediated,
    Compliant,
    Failed,
}

impl Default for RemediationStatus {
    fn default() -> Self {
        Self::NeedsRemediation
    }
}

impl RemediationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NeedsRemediation => "needs_remediation",
            Self::Remediated => "remediated",
            Self::AutoRemediated => "auto_remediated",
            Self::Compliant => "compliant",
            Self::Failed => "failed",
        }
    }

    /// Terminal states need no further processing.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::NeedsRemediation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemediationSource {
    Manual,
    /// The upstream conversion service already supplied the fix.
    #[serde(rename = "bda")]
    Automated,
}

/// Canonical issue type. All hyphen/underscore/alias spellings collapse to one
/// variant at ingestion; unrecognized tags are preserved in `Other` so they
/// can be reported as skipped rather than dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IssueType {
    MissingAltText,
    EmptyAltText,
    GenericAltText,
    LongAltText,
    ImproperFigureStructure,
    TableMissingHeaders,
    TableMissingScope,
    TableMissingCaption,
    TableMissingThead,
    TableMissingTbody,
    TableIrregularHeaders,
    TableMissingHeadersId,
    MissingMainLandmark,
    MissingNavigationLandmark,
    MissingHeaderLandmark,
    MissingFooterLandmark,
    MissingSkipLink,
    MissingPageTitle,
    MissingLanguage,
    SkippedHeadingLevel,
    EmptyHeading,
    EmptyLink,
    GenericLinkText,
    Other(String),
}

impl IssueType {
    /// Normalize a wire tag: lowercase, underscores to hyphens, then fold
    /// known legacy aliases into the canonical tag.
    pub fn parse(tag: &str) -> Self {
        let norm = tag.trim().to_ascii_lowercase().replace('_', "-");
        match norm.as_str() {
            "missing-alt-text" => Self::MissingAltText,
            "empty-alt-text" => Self::EmptyAltText,
            "generic-alt-text" => Self::GenericAltText,
            "long-alt-text" => Self::LongAltText,
            "improper-figure-structure" => Self::ImproperFigureStructure,
            "table-missing-headers" | "table-no-headers" => Self::TableMissingHeaders,
            "table-missing-scope" | "missing-header-scope" => Self::TableMissingScope,
            "table-missing-caption" => Self::TableMissingCaption,
            "table-missing-thead" => Self::TableMissingThead,
            "table-missing-tbody" => Self::TableMissingTbody,
            "table-irregular-headers" => Self::TableIrregularHeaders,
            "table-missing-headers-id" => Self::TableMissingHeadersId,
            "missing-main-landmark" => Self::MissingMainLandmark,
            "missing-navigation-landmark" | "missing-nav-landmark" => {
                Self::MissingNavigationLandmark
            }
            "missing-header-landmark" => Self::MissingHeaderLandmark,
            "missing-footer-landmark" => Self::MissingFooterLandmark,
            "missing-skip-link" => Self::MissingSkipLink,
            "missing-page-title" | "missing-document-title" => Self::MissingPageTitle,
            "missing-language" | "missing-document-language" => Self::MissingLanguage,
            "skipped-heading-level" => Self::SkippedHeadingLevel,
            "empty-heading" => Self::EmptyHeading,
            "empty-link" => Self::EmptyLink,
            "generic-link-text" => Self::GenericLinkText,
            _ => Self::Other(norm),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::MissingAltText => "missing-alt-text",
            Self::EmptyAltText => "empty-alt-text",
            Self::GenericAltText => "generic-alt-text",
            Self::LongAltText => "long-alt-text",
            Self::ImproperFigureStructure => "improper-figure-structure",
            Self::TableMissingHeaders => "table-missing-headers",
            Self::TableMissingScope => "table-missing-scope",
            Self::TableMissingCaption => "table-missing-caption",
            Self::TableMissingThead => "table-missing-thead",
            Self::TableMissingTbody => "table-missing-tbody",
            Self::TableIrregularHeaders => "table-irregular-headers",
            Self::TableMissingHeadersId => "table-missing-headers-id",
            Self::MissingMainLandmark => "missing-main-landmark",
            Self::MissingNavigationLandmark => "missing-navigation-landmark",
            Self::MissingHeaderLandmark => "missing-header-landmark",
            Self::MissingFooterLandmark => "missing-footer-landmark",
            Self::MissingSkipLink => "missing-skip-link",
            Self::MissingPageTitle => "missing-page-title",
            Self::MissingLanguage => "missing-language",
            Self::SkippedHeadingLevel => "skipped-heading-level",
            Self::EmptyHeading => "empty-heading",
            Self::EmptyLink => "empty-link",
            Self::GenericLinkText => "generic-link-text",
            Self::Other(tag) => tag,
        }
    }

    pub fn is_landmark(&self) -> bool {
        matches!(
            self,
            Self::MissingMainLandmark
                | Self::MissingNavigationLandmark
                | Self::MissingHeaderLandmark
                | Self::MissingFooterLandmark
                | Self::MissingSkipLink
        )
    }

    pub fn is_table(&self) -> bool {
        self.as_str().starts_with("table-")
    }
}

impl From<String> for IssueType {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<IssueType> for String {
    fn from(t: IssueType) -> Self {
        t.as_str().to_string()
    }
}

impl std::fmt::Display for IssueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Location hints for an issue. Every field is optional; downstream code must
/// default rather than fail when a field is absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// One rule violation found in a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueRecord {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: IssueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wcag_criterion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criterion_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criterion_level: Option<String>,
    #[serde(default)]
    pub severity: Severity,
    /// Tag name or minimal markup snippet. A matching hint, never an identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub remediation_status: RemediationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation_source: Option<RemediationSource>,
}

impl IssueRecord {
    pub fn new(kind: IssueType, severity: Severity) -> Self {
        Self {
            id: String::new(),
            kind,
            wcag_criterion: None,
            criterion_name: None,
            criterion_level: None,
            severity,
            element: None,
            message: None,
            location: Location::default(),
            remediation_status: RemediationStatus::NeedsRemediation,
            remediation_source: None,
        }
    }

    /// Every issue belongs to exactly one page; page 0 when undeterminable.
    pub fn page_number(&self) -> u32 {
        self.location.page_number.unwrap_or(0)
    }
}
