//! Conversion-service metadata: pages and semantic elements with their
//! original pre-mutation markup. The converter's JSON is the only source of
//! an element's original representation; the live DOM may already differ.

use serde::{Deserialize, Serialize};

use crate::error::AuditError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Representation {
    #[serde(default)]
    pub html: String,
}

/// A semantic content unit from the conversion step. Not necessarily a single
/// DOM node. Elements are created once at load and only annotated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    pub id: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub sub_type: Option<String>,
    /// Zero-based pages this element spans, usually one.
    #[serde(default)]
    pub page_indices: Vec<u32>,
    #[serde(default)]
    pub bounding_box: BoundingBox,
    #[serde(default)]
    pub representation: Representation,
}

impl Element {
    pub fn first_page(&self) -> u32 {
        self.page_indices.iter().copied().min().unwrap_or(0)
    }

    pub fn is_image(&self) -> bool {
        self.kind.eq_ignore_ascii_case("FIGURE")
            || self
                .sub_type
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case("IMAGE"))
            || self.representation.html.trim_start().starts_with("<img")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub page_index: u32,
    #[serde(default)]
    pub representation: Representation,
}

/// Top-level conversion output. Missing `pages`/`elements` arrays degrade to
/// empty collections: no correlation is possible, but nothing fails.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionMetadata {
    #[serde(default)]
    pub pages: Vec<Page>,
    #[serde(default)]
    pub elements: Vec<Element>,
}

impl ConversionMetadata {
    pub fn from_json(json: &str) -> Result<Self, AuditError> {
        serde_json::from_str(json).map_err(|e| AuditError::MalformedMetadata(e.to_string()))
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self, AuditError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}
