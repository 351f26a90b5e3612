//! Locating an indexed element's live node inside a parsed document.
//!
//! One cascade serves every fix strategy. Strategies are ordered from exact
//! to heuristic; the first hit wins and exhaustion returns `None` so callers
//! can skip the fix instead of corrupting an unrelated node.

use ego_tree::NodeId;
use scraper::Html;

use crate::dom::{self, ELEMENT_ID_ATTR, LEGACY_ELEMENT_ID_ATTR};
use crate::element::Element;
use crate::index::extract_quoted;
use crate::issue::{IssueRecord, IssueType};

/// Alt text longer than this is considered "long" when falling back to an
/// attribute-length match.
pub const LONG_ALT_THRESHOLD: usize = 150;

/// Which cascade stage produced a match. Logged for diagnosis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchedBy {
    StableId,
    Path,
    ImageSrc,
    CurrentAttribute,
    LongAttribute,
}

pub fn locate(doc: &Html, element: &Element, issue: &IssueRecord) -> Option<NodeId> {
    let (id, matched_by) = locate_with_stage(doc, element, issue)?;
    tracing::debug!(element = %element.id, ?matched_by, "located element node");
    Some(id)
}

pub fn locate_with_stage(
    doc: &Html,
    element: &Element,
    issue: &IssueRecord,
) -> Option<(NodeId, MatchedBy)> {
    if let Some(id) = by_stable_id(doc, &element.id) {
        return Some((id, MatchedBy::StableId));
    }
    if let Some(path) = issue.location.path.as_deref() {
        if let Some(node) = dom::select_one(doc, path) {
            return Some((node, MatchedBy::Path));
        }
    }
    if let Some(id) = by_image_src(doc, element, issue) {
        return Some((id, MatchedBy::ImageSrc));
    }
    if let Some(id) = by_current_attribute(doc, element) {
        return Some((id, MatchedBy::CurrentAttribute));
    }
    if let Some(id) = by_long_attribute(doc, issue) {
        return Some((id, MatchedBy::LongAttribute));
    }
    None
}

/// Exact match on the stamped stable-id attribute; the legacy spelling is
/// still honored on read for documents stamped by older converters.
fn by_stable_id(doc: &Html, element_id: &str) -> Option<NodeId> {
    for attr in [ELEMENT_ID_ATTR, LEGACY_ELEMENT_ID_ATTR] {
        let selector = format!("[{attr}=\"{element_id}\"]");
        if let Some(node) = dom::select_one(doc, &selector) {
            return Some(node);
        }
    }
    None
}

/// Match an `<img>` whose src contains the filename recorded for the element.
/// The filename, not the full path: converters rewrite directory prefixes.
fn by_image_src(doc: &Html, element: &Element, issue: &IssueRecord) -> Option<NodeId> {
    let src = issue
        .location
        .image_src
        .clone()
        .or_else(|| extract_quoted(&element.representation.html, "src="))?;
    let filename = src.rsplit('/').next().unwrap_or(&src);
    if filename.is_empty() {
        return None;
    }
    for img in dom::select_all(doc, "img") {
        if dom::get_attr(doc, img, "src").is_some_and(|s| s.contains(filename)) {
            return Some(img);
        }
    }
    None
}

/// Match on the element's current attribute value, e.g. the exact alt text
/// the index recorded for it.
fn by_current_attribute(doc: &Html, element: &Element) -> Option<NodeId> {
    let alt = extract_quoted(&element.representation.html, "alt=")?;
    if alt.trim().is_empty() {
        return None;
    }
    for img in dom::select_all(doc, "img") {
        if dom::get_attr(doc, img, "alt").as_deref() == Some(alt.as_str()) {
            return Some(img);
        }
    }
    None
}

/// Last resort for long-alt issues only: the first image whose alt exceeds
/// the threshold. Heuristic, so it never applies to other issue kinds.
fn by_long_attribute(doc: &Html, issue: &IssueRecord) -> Option<NodeId> {
    if issue.kind != IssueType::LongAltText {
        return None;
    }
    for img in dom::select_all(doc, "img") {
        if dom::get_attr(doc, img, "alt")
            .is_some_and(|a| a.chars().count() > LONG_ALT_THRESHOLD)
        {
            return Some(img);
        }
    }
    None
}
