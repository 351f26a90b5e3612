//! Applying a fix to a located node.
//!
//! Every fix is idempotent: applying it a second time reports `NoOp` and
//! leaves the tree untouched. Structural fixes re-stamp the stable element
//! id onto new image nodes so the locator still resolves them afterwards.

use ego_tree::NodeId;
use scraper::Html;

use crate::dom;
use crate::error::RemediateError;
use crate::strategies::landmarks::{self, LandmarkKind};

/// One concrete change to a document node.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "fix", rename_all = "snake_case")]
pub enum Fix {
    /// Set or replace one attribute.
    AttributeUpdate { name: String, value: String },
    /// Replace the node's children with parsed markup.
    ContentUpdate { html: String },
    /// Replace the node itself (tag included) with parsed markup.
    ReplaceHtml { html: String },
    /// Wrap an image in `<figure>` and append a `<figcaption>`.
    FigureStructure { caption: String },
    /// Ensure a document landmark exists. Document-level; the target node is
    /// ignored.
    Landmark { kind: LandmarkKind },
    /// Ensure `<head><title>` carries this text. Document-level.
    DocumentTitle { title: String },
    /// Set `lang` on the root element. Document-level.
    DocumentLanguage { lang: String },
}

impl Fix {
    pub fn describe(&self) -> String {
        match self {
            Fix::AttributeUpdate { name, .. } => format!("set attribute {name}"),
            Fix::ContentUpdate { .. } => "replace content".to_string(),
            Fix::ReplaceHtml { .. } => "replace element".to_string(),
            Fix::FigureStructure { .. } => "wrap in figure".to_string(),
            Fix::Landmark { kind } => format!("ensure {kind:?} landmark"),
            Fix::DocumentTitle { .. } => "set document title".to_string(),
            Fix::DocumentLanguage { lang } => format!("set document language {lang}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixOutcome {
    /// Carries the number of distinct DOM mutations made. One fix can make
    /// several, like a landmark chain inserting the whole set.
    Applied(usize),
    /// The document already satisfied the fix. Not an error.
    NoOp,
}

impl FixOutcome {
    pub fn changed(self) -> bool {
        matches!(self, FixOutcome::Applied(_))
    }

    pub fn changes(self) -> usize {
        match self {
            FixOutcome::Applied(n) => n,
            FixOutcome::NoOp => 0,
        }
    }
}

pub fn apply_fix(
    doc: &mut Html,
    target: NodeId,
    element_id: &str,
    fix: &Fix,
) -> Result<FixOutcome, RemediateError> {
    // Document-level fixes ignore the target node.
    match fix {
        Fix::Landmark { kind } => return Ok(landmarks::ensure_landmark(doc, *kind)),
        Fix::DocumentTitle { title } => return Ok(apply_document_title(doc, title)),
        Fix::DocumentLanguage { lang } => return Ok(apply_document_language(doc, lang)),
        _ => {}
    }
    if dom::element_ref(doc, target).is_none() {
        return Err(RemediateError::NoTarget(element_id.to_string()));
    }
    match fix {
        Fix::AttributeUpdate { name, value } => {
            if dom::get_attr(doc, target, name).as_deref() == Some(value.as_str()) {
                return Ok(FixOutcome::NoOp);
            }
            if !dom::set_attr(&mut doc.tree, target, name, value) {
                return Err(RemediateError::NoTarget(element_id.to_string()));
            }
            Ok(FixOutcome::Applied(1))
        }
        Fix::ContentUpdate { html } => {
            let current = dom::element_ref(doc, target)
                .map(|e| e.inner_html())
                .unwrap_or_default();
            if current == *html {
                return Ok(FixOutcome::NoOp);
            }
            let imported = dom::set_inner_fragment(doc, target, html);
            for id in imported {
                dom::stamp_stable_id(doc, id, element_id);
            }
            Ok(FixOutcome::Applied(1))
        }
        Fix::ReplaceHtml { html } => {
            let current = dom::element_ref(doc, target)
                .map(|e| e.html())
                .unwrap_or_default();
            if current == *html {
                return Ok(FixOutcome::NoOp);
            }
            let imported = dom::replace_with_fragment(doc, target, html);
            if imported.is_empty() {
                tracing::warn!(element = element_id, "replacement markup parsed to nothing");
                return Ok(FixOutcome::NoOp);
            }
            for id in imported {
                dom::stamp_stable_id(doc, id, element_id);
            }
            Ok(FixOutcome::Applied(1))
        }
        Fix::FigureStructure { caption } => {
            apply_figure_structure(doc, target, element_id, caption)
        }
        // Handled above; the early return keeps the element check from
        // applying to document-level fixes.
        Fix::Landmark { .. } | Fix::DocumentTitle { .. } | Fix::DocumentLanguage { .. } => {
            Ok(FixOutcome::NoOp)
        }
    }
}

fn apply_document_title(doc: &mut Html, title: &str) -> FixOutcome {
    if let Some(existing) = dom::select_one(doc, "head > title") {
        if dom::inner_text(doc, existing).trim() == title {
            return FixOutcome::NoOp;
        }
        let existing_children: Vec<NodeId> = match doc.tree.get(existing) {
            Some(node) => node.children().map(|c| c.id()).collect(),
            None => return FixOutcome::NoOp,
        };
        for child in existing_children {
            if let Some(mut node) = doc.tree.get_mut(child) {
                node.detach();
            }
        }
        let text = dom::create_text(&mut doc.tree, title);
        if let Some(mut node) = doc.tree.get_mut(existing) {
            node.append_id(text);
        }
        return FixOutcome::Applied(1);
    }
    let Some(head) = dom::select_one(doc, "head") else {
        tracing::warn!("document has no head, cannot set title");
        return FixOutcome::NoOp;
    };
    let title_el = dom::create_element(&mut doc.tree, "title", &[]);
    let text = dom::create_text(&mut doc.tree, title);
    if let Some(mut node) = doc.tree.get_mut(title_el) {
        node.append_id(text);
    }
    if let Some(mut node) = doc.tree.get_mut(head) {
        node.prepend_id(title_el);
    }
    FixOutcome::Applied(1)
}

fn apply_document_language(doc: &mut Html, lang: &str) -> FixOutcome {
    let Some(html) = dom::select_one(doc, "html") else {
        return FixOutcome::NoOp;
    };
    if dom::get_attr(doc, html, "lang").as_deref() == Some(lang) {
        return FixOutcome::NoOp;
    }
    dom::set_attr(&mut doc.tree, html, "lang", lang);
    FixOutcome::Applied(1)
}

fn apply_figure_structure(
    doc: &mut Html,
    target: NodeId,
    element_id: &str,
    caption: &str,
) -> Result<FixOutcome, RemediateError> {
    // The target may already be the figure (caption missing) or an image
    // inside or outside one.
    let (figure, wrapped) = if dom::tag_name(doc, target).as_deref() == Some("figure") {
        (target, false)
    } else {
        let parent_figure = doc
            .tree
            .get(target)
            .and_then(|n| n.parent())
            .filter(|p| p.value().as_element().is_some_and(|e| e.name() == "figure"))
            .map(|p| p.id());
        match parent_figure {
            Some(existing) => (existing, false),
            None => (
                dom::wrap_node(&mut doc.tree, target, "figure", &[])
                    .ok_or_else(|| RemediateError::NoTarget(element_id.to_string()))?,
                true,
            ),
        }
    };
    if !dom::select_within(doc, figure, "figcaption").is_empty() {
        return Ok(FixOutcome::NoOp);
    }
    let figcaption = dom::create_element(&mut doc.tree, "figcaption", &[]);
    let text = dom::create_text(&mut doc.tree, caption);
    if let Some(mut node) = doc.tree.get_mut(figcaption) {
        node.append_id(text);
    }
    if let Some(mut node) = doc.tree.get_mut(figure) {
        node.append_id(figcaption);
    }
    Ok(FixOutcome::Applied(if wrapped { 2 } else { 1 }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with_img() -> (Html, NodeId) {
        let doc = Html::parse_document(
            "<html><body><img data-element-id=\"el-1\" src=\"a.png\"></body></html>",
        );
        let img = dom::select_one(&doc, "img").unwrap();
        (doc, img)
    }

    #[test]
    fn test_attribute_update_then_noop() {
        let (mut doc, img) = doc_with_img();
        let fix = Fix::AttributeUpdate {
            name: "alt".into(),
            value: "a chart".into(),
        };
        assert_eq!(apply_fix(&mut doc, img, "el-1", &fix).unwrap(), FixOutcome::Applied(1));
        // Second application observes the value already present.
        assert_eq!(apply_fix(&mut doc, img, "el-1", &fix).unwrap(), FixOutcome::NoOp);
        assert_eq!(dom::get_attr(&doc, img, "alt").as_deref(), Some("a chart"));
    }

    #[test]
    fn test_figure_structure_wraps_once() {
        let (mut doc, img) = doc_with_img();
        let fix = Fix::FigureStructure { caption: "A bar chart".into() };
        // Wrap plus caption: two mutations.
        assert_eq!(apply_fix(&mut doc, img, "el-1", &fix).unwrap(), FixOutcome::Applied(2));
        assert_eq!(apply_fix(&mut doc, img, "el-1", &fix).unwrap(), FixOutcome::NoOp);

        let figure = dom::select_one(&doc, "figure").unwrap();
        assert_eq!(dom::select_within(&doc, figure, "img").len(), 1);
        let caption = dom::select_one(&doc, "figure > figcaption").unwrap();
        assert_eq!(dom::inner_text(&doc, caption), "A bar chart");
        // Exactly one figure even after the repeat.
        assert_eq!(dom::select_all(&doc, "figure").len(), 1);
    }

    #[test]
    fn test_figure_target_gets_caption_appended() {
        let mut doc = Html::parse_document(
            "<html><body><figure><img src=\"a.png\" alt=\"x\"></figure></body></html>",
        );
        let figure = dom::select_one(&doc, "figure").unwrap();
        let fix = Fix::FigureStructure { caption: "x".into() };
        assert_eq!(apply_fix(&mut doc, figure, "el-1", &fix).unwrap(), FixOutcome::Applied(1));
        // No double wrapping, caption inside the existing figure.
        assert_eq!(dom::select_all(&doc, "figure").len(), 1);
        assert!(dom::select_one(&doc, "figure > figcaption").is_some());
        assert_eq!(apply_fix(&mut doc, figure, "el-1", &fix).unwrap(), FixOutcome::NoOp);
    }

    #[test]
    fn test_wrapped_img_without_caption_gets_one() {
        let mut doc = Html::parse_document(
            "<html><body><figure><img src=\"a.png\"></figure></body></html>",
        );
        let img = dom::select_one(&doc, "img").unwrap();
        let fix = Fix::FigureStructure { caption: "A pie chart".into() };
        // The existing parent figure is reused, only the caption is added.
        assert_eq!(apply_fix(&mut doc, img, "el-1", &fix).unwrap(), FixOutcome::Applied(1));
        assert_eq!(dom::select_all(&doc, "figure").len(), 1);
        let caption = dom::select_one(&doc, "figure > figcaption").unwrap();
        assert_eq!(dom::inner_text(&doc, caption), "A pie chart");
        assert_eq!(apply_fix(&mut doc, img, "el-1", &fix).unwrap(), FixOutcome::NoOp);
    }

    #[test]
    fn test_fix_serializes_with_explicit_tag() {
        let fix = Fix::Landmark { kind: LandmarkKind::Main };
        let json = serde_json::to_string(&fix).unwrap();
        assert_eq!(json, r#"{"fix":"landmark","kind":"main"}"#);
        let back: Fix = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fix);
    }

    #[test]
    fn test_replace_html_restamps_stable_id() {
        let (mut doc, img) = doc_with_img();
        let fix = Fix::ReplaceHtml {
            html: "<img src=\"a.png\" alt=\"described\">".into(),
        };
        assert_eq!(apply_fix(&mut doc, img, "el-1", &fix).unwrap(), FixOutcome::Applied(1));
        let new_img = dom::select_one(&doc, "img").unwrap();
        assert_eq!(dom::stable_id(&doc, new_img).as_deref(), Some("el-1"));
        assert_eq!(dom::get_attr(&doc, new_img, "alt").as_deref(), Some("described"));
    }

    #[test]
    fn test_replace_html_empty_markup_is_noop() {
        let (mut doc, img) = doc_with_img();
        let fix = Fix::ReplaceHtml { html: "".into() };
        assert_eq!(apply_fix(&mut doc, img, "el-1", &fix).unwrap(), FixOutcome::NoOp);
        assert!(dom::select_one(&doc, "img").is_some());
    }

    #[test]
    fn test_content_update() {
        let mut doc = Html::parse_document("<html><body><a href=\"#x\"></a></body></html>");
        let link = dom::select_one(&doc, "a").unwrap();
        let fix = Fix::ContentUpdate { html: "Skip to content".into() };
        assert_eq!(apply_fix(&mut doc, link, "el-2", &fix).unwrap(), FixOutcome::Applied(1));
        assert_eq!(dom::inner_text(&doc, link), "Skip to content");
        assert_eq!(apply_fix(&mut doc, link, "el-2", &fix).unwrap(), FixOutcome::NoOp);
    }

    #[test]
    fn test_document_title_created_then_noop() {
        let mut doc =
            Html::parse_document("<html><head></head><body><h1>Report</h1></body></html>");
        let body = dom::select_one(&doc, "body").unwrap();
        let fix = Fix::DocumentTitle { title: "Report".into() };
        assert_eq!(apply_fix(&mut doc, body, "doc", &fix).unwrap(), FixOutcome::Applied(1));
        let title = dom::select_one(&doc, "head > title").unwrap();
        assert_eq!(dom::inner_text(&doc, title), "Report");
        assert_eq!(apply_fix(&mut doc, body, "doc", &fix).unwrap(), FixOutcome::NoOp);
    }

    #[test]
    fn test_document_language() {
        let mut doc = Html::parse_document("<html><head></head><body></body></html>");
        let body = dom::select_one(&doc, "body").unwrap();
        let fix = Fix::DocumentLanguage { lang: "en".into() };
        assert_eq!(apply_fix(&mut doc, body, "doc", &fix).unwrap(), FixOutcome::Applied(1));
        let html = dom::select_one(&doc, "html").unwrap();
        assert_eq!(dom::get_attr(&doc, html, "lang").as_deref(), Some("en"));
        assert_eq!(apply_fix(&mut doc, body, "doc", &fix).unwrap(), FixOutcome::NoOp);
    }

    #[test]
    fn test_non_element_target_is_error() {
        let mut doc = Html::parse_document("<html><body>plain</body></html>");
        let body = dom::select_one(&doc, "body").unwrap();
        let text_id = doc.tree.get(body).unwrap().first_child().unwrap().id();
        let fix = Fix::AttributeUpdate { name: "alt".into(), value: "x".into() };
        assert!(apply_fix(&mut doc, text_id, "el-3", &fix).is_err());
    }
}
