//! Document landmark fixes: main, navigation, header, footer, skip link.
//!
//! These operate on the document as a whole, not on one located node, so the
//! fix carries only the landmark kind and the work happens here when it is
//! applied. Ensuring one landmark pulls in the rest: main continues with
//! navigation, navigation with the header, the header with the footer, and
//! the footer with the skip link, which in turn needs a main target. A
//! per-call guard set keeps that chain from cycling, and a landmark with no
//! wrap candidate is created outright, so one fix on a landmark-free
//! document always terminates with every landmark present exactly once.

use std::collections::HashSet;

use ego_tree::NodeId;
use scraper::Html;

use crate::apply::{Fix, FixOutcome};
use crate::dom;
use crate::issue::{IssueRecord, IssueType};
use crate::strategies::StrategyError;

pub const SKIP_LINK_TEXT: &str = "Skip to main content";
pub const MAIN_CONTENT_ID: &str = "main-content";

const HEADER_FALLBACK_TITLE: &str = "Document";
const FOOTER_TEXT: &str = "© All rights reserved.";

const SKIP_LINK_CSS: &str = ".skip-link{position:absolute;left:-9999px;top:auto;}\
.skip-link:focus{left:0;top:0;background:#fff;padding:8px;z-index:1000;}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandmarkKind {
    Main,
    Navigation,
    Header,
    Footer,
    SkipLink,
}

impl LandmarkKind {
    fn from_issue(kind: &IssueType) -> Option<Self> {
        match kind {
            IssueType::MissingMainLandmark => Some(Self::Main),
            IssueType::MissingNavigationLandmark => Some(Self::Navigation),
            IssueType::MissingHeaderLandmark => Some(Self::Header),
            IssueType::MissingFooterLandmark => Some(Self::Footer),
            IssueType::MissingSkipLink => Some(Self::SkipLink),
            _ => None,
        }
    }

    fn presence_selector(self) -> &'static str {
        match self {
            Self::Main => "main, [role=\"main\"]",
            Self::Navigation => "nav, [role=\"navigation\"]",
            Self::Header => "header, [role=\"banner\"]",
            Self::Footer => "footer, [role=\"contentinfo\"]",
            Self::SkipLink => "a.skip-link, a[href=\"#main-content\"]",
        }
    }
}

pub fn build_fix(doc: &Html, issue: &IssueRecord) -> Result<Option<Fix>, StrategyError> {
    let kind = LandmarkKind::from_issue(&issue.kind)
        .ok_or_else(|| StrategyError::Unsupported(issue.kind.to_string()))?;
    if is_present(doc, kind) {
        return Ok(None);
    }
    Ok(Some(Fix::Landmark { kind }))
}

fn is_present(doc: &Html, kind: LandmarkKind) -> bool {
    dom::select_one(doc, kind.presence_selector()).is_some()
}

/// Apply a landmark fix. Idempotent against the document state; the change
/// count covers every landmark the chain inserted.
pub fn ensure_landmark(doc: &mut Html, kind: LandmarkKind) -> FixOutcome {
    let mut guard = HashSet::new();
    match ensure(doc, kind, &mut guard) {
        0 => FixOutcome::NoOp,
        changes => FixOutcome::Applied(changes),
    }
}

fn ensure(doc: &mut Html, kind: LandmarkKind, guard: &mut HashSet<LandmarkKind>) -> usize {
    if !guard.insert(kind) {
        return 0;
    }
    if is_present(doc, kind) {
        return 0;
    }
    match kind {
        LandmarkKind::Main => ensure_main(doc, guard),
        LandmarkKind::Navigation => ensure_navigation(doc, guard),
        LandmarkKind::Header => ensure_header(doc, guard),
        LandmarkKind::Footer => ensure_footer(doc, guard),
        LandmarkKind::SkipLink => ensure_skip_link(doc, guard),
    }
}

/// Move the body's content into `<main id="main-content">`, leaving skip
/// links and existing landmarks where they are.
fn ensure_main(doc: &mut Html, guard: &mut HashSet<LandmarkKind>) -> usize {
    let Some(body) = dom::select_one(doc, "body") else {
        return 0;
    };
    let keep: HashSet<NodeId> = dom::select_all(
        doc,
        "a.skip-link, header, nav, footer, [role=\"banner\"], [role=\"navigation\"], \
         [role=\"contentinfo\"], script, style, noscript",
    )
    .into_iter()
    .collect();
    let children: Vec<NodeId> = match doc.tree.get(body) {
        Some(node) => node
            .children()
            .map(|c| c.id())
            .filter(|id| !keep.contains(id))
            .collect(),
        None => return 0,
    };
    // Main goes after existing navigation, header, or skip link content.
    let anchor = dom::select_one(doc, "nav, [role=\"navigation\"]")
        .or_else(|| dom::select_one(doc, "header, [role=\"banner\"]"))
        .or_else(|| dom::select_one(doc, "a.skip-link"));
    let main = dom::create_element(&mut doc.tree, "main", &[("id", MAIN_CONTENT_ID)]);
    match anchor {
        Some(after) => {
            if let Some(mut node) = doc.tree.get_mut(after) {
                node.insert_id_after(main);
            }
        }
        None => {
            if let Some(mut node) = doc.tree.get_mut(body) {
                node.prepend_id(main);
            }
        }
    }
    for child in children {
        if let Some(mut node) = doc.tree.get_mut(child) {
            node.detach();
        }
        if let Some(mut node) = doc.tree.get_mut(main) {
            node.append_id(child);
        }
    }
    1 + ensure(doc, LandmarkKind::Navigation, guard)
}

/// Wrap an existing table of contents; with no candidate, insert an empty
/// navigation list so the landmark still lands.
fn ensure_navigation(doc: &mut Html, guard: &mut HashSet<LandmarkKind>) -> usize {
    let changes = match dom::select_one(doc, "#toc, .toc, ul.table-of-contents") {
        Some(candidate) => usize::from(
            dom::wrap_node(
                &mut doc.tree,
                candidate,
                "nav",
                &[("aria-label", "Main navigation")],
            )
            .is_some(),
        ),
        None => insert_empty_navigation(doc),
    };
    changes + ensure(doc, LandmarkKind::Header, guard)
}

fn insert_empty_navigation(doc: &mut Html) -> usize {
    let Some(body) = dom::select_one(doc, "body") else {
        return 0;
    };
    let after_header = dom::select_one(doc, "header, [role=\"banner\"]");
    let nav = dom::create_element(&mut doc.tree, "nav", &[("aria-label", "Main navigation")]);
    let list = dom::create_element(&mut doc.tree, "ul", &[]);
    if let Some(mut node) = doc.tree.get_mut(nav) {
        node.append_id(list);
    }
    match after_header {
        Some(header) => {
            if let Some(mut node) = doc.tree.get_mut(header) {
                node.insert_id_after(nav);
            }
        }
        None => {
            if let Some(mut node) = doc.tree.get_mut(body) {
                node.prepend_id(nav);
            }
        }
    }
    1
}

/// Wrap the first `h1`; with none, build a header carrying an `h1` from the
/// document title.
fn ensure_header(doc: &mut Html, guard: &mut HashSet<LandmarkKind>) -> usize {
    let changes = match dom::select_one(doc, "h1") {
        Some(h1) => usize::from(dom::wrap_node(&mut doc.tree, h1, "header", &[]).is_some()),
        None => insert_title_header(doc),
    };
    changes + ensure(doc, LandmarkKind::Footer, guard)
}

fn insert_title_header(doc: &mut Html) -> usize {
    let Some(body) = dom::select_one(doc, "body") else {
        return 0;
    };
    let title = dom::select_one(doc, "head > title")
        .map(|t| dom::inner_text(doc, t).trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| HEADER_FALLBACK_TITLE.to_string());
    let header = dom::create_element(&mut doc.tree, "header", &[]);
    let heading = dom::create_element(&mut doc.tree, "h1", &[]);
    let text = dom::create_text(&mut doc.tree, &title);
    if let Some(mut node) = doc.tree.get_mut(heading) {
        node.append_id(text);
    }
    if let Some(mut node) = doc.tree.get_mut(header) {
        node.append_id(heading);
    }
    if let Some(mut node) = doc.tree.get_mut(body) {
        node.prepend_id(header);
    }
    1
}

/// Wrap a footer-looking container; with none, append a minimal footer at
/// the end of the body.
fn ensure_footer(doc: &mut Html, guard: &mut HashSet<LandmarkKind>) -> usize {
    let changes = match dom::select_one(doc, "#footer, .footer, .page-footer") {
        Some(candidate) => {
            usize::from(dom::wrap_node(&mut doc.tree, candidate, "footer", &[]).is_some())
        }
        None => insert_copyright_footer(doc),
    };
    changes + ensure(doc, LandmarkKind::SkipLink, guard)
}

fn insert_copyright_footer(doc: &mut Html) -> usize {
    let Some(body) = dom::select_one(doc, "body") else {
        return 0;
    };
    let footer = dom::create_element(&mut doc.tree, "footer", &[]);
    let para = dom::create_element(&mut doc.tree, "p", &[]);
    let text = dom::create_text(&mut doc.tree, FOOTER_TEXT);
    if let Some(mut node) = doc.tree.get_mut(para) {
        node.append_id(text);
    }
    if let Some(mut node) = doc.tree.get_mut(footer) {
        node.append_id(para);
    }
    if let Some(mut node) = doc.tree.get_mut(body) {
        node.append_id(footer);
    }
    1
}

fn ensure_skip_link(doc: &mut Html, guard: &mut HashSet<LandmarkKind>) -> usize {
    // The link needs a target.
    let cascaded = ensure(doc, LandmarkKind::Main, guard);
    let Some(body) = dom::select_one(doc, "body") else {
        return cascaded;
    };
    let anchor = dom::create_element(
        &mut doc.tree,
        "a",
        &[("class", "skip-link"), ("href", "#main-content")],
    );
    let text = dom::create_text(&mut doc.tree, SKIP_LINK_TEXT);
    if let Some(mut node) = doc.tree.get_mut(anchor) {
        node.append_id(text);
    }
    if let Some(mut node) = doc.tree.get_mut(body) {
        node.prepend_id(anchor);
    }
    if let Some(head) = dom::select_one(doc, "head") {
        let style = dom::create_element(&mut doc.tree, "style", &[]);
        let css = dom::create_text(&mut doc.tree, SKIP_LINK_CSS);
        if let Some(mut node) = doc.tree.get_mut(style) {
            node.append_id(css);
        }
        if let Some(mut node) = doc.tree.get_mut(head) {
            node.append_id(style);
        }
    }
    cascaded + 1
}
