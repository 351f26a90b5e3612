//! Document structure fixes: title, language declaration, heading levels.

use ego_tree::NodeId;
use scraper::Html;

use crate::apply::Fix;
use crate::dom;
use crate::generate::GenerationRequest;
use crate::issue::{IssueRecord, IssueType};
use crate::strategies::{StrategyContext, StrategyError};

pub const DEFAULT_LANGUAGE: &str = "en";
const FALLBACK_TITLE: &str = "Document";

pub fn build_fix(
    doc: &Html,
    target: NodeId,
    issue: &IssueRecord,
    ctx: &StrategyContext<'_>,
) -> Result<Option<Fix>, StrategyError> {
    match &issue.kind {
        IssueType::MissingPageTitle => Ok(title_fix(doc)),
        IssueType::MissingLanguage => Ok(language_fix(doc, ctx)),
        IssueType::SkippedHeadingLevel => Ok(heading_level_fix(doc, target)),
        IssueType::EmptyHeading => empty_heading_fix(doc, target, issue, ctx),
        other => Err(StrategyError::Unsupported(other.to_string())),
    }
}

fn title_fix(doc: &Html) -> Option<Fix> {
    if let Some(title) = dom::select_one(doc, "head > title") {
        if !dom::inner_text(doc, title).trim().is_empty() {
            return None;
        }
    }
    let title = dom::select_one(doc, "h1")
        .map(|h1| dom::inner_text(doc, h1).trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| FALLBACK_TITLE.to_string());
    Some(Fix::DocumentTitle { title })
}

fn language_fix(doc: &Html, ctx: &StrategyContext<'_>) -> Option<Fix> {
    let html = dom::select_one(doc, "html")?;
    if dom::get_attr(doc, html, "lang").is_some_and(|l| !l.trim().is_empty()) {
        return None;
    }
    let lang = ctx.language.unwrap_or(DEFAULT_LANGUAGE);
    Some(Fix::DocumentLanguage { lang: lang.to_string() })
}

fn heading_level(tag: &str) -> Option<u8> {
    match tag {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

/// Demote or promote a heading so it is at most one level below the heading
/// that precedes it in document order. The first heading becomes `h1`.
fn heading_level_fix(doc: &Html, target: NodeId) -> Option<Fix> {
    let tag = dom::tag_name(doc, target)?;
    let current = heading_level(&tag)?;

    let headings = dom::select_all(doc, "h1, h2, h3, h4, h5, h6");
    let position = headings.iter().position(|&h| h == target)?;
    let expected = match position.checked_sub(1) {
        None => 1,
        Some(prev_idx) => {
            let prev_tag = dom::tag_name(doc, headings[prev_idx])?;
            heading_level(&prev_tag)? + 1
        }
    };
    if current <= expected {
        return None;
    }

    let (mut scratch, node) = dom::clone_element(doc, target)?;
    dom::rename_element(&mut scratch.tree, node, &format!("h{expected}"));
    let html = dom::element_ref(&scratch, node)?.html();
    Some(Fix::ReplaceHtml { html })
}

/// Headings with no text need generated content; nearby text gives the model
/// something to name.
fn empty_heading_fix(
    doc: &Html,
    target: NodeId,
    issue: &IssueRecord,
    ctx: &StrategyContext<'_>,
) -> Result<Option<Fix>, StrategyError> {
    if !dom::inner_text(doc, target).trim().is_empty() {
        return Ok(None);
    }
    let generator = ctx.generator.ok_or(StrategyError::AiRequired)?;
    let context = following_text(doc, target)
        .or_else(|| issue.location.context.clone())
        .unwrap_or_default();
    let prompt = format!(
        "Write a short heading (at most eight words) for a document section that \
         begins: {context}"
    );
    let text = generator.generate(&GenerationRequest::text(prompt))?;
    Ok(Some(Fix::ContentUpdate { html: text }))
}

fn following_text(doc: &Html, target: NodeId) -> Option<String> {
    let node = doc.tree.get(target)?;
    for sibling in node.next_siblings() {
        if sibling.value().is_element() {
            let text = dom::inner_text(doc, sibling.id());
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                let snippet: String = trimmed.chars().take(200).collect();
                return Some(snippet);
            }
        }
    }
    None
}
