//! Link text fixes: empty links and generic "click here" text.

use ego_tree::NodeId;
use scraper::Html;

use crate::apply::Fix;
use crate::dom;
use crate::generate::GenerationRequest;
use crate::issue::{IssueRecord, IssueType};
use crate::strategies::{StrategyContext, StrategyError};

/// Link text that tells a screen reader user nothing about the destination.
pub const GENERIC_LINK_TEXT: &[&str] =
    &["click here", "here", "link", "read more", "more", "this", "this link"];

pub fn is_generic_link_text(text: &str) -> bool {
    GENERIC_LINK_TEXT.contains(&text.trim().to_ascii_lowercase().as_str())
}

pub fn build_fix(
    doc: &Html,
    target: NodeId,
    issue: &IssueRecord,
    ctx: &StrategyContext<'_>,
) -> Result<Option<Fix>, StrategyError> {
    let text = dom::inner_text(doc, target);
    let text = text.trim();
    match &issue.kind {
        IssueType::EmptyLink => {
            if !text.is_empty() {
                return Ok(None);
            }
            let href = dom::get_attr(doc, target, "href").unwrap_or_default();
            let label = label_from_href(&href).unwrap_or_else(|| "Link".to_string());
            Ok(Some(Fix::ContentUpdate { html: label }))
        }
        IssueType::GenericLinkText => {
            if !is_generic_link_text(text) {
                return Ok(None);
            }
            let generator = ctx.generator.ok_or(StrategyError::AiRequired)?;
            let href = dom::get_attr(doc, target, "href").unwrap_or_default();
            let context = surrounding_text(doc, target);
            let prompt = format!(
                "Rewrite link text so it describes the destination. Current text: \
                 \"{text}\". Destination: {href}. Surrounding sentence: {context}. \
                 Answer with the link text only."
            );
            let label = generator.generate(&GenerationRequest::text(prompt))?;
            Ok(Some(Fix::ContentUpdate { html: label }))
        }
        other => Err(StrategyError::Unsupported(other.to_string())),
    }
}

/// Derive a readable label from the link destination: fragment or filename,
/// extension stripped, separators spaced.
fn label_from_href(href: &str) -> Option<String> {
    let raw = if let Some(fragment) = href.strip_prefix('#') {
        fragment
    } else {
        let path = href.split(['?', '#']).next().unwrap_or(href);
        let last = path.trim_end_matches('/').rsplit('/').next()?;
        last.split('.').next().unwrap_or(last)
    };
    let label = raw.replace(['-', '_'], " ").trim().to_string();
    (!label.is_empty()).then_some(label)
}

fn surrounding_text(doc: &Html, target: NodeId) -> String {
    doc.tree
        .get(target)
        .and_then(|n| n.parent())
        .map(|p| {
            let text = dom::inner_text(doc, p.id());
            text.trim().chars().take(200).collect()
        })
        .unwrap_or_default()
}
