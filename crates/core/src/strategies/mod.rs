//! Per-issue-type fix strategies.
//!
//! A strategy inspects the located node and produces a [`Fix`] for the
//! applicator; it never mutates the document itself. `Ok(None)` means the
//! document already satisfies the rule.

pub mod images;
pub mod landmarks;
pub mod links;
pub mod structure;
pub mod tables;

use std::path::Path;

use ego_tree::NodeId;
use scraper::Html;

use crate::apply::Fix;
use crate::error::GenerationError;
use crate::generate::TextGenerator;
use crate::issue::{IssueRecord, IssueType};

#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    /// The fix needs generated text and no generator is available.
    #[error("fix requires text generation, which is disabled")]
    AiRequired,

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("no strategy for issue type {0}")]
    Unsupported(String),
}

/// Shared strategy inputs for one remediation session.
pub struct StrategyContext<'a> {
    pub generator: Option<&'a dyn TextGenerator>,
    /// Directory holding extracted images, for resolving `src` to files.
    pub image_dir: Option<&'a Path>,
    /// Language tag assumed for documents that declare none.
    pub language: Option<&'a str>,
}

impl<'a> StrategyContext<'a> {
    pub fn without_generator() -> Self {
        Self { generator: None, image_dir: None, language: None }
    }
}

/// Route an issue to its strategy.
pub fn build_fix(
    doc: &Html,
    target: NodeId,
    issue: &IssueRecord,
    ctx: &StrategyContext<'_>,
) -> Result<Option<Fix>, StrategyError> {
    match &issue.kind {
        k if k.is_table() => tables::build_fix(doc, target, issue, ctx),
        IssueType::MissingAltText
        | IssueType::EmptyAltText
        | IssueType::GenericAltText
        | IssueType::LongAltText
        | IssueType::ImproperFigureStructure => images::build_fix(doc, target, issue, ctx),
        k if k.is_landmark() => landmarks::build_fix(doc, issue),
        IssueType::MissingPageTitle
        | IssueType::MissingLanguage
        | IssueType::SkippedHeadingLevel
        | IssueType::EmptyHeading => structure::build_fix(doc, target, issue, ctx),
        IssueType::EmptyLink | IssueType::GenericLinkText => {
            links::build_fix(doc, target, issue, ctx)
        }
        other => Err(StrategyError::Unsupported(other.to_string())),
    }
}
