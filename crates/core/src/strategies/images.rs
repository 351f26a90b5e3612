//! Alt-text and figure-structure fixes for images.

use ego_tree::NodeId;
use scraper::Html;

use crate::apply::Fix;
use crate::dom;
use crate::generate::GenerationRequest;
use crate::issue::{IssueRecord, IssueType};
use crate::strategies::{StrategyContext, StrategyError};

/// Used when no generator is available or generation fails. A screen reader
/// announcing this is still better than silence or a filename.
pub const ALT_TEXT_PLACEHOLDER: &str = "Image description unavailable";

/// Alt values that convey nothing about the image.
pub const GENERIC_ALT_VALUES: &[&str] =
    &["image", "picture", "photo", "graphic", "img", "icon", "untitled", "alt"];

pub fn is_generic_alt(alt: &str) -> bool {
    let norm = alt.trim().trim_end_matches(|c: char| c.is_ascii_digit()).trim();
    GENERIC_ALT_VALUES.contains(&norm.to_ascii_lowercase().as_str())
}

pub fn build_fix(
    doc: &Html,
    target: NodeId,
    issue: &IssueRecord,
    ctx: &StrategyContext<'_>,
) -> Result<Option<Fix>, StrategyError> {
    let current_alt = dom::get_attr(doc, target, "alt");
    match &issue.kind {
        IssueType::MissingAltText | IssueType::EmptyAltText => {
            if current_alt.as_deref().is_some_and(|a| !a.trim().is_empty()) {
                return Ok(None);
            }
            let alt = generated_description(doc, target, ctx)
                .unwrap_or_else(|| ALT_TEXT_PLACEHOLDER.to_string());
            Ok(Some(Fix::AttributeUpdate { name: "alt".into(), value: alt }))
        }
        IssueType::GenericAltText => {
            if current_alt.as_deref().is_some_and(|a| !is_generic_alt(a)) {
                return Ok(None);
            }
            // A placeholder would be just as generic; this fix needs a model.
            let generator = ctx.generator.ok_or(StrategyError::AiRequired)?;
            let alt = generator.generate(&describe_request(doc, target, ctx))?;
            Ok(Some(Fix::AttributeUpdate { name: "alt".into(), value: alt }))
        }
        IssueType::LongAltText => {
            let Some(alt) = current_alt else {
                return Ok(None);
            };
            if alt.chars().count() <= crate::locator::LONG_ALT_THRESHOLD {
                return Ok(None);
            }
            let generator = ctx.generator.ok_or(StrategyError::AiRequired)?;
            let prompt = format!(
                "Rewrite this image alt text in at most 150 characters, keeping the \
                 essential information: {alt}"
            );
            let short = generator.generate(&GenerationRequest::text(prompt))?;
            Ok(Some(Fix::AttributeUpdate { name: "alt".into(), value: short }))
        }
        IssueType::ImproperFigureStructure => {
            // The target may be the figure itself; borrow the inner image's
            // alt text for the caption in that case.
            let inner_alt = dom::select_within(doc, target, "img")
                .into_iter()
                .find_map(|img| dom::get_attr(doc, img, "alt"));
            let caption = generated_description(doc, target, ctx)
                .or_else(|| current_alt.filter(|a| !a.trim().is_empty()))
                .or_else(|| inner_alt.filter(|a| !a.trim().is_empty()))
                .unwrap_or_else(|| ALT_TEXT_PLACEHOLDER.to_string());
            Ok(Some(Fix::FigureStructure { caption }))
        }
        other => Err(StrategyError::Unsupported(other.to_string())),
    }
}

fn describe_request(doc: &Html, target: NodeId, ctx: &StrategyContext<'_>) -> GenerationRequest {
    let prompt = "Describe this image concisely for use as alt text. Focus on the \
                  information the image conveys, not its appearance.";
    if let Some(path) = resolve_image_path(doc, target, ctx) {
        GenerationRequest::with_image(prompt, path)
    } else {
        GenerationRequest::text(prompt)
    }
}

/// Best-effort generation; failures degrade to the caller's fallback.
fn generated_description(doc: &Html, target: NodeId, ctx: &StrategyContext<'_>) -> Option<String> {
    let generator = ctx.generator?;
    match generator.generate(&describe_request(doc, target, ctx)) {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::warn!(error = %e, "alt text generation failed, using fallback");
            None
        }
    }
}

/// Map the node's `src` to a file on disk, when an image directory is known.
fn resolve_image_path(
    doc: &Html,
    target: NodeId,
    ctx: &StrategyContext<'_>,
) -> Option<std::path::PathBuf> {
    let dir = ctx.image_dir?;
    let src = dom::get_attr(doc, target, "src")?;
    let filename = src.rsplit('/').next()?;
    let candidate = dir.join(filename);
    candidate.is_file().then_some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::Severity;

    struct FixedGenerator(&'static str);

    impl crate::generate::TextGenerator for FixedGenerator {
        fn name(&self) -> &str {
            "fixed"
        }
        fn generate(
            &self,
            _request: &GenerationRequest,
        ) -> Result<String, crate::error::GenerationError> {
            Ok(self.0.to_string())
        }
    }

    fn img_doc(markup: &str) -> (Html, NodeId) {
        let doc = Html::parse_document(&format!("<html><body>{markup}</body></html>"));
        let img = dom::select_one(&doc, "img").unwrap();
        (doc, img)
    }

    fn issue(kind: IssueType) -> IssueRecord {
        IssueRecord::new(kind, Severity::Major)
    }

    #[test]
    fn test_missing_alt_without_generator_uses_placeholder() {
        let (doc, img) = img_doc("<img src=\"a.png\">");
        let fix = build_fix(
            &doc,
            img,
            &issue(IssueType::MissingAltText),
            &StrategyContext::without_generator(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            fix,
            Fix::AttributeUpdate { name: "alt".into(), value: ALT_TEXT_PLACEHOLDER.into() }
        );
    }

    #[test]
    fn test_missing_alt_with_generator() {
        let (doc, img) = img_doc("<img src=\"a.png\">");
        let generator = FixedGenerator("A line chart of revenue");
        let ctx = StrategyContext { generator: Some(&generator), image_dir: None, language: None };
        let fix = build_fix(&doc, img, &issue(IssueType::MissingAltText), &ctx)
            .unwrap()
            .unwrap();
        assert_eq!(
            fix,
            Fix::AttributeUpdate { name: "alt".into(), value: "A line chart of revenue".into() }
        );
    }

    #[test]
    fn test_present_alt_needs_no_fix() {
        let (doc, img) = img_doc("<img src=\"a.png\" alt=\"already described\">");
        let fix = build_fix(
            &doc,
            img,
            &issue(IssueType::MissingAltText),
            &StrategyContext::without_generator(),
        )
        .unwrap();
        assert!(fix.is_none());
    }

    #[test]
    fn test_generic_alt_requires_generator() {
        let (doc, img) = img_doc("<img src=\"a.png\" alt=\"image\">");
        let err = build_fix(
            &doc,
            img,
            &issue(IssueType::GenericAltText),
            &StrategyContext::without_generator(),
        )
        .unwrap_err();
        assert!(matches!(err, StrategyError::AiRequired));
    }

    #[test]
    fn test_long_alt_requires_generator() {
        let long = "x".repeat(200);
        let (doc, img) = img_doc(&format!("<img src=\"a.png\" alt=\"{long}\">"));
        let err = build_fix(
            &doc,
            img,
            &issue(IssueType::LongAltText),
            &StrategyContext::without_generator(),
        )
        .unwrap_err();
        assert!(matches!(err, StrategyError::AiRequired));
    }

    #[test]
    fn test_figure_structure_reuses_existing_alt_as_caption() {
        let (doc, img) = img_doc("<img src=\"a.png\" alt=\"Quarterly totals\">");
        let fix = build_fix(
            &doc,
            img,
            &issue(IssueType::ImproperFigureStructure),
            &StrategyContext::without_generator(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(fix, Fix::FigureStructure { caption: "Quarterly totals".into() });
    }

    #[test]
    fn test_is_generic_alt() {
        assert!(is_generic_alt("image"));
        assert!(is_generic_alt("Image 3"));
        assert!(is_generic_alt(" photo "));
        assert!(!is_generic_alt("a dog on a couch"));
    }
}
