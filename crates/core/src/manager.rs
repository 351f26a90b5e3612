//! Remediation session: one document, its element index, a cursor, history,
//! and the lazily-built generation client.

use std::time::{SystemTime, UNIX_EPOCH};

use ego_tree::NodeId;
use scraper::Html;
use serde::Serialize;

use crate::apply::{self, Fix, FixOutcome};
use crate::config::RemediateOptions;
use crate::dom;
use crate::element::Element;
use crate::error::{A11yError, IndexError};
use crate::generate::{HttpGenerator, TextGenerator};
use crate::index::{ElementIndex, ElementPosition, PageStatus};
use crate::issue::{IssueRecord, IssueType, RemediationSource, RemediationStatus};
use crate::locator;
use crate::strategies::{self, StrategyContext, StrategyError};

/// One applied fix, recorded for undo and reporting.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub element_id: String,
    pub issue_id: String,
    pub page_number: u32,
    /// Unix seconds.
    pub timestamp: u64,
    pub fix: Fix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionOutcome {
    Remediated,
    Skipped,
    Failed,
}

/// Per-issue result of a remediation attempt, with the issue id preserved so
/// callers can join it back to the audit report.
#[derive(Debug, Clone, Serialize)]
pub struct IssueResolution {
    pub issue_id: String,
    pub issue_type: IssueType,
    pub element_id: Option<String>,
    pub outcome: ResolutionOutcome,
    /// DOM mutations this resolution made; a chained fix can make several.
    pub changes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemediationCounts {
    pub processed: usize,
    pub remediated: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Actual DOM mutations, counted at the applicator boundary. Distinct
    /// from `remediated`, which is status bookkeeping.
    pub changes_applied: usize,
}

impl RemediationCounts {
    /// `remediated + failed + skipped == processed`, always.
    pub fn consistent(&self) -> bool {
        self.remediated + self.failed + self.skipped == self.processed
    }

    fn record(&mut self, resolution: &IssueResolution) {
        self.processed += 1;
        self.changes_applied += resolution.changes;
        match resolution.outcome {
            ResolutionOutcome::Remediated => self.remediated += 1,
            ResolutionOutcome::Skipped => self.skipped += 1,
            ResolutionOutcome::Failed => self.failed += 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RemediationSummary {
    pub counts: RemediationCounts,
    pub resolutions: Vec<IssueResolution>,
}

pub struct RemediationManager {
    doc: Html,
    /// Pristine input, kept for undo replay.
    original_html: String,
    index: ElementIndex,
    options: RemediateOptions,
    current_element: Option<String>,
    current_page: Option<u32>,
    history: Vec<HistoryEntry>,
    generator: Option<Box<dyn TextGenerator>>,
    generator_probed: bool,
}

impl RemediationManager {
    pub fn new(html: &str, index: ElementIndex, options: RemediateOptions) -> Self {
        Self {
            doc: dom::parse_document(html),
            original_html: html.to_string(),
            index,
            options,
            current_element: None,
            current_page: None,
            history: Vec::new(),
            generator: None,
            generator_probed: false,
        }
    }

    /// Inject a generator, bypassing endpoint construction. Also how tests
    /// supply a canned one.
    pub fn with_generator(mut self, generator: Box<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self.generator_probed = true;
        self
    }

    /// Build the HTTP client on first use; probing exactly once keeps a bad
    /// endpoint from being retried on every issue.
    fn ensure_generator(&mut self) {
        if self.generator_probed {
            return;
        }
        self.generator_probed = true;
        if self.options.disable_ai {
            tracing::debug!("text generation disabled by options");
            return;
        }
        let Some(endpoint) = self.options.endpoint.clone() else {
            tracing::debug!("no generation endpoint configured");
            return;
        };
        self.generator = Some(Box::new(HttpGenerator::new(
            endpoint,
            self.options.model_id.clone(),
        )));
    }

    pub fn index(&self) -> &ElementIndex {
        &self.index
    }

    pub fn html(&self) -> String {
        dom::serialize(&self.doc)
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    // ---- cursor ----

    /// Move to the first element with outstanding issues.
    pub fn start(&mut self) -> Option<String> {
        let id = self.index.next_element_with_issues(None)?.id.clone();
        self.set_current(id.clone());
        Some(id)
    }

    /// Move to the first element with outstanding issues on a page.
    pub fn start_page(&mut self, page: u32) -> Option<String> {
        self.current_page = Some(page);
        let id = self
            .index
            .page_elements(page)
            .into_iter()
            .find(|el| {
                self.index
                    .issues_for_element(&el.id)
                    .iter()
                    .any(|i| i.remediation_status == RemediationStatus::NeedsRemediation)
            })
            .map(|el| el.id.clone())?;
        self.current_element = Some(id.clone());
        Some(id)
    }

    pub fn move_to_next_element(&mut self) -> Option<String> {
        let id = self
            .index
            .next_element_with_issues(self.current_element.as_deref())?
            .id
            .clone();
        self.set_current(id.clone());
        Some(id)
    }

    pub fn move_to_previous_element(&mut self) -> Option<String> {
        let current = self.current_element.as_deref()?;
        let id = self.index.previous_element_with_issues(current)?.id.clone();
        self.set_current(id.clone());
        Some(id)
    }

    pub fn move_to_next_page(&mut self) -> Option<u32> {
        let page = self.index.next_page_with_issues(self.current_page)?;
        self.start_page(page);
        Some(page)
    }

    pub fn move_to_previous_page(&mut self) -> Option<u32> {
        let page = self.index.previous_page_with_issues(self.current_page?)?;
        self.start_page(page);
        Some(page)
    }

    fn set_current(&mut self, id: String) {
        self.current_page = self.index.element(&id).map(Element::first_page);
        self.current_element = Some(id);
    }

    pub fn current_element(&self) -> Option<&Element> {
        self.index.element(self.current_element.as_deref()?)
    }

    pub fn position(&self) -> Option<ElementPosition> {
        self.index.position_info(self.current_element.as_deref()?)
    }

    pub fn page_status(&self, page: u32) -> PageStatus {
        self.index.page_status(page)
    }

    // ---- remediation ----

    /// Remediate every outstanding issue that passes the option filters, in
    /// ingestion order.
    pub fn remediate(&mut self) -> Result<RemediationSummary, A11yError> {
        let mut candidates: Vec<String> = self
            .index
            .issues()
            .filter(|i| !i.remediation_status.is_terminal())
            .filter(|i| {
                self.options.issue_types.is_empty() || self.options.issue_types.contains(&i.kind)
            })
            .filter(|i| {
                self.options
                    .severity_threshold
                    .map_or(true, |threshold| i.severity >= threshold)
            })
            .map(|i| i.id.clone())
            .collect();
        if let Some(max) = self.options.max_issues {
            candidates.truncate(max);
        }

        let mut counts = RemediationCounts::default();
        let mut resolutions = Vec::with_capacity(candidates.len());
        for issue_id in candidates {
            let resolution = if self.options.auto_fix {
                self.remediate_issue(&issue_id)?
            } else {
                self.report_only(&issue_id)?
            };
            counts.record(&resolution);
            resolutions.push(resolution);
        }
        debug_assert!(counts.consistent());
        Ok(RemediationSummary { counts, resolutions })
    }

    /// Remediate the outstanding issues on the cursor's element.
    pub fn remediate_current(&mut self) -> Result<Vec<IssueResolution>, A11yError> {
        let element_id = self
            .current_element
            .clone()
            .ok_or(crate::error::RemediateError::NoCurrentElement)?;
        let issue_ids: Vec<String> = self
            .index
            .issues_for_element(&element_id)
            .into_iter()
            .filter(|i| !i.remediation_status.is_terminal())
            .map(|i| i.id.clone())
            .collect();
        let mut out = Vec::with_capacity(issue_ids.len());
        for id in issue_ids {
            out.push(self.remediate_issue(&id)?);
        }
        Ok(out)
    }

    /// Remediate one issue by id. Location or strategy failure is reported in
    /// the resolution, never by corrupting an unrelated node.
    pub fn remediate_issue(&mut self, issue_id: &str) -> Result<IssueResolution, A11yError> {
        self.ensure_generator();
        let issue = self
            .index
            .issue(issue_id)
            .ok_or_else(|| IndexError::UnknownIssue(issue_id.to_string()))?
            .clone();
        let element_id = self.index.element_of_issue(issue_id).map(str::to_string);

        if issue.remediation_status.is_terminal() {
            return Ok(self.resolution(
                &issue,
                &element_id,
                ResolutionOutcome::Skipped,
                None,
                Some(format!("already {}", issue.remediation_status.as_str())),
            ));
        }

        let Some(target) = self.resolve_target(&issue, element_id.as_deref()) else {
            self.index
                .update_status(issue_id, RemediationStatus::Failed, None)?;
            return Ok(self.resolution(
                &issue,
                &element_id,
                ResolutionOutcome::Failed,
                None,
                Some("could not locate element in document".to_string()),
            ));
        };

        let ctx = StrategyContext {
            generator: self.generator.as_deref(),
            image_dir: self.options.image_dir.as_deref(),
            language: self.options.language.as_deref(),
        };
        let fix = match strategies::build_fix(&self.doc, target, &issue, &ctx) {
            Ok(Some(fix)) => fix,
            Ok(None) => {
                self.index
                    .update_status(issue_id, RemediationStatus::Compliant, None)?;
                return Ok(self.resolution(
                    &issue,
                    &element_id,
                    ResolutionOutcome::Skipped,
                    None,
                    Some("already compliant".to_string()),
                ));
            }
            Err(StrategyError::AiRequired) => {
                self.index
                    .update_status(issue_id, RemediationStatus::Failed, None)?;
                return Ok(self.resolution(
                    &issue,
                    &element_id,
                    ResolutionOutcome::Failed,
                    None,
                    Some("AI service required but not available".to_string()),
                ));
            }
            Err(StrategyError::Unsupported(kind)) => {
                return Ok(self.resolution(
                    &issue,
                    &element_id,
                    ResolutionOutcome::Skipped,
                    None,
                    Some(format!("no strategy for {kind}")),
                ));
            }
            Err(StrategyError::Generation(e)) => {
                self.index
                    .update_status(issue_id, RemediationStatus::Failed, None)?;
                return Ok(self.resolution(
                    &issue,
                    &element_id,
                    ResolutionOutcome::Failed,
                    None,
                    Some(e.to_string()),
                ));
            }
        };

        let apply_id = element_id.as_deref().unwrap_or("document");
        match apply::apply_fix(&mut self.doc, target, apply_id, &fix) {
            Ok(FixOutcome::Applied(changes)) => {
                self.history.push(HistoryEntry {
                    element_id: apply_id.to_string(),
                    issue_id: issue_id.to_string(),
                    page_number: issue.page_number(),
                    timestamp: unix_now(),
                    fix: fix.clone(),
                });
                self.index.update_status(
                    issue_id,
                    RemediationStatus::Remediated,
                    Some(RemediationSource::Manual),
                )?;
                tracing::info!(issue = issue_id, action = %fix.describe(), changes, "issue remediated");
                let mut resolution = self.resolution(
                    &issue,
                    &element_id,
                    ResolutionOutcome::Remediated,
                    Some(fix.describe()),
                    None,
                );
                resolution.changes = changes;
                Ok(resolution)
            }
            Ok(FixOutcome::NoOp) => {
                self.index
                    .update_status(issue_id, RemediationStatus::Compliant, None)?;
                Ok(self.resolution(
                    &issue,
                    &element_id,
                    ResolutionOutcome::Skipped,
                    Some(fix.describe()),
                    Some("document already satisfied the fix".to_string()),
                ))
            }
            Err(e) => {
                self.index
                    .update_status(issue_id, RemediationStatus::Failed, None)?;
                Ok(self.resolution(
                    &issue,
                    &element_id,
                    ResolutionOutcome::Failed,
                    Some(fix.describe()),
                    Some(e.to_string()),
                ))
            }
        }
    }

    /// Revert the most recent fix by replaying the rest of the history onto
    /// the pristine document. Returns false when there is nothing to undo.
    pub fn undo_last_fix(&mut self) -> Result<bool, A11yError> {
        let Some(last) = self.history.pop() else {
            return Ok(false);
        };
        self.doc = dom::parse_document(&self.original_html);
        let replay = std::mem::take(&mut self.history);
        for entry in &replay {
            let issue = self.index.issue(&entry.issue_id).cloned();
            let target = issue.as_ref().and_then(|issue| {
                self.resolve_target(issue, Some(entry.element_id.as_str()))
            });
            match target {
                Some(target) => {
                    if let Err(e) =
                        apply::apply_fix(&mut self.doc, target, &entry.element_id, &entry.fix)
                    {
                        tracing::warn!(issue = %entry.issue_id, error = %e, "replay failed");
                    }
                }
                None => {
                    tracing::warn!(issue = %entry.issue_id, "replay target not found");
                }
            }
        }
        self.history = replay;
        self.index
            .update_status(&last.issue_id, RemediationStatus::NeedsRemediation, None)?;
        tracing::info!(issue = %last.issue_id, "undid last fix");
        Ok(true)
    }

    /// Document-level issues target the body; element issues go through the
    /// locator cascade; uncorrelated issues get one last chance via their
    /// recorded selector path.
    fn resolve_target(&self, issue: &IssueRecord, element_id: Option<&str>) -> Option<NodeId> {
        if is_document_level(&issue.kind) {
            return dom::select_one(&self.doc, "body");
        }
        if let Some(element) = element_id.and_then(|id| self.index.element(id)) {
            return locator::locate(&self.doc, element, issue);
        }
        issue
            .location
            .path
            .as_deref()
            .and_then(|path| dom::select_one(&self.doc, path))
    }

    fn resolution(
        &self,
        issue: &IssueRecord,
        element_id: &Option<String>,
        outcome: ResolutionOutcome,
        action: Option<String>,
        detail: Option<String>,
    ) -> IssueResolution {
        IssueResolution {
            issue_id: issue.id.clone(),
            issue_type: issue.kind.clone(),
            element_id: element_id.clone(),
            outcome,
            changes: 0,
            action,
            detail,
        }
    }

    /// Report-only pass for `auto_fix = false`: the issue stays outstanding
    /// and the document is untouched.
    fn report_only(&self, issue_id: &str) -> Result<IssueResolution, A11yError> {
        let issue = self
            .index
            .issue(issue_id)
            .ok_or_else(|| IndexError::UnknownIssue(issue_id.to_string()))?;
        let element_id = self.index.element_of_issue(issue_id).map(str::to_string);
        Ok(self.resolution(
            issue,
            &element_id,
            ResolutionOutcome::Skipped,
            None,
            Some("automatic fixes disabled".to_string()),
        ))
    }
}

fn is_document_level(kind: &IssueType) -> bool {
    kind.is_landmark()
        || matches!(kind, IssueType::MissingPageTitle | IssueType::MissingLanguage)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{BoundingBox, Representation};
    use crate::issue::Severity;
    use crate::strategies::images::ALT_TEXT_PLACEHOLDER;

    fn element(id: &str, page: u32, top: f64, html: &str) -> Element {
        Element {
            id: id.to_string(),
            kind: if html.starts_with("<img") { "FIGURE".into() } else { "TEXT".into() },
            sub_type: None,
            page_indices: vec![page],
            bounding_box: BoundingBox { top, left: 0.0, width: 10.0, height: 10.0 },
            representation: Representation { html: html.to_string() },
        }
    }

    fn issue(id: &str, kind: IssueType, severity: Severity, page: u32) -> IssueRecord {
        let mut issue = IssueRecord::new(kind, severity);
        issue.id = id.to_string();
        issue.location.page_number = Some(page);
        issue
    }

    fn manager_for(
        html: &str,
        elements: Vec<Element>,
        issues: Vec<IssueRecord>,
    ) -> RemediationManager {
        let index = ElementIndex::build(elements, issues);
        RemediationManager::new(html, index, RemediateOptions::default())
    }

    #[test]
    fn test_missing_alt_gets_placeholder_without_generator() {
        let mut manager = manager_for(
            "<html><head></head><body><img src=\"chart.png\"></body></html>",
            vec![element("el-1", 0, 0.0, "<img src=\"chart.png\">")],
            vec![issue("iss-1", IssueType::MissingAltText, Severity::Major, 0)],
        );
        let summary = manager.remediate().unwrap();
        assert_eq!(summary.counts.remediated, 1);
        assert_eq!(summary.counts.changes_applied, 1);
        assert!(summary.counts.consistent());
        assert!(manager
            .html()
            .contains(&format!("alt=\"{ALT_TEXT_PLACEHOLDER}\"")));
        assert_eq!(
            manager.index().issue("iss-1").unwrap().remediation_status,
            RemediationStatus::Remediated
        );
    }

    #[test]
    fn test_ai_required_issue_fails_without_generator() {
        let mut manager = manager_for(
            "<html><head></head><body><img src=\"a.png\" alt=\"image\"></body></html>",
            vec![element("el-1", 0, 0.0, "<img src=\"a.png\" alt=\"image\">")],
            vec![issue("iss-1", IssueType::GenericAltText, Severity::Minor, 0)],
        );
        let summary = manager.remediate().unwrap();
        assert_eq!(summary.counts.failed, 1);
        assert!(summary.counts.consistent());
        assert_eq!(
            summary.resolutions[0].detail.as_deref(),
            Some("AI service required but not available")
        );
        // Terminal: a degraded run leaves no issue in limbo.
        assert_eq!(
            manager.index().issue("iss-1").unwrap().remediation_status,
            RemediationStatus::Failed
        );
    }

    #[test]
    fn test_auto_fix_disabled_leaves_document_untouched() {
        let html = "<html><head></head><body><img src=\"chart.png\"></body></html>";
        let index = ElementIndex::build(
            vec![element("el-1", 0, 0.0, "<img src=\"chart.png\">")],
            vec![issue("iss-1", IssueType::MissingAltText, Severity::Major, 0)],
        );
        let options = RemediateOptions { auto_fix: false, ..RemediateOptions::default() };
        let mut manager = RemediationManager::new(html, index, options);
        let before = manager.html();
        let summary = manager.remediate().unwrap();
        assert_eq!(summary.counts.skipped, 1);
        assert_eq!(summary.counts.changes_applied, 0);
        assert_eq!(manager.html(), before);
        assert_eq!(
            manager.index().issue("iss-1").unwrap().remediation_status,
            RemediationStatus::NeedsRemediation
        );
    }

    #[test]
    fn test_locate_failure_is_failed_not_panic() {
        let mut manager = manager_for(
            "<html><head></head><body><p>no image at all</p></body></html>",
            vec![element("el-1", 0, 0.0, "<img src=\"gone.png\">")],
            vec![issue("iss-1", IssueType::MissingAltText, Severity::Major, 0)],
        );
        let summary = manager.remediate().unwrap();
        assert_eq!(summary.counts.failed, 1);
        assert!(summary.counts.consistent());
        assert_eq!(
            manager.index().issue("iss-1").unwrap().remediation_status,
            RemediationStatus::Failed
        );
    }

    #[test]
    fn test_max_issues_and_severity_filters() {
        let html = "<html><head></head><body>\
                    <img src=\"a.png\"><img src=\"b.png\"><img src=\"c.png\">\
                    </body></html>";
        let elements = vec![
            element("el-a", 0, 0.0, "<img src=\"a.png\">"),
            element("el-b", 0, 10.0, "<img src=\"b.png\">"),
            element("el-c", 0, 20.0, "<img src=\"c.png\">"),
        ];
        let mut issues = vec![
            issue("iss-a", IssueType::MissingAltText, Severity::Critical, 0),
            issue("iss-b", IssueType::MissingAltText, Severity::Minor, 0),
            issue("iss-c", IssueType::MissingAltText, Severity::Critical, 0),
        ];
        issues[0].location.context = Some("<img src=\"a.png\">".to_string());
        issues[1].location.context = Some("<img src=\"b.png\">".to_string());
        issues[2].location.context = Some("<img src=\"c.png\">".to_string());

        let index = ElementIndex::build(elements, issues);
        let options = RemediateOptions {
            max_issues: Some(1),
            severity_threshold: Some(Severity::Major),
            ..RemediateOptions::default()
        };
        let mut manager = RemediationManager::new(html, index, options);
        let summary = manager.remediate().unwrap();
        // Only iss-a: severity filter drops iss-b, max_issues drops iss-c.
        assert_eq!(summary.counts.processed, 1);
        assert_eq!(summary.resolutions[0].issue_id, "iss-a");
    }

    #[test]
    fn test_undo_restores_previous_state() {
        let mut manager = manager_for(
            "<html><head></head><body><img src=\"a.png\"><img src=\"b.png\"></body></html>",
            vec![
                element("el-a", 0, 0.0, "<img src=\"a.png\">"),
                element("el-b", 0, 10.0, "<img src=\"b.png\">"),
            ],
            {
                let mut a = issue("iss-a", IssueType::MissingAltText, Severity::Major, 0);
                a.location.context = Some("<img src=\"a.png\">".to_string());
                let mut b = issue("iss-b", IssueType::MissingAltText, Severity::Major, 0);
                b.location.context = Some("<img src=\"b.png\">".to_string());
                vec![a, b]
            },
        );
        manager.remediate().unwrap();
        assert_eq!(manager.history().len(), 2);

        assert!(manager.undo_last_fix().unwrap());
        assert_eq!(manager.history().len(), 1);
        let html = manager.html();
        // First fix survives the replay, the second is gone.
        let alt_count = html.matches(ALT_TEXT_PLACEHOLDER).count();
        assert_eq!(alt_count, 1);
        assert_eq!(
            manager.index().issue("iss-b").unwrap().remediation_status,
            RemediationStatus::NeedsRemediation
        );
        assert_eq!(
            manager.index().issue("iss-a").unwrap().remediation_status,
            RemediationStatus::Remediated
        );

        assert!(manager.undo_last_fix().unwrap());
        assert!(!manager.undo_last_fix().unwrap());
    }

    #[test]
    fn test_document_level_fix_without_correlated_element() {
        let mut manager = manager_for(
            "<html><head></head><body><p>content</p></body></html>",
            vec![],
            vec![issue("iss-1", IssueType::MissingMainLandmark, Severity::Major, 0)],
        );
        let summary = manager.remediate().unwrap();
        assert_eq!(summary.counts.remediated, 1);
        // The landmark chain made several mutations for this one resolution.
        assert!(summary.counts.changes_applied > summary.counts.remediated);
        assert_eq!(summary.resolutions[0].changes, summary.counts.changes_applied);
        assert!(manager.html().contains("<main id=\"main-content\">"));
    }

    #[test]
    fn test_cursor_navigation() {
        let mut manager = manager_for(
            "<html><head></head><body><img src=\"a.png\"><img src=\"b.png\"></body></html>",
            vec![
                element("el-a", 0, 0.0, "<img src=\"a.png\">"),
                element("el-b", 2, 0.0, "<img src=\"b.png\">"),
            ],
            {
                let mut a = issue("iss-a", IssueType::MissingAltText, Severity::Major, 0);
                a.location.context = Some("<img src=\"a.png\">".to_string());
                let mut b = issue("iss-b", IssueType::MissingAltText, Severity::Major, 2);
                b.location.context = Some("<img src=\"b.png\">".to_string());
                vec![a, b]
            },
        );
        assert_eq!(manager.start().as_deref(), Some("el-a"));
        let pos = manager.position().unwrap();
        assert_eq!(pos.index, 0);
        assert_eq!(pos.total_with_issues, 2);

        assert_eq!(manager.move_to_next_element().as_deref(), Some("el-b"));
        assert_eq!(manager.move_to_next_element(), None);
        assert_eq!(manager.move_to_previous_element().as_deref(), Some("el-a"));

        assert_eq!(manager.move_to_next_page(), Some(2));
        assert_eq!(manager.move_to_next_page(), None);
    }

    #[test]
    fn test_remediate_current_fixes_cursor_element_only() {
        let mut manager = manager_for(
            "<html><head></head><body><img src=\"a.png\"><img src=\"b.png\"></body></html>",
            vec![
                element("el-a", 0, 0.0, "<img src=\"a.png\">"),
                element("el-b", 0, 10.0, "<img src=\"b.png\">"),
            ],
            {
                let mut a = issue("iss-a", IssueType::MissingAltText, Severity::Major, 0);
                a.location.context = Some("<img src=\"a.png\">".to_string());
                let mut b = issue("iss-b", IssueType::MissingAltText, Severity::Major, 0);
                b.location.context = Some("<img src=\"b.png\">".to_string());
                vec![a, b]
            },
        );
        manager.start();
        let resolutions = manager.remediate_current().unwrap();
        assert_eq!(resolutions.len(), 1);
        assert_eq!(resolutions[0].issue_id, "iss-a");
        assert_eq!(
            manager.index().issue("iss-b").unwrap().remediation_status,
            RemediationStatus::NeedsRemediation
        );
    }

    #[test]
    fn test_remediate_is_idempotent_over_repeat_runs() {
        let mut manager = manager_for(
            "<html><head></head><body><img src=\"chart.png\"></body></html>",
            vec![element("el-1", 0, 0.0, "<img src=\"chart.png\">")],
            vec![issue("iss-1", IssueType::MissingAltText, Severity::Major, 0)],
        );
        let first = manager.remediate().unwrap();
        assert_eq!(first.counts.remediated, 1);
        let html_after_first = manager.html();

        // Second run: the issue is terminal, nothing to process.
        let second = manager.remediate().unwrap();
        assert_eq!(second.counts.processed, 0);
        assert_eq!(manager.html(), html_after_first);
    }
}
