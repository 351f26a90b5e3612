//! Report assembly and JSON persistence.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ReportError;
use crate::issue::{IssueRecord, RemediationStatus};
use crate::manager::{RemediationCounts, RemediationSummary};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditSummary {
    pub total: usize,
    pub needs_remediation: usize,
    pub compliant: usize,
    pub by_severity: BTreeMap<String, usize>,
    pub by_type: BTreeMap<String, usize>,
    pub by_page: BTreeMap<u32, usize>,
}

/// Audit output: the issues plus derived rollups. The summary is computed
/// from the issues at construction, never stored independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    pub issues: Vec<IssueRecord>,
    pub summary: AuditSummary,
}

impl AuditReport {
    pub fn new(issues: Vec<IssueRecord>) -> Self {
        let mut summary = AuditSummary {
            total: issues.len(),
            ..AuditSummary::default()
        };
        for issue in &issues {
            match issue.remediation_status {
                RemediationStatus::NeedsRemediation => summary.needs_remediation += 1,
                RemediationStatus::Compliant
                | RemediationStatus::Remediated
                | RemediationStatus::AutoRemediated => summary.compliant += 1,
                RemediationStatus::Failed => {}
            }
            *summary
                .by_severity
                .entry(issue.severity.as_str().to_string())
                .or_default() += 1;
            *summary
                .by_type
                .entry(issue.kind.as_str().to_string())
                .or_default() += 1;
            *summary.by_page.entry(issue.page_number()).or_default() += 1;
        }
        Self { issues, summary }
    }

    pub fn issues_for_page(&self, page: u32) -> Vec<&IssueRecord> {
        self.issues.iter().filter(|i| i.page_number() == page).collect()
    }

    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ReportError> {
        let report: Self = serde_json::from_str(json)?;
        // Stored summaries may predate newer issue fields; recompute.
        Ok(Self::new(report.issues))
    }

    pub fn save(&self, path: &Path) -> Result<(), ReportError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ReportError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}

/// Outcome for one document in a batch run. A failure is recorded, not
/// propagated, so one bad document cannot sink the rest of the batch.
#[derive(Debug, Serialize)]
pub struct DocumentReport {
    pub document: String,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<RemediationSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Default, Serialize)]
pub struct BatchReport {
    pub documents: Vec<DocumentReport>,
}

impl BatchReport {
    pub fn push_success(&mut self, document: String, summary: RemediationSummary, output: Option<PathBuf>) {
        self.documents.push(DocumentReport {
            document,
            succeeded: true,
            error: None,
            summary: Some(summary),
            output,
        });
    }

    pub fn push_failure(&mut self, document: String, error: String) {
        self.documents.push(DocumentReport {
            document,
            succeeded: false,
            error: Some(error),
            summary: None,
            output: None,
        });
    }

    pub fn succeeded(&self) -> usize {
        self.documents.iter().filter(|d| d.succeeded).count()
    }

    pub fn failed(&self) -> usize {
        self.documents.len() - self.succeeded()
    }

    pub fn totals(&self) -> RemediationCounts {
        let mut totals = RemediationCounts::default();
        for summary in self.documents.iter().filter_map(|d| d.summary.as_ref()) {
            totals.processed += summary.counts.processed;
            totals.remediated += summary.counts.remediated;
            totals.failed += summary.counts.failed;
            totals.skipped += summary.counts.skipped;
            totals.changes_applied += summary.counts.changes_applied;
        }
        totals
    }

    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ReportError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::{IssueType, Severity};
    use pretty_assertions::assert_eq;

    fn issue(kind: IssueType, severity: Severity, page: u32) -> IssueRecord {
        let mut issue = IssueRecord::new(kind.clone(), severity);
        issue.id = format!("iss-{}-{page}", kind.as_str());
        issue.location.page_number = Some(page);
        issue
    }

    #[test]
    fn test_summary_rollups() {
        let report = AuditReport::new(vec![
            issue(IssueType::MissingAltText, Severity::Major, 0),
            issue(IssueType::MissingAltText, Severity::Major, 1),
            issue(IssueType::TableMissingCaption, Severity::Minor, 1),
        ]);
        assert_eq!(report.summary.total, 3);
        assert_eq!(report.summary.needs_remediation, 3);
        assert_eq!(report.summary.by_severity["major"], 2);
        assert_eq!(report.summary.by_type["missing-alt-text"], 2);
        assert_eq!(report.summary.by_page[&1], 2);
        assert_eq!(report.issues_for_page(1).len(), 2);
    }

    #[test]
    fn test_report_roundtrip_recomputes_summary() {
        let report = AuditReport::new(vec![issue(IssueType::EmptyLink, Severity::Major, 2)]);
        let json = report.to_json().unwrap();
        let back = AuditReport::from_json(&json).unwrap();
        assert_eq!(back.issues.len(), 1);
        assert_eq!(back.summary.total, 1);
        assert_eq!(back.issues[0].kind, IssueType::EmptyLink);
    }

    #[test]
    fn test_report_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.json");
        let report = AuditReport::new(vec![issue(IssueType::MissingLanguage, Severity::Major, 0)]);
        report.save(&path).unwrap();
        let loaded = AuditReport::load(&path).unwrap();
        assert_eq!(loaded.issues[0].kind, IssueType::MissingLanguage);
    }

    #[test]
    fn test_batch_totals_and_failure_isolation() {
        let mut batch = BatchReport::default();
        batch.push_success(
            "a.html".into(),
            RemediationSummary {
                counts: RemediationCounts {
                    processed: 3,
                    remediated: 2,
                    failed: 0,
                    skipped: 1,
                    changes_applied: 2,
                },
                resolutions: Vec::new(),
            },
            None,
        );
        batch.push_failure("b.html".into(), "no HTML content".into());
        assert_eq!(batch.succeeded(), 1);
        assert_eq!(batch.failed(), 1);
        let totals = batch.totals();
        assert_eq!(totals.processed, 3);
        assert!(totals.consistent());
    }
}
