//! File-level orchestration: audit and remediate HTML on disk, single file
//! or a directory of converted pages.

use std::path::{Path, PathBuf};

use crate::audit;
use crate::config::{AuditOptions, RemediateOptions};
use crate::element::{ConversionMetadata, Element};
use crate::error::{A11yError, AuditError};
use crate::index::ElementIndex;
use crate::issue::IssueRecord;
use crate::manager::{RemediationManager, RemediationSummary};
use crate::report::{AuditReport, BatchReport};

fn read_html(path: &Path) -> Result<String, A11yError> {
    let content = std::fs::read_to_string(path).map_err(|_| AuditError::NoContent {
        path: path.display().to_string(),
    })?;
    if content.trim().is_empty() {
        return Err(AuditError::NoContent {
            path: path.display().to_string(),
        }
        .into());
    }
    Ok(content)
}

fn html_files(dir: &Path) -> Result<Vec<PathBuf>, A11yError> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(AuditError::Io)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| {
            p.extension()
                .is_some_and(|ext| ext == "html" || ext == "htm")
        })
        .collect();
    files.sort();
    Ok(files)
}

pub fn audit_file(path: &Path, options: &AuditOptions) -> Result<AuditReport, A11yError> {
    let html = read_html(path)?;
    let mut issues = audit::audit_html(&html, options);
    let file_name = path.file_name().map(|n| n.to_string_lossy().to_string());
    for issue in &mut issues {
        issue.location.file_path = Some(path.display().to_string());
        issue.location.file_name = file_name.clone();
    }
    Ok(AuditReport::new(issues))
}

/// Audit a single file or every page file in a directory. Directory pages
/// are visited in name order; page attribution inside each file wins over
/// the file's position.
pub fn audit_path(path: &Path, options: &AuditOptions) -> Result<AuditReport, A11yError> {
    if path.is_dir() {
        let mut all = Vec::new();
        for (position, file) in html_files(path)?.iter().enumerate() {
            let report = audit_file(file, options)?;
            for mut issue in report.issues {
                if issue.location.page_number.is_none() || issue.page_number() == 0 {
                    issue.location.page_number = Some(position as u32);
                }
                all.push(issue);
            }
        }
        Ok(AuditReport::new(all))
    } else {
        audit_file(path, options)
    }
}

/// Remediate an in-memory document against an already-computed issue list.
/// Returns the fixed serialization alongside the per-issue resolutions.
pub fn remediate_html(
    html: &str,
    issues: Vec<IssueRecord>,
    elements: Vec<Element>,
    options: &RemediateOptions,
) -> Result<(String, RemediationSummary), A11yError> {
    let index = ElementIndex::build(elements, issues);
    let mut manager = RemediationManager::new(html, index, options.clone());
    let summary = manager.remediate()?;
    Ok((manager.html(), summary))
}

fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string());
    input.with_file_name(format!("{stem}.remediated.html"))
}

/// Audit and remediate one file, writing the fixed document next to the
/// input unless an output path is given. Conversion metadata, when present,
/// supplies element geometry for issue correlation.
pub fn remediate_file(
    input: &Path,
    output: Option<&Path>,
    metadata: Option<&Path>,
    options: &RemediateOptions,
) -> Result<(RemediationSummary, PathBuf), A11yError> {
    let html = read_html(input)?;
    let issues = audit::audit_html(&html, &AuditOptions::default());
    let elements = match metadata {
        Some(path) => ConversionMetadata::from_file(path)?.elements,
        None => Vec::new(),
    };
    let (fixed, summary) = remediate_html(&html, issues, elements, options)?;

    let output_path = output.map(Path::to_path_buf).unwrap_or_else(|| default_output(input));
    std::fs::write(&output_path, fixed)?;
    tracing::info!(
        input = %input.display(),
        output = %output_path.display(),
        remediated = summary.counts.remediated,
        "document remediated"
    );
    Ok((summary, output_path))
}

/// Remediate every page file in a directory. Failures are recorded per
/// document; the batch always runs to completion.
pub fn remediate_dir(
    dir: &Path,
    output_dir: Option<&Path>,
    options: &RemediateOptions,
) -> Result<BatchReport, A11yError> {
    if let Some(out) = output_dir {
        std::fs::create_dir_all(out)?;
    }
    let mut batch = BatchReport::default();
    for file in html_files(dir)? {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| file.display().to_string());
        let output = output_dir.map(|out| out.join(&name));
        match remediate_file(&file, output.as_deref(), None, options) {
            Ok((summary, written)) => batch.push_success(name, summary, Some(written)),
            Err(e) => {
                tracing::warn!(document = %name, error = %e, "skipping failed document");
                batch.push_failure(name, e.to_string());
            }
        }
    }
    Ok(batch)
}
