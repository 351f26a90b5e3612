//! WCAG 2.1 checks over a parsed document.
//!
//! Each check walks the DOM and emits issue records with a stable content-
//! derived id, the matching criterion, and enough location detail for the
//! locator cascade to find the node again later.

use ego_tree::NodeId;
use scraper::Html;
use sha2::{Digest, Sha256};

use crate::config::AuditOptions;
use crate::dom;
use crate::issue::{IssueRecord, IssueType, RemediationStatus, Severity};
use crate::locator::LONG_ALT_THRESHOLD;
use crate::standards;
use crate::strategies::images::is_generic_alt;
use crate::strategies::links::is_generic_link_text;

/// Audit an already-parsed document.
pub fn audit_document(doc: &Html, options: &AuditOptions) -> Vec<IssueRecord> {
    let mut issues = Vec::new();
    check_images(doc, options, &mut issues);
    check_tables(doc, &mut issues);
    check_landmarks(doc, &mut issues);
    check_document_metadata(doc, &mut issues);
    check_headings(doc, &mut issues);
    check_links(doc, &mut issues);

    if let Some(threshold) = options.severity_threshold {
        issues.retain(|i| {
            i.severity >= threshold || i.remediation_status == RemediationStatus::Compliant
        });
    }
    issues
}

/// Parse and audit an HTML string.
pub fn audit_html(html: &str, options: &AuditOptions) -> Vec<IssueRecord> {
    audit_document(&dom::parse_document(html), options)
}

fn check_images(doc: &Html, options: &AuditOptions, issues: &mut Vec<IssueRecord>) {
    for img in dom::select_all(doc, "img") {
        let alt = dom::get_attr(doc, img, "alt");
        match alt.as_deref() {
            None => issues.push(make_issue(
                doc,
                Some(img),
                IssueType::MissingAltText,
                Severity::Major,
                "1.1.1",
                "image has no alt attribute".to_string(),
            )),
            Some(a) if a.trim().is_empty() => issues.push(make_issue(
                doc,
                Some(img),
                IssueType::EmptyAltText,
                Severity::Minor,
                "1.1.1",
                "image alt attribute is empty".to_string(),
            )),
            Some(a) if is_generic_alt(a) => issues.push(make_issue(
                doc,
                Some(img),
                IssueType::GenericAltText,
                Severity::Minor,
                "1.1.1",
                format!("image alt text \"{a}\" conveys no information"),
            )),
            Some(a) if a.chars().count() > LONG_ALT_THRESHOLD => issues.push(make_issue(
                doc,
                Some(img),
                IssueType::LongAltText,
                Severity::Minor,
                "1.1.1",
                format!("image alt text is {} characters", a.chars().count()),
            )),
            Some(_) if options.include_compliant => {
                let mut issue = make_issue(
                    doc,
                    Some(img),
                    IssueType::MissingAltText,
                    Severity::Info,
                    "1.1.1",
                    "image has descriptive alt text".to_string(),
                );
                issue.remediation_status = RemediationStatus::Compliant;
                issues.push(issue);
            }
            Some(_) => {}
        }
    }

    for figure in dom::select_all(doc, "figure") {
        if dom::select_within(doc, figure, "figcaption").is_empty() {
            issues.push(make_issue(
                doc,
                Some(figure),
                IssueType::ImproperFigureStructure,
                Severity::Minor,
                "1.1.1",
                "figure has no figcaption".to_string(),
            ));
        }
    }
}

fn check_tables(doc: &Html, issues: &mut Vec<IssueRecord>) {
    for table in dom::select_all(doc, "table") {
        let header_cells = dom::select_within(doc, table, "th");
        if header_cells.is_empty() {
            issues.push(make_issue(
                doc,
                Some(table),
                IssueType::TableMissingHeaders,
                Severity::Major,
                "1.3.1",
                "table has no header cells".to_string(),
            ));
        } else if dom::select_within(doc, table, "thead").is_empty() {
            issues.push(make_issue(
                doc,
                Some(table),
                IssueType::TableMissingThead,
                Severity::Major,
                "1.3.1",
                "table header cells are not grouped in a thead".to_string(),
            ));
        }

        let caption = dom::select_within(doc, table, "caption").into_iter().next();
        if caption.map_or(true, |c| dom::inner_text(doc, c).trim().is_empty()) {
            issues.push(make_issue(
                doc,
                Some(table),
                IssueType::TableMissingCaption,
                Severity::Minor,
                "1.3.1",
                "table has no caption".to_string(),
            ));
        }

        if header_cells
            .iter()
            .any(|&th| dom::get_attr(doc, th, "scope").is_none())
        {
            issues.push(make_issue(
                doc,
                Some(table),
                IssueType::TableMissingScope,
                Severity::Minor,
                "1.3.1",
                "header cells lack scope attributes".to_string(),
            ));
        }

        // Rows of unequal width usually mean spanned or layered headers that
        // need explicit header/cell association.
        let widths: Vec<usize> = dom::select_within(doc, table, "tr")
            .into_iter()
            .map(|tr| dom::select_within(doc, tr, "td, th").len())
            .collect();
        if widths.windows(2).any(|w| w[0] != w[1]) {
            issues.push(make_issue(
                doc,
                Some(table),
                IssueType::TableIrregularHeaders,
                Severity::Major,
                "1.3.1",
                "table rows have unequal cell counts".to_string(),
            ));
        }
    }
}

fn check_landmarks(doc: &Html, issues: &mut Vec<IssueRecord>) {
    if dom::select_one(doc, "main, [role=\"main\"]").is_none() {
        issues.push(make_issue(
            doc,
            None,
            IssueType::MissingMainLandmark,
            Severity::Major,
            "1.3.1",
            "document has no main landmark".to_string(),
        ));
    }
    if dom::select_one(doc, "a.skip-link, a[href=\"#main-content\"]").is_none() {
        issues.push(make_issue(
            doc,
            None,
            IssueType::MissingSkipLink,
            Severity::Minor,
            "2.4.1",
            "document has no skip link".to_string(),
        ));
    }
    // Navigation, header, and footer are flagged on their own only when there
    // is content to wrap; the main-landmark fix chain lands them regardless.
    if dom::select_one(doc, "#toc, .toc, ul.table-of-contents").is_some()
        && dom::select_one(doc, "nav, [role=\"navigation\"]").is_none()
    {
        issues.push(make_issue(
            doc,
            None,
            IssueType::MissingNavigationLandmark,
            Severity::Minor,
            "1.3.1",
            "table of contents is not marked as navigation".to_string(),
        ));
    }
    if dom::select_one(doc, "h1").is_some()
        && dom::select_one(doc, "header, [role=\"banner\"]").is_none()
    {
        issues.push(make_issue(
            doc,
            None,
            IssueType::MissingHeaderLandmark,
            Severity::Minor,
            "1.3.1",
            "document has no header landmark".to_string(),
        ));
    }
    if dom::select_one(doc, "#footer, .footer, .page-footer").is_some()
        && dom::select_one(doc, "footer, [role=\"contentinfo\"]").is_none()
    {
        issues.push(make_issue(
            doc,
            None,
            IssueType::MissingFooterLandmark,
            Severity::Minor,
            "1.3.1",
            "footer content is not marked as contentinfo".to_string(),
        ));
    }
}

fn check_document_metadata(doc: &Html, issues: &mut Vec<IssueRecord>) {
    let title = dom::select_one(doc, "head > title");
    if title.map_or(true, |t| dom::inner_text(doc, t).trim().is_empty()) {
        issues.push(make_issue(
            doc,
            None,
            IssueType::MissingPageTitle,
            Severity::Major,
            "2.4.2",
            "document has no title".to_string(),
        ));
    }
    let lang = dom::select_one(doc, "html").and_then(|html| dom::get_attr(doc, html, "lang"));
    if lang.map_or(true, |l| l.trim().is_empty()) {
        issues.push(make_issue(
            doc,
            None,
            IssueType::MissingLanguage,
            Severity::Major,
            "3.1.1",
            "document declares no language".to_string(),
        ));
    }
}

fn check_headings(doc: &Html, issues: &mut Vec<IssueRecord>) {
    let mut previous_level: Option<u8> = None;
    for heading in dom::select_all(doc, "h1, h2, h3, h4, h5, h6") {
        let Some(tag) = dom::tag_name(doc, heading) else {
            continue;
        };
        let Some(level) = tag.strip_prefix('h').and_then(|l| l.parse::<u8>().ok()) else {
            continue;
        };
        if dom::inner_text(doc, heading).trim().is_empty() {
            issues.push(make_issue(
                doc,
                Some(heading),
                IssueType::EmptyHeading,
                Severity::Major,
                "2.4.6",
                "heading has no text".to_string(),
            ));
        }
        let expected = previous_level.map_or(1, |p| p + 1);
        if level > expected {
            issues.push(make_issue(
                doc,
                Some(heading),
                IssueType::SkippedHeadingLevel,
                Severity::Minor,
                "1.3.1",
                format!("heading is h{level} where h{expected} or lower was expected"),
            ));
        }
        previous_level = Some(level);
    }
}

fn check_links(doc: &Html, issues: &mut Vec<IssueRecord>) {
    for link in dom::select_all(doc, "a") {
        let text = dom::inner_text(doc, link);
        let text = text.trim();
        if text.is_empty() {
            // An image with alt text or an aria-label still names the link.
            let labelled = dom::get_attr(doc, link, "aria-label")
                .is_some_and(|l| !l.trim().is_empty())
                || dom::select_within(doc, link, "img").iter().any(|&img| {
                    dom::get_attr(doc, img, "alt").is_some_and(|a| !a.trim().is_empty())
                });
            if !labelled {
                issues.push(make_issue(
                    doc,
                    Some(link),
                    IssueType::EmptyLink,
                    Severity::Major,
                    "2.4.4",
                    "link has no accessible name".to_string(),
                ));
            }
        } else if is_generic_link_text(text) {
            issues.push(make_issue(
                doc,
                Some(link),
                IssueType::GenericLinkText,
                Severity::Minor,
                "2.4.4",
                format!("link text \"{text}\" does not describe its destination"),
            ));
        }
    }
}

fn make_issue(
    doc: &Html,
    node: Option<NodeId>,
    kind: IssueType,
    severity: Severity,
    criterion: &str,
    message: String,
) -> IssueRecord {
    let mut issue = IssueRecord::new(kind, severity);
    let info = standards::criterion_info(criterion);
    issue.wcag_criterion = Some(criterion.to_string());
    issue.criterion_name = Some(info.name.to_string());
    issue.criterion_level = Some(info.level.to_string());
    issue.message = Some(message);
    match node {
        Some(node) => {
            issue.element = dom::tag_name(doc, node);
            issue.location.path = Some(css_path(doc, node));
            issue.location.page_number = Some(page_of(doc, node));
            issue.location.context = Some(snippet(doc, node));
            if issue.element.as_deref() == Some("img") {
                issue.location.image_src = dom::get_attr(doc, node, "src");
            }
        }
        None => {
            issue.location.page_number = Some(0);
        }
    }
    issue.id = stable_issue_id(&issue);
    issue
}

/// Content-derived id: auditing the same document twice yields the same ids,
/// so reports can be diffed across runs.
fn stable_issue_id(issue: &IssueRecord) -> String {
    let mut hasher = Sha256::new();
    hasher.update(issue.kind.as_str().as_bytes());
    hasher.update([0]);
    hasher.update(issue.page_number().to_le_bytes());
    hasher.update([0]);
    hasher.update(issue.location.path.as_deref().unwrap_or("").as_bytes());
    hasher.update([0]);
    hasher.update(issue.location.context.as_deref().unwrap_or("").as_bytes());
    let digest = hasher.finalize();
    let hex = format!("{digest:x}");
    format!("iss-{}", &hex[..12])
}

/// Selector path from the nearest id-bearing ancestor (or body) down to the
/// node, with `:nth-of-type` disambiguation at each step.
fn css_path(doc: &Html, node: NodeId) -> String {
    let mut segments: Vec<String> = Vec::new();
    let mut current = node;
    loop {
        let Some(node_ref) = doc.tree.get(current) else {
            break;
        };
        let Some(element) = node_ref.value().as_element() else {
            break;
        };
        let tag = element.name().to_string();
        if let Some(id) = element.attr("id") {
            segments.push(format!("#{id}"));
            break;
        }
        if tag == "body" || tag == "html" {
            segments.push(tag);
            break;
        }
        let position = node_ref
            .prev_siblings()
            .filter(|s| s.value().as_element().is_some_and(|e| e.name() == tag))
            .count()
            + 1;
        segments.push(format!("{tag}:nth-of-type({position})"));
        match node_ref.parent() {
            Some(parent) => current = parent.id(),
            None => break,
        }
    }
    segments.reverse();
    segments.join(" > ")
}

/// Page index from the enclosing page container. Converted documents wrap
/// each page in `<div id="page-N">` or carry a `data-page` attribute.
fn page_of(doc: &Html, node: NodeId) -> u32 {
    let Some(node_ref) = doc.tree.get(node) else {
        return 0;
    };
    for ancestor in std::iter::once(node_ref).chain(node_ref.ancestors()) {
        let Some(element) = ancestor.value().as_element() else {
            continue;
        };
        if let Some(page) = element.attr("data-page").and_then(|p| p.parse().ok()) {
            return page;
        }
        if let Some(rest) = element.attr("id").and_then(|id| id.strip_prefix("page-")) {
            if let Ok(page) = rest.parse() {
                return page;
            }
        }
    }
    0
}

fn snippet(doc: &Html, node: NodeId) -> String {
    dom::element_ref(doc, node)
        .map(|e| e.html().chars().take(200).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MESSY: &str = r##"<html><head></head><body>
        <div id="page-1">
            <h2>Starts at two</h2>
            <img src="chart.png">
            <img src="logo.png" alt="image">
            <table><tr><td>Name</td><td>Age</td></tr><tr><td>Alice</td><td>30</td></tr></table>
            <a href="report.pdf">click here</a>
            <a href="#next"></a>
        </div>
    </body></html>"##;

    fn kinds(issues: &[IssueRecord]) -> Vec<&str> {
        issues.iter().map(|i| i.kind.as_str()).collect()
    }

    #[test]
    fn test_audit_finds_expected_issues() {
        let issues = audit_html(MESSY, &AuditOptions::default());
        let found = kinds(&issues);
        for expected in [
            "missing-alt-text",
            "generic-alt-text",
            "table-missing-headers",
            "table-missing-caption",
            "generic-link-text",
            "empty-link",
            "missing-main-landmark",
            "missing-skip-link",
            "missing-page-title",
            "missing-language",
            "skipped-heading-level",
        ] {
            assert!(found.contains(&expected), "missing {expected} in {found:?}");
        }
    }

    #[test]
    fn test_issue_ids_are_stable_across_runs() {
        let first = audit_html(MESSY, &AuditOptions::default());
        let second = audit_html(MESSY, &AuditOptions::default());
        let ids_a: Vec<&str> = first.iter().map(|i| i.id.as_str()).collect();
        let ids_b: Vec<&str> = second.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids_a, ids_b);
        // And distinct within one run.
        let mut dedup = ids_a.clone();
        dedup.sort_unstable();
        dedup.dedup();
        assert_eq!(dedup.len(), ids_a.len());
    }

    #[test]
    fn test_recorded_paths_resolve_back_to_the_node() {
        let doc = dom::parse_document(MESSY);
        let issues = audit_document(&doc, &AuditOptions::default());
        for issue in issues.iter().filter(|i| i.location.path.is_some()) {
            let path = issue.location.path.as_deref().unwrap();
            let found = dom::select_one(&doc, path);
            assert!(found.is_some(), "path {path} did not resolve");
            assert_eq!(
                dom::tag_name(&doc, found.unwrap()),
                issue.element.clone(),
                "path {path} resolved to a different element"
            );
        }
    }

    #[test]
    fn test_page_attribution_from_container() {
        let issues = audit_html(MESSY, &AuditOptions::default());
        let img_issue = issues
            .iter()
            .find(|i| i.kind == IssueType::MissingAltText)
            .unwrap();
        assert_eq!(img_issue.page_number(), 1);
        // Document-level issues default to page 0.
        let lang = issues
            .iter()
            .find(|i| i.kind == IssueType::MissingLanguage)
            .unwrap();
        assert_eq!(lang.page_number(), 0);
    }

    #[test]
    fn test_clean_document_yields_no_issues() {
        let clean = r##"<html lang="en"><head><title>Report</title></head><body>
            <a class="skip-link" href="#main-content">Skip to main content</a>
            <main id="main-content">
                <h1>Report</h1>
                <img src="chart.png" alt="Revenue by quarter, rising steadily">
                <table>
                    <caption>Quarterly revenue</caption>
                    <thead><tr><th scope="col">Quarter</th><th scope="col">Revenue</th></tr></thead>
                    <tbody><tr><td>Q1</td><td>10</td></tr></tbody>
                </table>
                <a href="notes.html">Methodology notes</a>
            </main>
        </body></html>"##;
        let mut issues = audit_html(clean, &AuditOptions::default());
        issues.retain(|i| i.kind != IssueType::MissingHeaderLandmark);
        assert!(issues.is_empty(), "unexpected issues: {:?}", kinds(&issues));
    }

    #[test]
    fn test_include_compliant_reports_good_images() {
        let html = r#"<html lang="en"><head><title>t</title></head><body>
            <img src="a.png" alt="A detailed map of the region"></body></html>"#;
        let options = AuditOptions { include_compliant: true, ..AuditOptions::default() };
        let issues = audit_html(html, &options);
        assert!(issues
            .iter()
            .any(|i| i.remediation_status == RemediationStatus::Compliant));
    }

    #[test]
    fn test_severity_threshold_filters_minor_issues() {
        let issues = audit_html(
            MESSY,
            &AuditOptions {
                severity_threshold: Some(Severity::Major),
                ..AuditOptions::default()
            },
        );
        assert!(issues.iter().all(|i| i.severity >= Severity::Major));
    }
}
