//! Element/issue correlation index.
//!
//! Owns the element collection and the issue records for one remediation
//! session. Issues are keyed by their own unique id; per-page status counters
//! are a derived view recomputed on read, so they cannot drift from the issue
//! records themselves.

use std::collections::{BTreeMap, HashMap};

use crate::element::Element;
use crate::error::IndexError;
use crate::issue::{IssueRecord, IssueType, RemediationSource, RemediationStatus};

/// Derived per-page remediation counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct PageStatus {
    pub total_elements: usize,
    pub needs_remediation: usize,
    pub remediated: usize,
    pub auto_remediated: usize,
    pub compliant: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ElementPosition {
    pub index: usize,
    pub total_elements: usize,
    pub total_with_issues: usize,
    pub issues_before: usize,
    pub issues_remaining: usize,
    pub page_number: u32,
}

pub struct ElementIndex {
    elements: HashMap<String, Element>,
    /// Element ids in document order: stable sort by (min page, top, left).
    order: Vec<String>,
    by_page: BTreeMap<u32, Vec<String>>,
    issues: HashMap<String, IssueRecord>,
    /// Issue ids in ingestion order.
    issue_order: Vec<String>,
    /// element id -> issue ids correlated to it.
    issues_by_element: HashMap<String, Vec<String>>,
    /// issue id -> correlated element id.
    element_of_issue: HashMap<String, String>,
    unresolved: Vec<String>,
}

impl ElementIndex {
    /// Build the index in one pass over elements and issues. Issues that
    /// cannot be correlated are retained as unresolved, never dropped.
    pub fn build(elements: Vec<Element>, issues: Vec<IssueRecord>) -> Self {
        let mut index = Self {
            elements: HashMap::new(),
            order: Vec::new(),
            by_page: BTreeMap::new(),
            issues: HashMap::new(),
            issue_order: Vec::new(),
            issues_by_element: HashMap::new(),
            element_of_issue: HashMap::new(),
            unresolved: Vec::new(),
        };

        for element in elements {
            if element.id.is_empty() {
                tracing::warn!("skipping element without id");
                continue;
            }
            index.order.push(element.id.clone());
            for &page in &element.page_indices {
                index.by_page.entry(page).or_default().push(element.id.clone());
            }
            if element.page_indices.is_empty() {
                index.by_page.entry(0).or_default().push(element.id.clone());
            }
            index.elements.insert(element.id.clone(), element);
        }

        // Document order: stable sort keeps input order for ties.
        let sort_key = |index: &Self, id: &String| {
            let el = &index.elements[id];
            (el.first_page(), el.bounding_box.top, el.bounding_box.left)
        };
        let mut order = std::mem::take(&mut index.order);
        order.sort_by(|a, b| {
            let ka = sort_key(&index, a);
            let kb = sort_key(&index, b);
            ka.0.cmp(&kb.0)
                .then(ka.1.total_cmp(&kb.1))
                .then(ka.2.total_cmp(&kb.2))
        });
        index.order = order;
        for ids in index.by_page.values_mut() {
            let elements = &index.elements;
            ids.sort_by(|a, b| {
                let ea = &elements[a];
                let eb = &elements[b];
                ea.bounding_box
                    .top
                    .total_cmp(&eb.bounding_box.top)
                    .then(ea.bounding_box.left.total_cmp(&eb.bounding_box.left))
            });
        }

        for (seq, mut issue) in issues.into_iter().enumerate() {
            if issue.id.is_empty() {
                issue.id = format!("issue-{seq}");
            }
            let issue_id = issue.id.clone();
            match index.correlate(&issue) {
                Some(element_id) => {
                    index.detect_auto_remediated(&mut issue, &element_id);
                    index
                        .issues_by_element
                        .entry(element_id.clone())
                        .or_default()
                        .push(issue_id.clone());
                    index.element_of_issue.insert(issue_id.clone(), element_id);
                }
                None => {
                    tracing::debug!(issue = %issue_id, kind = %issue.kind, "issue left unresolved");
                    index.unresolved.push(issue_id.clone());
                }
            }
            index.issue_order.push(issue_id.clone());
            index.issues.insert(issue_id, issue);
        }

        index
    }

    /// Correlate one issue to an element id via the fallback cascade. Each
    /// strategy runs only when the previous one fails; exhaustion is `None`.
    pub fn correlate(&self, issue: &IssueRecord) -> Option<String> {
        // Page attribution defaults to 0 when the audit could not determine it.
        let page = issue.location.page_number.unwrap_or(0);
        let candidates: Vec<&Element> = self
            .by_page
            .get(&page)
            .map(|ids| ids.iter().map(|id| &self.elements[id]).collect())
            .unwrap_or_default();
        if candidates.is_empty() {
            return None;
        }

        // Positional match from a `:nth-of-type(N)` path suffix.
        if let Some(path) = issue.location.path.as_deref() {
            if let Some(id) = Self::match_by_position(path, &candidates) {
                return Some(id);
            }
        }

        // src=/alt= substrings extracted from the context snippet.
        if let Some(context) = issue.location.context.as_deref() {
            let src = extract_quoted(context, "src=");
            let alt = extract_quoted(context, "alt=");
            if src.is_some() || alt.is_some() {
                for el in &candidates {
                    let html = &el.representation.html;
                    if src.as_deref().is_some_and(|s| html.contains(s))
                        || alt.as_deref().is_some_and(|a| html.contains(a))
                    {
                        return Some(el.id.clone());
                    }
                }
            }
        }

        // A single candidate on the page wins unconditionally.
        if candidates.len() == 1 {
            return Some(candidates[0].id.clone());
        }

        // Long-alt-text issues: match the alt text itself, then prefer image
        // elements that already carry alt text, then any image element.
        if issue.kind == IssueType::LongAltText {
            if let Some(context) = issue.location.context.as_deref() {
                for el in &candidates {
                    if !context.is_empty() && el.representation.html.contains(context) {
                        return Some(el.id.clone());
                    }
                }
            }
            let images: Vec<&&Element> = candidates.iter().filter(|e| e.is_image()).collect();
            if let Some(el) = images.iter().find(|e| e.representation.html.contains("alt=")) {
                return Some(el.id.clone());
            }
            if let Some(el) = images.first() {
                return Some(el.id.clone());
            }
        }

        None
    }

    fn match_by_position(path: &str, candidates: &[&Element]) -> Option<String> {
        let (prefix, rest) = path.rsplit_once(":nth-of-type(")?;
        let position: usize = rest.strip_suffix(')')?.parse().ok()?;
        let tag = prefix
            .rsplit(|c: char| c == '>' || c.is_whitespace())
            .next()?
            .trim();
        if tag.is_empty() {
            return None;
        }
        let open = format!("<{tag}");
        let matching: Vec<&&Element> = candidates
            .iter()
            .filter(|el| el.representation.html.trim_start().starts_with(open.as_str()))
            .collect();
        if position >= 1 && position <= matching.len() {
            return Some(matching[position - 1].id.clone());
        }
        None
    }

    /// The upstream converter sometimes supplies the needed fix itself: an
    /// alt-text issue whose element markup already carries a non-empty alt is
    /// auto-remediated, detected rather than fixed.
    fn detect_auto_remediated(&self, issue: &mut IssueRecord, element_id: &str) {
        if issue.kind != IssueType::MissingAltText {
            return;
        }
        let Some(element) = self.elements.get(element_id) else {
            return;
        };
        if extract_quoted(&element.representation.html, "alt=")
            .is_some_and(|alt| !alt.trim().is_empty())
        {
            issue.remediation_status = RemediationStatus::AutoRemediated;
            issue.remediation_source = Some(RemediationSource::Automated);
        }
    }

    /// Transition one issue's status, keyed by the issue's own unique id.
    pub fn update_status(
        &mut self,
        issue_id: &str,
        new_status: RemediationStatus,
        source: Option<RemediationSource>,
    ) -> Result<(), IndexError> {
        let issue = self
            .issues
            .get_mut(issue_id)
            .ok_or_else(|| IndexError::UnknownIssue(issue_id.to_string()))?;
        issue.remediation_status = new_status;
        issue.remediation_source = source;
        Ok(())
    }

    pub fn element(&self, element_id: &str) -> Option<&Element> {
        self.elements.get(element_id)
    }

    pub fn issue(&self, issue_id: &str) -> Option<&IssueRecord> {
        self.issues.get(issue_id)
    }

    pub fn issues(&self) -> impl Iterator<Item = &IssueRecord> {
        self.issue_order.iter().filter_map(|id| self.issues.get(id))
    }

    pub fn element_of_issue(&self, issue_id: &str) -> Option<&str> {
        self.element_of_issue.get(issue_id).map(String::as_str)
    }

    pub fn issues_for_element(&self, element_id: &str) -> Vec<&IssueRecord> {
        self.issues_by_element
            .get(element_id)
            .map(|ids| ids.iter().filter_map(|id| self.issues.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn unresolved_issues(&self) -> Vec<&IssueRecord> {
        self.unresolved
            .iter()
            .filter_map(|id| self.issues.get(id))
            .collect()
    }

    fn element_has_outstanding(&self, element_id: &str) -> bool {
        self.issues_for_element(element_id)
            .iter()
            .any(|i| i.remediation_status == RemediationStatus::NeedsRemediation)
    }

    /// Pages that still have at least one outstanding issue, ascending.
    pub fn pages_with_issues(&self) -> Vec<u32> {
        self.issue_pages(|id| self.element_has_outstanding(id))
    }

    /// Pages with any correlated issue, terminal or not.
    fn correlated_pages(&self) -> Vec<u32> {
        self.issue_pages(|_| true)
    }

    fn issue_pages(&self, keep: impl Fn(&str) -> bool) -> Vec<u32> {
        let mut pages: Vec<u32> = self
            .issues_by_element
            .keys()
            .filter(|id| keep(id))
            .filter_map(|id| self.elements.get(id))
            .flat_map(|el| {
                if el.page_indices.is_empty() {
                    vec![0]
                } else {
                    el.page_indices.clone()
                }
            })
            .collect();
        pages.sort_unstable();
        pages.dedup();
        pages
    }

    pub fn next_page_with_issues(&self, current: Option<u32>) -> Option<u32> {
        let pages = self.pages_with_issues();
        match current {
            None => pages.first().copied(),
            Some(cur) => pages.into_iter().find(|&p| p > cur),
        }
    }

    pub fn previous_page_with_issues(&self, current: u32) -> Option<u32> {
        self.pages_with_issues()
            .into_iter()
            .rev()
            .find(|&p| p < current)
    }

    /// Elements on a page, position-sorted.
    pub fn page_elements(&self, page: u32) -> Vec<&Element> {
        self.by_page
            .get(&page)
            .map(|ids| ids.iter().filter_map(|id| self.elements.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn page_issues(&self, page: u32) -> Vec<&IssueRecord> {
        let mut out = Vec::new();
        for (element_id, issue_ids) in &self.issues_by_element {
            let Some(element) = self.elements.get(element_id) else {
                continue;
            };
            let on_page = element.page_indices.contains(&page)
                || (element.page_indices.is_empty() && page == 0);
            if on_page {
                out.extend(issue_ids.iter().filter_map(|id| self.issues.get(id)));
            }
        }
        out
    }

    /// Recomputed from the issue records on every call; there is no stored
    /// counter to fall out of sync.
    pub fn page_status(&self, page: u32) -> PageStatus {
        let mut status = PageStatus {
            total_elements: self.by_page.get(&page).map_or(0, Vec::len),
            ..PageStatus::default()
        };
        for issue in self.page_issues(page) {
            match issue.remediation_status {
                RemediationStatus::NeedsRemediation => status.needs_remediation += 1,
                RemediationStatus::Remediated => status.remediated += 1,
                RemediationStatus::AutoRemediated => status.auto_remediated += 1,
                RemediationStatus::Compliant => status.compliant += 1,
                RemediationStatus::Failed => status.failed += 1,
            }
        }
        status
    }

    pub fn elements_in_order(&self) -> impl Iterator<Item = &Element> {
        self.order.iter().filter_map(|id| self.elements.get(id))
    }

    pub fn elements_with_issues(&self) -> Vec<&Element> {
        self.order
            .iter()
            .filter(|id| self.issues_by_element.contains_key(*id))
            .filter_map(|id| self.elements.get(id))
            .collect()
    }

    /// Next element in document order with outstanding issues. `None` current
    /// starts from the beginning; no wraparound at the end.
    pub fn next_element_with_issues(&self, current: Option<&str>) -> Option<&Element> {
        let start = match current {
            None => 0,
            Some(id) => self.order.iter().position(|e| e == id)? + 1,
        };
        self.order[start..]
            .iter()
            .find(|id| self.element_has_outstanding(id))
            .and_then(|id| self.elements.get(id))
    }

    pub fn previous_element_with_issues(&self, current: &str) -> Option<&Element> {
        let pos = self.order.iter().position(|e| e == current)?;
        self.order[..pos]
            .iter()
            .rev()
            .find(|id| self.element_has_outstanding(id))
            .and_then(|id| self.elements.get(id))
    }

    pub fn position_info(&self, element_id: &str) -> Option<ElementPosition> {
        let index = self.order.iter().position(|e| e == element_id)?;
        let with_issues = self.issues_by_element.len();
        let issues_before = self.order[..index]
            .iter()
            .filter(|id| self.issues_by_element.contains_key(*id))
            .count();
        Some(ElementPosition {
            index,
            total_elements: self.order.len(),
            total_with_issues: with_issues,
            issues_before,
            issues_remaining: with_issues - issues_before,
            page_number: self.elements.get(element_id)?.first_page(),
        })
    }

    /// Invariant check: per-page counters sum to the number of correlated
    /// issues. Always true by construction with derived counters; exposed so
    /// callers and tests can assert it after arbitrary status transitions.
    pub fn counters_consistent(&self) -> bool {
        let counted: usize = self
            .correlated_pages()
            .iter()
            .map(|&p| {
                let s = self.page_status(p);
                s.needs_remediation + s.remediated + s.auto_remediated + s.compliant + s.failed
            })
            .sum();
        let expected: usize = self
            .issues_by_element
            .iter()
            .map(|(element_id, ids)| {
                let pages = self
                    .elements
                    .get(element_id)
                    .map_or(1, |e| e.page_indices.len().max(1));
                ids.len() * pages
            })
            .sum();
        counted == expected
    }
}

/// Extract the quoted value following `needle` (e.g. `src=` or `alt=`) in a
/// markup snippet. Accepts single or double quotes.
pub(crate) fn extract_quoted(haystack: &str, needle: &str) -> Option<String> {
    let start = haystack.find(needle)? + needle.len();
    let rest = &haystack[start..];
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let inner = &rest[1..];
    let end = inner.find(quote)?;
    Some(inner[..end].to_string())
}
