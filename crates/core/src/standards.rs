//! Static WCAG 2.1 criterion table. Informational only; issues carry a copy.

pub struct CriterionInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub level: &'static str,
}

const WCAG_CRITERIA: &[CriterionInfo] = &[
    CriterionInfo { id: "1.1.1", name: "Non-text Content", level: "A" },
    CriterionInfo { id: "1.3.1", name: "Info and Relationships", level: "A" },
    CriterionInfo { id: "1.3.2", name: "Meaningful Sequence", level: "A" },
    CriterionInfo { id: "1.4.1", name: "Use of Color", level: "A" },
    CriterionInfo { id: "1.4.3", name: "Contrast (Minimum)", level: "AA" },
    CriterionInfo { id: "2.4.1", name: "Bypass Blocks", level: "A" },
    CriterionInfo { id: "2.4.2", name: "Page Titled", level: "A" },
    CriterionInfo { id: "2.4.4", name: "Link Purpose (In Context)", level: "A" },
    CriterionInfo { id: "2.4.6", name: "Headings and Labels", level: "AA" },
    CriterionInfo { id: "3.1.1", name: "Language of Page", level: "A" },
    CriterionInfo { id: "3.3.2", name: "Labels or Instructions", level: "A" },
    CriterionInfo { id: "4.1.1", name: "Parsing", level: "A" },
    CriterionInfo { id: "4.1.2", name: "Name, Role, Value", level: "A" },
];

/// Look up a criterion by id (e.g. `"1.1.1"`). Unknown ids get a placeholder
/// rather than an error; criterion data is informational.
pub fn criterion_info(id: &str) -> &'static CriterionInfo {
    static UNKNOWN: CriterionInfo = CriterionInfo {
        id: "unknown",
        name: "Unknown Criterion",
        level: "Unknown",
    };
    WCAG_CRITERIA.iter().find(|c| c.id == id).unwrap_or(&UNKNOWN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_criterion() {
        let c = criterion_info("1.1.1");
        assert_eq!(c.name, "Non-text Content");
        assert_eq!(c.level, "A");
    }

    #[test]
    fn test_unknown_criterion_defaults() {
        let c = criterion_info("9.9.9");
        assert_eq!(c.name, "Unknown Criterion");
    }
}
