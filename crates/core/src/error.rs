/// Top-level error type. All public API functions return this.
#[derive(Debug, thiserror::Error)]
pub enum A11yError {
    #[error("Audit error: {0}")]
    Audit(#[from] AuditError),

    #[error("Remediation error: {0}")]
    Remediate(#[from] RemediateError),

    #[error("Element index error: {0}")]
    Index(#[from] IndexError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("No HTML content to audit at {path}")]
    NoContent { path: String },

    #[error("Malformed conversion metadata: {0}")]
    MalformedMetadata(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum RemediateError {
    #[error("No remediation target: {0}")]
    NoTarget(String),

    #[error("No current element selected")]
    NoCurrentElement,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Unknown element id: {0}")]
    UnknownElement(String),

    #[error("Unknown issue id: {0}")]
    UnknownIssue(String),
}

/// Typed failure from the text/alt-text generation service boundary.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Generation service not configured")]
    NotConfigured,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Service returned error: {0}")]
    Service(String),

    #[error("Empty response from generation service")]
    EmptyResponse,

    #[error("Image at {path} could not be prepared: {detail}")]
    ImagePreparation { path: String, detail: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Failed to parse report: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
