//! Config file parsing for `~/.config/doc-a11y/config.toml`.
//!
//! Use `audit_options_from_config` and `remediate_options_from_config` to
//! build runtime options from the loaded config so generation and filtering
//! settings apply.

use serde::{Deserialize, Serialize};

use crate::issue::{IssueType, Severity};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub remediate: RemediateConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Include already-compliant checks in the report.
    #[serde(default)]
    pub include_compliant: bool,
    pub severity_threshold: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediateConfig {
    /// Apply fixes automatically; false runs report-only.
    #[serde(default = "default_true")]
    pub auto_fix: bool,
    pub max_issues: Option<usize>,
    /// Empty means all types.
    #[serde(default)]
    pub issue_types: Vec<String>,
    pub severity_threshold: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_true() -> bool {
    true
}

fn default_language() -> String {
    "en".to_string()
}

impl Default for RemediateConfig {
    fn default() -> Self {
        Self {
            auto_fix: true,
            max_issues: None,
            issue_types: Vec::new(),
            severity_threshold: None,
            language: default_language(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// No endpoint means generation is unavailable.
    pub endpoint: Option<String>,
    #[serde(default = "default_model_id")]
    pub model_id: String,
    #[serde(default)]
    pub disable: bool,
}

fn default_model_id() -> String {
    "vision-default".to_string()
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            model_id: default_model_id(),
            disable: false,
        }
    }
}

/// Runtime audit options.
#[derive(Debug, Clone, Default)]
pub struct AuditOptions {
    pub include_compliant: bool,
    pub severity_threshold: Option<Severity>,
}

/// Runtime remediation options.
#[derive(Debug, Clone)]
pub struct RemediateOptions {
    /// Apply fixes automatically; false runs report-only.
    pub auto_fix: bool,
    pub max_issues: Option<usize>,
    /// Empty means all types.
    pub issue_types: Vec<IssueType>,
    pub severity_threshold: Option<Severity>,
    pub disable_ai: bool,
    pub endpoint: Option<String>,
    pub model_id: String,
    /// Directory holding the document's extracted images.
    pub image_dir: Option<std::path::PathBuf>,
    pub language: Option<String>,
}

impl Default for RemediateOptions {
    fn default() -> Self {
        Self {
            auto_fix: true,
            max_issues: None,
            issue_types: Vec::new(),
            severity_threshold: None,
            disable_ai: false,
            endpoint: None,
            model_id: String::new(),
            image_dir: None,
            language: None,
        }
    }
}

/// Load config from the default path (`~/.config/doc-a11y/config.toml`).
pub fn load_config() -> AppConfig {
    let Some(config_path) = config_path() else {
        return AppConfig::default();
    };
    let content = match std::fs::read_to_string(&config_path) {
        Ok(c) => c,
        Err(_) => return AppConfig::default(),
    };
    match toml::from_str::<AppConfig>(&content) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::warn!(path = %config_path.display(), error = %e, "ignoring invalid config");
            AppConfig::default()
        }
    }
}

/// Return the default config file path (for init and show).
pub fn config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|mut p| {
        p.push("doc-a11y");
        p.push("config.toml");
        p
    })
}

pub fn audit_options_from_config(cfg: &AppConfig) -> AuditOptions {
    AuditOptions {
        include_compliant: cfg.audit.include_compliant,
        severity_threshold: cfg.audit.severity_threshold.as_deref().map(Severity::parse),
    }
}

pub fn remediate_options_from_config(cfg: &AppConfig) -> RemediateOptions {
    RemediateOptions {
        auto_fix: cfg.remediate.auto_fix,
        max_issues: cfg.remediate.max_issues,
        issue_types: cfg
            .remediate
            .issue_types
            .iter()
            .map(|t| IssueType::parse(t))
            .collect(),
        severity_threshold: cfg
            .remediate
            .severity_threshold
            .as_deref()
            .map(Severity::parse),
        disable_ai: cfg.generation.disable,
        endpoint: cfg.generation.endpoint.clone(),
        model_id: cfg.generation.model_id.clone(),
        image_dir: None,
        language: Some(cfg.remediate.language.clone()),
    }
}
