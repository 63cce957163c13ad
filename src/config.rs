//! Pipeline configuration: keyword lists, field label patterns and the
//! per-source registries.
//!
//! The built-in configuration lives in `config/default.yaml` and is compiled
//! into the binary. An operator file with the same schema can replace it via
//! `--config`. Everything that is "data" rather than "logic" (Hebrew label
//! text, municipality URLs, selector-independent markers) is kept here so
//! that adding a source or a label variant does not require a code change.

use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::{info, instrument};
use url::Url;

const BUILTIN_CONFIG: &str = include_str!("../config/default.yaml");

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid pattern {pattern:?}: {reason}")]
    Pattern { pattern: String, reason: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Which part of a listing the classifier looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextScope {
    /// The extracted title only.
    Title,
    /// The title followed by the full fragment text.
    TitleAndText,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub http: HttpConfig,
    pub classifier: ClassifierConfig,
    pub fields: FieldPatterns,
    pub doc_types: DocTypeConfig,
    pub portal: PortalConfig,
    pub gov_api: GovApiConfig,
    #[serde(default)]
    pub municipalities: Vec<SourceDescriptor>,
    #[serde(default)]
    pub companies: Vec<SourceDescriptor>,
}

/// Default headers and timeout applied to every adapter session.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    pub user_agent: String,
    pub accept_language: String,
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    pub keywords: Vec<String>,
    #[serde(default)]
    pub exclusions: Vec<String>,
    /// Category taxonomy; declaration order is output order.
    pub categories: Vec<CategoryRule>,
    pub default_category: String,
    #[serde(default = "default_relevance_scope")]
    pub relevance_scope: TextScope,
    #[serde(default = "default_category_scope")]
    pub category_scope: TextScope,
}

fn default_relevance_scope() -> TextScope {
    TextScope::Title
}

fn default_category_scope() -> TextScope {
    TextScope::TitleAndText
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryRule {
    pub name: String,
    pub synonyms: Vec<String>,
}

/// Label patterns per extracted field. Each pattern is a regex whose first
/// capture group holds the value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldPatterns {
    #[serde(default)]
    pub tender_number: Vec<String>,
    #[serde(default)]
    pub deadline: Vec<String>,
    #[serde(default)]
    pub publisher: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocTypeConfig {
    pub default_doc_type: String,
    #[serde(default)]
    pub rules: Vec<DocTypeRule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocTypeRule {
    pub label: String,
    pub markers: Vec<String>,
}

/// The national procurement portal: keyword search with pagination.
#[derive(Debug, Clone, Deserialize)]
pub struct PortalConfig {
    pub base_url: String,
    pub search_url: String,
    pub queries: Vec<String>,
    pub query_param: String,
    pub page_param: String,
    pub pages: u32,
    pub historical_pages: u32,
    #[serde(default)]
    pub extra_params: BTreeMap<String, String>,
    #[serde(default)]
    pub historical_params: BTreeMap<String, String>,
    #[serde(default)]
    pub exemption_markers: Vec<String>,
    #[serde(default)]
    pub tender_markers: Vec<String>,
    pub default_publisher: String,
    pub id_prefix: String,
    #[serde(default)]
    pub insecure_tls: bool,
}

/// The gov.il tenders API with its HTML listing as fallback.
#[derive(Debug, Clone, Deserialize)]
pub struct GovApiConfig {
    pub base_url: String,
    pub api_url: String,
    pub html_url: String,
    pub page_size: u32,
    pub default_publisher: String,
    pub id_prefix: String,
    #[serde(default)]
    pub insecure_tls: bool,
}

/// One entry of a static source registry (a municipality or a company).
#[derive(Debug, Clone, Deserialize)]
pub struct SourceDescriptor {
    pub id: String,
    pub name: String,
    pub url: String,
    /// Prefix for tender numbers minted from this source.
    pub prefix: String,
    /// Skip certificate validation for sites with broken chains.
    #[serde(default)]
    pub insecure_tls: bool,
}

impl PipelineConfig {
    /// The configuration compiled into the binary.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_yaml_str(BUILTIN_CONFIG)
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, or fall back to the built-in configuration.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                let yaml = tokio::fs::read_to_string(path).await?;
                let config = Self::from_yaml_str(&yaml)?;
                info!(path = %path.display(), "Loaded configuration file");
                Ok(config)
            }
            None => {
                info!("Using built-in configuration");
                Self::builtin()
            }
        }
    }

    /// Check everything that would otherwise fail halfway through a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.classifier.categories.is_empty() {
            return Err(ConfigError::Invalid("classifier.categories is empty".into()));
        }
        if self.classifier.default_category.trim().is_empty() {
            return Err(ConfigError::Invalid("classifier.default_category is empty".into()));
        }

        for pattern in self
            .fields
            .tender_number
            .iter()
            .chain(&self.fields.deadline)
            .chain(&self.fields.publisher)
        {
            compile_pattern(pattern)?;
        }

        let mut urls = vec![
            ("portal.base_url", &self.portal.base_url),
            ("portal.search_url", &self.portal.search_url),
            ("gov_api.base_url", &self.gov_api.base_url),
            ("gov_api.api_url", &self.gov_api.api_url),
            ("gov_api.html_url", &self.gov_api.html_url),
        ];
        urls.extend(
            self.municipalities
                .iter()
                .chain(&self.companies)
                .map(|d| (d.id.as_str(), &d.url)),
        );
        for (field, url) in urls {
            Url::parse(url).map_err(|e| ConfigError::Invalid(format!("{field}: {url:?}: {e}")))?;
        }

        Ok(())
    }
}

/// Compile a configured label pattern, requiring one capture group.
pub fn compile_pattern(pattern: &str) -> Result<Regex, ConfigError> {
    let regex = Regex::new(pattern).map_err(|e| ConfigError::Pattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;
    if regex.captures_len() < 2 {
        return Err(ConfigError::Pattern {
            pattern: pattern.to_string(),
            reason: "pattern needs a capture group".to_string(),
        });
    }
    Ok(regex)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_config_is_valid() {
        let config = PipelineConfig::builtin().unwrap();

        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.classifier.default_category, "תקשורת");
        assert_eq!(config.classifier.relevance_scope, TextScope::Title);
        assert_eq!(config.classifier.category_scope, TextScope::TitleAndText);
        assert_eq!(config.municipalities.len(), 5);
        assert_eq!(config.municipalities[0].prefix, "TLV");
        assert!(!config.companies.is_empty());
        assert!(config.portal.historical_pages > config.portal.pages);
    }

    #[test]
    fn test_category_order_is_preserved() {
        let config = PipelineConfig::builtin().unwrap();
        let names: Vec<_> = config
            .classifier
            .categories
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, ["דוברות", "יחסי ציבור", "תקשורת", "פרסום", "מדיה"]);
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let yaml = BUILTIN_CONFIG.replace("מספר פרסום\\\\s*", "מספר פרסום(\\\\s*");
        let err = PipelineConfig::from_yaml_str(&yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Pattern { .. }), "got {err}");
    }

    #[test]
    fn test_pattern_without_capture_group_is_rejected() {
        assert!(compile_pattern(r"מועד אחרון").is_err());
        assert!(compile_pattern(r"מועד אחרון\s*(\S+)").is_ok());
    }

    #[test]
    fn test_invalid_descriptor_url_is_rejected() {
        let yaml = BUILTIN_CONFIG.replace("https://www.haifa.muni.il/tenders", "haifa tenders");
        let err = PipelineConfig::from_yaml_str(&yaml).unwrap_err();
        assert!(err.to_string().contains("haifa"), "got {err}");
    }

    #[tokio::test]
    async fn test_load_without_path_uses_builtin() {
        let config = PipelineConfig::load(None).await.unwrap();
        assert_eq!(config.portal.id_prefix, "MR");
    }

    #[tokio::test]
    async fn test_load_missing_file_is_io_error() {
        let err = PipelineConfig::load(Some(Path::new("/nonexistent/tenders.yaml")))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
