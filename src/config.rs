//! Settings document and report template loading.
//!
//! Settings live in a YAML file. Command-line overrides are applied on top of
//! the file values, then the result is validated once and handed to every stage
//! by reference.

use crate::cli::Cli;
use crate::error::{DigestError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

/// Fixed field widths for the rendered tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Widths {
    /// Rank column.
    pub idx: usize,
    /// Count / monetary column.
    pub cnt: usize,
    /// Category column of the metric tables.
    pub name: usize,
    /// Category column of the record table.
    #[serde(rename = "type")]
    pub category: usize,
    pub author: usize,
    pub title: usize,
}

impl Default for Widths {
    fn default() -> Self {
        Widths {
            idx: 4,
            cnt: 10,
            name: 24,
            category: 16,
            author: 18,
            title: 48,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorSettings {
    pub name: String,
    /// Posting credential handed to the publish endpoint.
    #[serde(default)]
    pub posting: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublishSettings {
    /// Publish endpoint. Without one the report goes to a dry-run directory.
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuditSettings {
    /// Directory the audit collection lives in.
    pub target: PathBuf,
    pub collection: String,
}

impl Default for AuditSettings {
    fn default() -> Self {
        AuditSettings {
            target: PathBuf::from("audit"),
            collection: "digests".to_string(),
        }
    }
}

/// Immutable run configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub days_before: u32,
    /// Size of the top-N record table.
    pub count: usize,
    /// Rounding resolution for monetary values, e.g. `0.01`.
    pub decimal: f64,
    pub page_size: usize,
    pub feed_url: String,
    /// Prefix joined to each record's relative URL in the reference lines.
    pub link_base: String,
    pub currency_marker: String,
    #[serde(rename = "fmt_width")]
    pub widths: Widths,
    /// Report title prefix; the generation date is appended.
    pub title: String,
    pub parent_permlink: String,
    pub body_template: PathBuf,
    pub author: AuthorSettings,
    pub json_metadata: serde_json::Value,
    pub publish: PublishSettings,
    pub audit: AuditSettings,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            days_before: 0,
            count: 10,
            decimal: 0.01,
            page_size: 100,
            feed_url: "https://api.utopian.io/api/posts/".to_string(),
            link_base: "https://steemit.com".to_string(),
            currency_marker: "$".to_string(),
            widths: Widths::default(),
            title: "Daily category digest ".to_string(),
            parent_permlink: "cn".to_string(),
            body_template: PathBuf::from("body.md"),
            author: AuthorSettings::default(),
            json_metadata: serde_json::Value::Null,
            publish: PublishSettings::default(),
            audit: AuditSettings::default(),
            request_timeout_secs: 30,
        }
    }
}

impl Settings {
    /// Parse a YAML settings document.
    pub fn from_yaml(raw: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Apply command-line overrides over the file values.
    pub fn with_overrides(mut self, cli: &Cli) -> Self {
        if let Some(days_before) = cli.days_before {
            self.days_before = days_before;
        }
        if let Some(count) = cli.count {
            self.count = count;
        }
        self
    }

    /// Multiplier used for rounding monetary values, `round(1 / decimal)`.
    pub fn precision(&self) -> f64 {
        (1.0 / self.decimal).round()
    }

    pub fn validate(&self) -> Result<()> {
        if self.count == 0 {
            return Err(DigestError::Config("count must be greater than 0".into()));
        }
        if self.page_size == 0 {
            return Err(DigestError::Config("page_size must be greater than 0".into()));
        }
        if !(self.decimal > 0.0 && self.decimal <= 1.0) {
            return Err(DigestError::Config(format!(
                "decimal must be in (0, 1], got {}",
                self.decimal
            )));
        }
        let w = &self.widths;
        if [w.idx, w.cnt, w.name, w.category, w.author, w.title].contains(&0) {
            return Err(DigestError::Config("field widths must be greater than 0".into()));
        }
        url::Url::parse(&self.feed_url)?;
        if let Some(endpoint) = &self.publish.endpoint {
            url::Url::parse(endpoint)?;
        }
        Ok(())
    }
}

/// Settings plus the body template they point at.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub settings: Settings,
    pub template: String,
}

/// Load settings from `path`, apply `cli` overrides, validate, and read the template.
///
/// A relative `body_template` is resolved against the settings file's directory.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load(path: &Path, cli: &Cli) -> Result<JobConfig> {
    let raw = fs::read_to_string(path)
        .await
        .map_err(|e| DigestError::Config(format!("cannot read {}: {e}", path.display())))?;
    let settings = Settings::from_yaml(&raw)?.with_overrides(cli);
    settings.validate()?;

    let template_path = match path.parent() {
        Some(dir) if settings.body_template.is_relative() => dir.join(&settings.body_template),
        _ => settings.body_template.clone(),
    };
    let template = fs::read_to_string(&template_path).await.map_err(|e| {
        DigestError::Config(format!("cannot read template {}: {e}", template_path.display()))
    })?;

    info!(
        template = %template_path.display(),
        days_before = settings.days_before,
        count = settings.count,
        "Loaded settings"
    );
    Ok(JobConfig { settings, template })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    const SAMPLE: &str = r#"
days_before: 1
count: 5
decimal: 0.001
fmt_width:
  idx: 5
  type: 12
title: "Utopian daily: "
author:
  name: digest-bot
  posting: secret
json_metadata:
  tags: [cn, utopian-io]
audit:
  target: /var/lib/digest
  collection: utopian_types
"#;

    #[test]
    fn test_from_yaml_with_defaults() {
        let s = Settings::from_yaml(SAMPLE).unwrap();
        assert_eq!(s.days_before, 1);
        assert_eq!(s.count, 5);
        assert_eq!(s.widths.idx, 5);
        assert_eq!(s.widths.category, 12);
        assert_eq!(s.widths.cnt, Widths::default().cnt);
        assert_eq!(s.page_size, 100);
        assert_eq!(s.author.name, "digest-bot");
        assert_eq!(s.audit.collection, "utopian_types");
        assert_eq!(s.json_metadata["tags"][0], "cn");
        assert_eq!(s.precision(), 1000.0);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_malformed_yaml_is_config_error() {
        let err = Settings::from_yaml("count: [1, 2").unwrap_err();
        assert!(matches!(err, DigestError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let s = Settings { count: 0, ..Settings::default() };
        assert!(matches!(s.validate(), Err(DigestError::Config(_))));

        let s = Settings { decimal: 0.0, ..Settings::default() };
        assert!(s.validate().is_err());

        let mut s = Settings::default();
        s.widths.title = 0;
        assert!(s.validate().is_err());

        let s = Settings { feed_url: "not a url".into(), ..Settings::default() };
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_cli_overrides_file_values() {
        let cli = Cli::parse_from(["category_digest", "-c", "s.yaml", "--count", "3"]);
        let s = Settings::from_yaml(SAMPLE).unwrap().with_overrides(&cli);
        assert_eq!(s.count, 3);
        assert_eq!(s.days_before, 1);
    }

    #[tokio::test]
    async fn test_load_resolves_template_next_to_settings() {
        let dir = tempfile::tempdir().unwrap();
        let settings_path = dir.path().join("settings.yaml");
        std::fs::write(&settings_path, "body_template: body.md\n").unwrap();
        std::fs::write(dir.path().join("body.md"), "count: $COUNT").unwrap();

        let cli = Cli::parse_from(["category_digest", "-c", "settings.yaml"]);
        let job = load(&settings_path, &cli).await.unwrap();
        assert_eq!(job.template, "count: $COUNT");
    }

    #[tokio::test]
    async fn test_load_missing_template_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let settings_path = dir.path().join("settings.yaml");
        std::fs::write(&settings_path, "body_template: missing.md\n").unwrap();

        let cli = Cli::parse_from(["category_digest", "-c", "settings.yaml"]);
        let err = load(&settings_path, &cli).await.unwrap_err();
        assert!(matches!(err, DigestError::Config(_)));
    }
}
