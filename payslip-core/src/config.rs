use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

// Default value functions for serde
fn default_year_parent_dir() -> String {
    "HOLERITES".to_string()
}

fn default_page_suffix_tag() -> String {
    "_pag".to_string()
}

fn default_pdf_extension() -> String {
    "pdf".to_string()
}

/// What happens when `<stem>.pdf` is claimed by more than one source document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    /// Replace the existing file (logged as a warning)
    Overwrite,
    /// Leave the tagged artifacts in place and keep the existing file
    KeepExisting,
    /// Rename to `<stem> (2).pdf`, `<stem> (3).pdf`, ...
    #[default]
    Disambiguate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Directory directly under the archive root that holds the year folders
    #[serde(default = "default_year_parent_dir")]
    pub year_parent_dir: String,
    /// Marker placed between the file stem and the 1-based page number
    #[serde(default = "default_page_suffix_tag")]
    pub page_suffix_tag: String,
    /// Source file extension, compared case-insensitively
    #[serde(default = "default_pdf_extension")]
    pub pdf_extension: String,
    /// Worker pool size; defaults to the host's available parallelism
    #[serde(default)]
    pub max_workers: Option<usize>,
    #[serde(default)]
    pub collision_policy: CollisionPolicy,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            year_parent_dir: default_year_parent_dir(),
            page_suffix_tag: default_page_suffix_tag(),
            pdf_extension: default_pdf_extension(),
            max_workers: None,
            collision_policy: CollisionPolicy::default(),
        }
    }
}

impl ExtractionConfig {
    /// Load config from a YAML file
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {path}"))?;
        let config: ExtractionConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {path}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config with fallback to default
    pub fn load_with_fallback(path: Option<&str>) -> Self {
        match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|e| {
                tracing::warn!(path = p, error = %e, "failed to load config, using defaults");
                Self::default()
            }),
            None => Self::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_suffix_tag.is_empty() {
            bail!("page_suffix_tag must not be empty");
        }
        if self.year_parent_dir.is_empty() {
            bail!("year_parent_dir must not be empty");
        }
        if self.pdf_extension.is_empty() {
            bail!("pdf_extension must not be empty");
        }
        Ok(())
    }

    /// Effective pool size: configured value (at least 1) or host CPU count
    pub fn worker_count(&self) -> usize {
        match self.max_workers {
            Some(n) => n.max(1),
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
