//! Company seed file: the tenants to track and their provider mappings.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Platform};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyConfig {
    pub name: String,
    /// Web-analytics property reference, e.g. `properties/312450981`.
    pub ga_property: Option<String>,
    /// Search-console site URL, e.g. `https://acme.example.com/`.
    pub gsc_site: Option<String>,
    /// Video channel id, e.g. `UCmBw1Yq3ZQ`.
    pub yt_channel: Option<String>,
    /// Professional-network organization URN, e.g. `urn:li:organization:42`.
    pub li_org: Option<String>,
    pub notes: Option<String>,
}

impl CompanyConfig {
    /// Generate a URL-safe slug from the company name.
    #[must_use]
    pub fn slug(&self) -> String {
        self.name
            .to_lowercase()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' {
                    c
                } else if c == ' ' {
                    '-'
                } else {
                    '\0'
                }
            })
            .filter(|&c| c != '\0')
            .collect::<String>()
            .split('-')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-")
    }

    /// The platform mappings this company has configured.
    #[must_use]
    pub fn mappings(&self) -> Vec<(Platform, &str)> {
        let mut out = Vec::new();
        if let Some(r) = self.ga_property.as_deref() {
            out.push((Platform::Ga, r));
        }
        if let Some(r) = self.gsc_site.as_deref() {
            out.push((Platform::Gsc, r));
        }
        if let Some(r) = self.yt_channel.as_deref() {
            out.push((Platform::Yt, r));
        }
        if let Some(r) = self.li_org.as_deref() {
            out.push((Platform::Li, r));
        }
        out
    }
}

#[derive(Debug, Deserialize)]
pub struct CompaniesFile {
    pub companies: Vec<CompanyConfig>,
}

/// Load and validate the companies configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_companies(path: &Path) -> Result<CompaniesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CompaniesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let companies_file: CompaniesFile =
        serde_yaml::from_str(&content).map_err(ConfigError::CompaniesFileParse)?;

    validate_companies(&companies_file)?;

    Ok(companies_file)
}

fn validate_companies(file: &CompaniesFile) -> Result<(), ConfigError> {
    let mut seen_names = HashSet::new();
    let mut seen_slugs = HashSet::new();

    for company in &file.companies {
        if company.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "company name must be non-empty".to_string(),
            ));
        }

        let slug = company.slug();
        if slug.is_empty() {
            return Err(ConfigError::Validation(format!(
                "company '{}' produces an empty slug",
                company.name
            )));
        }

        if !seen_names.insert(company.name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate company name: {}",
                company.name
            )));
        }

        if !seen_slugs.insert(slug.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate company slug: {slug}"
            )));
        }
    }

    Ok(())
}
