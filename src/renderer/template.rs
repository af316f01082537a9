//! Certificate template loading and placeholder substitution.
//!
//! Placeholders use the `{{fieldName}}` syntax. Substitution is a single pass
//! over the source driven by a key to value map, so replacement values are
//! never themselves scanned for tokens.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use super::common::escape_html;
use super::{CertificateData, RenderError};

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\{\{([A-Za-z0-9_]+)\}\}").unwrap();
    static ref ANY_TOKEN: Regex = Regex::new(r"\{\{.*?\}\}").unwrap();
}

/// An HTML template read from disk.
#[derive(Debug, Clone)]
pub struct CertificateTemplate {
    path: PathBuf,
    source: String,
}

impl CertificateTemplate {
    /// Read the template at `path`.
    ///
    /// The stored path is absolute so resources resolve the same way whatever
    /// directory the PDF engine runs in.
    pub async fn load(path: &Path) -> Result<Self, RenderError> {
        log::info!("Loading certificate template from {}", path.display());
        let not_found = |source: std::io::Error| {
            log::error!("Certificate template not found at {}", path.display());
            RenderError::TemplateNotFound {
                path: path.to_path_buf(),
                source,
            }
        };
        let source = tokio::fs::read_to_string(path).await.map_err(not_found)?;
        let path = tokio::fs::canonicalize(path).await.map_err(not_found)?;

        Ok(Self { path, source })
    }

    /// Build a template from an in-memory string.
    pub fn from_source(path: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Directory relative resources in the template resolve against.
    ///
    /// Only absolute directories qualify; a relative one has no meaning once
    /// the engine runs elsewhere.
    pub fn base_dir(&self) -> Option<&Path> {
        self.path.parent().filter(|p| p.is_absolute())
    }

    /// Substitute the certificate fields into the template.
    pub fn fill(&self, data: &CertificateData) -> String {
        let values: HashMap<&str, String> = data
            .placeholder_values()
            .into_iter()
            .map(|(key, value)| (key, escape_html(value)))
            .collect();

        let (html, counts) = substitute(&self.source, &values);
        for (key, value) in data.placeholder_values() {
            log::debug!(
                "{{{{{}}}}}: \"{}\" ({} occurrences)",
                key,
                preview_value(value),
                counts.get(key).copied().unwrap_or(0)
            );
        }

        let remaining = unreplaced_tokens(&html);
        if !remaining.is_empty() {
            log::warn!("Some placeholders were not replaced: {:?}", remaining);
        }

        html
    }
}

/// Replace every `{{key}}` whose key is present in `values`.
///
/// Unknown tokens are left untouched. Returns the output together with the
/// number of replacements made per key.
pub fn substitute<'a>(
    source: &str,
    values: &HashMap<&'a str, String>,
) -> (String, HashMap<&'a str, usize>) {
    let mut counts: HashMap<&'a str, usize> = HashMap::new();

    let output = PLACEHOLDER.replace_all(source, |caps: &Captures| {
        let key = &caps[1];
        match values.get_key_value(key) {
            Some((&known, value)) => {
                *counts.entry(known).or_insert(0) += 1;
                value.clone()
            }
            None => caps[0].to_string(),
        }
    });

    (output.into_owned(), counts)
}

/// List every `{{...}}` token still present in `html`.
pub fn unreplaced_tokens(html: &str) -> Vec<String> {
    ANY_TOKEN
        .find_iter(html)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Insert a `<base>` element so relative URLs resolve against `dir`.
pub fn with_base_href(html: &str, dir: &Path) -> String {
    let base = format!("<base href=\"file://{}/\">", dir.display());
    match html.find("<head>") {
        Some(idx) => {
            let insert_at = idx + "<head>".len();
            format!("{}{}{}", &html[..insert_at], base, &html[insert_at..])
        }
        None => html.to_string(),
    }
}

fn preview_value(value: &str) -> String {
    if value.chars().count() > 30 {
        format!("{}...", value.chars().take(30).collect::<String>())
    } else {
        value.to_string()
    }
}
