//! Literal placeholder substitution with post-render validation.

use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use tracing::{debug, warn};

use crate::error::{TemplateError, TemplateResult};

/// Target namespace marker.
pub const NAMESPACE: &str = "CHANGE_THIS_TO_NAMESPACE";

/// Base domain marker.
pub const DOMAIN: &str = "CHANGE_THIS_TO_DOMAIN";

/// Database admin token marker.
pub const ADMIN_TOKEN: &str = "ADMIN_TOKEN_PLACEHOLDER";

/// Dashboard admin password marker.
pub const ADMIN_PASSWORD: &str = "ADMIN_PASSWORD_PLACEHOLDER";

/// Base64-encoded TLS certificate marker.
pub const CERT_BASE64: &str = "CERT_BASE64_PLACEHOLDER";

/// Base64-encoded TLS private key marker.
pub const KEY_BASE64: &str = "KEY_BASE64_PLACEHOLDER";

/// A mapping from placeholder marker to substitution value.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderBindings {
    values: BTreeMap<String, String>,
}

impl PlaceholderBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a placeholder marker to a value.
    pub fn bind(mut self, placeholder: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(placeholder.into(), value.into());
        self
    }

    /// Iterate over (placeholder, value) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A successfully rendered template.
#[derive(Debug, Clone)]
pub struct Rendered {
    /// The rendered text, guaranteed free of placeholder syntax
    pub text: String,
    /// Bindings that had no occurrence in the template
    pub unused_bindings: Vec<String>,
}

/// Template renderer performing literal substitution.
pub struct TemplateRenderer {
    leftover_pattern: Regex,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer {
    /// Create a new template renderer.
    pub fn new() -> Self {
        Self {
            // Placeholder syntax: CHANGE_THIS_TO_<NAME> or <NAME>_PLACEHOLDER
            leftover_pattern: Regex::new(r"\b(?:CHANGE_THIS_TO_[A-Z0-9_]+|[A-Z0-9_]*_PLACEHOLDER)\b")
                .unwrap(),
        }
    }

    /// Read a template from disk.
    pub fn load(&self, path: &Path) -> TemplateResult<String> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// Substitute every occurrence of every bound placeholder.
    ///
    /// Unrecognized content is never touched. After substitution the output
    /// is scanned for leftover placeholder syntax; any survivor fails the
    /// render with `UnboundPlaceholder` and no output is produced. Bindings
    /// without an occurrence are reported but do not fail the render.
    pub fn render(
        &self,
        template: &str,
        bindings: &PlaceholderBindings,
    ) -> TemplateResult<Rendered> {
        let mut text = template.to_string();
        let mut unused_bindings = Vec::new();

        for (placeholder, value) in bindings.iter() {
            if text.contains(placeholder) {
                text = text.replace(placeholder, value);
            } else {
                warn!(placeholder, "binding has no occurrence in template");
                unused_bindings.push(placeholder.to_string());
            }
        }

        let mut leftovers: Vec<String> = self
            .leftover_pattern
            .find_iter(&text)
            .map(|m| m.as_str().to_string())
            .collect();
        leftovers.sort();
        leftovers.dedup();

        if !leftovers.is_empty() {
            return Err(TemplateError::UnboundPlaceholder {
                placeholders: leftovers,
            });
        }

        debug!(
            bindings = bindings.len(),
            unused = unused_bindings.len(),
            "template rendered"
        );
        Ok(Rendered {
            text,
            unused_bindings,
        })
    }
}
