//! Template catalog: what the panel shows.
//!
//! DESIGN
//! ======
//! Holds the templates of the last successful import plus the panel's
//! filter state. The template list is only ever replaced wholesale; the
//! filtered grid and suggestions are derived on demand and never cached.

use serde::Serialize;

use crate::model::{Template, TemplateKey};

/// Highest phase selectable in the session filter.
pub const MAX_SESSION_PHASE: u32 = 5;
/// Number of type-ahead suggestions returned.
pub const MAX_SUGGESTIONS: usize = 5;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("invalid session filter '{0}' (expected 'all' or 1..={MAX_SESSION_PHASE})")]
    InvalidSession(String),
    #[error("template not found: {0}")]
    TemplateNotFound(TemplateKey),
}

impl crate::error::ErrorCode for CatalogError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidSession(_) => "E_INVALID_SESSION",
            Self::TemplateNotFound(_) => "E_TEMPLATE_NOT_FOUND",
        }
    }
}

// =============================================================================
// SESSION FILTER
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionFilter {
    #[default]
    All,
    Phase(u32),
}

impl SessionFilter {
    /// Parse the panel's select value. Empty means all.
    ///
    /// # Errors
    ///
    /// Returns an error for anything other than `all` or a phase in range.
    pub fn parse(raw: &str) -> Result<Self, CatalogError> {
        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        match raw.parse::<u32>() {
            Ok(phase) if (1..=MAX_SESSION_PHASE).contains(&phase) => Ok(Self::Phase(phase)),
            _ => Err(CatalogError::InvalidSession(raw.to_string())),
        }
    }

    #[must_use]
    pub fn matches(self, template: &Template) -> bool {
        match self {
            Self::All => true,
            Self::Phase(phase) => template.key.phase == phase,
        }
    }
}

// =============================================================================
// CATALOG
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    templates: Vec<Template>,
}

/// Grid entry for one template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateSummary {
    pub phase: u32,
    pub index: u32,
    pub key: String,
    pub title: String,
    pub thumbnail_url: String,
    pub children: usize,
}

impl From<&Template> for TemplateSummary {
    fn from(t: &Template) -> Self {
        Self {
            phase: t.key.phase,
            index: t.key.sequence_index,
            key: t.key.to_string(),
            title: t.title.clone(),
            thumbnail_url: t.thumbnail_url(),
            children: t.children.len(),
        }
    }
}

fn title_matches(title: &str, term: &str) -> bool {
    title.to_lowercase().contains(&term.to_lowercase())
}

impl Catalog {
    #[must_use]
    pub fn new(templates: Vec<Template>) -> Self {
        Self { templates }
    }

    /// Swap in a freshly imported template list.
    pub fn replace(&mut self, templates: Vec<Template>) {
        self.templates = templates;
    }

    #[must_use]
    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Template with `key`.
    ///
    /// # Errors
    ///
    /// Returns `TemplateNotFound` when no template has that key.
    pub fn find(&self, key: TemplateKey) -> Result<&Template, CatalogError> {
        self.templates
            .iter()
            .find(|t| t.key == key)
            .ok_or(CatalogError::TemplateNotFound(key))
    }

    /// Templates passing the session filter and the search term. A blank
    /// term matches everything; otherwise the untrimmed term is matched
    /// case-insensitively against the title.
    #[must_use]
    pub fn filtered(&self, session: SessionFilter, term: &str) -> Vec<&Template> {
        let blank = term.trim().is_empty();
        self.templates
            .iter()
            .filter(|t| session.matches(t))
            .filter(|t| blank || title_matches(&t.title, term))
            .collect()
    }

    /// First distinct titles containing `term`, across all sessions.
    #[must_use]
    pub fn suggestions(&self, term: &str) -> Vec<String> {
        if term.is_empty() {
            return Vec::new();
        }
        let mut out: Vec<String> = Vec::new();
        for t in &self.templates {
            if out.len() == MAX_SUGGESTIONS {
                break;
            }
            if title_matches(&t.title, term) && !out.contains(&t.title) {
                out.push(t.title.clone());
            }
        }
        out
    }
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
