//! Resolves request paths against the configured API origin.

/// Joins relative paths onto a base origin.
///
/// The base is stored without trailing slashes. An empty base leaves every
/// path untouched so requests stay relative to whatever the host resolves
/// them against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlBuilder {
    base: String,
}

impl UrlBuilder {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Resolve `path` to the URL to dial. Absolute URLs pass through as-is.
    pub fn resolve(&self, path: &str) -> String {
        if self.base.is_empty() || is_absolute(path) {
            return path.to_string();
        }
        format!("{}{path}", self.base)
    }
}

fn is_absolute(path: &str) -> bool {
    ["http://", "https://"].iter().any(|scheme| {
        path.get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}
