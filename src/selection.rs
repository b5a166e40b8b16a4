use thiserror::Error;

use crate::catalog::{self, Component, CATALOG, LANGUAGE_SERVERS};

/// Validation failures for component and language-server selections.
///
/// Unknown tokens are collected, not fail-fast, so one run reports every bad
/// token at once.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("unknown component(s): {}; valid components: {}", .0.join(", "), catalog::valid_ids())]
    Unknown(Vec<String>),
    #[error("no components selected")]
    Empty,
}

/// Ordered, deduplicated set of components to provision.
#[derive(Debug, Clone)]
pub struct Selection {
    components: Vec<&'static Component>,
    all: bool,
}

impl Selection {
    /// Parse a comma-separated selection.
    ///
    /// Tokens are trimmed and case-folded; aliases resolve to canonical ids;
    /// duplicates keep their first position. The token `all` expands to the
    /// whole catalog and marks the selection so the export phase knows to
    /// probe which components actually landed in the container.
    pub fn parse(raw: &str) -> Result<Self, SelectionError> {
        let mut components: Vec<&'static Component> = Vec::new();
        let mut unknown: Vec<String> = Vec::new();
        let mut all = false;

        for token in raw.split(',') {
            let token = token.trim().to_lowercase();
            if token.is_empty() {
                continue;
            }
            if token == "all" {
                all = true;
                for component in CATALOG {
                    if !components.iter().any(|c| c.id == component.id) {
                        components.push(component);
                    }
                }
                continue;
            }
            match catalog::find(&token) {
                Some(component) => {
                    if !components.iter().any(|c| c.id == component.id) {
                        components.push(component);
                    }
                }
                None => {
                    if !unknown.contains(&token) {
                        unknown.push(token);
                    }
                }
            }
        }

        if !unknown.is_empty() {
            return Err(SelectionError::Unknown(unknown));
        }
        if components.is_empty() {
            return Err(SelectionError::Empty);
        }

        Ok(Self { components, all })
    }

    /// The full catalog, as selected by an absent argument.
    pub fn all() -> Self {
        Self {
            components: CATALOG.iter().collect(),
            all: true,
        }
    }

    pub fn components(&self) -> &[&'static Component] {
        &self.components
    }

    /// Whether this selection came from the `all` sentinel rather than an
    /// explicit enumeration.
    pub fn is_all(&self) -> bool {
        self.all
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.components.iter().map(|c| c.id).collect()
    }

    /// Whether any selected component consumes the language-server selection.
    pub fn uses_language_servers(&self) -> bool {
        self.components.iter().any(|c| c.uses_language_servers)
    }

    /// Selection string handed to the image build.
    pub fn build_arg(&self) -> String {
        self.ids().join(",")
    }
}

/// Language servers to bake into the image, parsed from an `LSP:`-prefixed
/// argument.
#[derive(Debug, Clone, Default)]
pub struct LanguageServers {
    servers: Vec<&'static str>,
}

impl LanguageServers {
    /// Parse a comma-separated server list; a leading `LSP:`/`lsp:` prefix
    /// is stripped if present. Unknown servers are collected like unknown
    /// components.
    pub fn parse(raw: &str) -> Result<Self, SelectionError> {
        let raw = strip_lsp_prefix(raw).unwrap_or(raw);

        let mut servers: Vec<&'static str> = Vec::new();
        let mut unknown: Vec<String> = Vec::new();

        for token in raw.split(',') {
            let token = token.trim().to_lowercase();
            if token.is_empty() {
                continue;
            }
            match LANGUAGE_SERVERS.iter().find(|s| **s == token) {
                Some(&server) => {
                    if !servers.contains(&server) {
                        servers.push(server);
                    }
                }
                None => {
                    if !unknown.contains(&token) {
                        unknown.push(token);
                    }
                }
            }
        }

        if !unknown.is_empty() {
            return Err(SelectionError::Unknown(unknown));
        }

        Ok(Self { servers })
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn ids(&self) -> &[&'static str] {
        &self.servers
    }

    /// Server string handed to the image build; `None` when nothing was
    /// selected.
    pub fn build_arg(&self) -> Option<String> {
        if self.servers.is_empty() {
            None
        } else {
            Some(self.servers.join(","))
        }
    }
}

/// Whether a raw argument carries the language-server prefix.
pub fn has_lsp_prefix(token: &str) -> bool {
    token
        .trim()
        .get(..4)
        .map(|prefix| prefix.eq_ignore_ascii_case("lsp:"))
        .unwrap_or(false)
}

fn strip_lsp_prefix(token: &str) -> Option<&str> {
    let trimmed = token.trim();
    if has_lsp_prefix(trimmed) {
        Some(&trimmed[4..])
    } else {
        None
    }
}

/// Sort the two positional arguments into (selection, language servers).
///
/// The prefix, not the position, decides which is which, so
/// `idebox LSP:rust-analyzer` selects every component plus servers.
pub fn split_raw(
    first: Option<String>,
    second: Option<String>,
) -> (Option<String>, Option<String>) {
    match (first, second) {
        (Some(f), second) if has_lsp_prefix(&f) => (second, Some(f)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("zed,cursor")]
    #[case("Zed, CURSOR")]
    #[case("  zed ,cursor  ")]
    #[case("ZED,zed,cursor")]
    fn test_parse_folds_case_and_whitespace(#[case] raw: &str) {
        let selection = Selection::parse(raw).unwrap();
        assert_eq!(selection.ids(), vec!["zed", "cursor"]);
        assert!(!selection.is_all());
    }

    #[test]
    fn test_parse_resolves_aliases() {
        let selection = Selection::parse("code,toolbox").unwrap();
        assert_eq!(selection.ids(), vec!["vscode", "jetbrains"]);
    }

    #[test]
    fn test_parse_preserves_order_and_dedupes() {
        let selection = Selection::parse("cursor,zed,code,cursor").unwrap();
        assert_eq!(selection.ids(), vec!["cursor", "zed", "vscode"]);
    }

    #[test]
    fn test_parse_collects_every_unknown_token() {
        let err = Selection::parse("zed,zedd,cursor,foo").unwrap_err();
        assert_eq!(
            err,
            SelectionError::Unknown(vec!["zedd".to_string(), "foo".to_string()])
        );
    }

    #[test]
    fn test_parse_rejects_empty_input() {
        assert_eq!(Selection::parse("").unwrap_err(), SelectionError::Empty);
        assert_eq!(Selection::parse(" , ,").unwrap_err(), SelectionError::Empty);
    }

    #[test]
    fn test_all_expands_to_whole_catalog() {
        let selection = Selection::parse("all").unwrap();
        assert!(selection.is_all());
        assert_eq!(
            selection.ids(),
            crate::catalog::CATALOG.iter().map(|c| c.id).collect::<Vec<_>>()
        );
        // Deterministic: a second parse yields the same expansion.
        assert_eq!(Selection::parse("ALL").unwrap().ids(), selection.ids());
    }

    #[test]
    fn test_uses_language_servers() {
        assert!(!Selection::parse("zed,vscode").unwrap().uses_language_servers());
        assert!(Selection::parse("zed,neovim").unwrap().uses_language_servers());
    }

    #[rstest]
    #[case("LSP:rust-analyzer,gopls")]
    #[case("lsp:rust-analyzer, GOPLS")]
    #[case("rust-analyzer,gopls")]
    fn test_language_servers_parse(#[case] raw: &str) {
        let servers = LanguageServers::parse(raw).unwrap();
        assert_eq!(servers.ids(), &["rust-analyzer", "gopls"]);
    }

    #[test]
    fn test_language_servers_collects_unknowns() {
        let err = LanguageServers::parse("LSP:rust-analyzer,sourcekit,jdtls").unwrap_err();
        assert_eq!(
            err,
            SelectionError::Unknown(vec!["sourcekit".to_string(), "jdtls".to_string()])
        );
    }

    #[test]
    fn test_language_servers_empty_is_ok() {
        assert!(LanguageServers::parse("LSP:").unwrap().is_empty());
        assert!(LanguageServers::default().build_arg().is_none());
    }

    #[test]
    fn test_split_raw_sorts_by_prefix() {
        let (sel, lsp) = split_raw(Some("zed".into()), Some("LSP:gopls".into()));
        assert_eq!(sel.as_deref(), Some("zed"));
        assert_eq!(lsp.as_deref(), Some("LSP:gopls"));

        let (sel, lsp) = split_raw(Some("lsp:gopls".into()), None);
        assert_eq!(sel, None);
        assert_eq!(lsp.as_deref(), Some("lsp:gopls"));
    }
}
