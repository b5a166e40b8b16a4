use std::fmt;

/// How a component is exposed on the host after export.
///
/// Graphical IDEs get a desktop entry and a launcher binary; terminal
/// editors only get the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    Gui,
    Cli,
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentKind::Gui => write!(f, "gui"),
            ComponentKind::Cli => write!(f, "cli"),
        }
    }
}

/// A single installable IDE or editor known to idebox.
#[derive(Debug)]
pub struct Component {
    /// Canonical id used in selections, registry entries, and log names.
    pub id: &'static str,
    /// Human-readable display name.
    pub name: &'static str,
    /// Accepted alternate spellings, resolved to `id` during parsing.
    pub aliases: &'static [&'static str],
    pub kind: ComponentKind,
    /// Terminal editors consume the language-server selection.
    pub uses_language_servers: bool,
    /// Binary name inside the container; also the exported launcher name.
    pub binary: &'static str,
    /// Whether the IDE has a VS Code-style `--list-extensions` /
    /// `--install-extension` command line.
    pub extension_cli: bool,
}

impl Component {
    pub fn is_gui(&self) -> bool {
        self.kind == ComponentKind::Gui
    }

    pub fn is_cli(&self) -> bool {
        self.kind == ComponentKind::Cli
    }
}

/// Every component idebox can provision, in the order `all` expands to.
pub const CATALOG: &[Component] = &[
    Component {
        id: "zed",
        name: "Zed",
        aliases: &[],
        kind: ComponentKind::Gui,
        uses_language_servers: false,
        binary: "zed",
        extension_cli: false,
    },
    Component {
        id: "vscode",
        name: "Visual Studio Code",
        aliases: &["code"],
        kind: ComponentKind::Gui,
        uses_language_servers: false,
        binary: "code",
        extension_cli: true,
    },
    Component {
        id: "cursor",
        name: "Cursor",
        aliases: &[],
        kind: ComponentKind::Gui,
        uses_language_servers: false,
        binary: "cursor",
        extension_cli: true,
    },
    Component {
        id: "jetbrains",
        name: "JetBrains Toolbox",
        aliases: &["toolbox"],
        kind: ComponentKind::Gui,
        uses_language_servers: false,
        binary: "jetbrains-toolbox",
        extension_cli: false,
    },
    Component {
        id: "neovim",
        name: "Neovim",
        aliases: &["nvim"],
        kind: ComponentKind::Cli,
        uses_language_servers: true,
        binary: "nvim",
        extension_cli: false,
    },
    Component {
        id: "emacs",
        name: "Emacs",
        aliases: &[],
        kind: ComponentKind::Cli,
        uses_language_servers: true,
        binary: "emacs",
        extension_cli: false,
    },
    Component {
        id: "helix",
        name: "Helix",
        aliases: &["hx"],
        kind: ComponentKind::Cli,
        uses_language_servers: true,
        binary: "hx",
        extension_cli: false,
    },
];

/// Language servers that can be baked into the container image.
pub const LANGUAGE_SERVERS: &[&str] = &[
    "rust-analyzer",
    "gopls",
    "pyright",
    "clangd",
    "typescript-language-server",
    "lua-language-server",
    "bash-language-server",
    "marksman",
];

/// Extensions installed into every wrapped VS Code-family IDE.
///
/// Consulted on every activation cycle; ids are compared case-insensitively
/// against the IDE's installed list.
pub const REQUIRED_EXTENSIONS: &[&str] = &[
    "rust-lang.rust-analyzer",
    "golang.go",
    "ms-python.python",
    "llvm-vs-code-extensions.vscode-clangd",
    "tamasfe.even-better-toml",
];

/// Resolve a token (canonical id or alias, any case) to a catalog entry.
pub fn find(token: &str) -> Option<&'static Component> {
    let token = token.to_lowercase();
    CATALOG
        .iter()
        .find(|c| c.id == token || c.aliases.contains(&token.as_str()))
}

/// Comma-separated list of canonical ids, for error messages.
pub fn valid_ids() -> String {
    CATALOG
        .iter()
        .map(|c| c.id)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_find_by_id_and_alias() {
        assert_eq!(find("zed").unwrap().id, "zed");
        assert_eq!(find("code").unwrap().id, "vscode");
        assert_eq!(find("toolbox").unwrap().id, "jetbrains");
        assert_eq!(find("nvim").unwrap().id, "neovim");
        assert_eq!(find("hx").unwrap().id, "helix");
        assert!(find("eclipse").is_none());
    }

    #[test]
    fn test_find_is_case_insensitive() {
        assert_eq!(find("Zed").unwrap().id, "zed");
        assert_eq!(find("CODE").unwrap().id, "vscode");
    }

    #[test]
    fn test_ids_and_aliases_are_unique() {
        // Every alias must resolve to exactly one canonical id.
        let mut seen = HashSet::new();
        for component in CATALOG {
            assert!(seen.insert(component.id), "duplicate id {}", component.id);
            for &alias in component.aliases {
                assert!(
                    seen.insert(alias),
                    "alias {} collides with another token",
                    alias
                );
            }
        }
    }

    #[test]
    fn test_required_extensions_are_lowercase() {
        for ext in REQUIRED_EXTENSIONS {
            assert_eq!(*ext, ext.to_lowercase());
        }
    }

    #[test]
    fn test_terminal_editors_use_language_servers() {
        for component in CATALOG.iter().filter(|c| c.is_cli()) {
            assert!(component.uses_language_servers);
        }
    }
}
