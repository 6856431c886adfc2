use std::path::Path;

use crate::error::Error;

/// Config file name looked up in the corpus root.
pub const CONFIG_FILE: &str = ".validate-docs.toml";

/// Separator marker used when the config doesn't name one.
pub const DEFAULT_SEPARATOR: &str = "<!-- guide-separator -->";

/// Corpus configuration loaded from `.validate-docs.toml`.
/// Include/exclude patterns are path prefixes applied to markdown files.
#[derive(Debug)]
pub struct Config {
    /// Skip paths starting with any of these prefixes.
    exclude: Vec<String>,
    /// Drop links with a URI scheme before classification.
    pub ignore_external: bool,
    /// Only scan paths starting with one of these prefixes (empty = all).
    include: Vec<String>,
    /// Line that splits a concatenated file into sub-documents.
    pub separator: String,
}

/// Raw TOML structure for `.validate-docs.toml`.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct ValidateDocsTomlConfig {
    /// See `Config::exclude`.
    #[serde(default)]
    exclude: Vec<String>,
    /// See `Config::ignore_external`.
    #[serde(default)]
    ignore_external: bool,
    /// See `Config::include`.
    #[serde(default)]
    include: Vec<String>,
    /// See `Config::separator`.
    separator: Option<String>,
}

impl Config {
    /// Load config from `.validate-docs.toml` in the given root directory.
    /// Returns a default that scans everything if the file doesn't exist.
    /// A file that exists but is malformed is an error, never a silent default.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            },
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };

        return Self::parse(&content);
    }

    /// Parse config from TOML content.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the TOML is malformed or has unknown keys.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let raw: ValidateDocsTomlConfig = toml::from_str(content)?;
        let separator = raw
            .separator
            .map(|s| return s.trim().to_string())
            .filter(|s| return !s.is_empty())
            .unwrap_or_else(|| return DEFAULT_SEPARATOR.to_string());

        return Ok(Self {
            exclude: raw.exclude,
            ignore_external: raw.ignore_external,
            include: raw.include,
            separator,
        });
    }

    /// Check whether a markdown file path should be scanned.
    ///
    /// A path is included if no include patterns are set (scan everything),
    /// or if the path starts with at least one include pattern.
    /// An included path is then excluded if it starts with any exclude pattern.
    pub fn should_scan(&self, relative_path: &str) -> bool {
        let included = self.include.is_empty()
            || self.include.iter().any(|p| return relative_path.starts_with(p.as_str()));

        if !included {
            return false;
        }

        return !self.exclude.iter().any(|p| return relative_path.starts_with(p.as_str()));
    }
}

impl Default for Config {
    /// Include everything, exclude nothing, default separator.
    fn default() -> Self {
        return Self {
            exclude: Vec::new(),
            ignore_external: false,
            include: Vec::new(),
            separator: DEFAULT_SEPARATOR.to_string(),
        };
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test code")]
mod tests {
    use super::*;

    #[test]
    fn missing_file_scans_everything() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert!(config.should_scan("SKILL.md"), "root file is scanned");
        assert!(config.should_scan("core/locators.md"), "nested file is scanned");
        assert_eq!(config.separator, DEFAULT_SEPARATOR, "default separator");
        assert!(!config.ignore_external, "external links are classified by default");
    }

    #[test]
    fn include_then_exclude() {
        let config = Config::parse(
            "include = [\"core/\", \"SKILL.md\"]\nexclude = [\"core/archive/\"]\n",
        )
        .unwrap();
        assert!(config.should_scan("SKILL.md"), "included file");
        assert!(config.should_scan("core/locators.md"), "included prefix");
        assert!(!config.should_scan("core/archive/old.md"), "exclude wins over include");
        assert!(!config.should_scan("ci/github.md"), "outside every include");
    }

    #[test]
    fn custom_separator_is_trimmed() {
        let config = Config::parse("separator = \"  <!-- split -->  \"\nignore_external = true\n").unwrap();
        assert_eq!(config.separator, "<!-- split -->", "separator is trimmed");
        assert!(config.ignore_external, "ignore_external is read");
    }

    #[test]
    fn malformed_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "include = \"not a list\"").unwrap();
        let result = Config::load(dir.path());
        assert!(matches!(result, Err(Error::TomlDe(_))), "got {result:?}");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::parse("inclde = [\"docs/\"]").is_err(), "misspelled key");
    }
}
