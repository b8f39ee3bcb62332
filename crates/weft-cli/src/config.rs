//! Project configuration loaded from `weft.toml`.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;
use weft_syntax::engine::{LexicalConfig, ParseOptions};

pub(crate) const CONFIG_FILES: &[&str] = &["weft.toml", ".weft.toml"];

/// Settings merged from the config file and command-line flags.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// Config file path (if found).
    pub config_path: Option<PathBuf>,
    /// Production used when none is given on the command line.
    pub entry: Option<String>,
    /// Options handed to the engine.
    pub options: ParseOptions,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    parse: ParseSection,
    lexical: LexicalSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ParseSection {
    entry: Option<String>,
    non_standard: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LexicalSection {
    whitespace: Option<String>,
    line_comments: Option<Vec<String>>,
    block_comments: Option<Vec<[String; 2]>>,
}

impl From<LexicalSection> for LexicalConfig {
    fn from(section: LexicalSection) -> Self {
        let defaults = LexicalConfig::default();
        LexicalConfig {
            whitespace: section.whitespace.unwrap_or(defaults.whitespace),
            line_comments: section.line_comments.unwrap_or(defaults.line_comments),
            block_comments: section.block_comments.map_or(defaults.block_comments, |pairs| {
                pairs.into_iter().map(|[open, close]| (open, close)).collect()
            }),
        }
    }
}

impl Settings {
    /// Load settings for a directory. A missing file yields defaults; an
    /// unreadable or malformed one is logged and ignored.
    pub fn load(root: &Path) -> Self {
        let Some(path) = find_config_file(root) else {
            return Settings::default();
        };
        let Ok(contents) = std::fs::read_to_string(&path) else {
            warn!("Failed to read weft config at {}", path.display());
            return Settings {
                config_path: Some(path),
                ..Settings::default()
            };
        };
        Settings::from_contents(Some(path), &contents)
    }

    pub fn from_contents(config_path: Option<PathBuf>, contents: &str) -> Self {
        let parsed: ConfigFile = match toml::from_str(contents) {
            Ok(parsed) => parsed,
            Err(err) => {
                match &config_path {
                    Some(path) => warn!("Failed to parse weft config at {}: {err}", path.display()),
                    None => warn!("Failed to parse weft config: {err}"),
                }
                return Settings {
                    config_path,
                    ..Settings::default()
                };
            }
        };
        Settings {
            config_path,
            entry: parsed.parse.entry,
            options: ParseOptions {
                allow_non_standard: parsed.parse.non_standard,
                lexical: parsed.lexical.into(),
            },
        }
    }
}

pub(crate) fn find_config_file(root: &Path) -> Option<PathBuf> {
    CONFIG_FILES
        .iter()
        .map(|name| root.join(name))
        .find(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_every_section() {
        let settings = Settings::from_contents(
            None,
            r##"
[parse]
entry = "Expr"
non_standard = true

[lexical]
line_comments = ["#"]
block_comments = [["(*", "*)"]]
"##,
        );
        assert_eq!(settings.entry.as_deref(), Some("Expr"));
        assert!(settings.options.allow_non_standard);
        assert_eq!(settings.options.lexical.line_comments, vec!["#".to_string()]);
        assert_eq!(
            settings.options.lexical.block_comments,
            vec![("(*".to_string(), "*)".to_string())]
        );
        assert_eq!(settings.options.lexical.whitespace, LexicalConfig::default().whitespace);
    }

    #[test]
    fn malformed_files_fall_back_to_defaults() {
        let settings = Settings::from_contents(Some(PathBuf::from("weft.toml")), "[parse\nentry =");
        assert_eq!(settings.config_path, Some(PathBuf::from("weft.toml")));
        assert!(settings.entry.is_none());
        assert_eq!(settings.options, ParseOptions::default());
    }
}
