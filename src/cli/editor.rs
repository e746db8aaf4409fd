//! Arguments of the `editor` binary

use super::CommonArgs;
use crate::config::{Config, ConfigOverrides};
use crate::editor::{self, Validator};
use crate::error::{AppError, Result};
use clap::Parser;
use std::path::PathBuf;

/// edit files with a command line editor, replacing them only on success
#[derive(Parser, Debug, Clone)]
#[command(name = "editor", version = crate::LONG_VERSION, about)]
pub struct EditorCli {
    /// Editor to use instead of $EDITOR
    #[arg(short = 'e', long = "editor", value_name = "EDITOR")]
    pub editor: Option<String>,

    /// Validate the edited file as JSON before saving
    #[arg(short = 'j', long = "json")]
    pub json: bool,

    #[command(flatten)]
    pub common: CommonArgs,

    /// Files to edit
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,
}

impl EditorCli {
    /// Edit every path in turn; failures are collected so one bad file
    /// does not stop the rest.
    pub fn run(&self, config: &Config) -> Vec<(PathBuf, AppError)> {
        let json: Validator<'_> = &editor::validate_json;
        let validate = self.json.then_some(json);

        self.paths
            .iter()
            .filter_map(|path| {
                editor::edit_with(path, config.editor.as_deref(), validate)
                    .err()
                    .map(|e| (path.clone(), e))
            })
            .collect()
    }
}

impl ConfigOverrides for EditorCli {
    fn apply(&self, config: &mut Config) -> Result<()> {
        self.common.apply(config);
        if let Some(editor) = &self.editor {
            config.editor = Some(editor.clone());
        }
        Ok(())
    }

    fn debug(&self) -> bool {
        self.common.debug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arguments() {
        let cli = EditorCli::parse_from(["editor", "-e", "nano", "-j", "a.json", "b.json"]);
        assert_eq!(cli.editor.as_deref(), Some("nano"));
        assert!(cli.json);
        assert_eq!(cli.paths, vec![PathBuf::from("a.json"), PathBuf::from("b.json")]);
    }

    #[test]
    fn test_editor_flag_overrides_config() {
        let mut config = Config {
            editor: Some("vim".to_string()),
            ..Default::default()
        };
        EditorCli::parse_from(["editor", "x"]).apply(&mut config).unwrap();
        assert_eq!(config.editor.as_deref(), Some("vim"));

        EditorCli::parse_from(["editor", "-e", "emacs", "x"]).apply(&mut config).unwrap();
        assert_eq!(config.editor.as_deref(), Some("emacs"));
    }

    #[test]
    fn test_run_collects_failures() {
        let dir = tempfile::TempDir::new().unwrap();
        let cli = EditorCli::parse_from(["editor", dir.path().to_str().unwrap()]);
        let config = Config {
            editor: Some("/bin/true".to_string()),
            ..Default::default()
        };

        let failures = cli.run(&config);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, dir.path());
    }
}
