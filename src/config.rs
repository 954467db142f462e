//! Configuration file support.
//!
//! Settings come from `--config <file>` or, when that is not given, from
//! `chartcrop/config.toml` under the user's config directory if it exists.
//! Command-line flags are applied on top by the binary.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::Options;
use crate::error::CropError;
use crate::export::{ExportOptions, MutoolConverter};

const CONFIG_FILE: &str = "chartcrop/config.toml";

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub reduce: Options,
    pub convert: ConvertConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConvertConfig {
    /// The `mutool` executable
    pub program: String,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            program: MutoolConverter::default().program,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    pub keep_intermediate: bool,
    pub fallback_dir: Option<PathBuf>,
}

impl Config {
    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            reduce: self.reduce.clone(),
            keep_intermediate: self.export.keep_intermediate,
            fallback_dir: self.export.fallback_dir.clone(),
        }
    }

    pub fn converter(&self) -> MutoolConverter {
        MutoolConverter {
            program: self.convert.program.clone(),
        }
    }
}

/// Load the config from `path`, or from the user config file, or defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config, CropError> {
    match path {
        Some(path) => read_config(path),
        None => match default_config_path() {
            Some(path) if path.is_file() => read_config(&path),
            _ => Ok(Config::default()),
        },
    }
}

/// `<config dir>/chartcrop/config.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|dir| dir.join(CONFIG_FILE))
}

pub fn parse_config(text: &str, path: &Path) -> Result<Config, CropError> {
    toml::from_str(text).map_err(|e| CropError::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn read_config(path: &Path) -> Result<Config, CropError> {
    debug!(path = %path.display(), "loading config");
    let text = fs::read_to_string(path)?;
    parse_config(&text, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScanMode;

    #[test]
    fn test_empty_config_is_default() {
        let config = parse_config("", Path::new("config.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.reduce.precision, 2);
        assert_eq!(config.convert.program, "mutool");
    }

    #[test]
    fn test_full_config() {
        let text = r#"
[reduce]
precision = 3
scan = "pattern"
check_transforms = true

[convert]
program = "/opt/mupdf/bin/mutool"

[export]
keep_intermediate = true
fallback_dir = "/srv/charts"
"#;
        let config = parse_config(text, Path::new("config.toml")).unwrap();
        assert_eq!(config.reduce.precision, 3);
        assert_eq!(config.reduce.scan, ScanMode::Pattern);
        assert!(config.reduce.check_transforms);
        assert_eq!(config.converter().program, "/opt/mupdf/bin/mutool");

        let export = config.export_options();
        assert!(export.keep_intermediate);
        assert_eq!(export.fallback_dir, Some(PathBuf::from("/srv/charts")));
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let config = parse_config("[reduce]\nscan = \"tree\"\n", Path::new("c.toml")).unwrap();
        assert_eq!(config.reduce, Options::default());
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = parse_config("[reduce]\nprecison = 3\n", Path::new("c.toml")).unwrap_err();
        match err {
            CropError::Config { path, message } => {
                assert_eq!(path, PathBuf::from("c.toml"));
                assert!(message.contains("precison"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, CropError::Io(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[export]\nkeep_intermediate = true\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert!(config.export.keep_intermediate);
    }
}
