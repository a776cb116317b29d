use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::export::{DisplayMode, OutputFormat, ReportOptions};
use crate::graph::Direction;
use crate::search::SearchOptions;
use crate::{Error, Result};

/// Contents of `spaghetti.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpaghettiConfig {
    pub include_builtins: bool,
    pub inverse: bool,
    pub raw: bool,
    pub connectivity: bool,
    pub quiet: bool,
    pub display: DisplayMode,
    pub format: OutputFormat,
    pub extra_builtins: Vec<String>,
    pub search_paths: Vec<String>,
    pub exclude: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
}

impl SpaghettiConfig {
    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            include_builtins: self.include_builtins,
            extra_builtins: self.extra_builtins.clone(),
            root: self.root.as_ref().map(PathBuf::from),
            search_paths: self.search_paths.iter().map(PathBuf::from).collect(),
            exclude: self.exclude.clone(),
        }
    }

    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            direction: Direction::from_inverse(self.inverse),
            raw: self.raw,
            quiet: self.quiet,
            connectivity: self.connectivity,
            display: self.display,
            format: self.format,
            cwd: None,
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("spaghetti.toml")
}

/// Load the config at `path`, or `spaghetti.toml` in the working directory.
///
/// A missing default file is not an error; a missing explicit one is.
pub fn load_config(path: Option<&Path>) -> Result<Option<SpaghettiConfig>> {
    let explicit = path.is_some();
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        if explicit {
            return Err(Error::Config(format!("config not found at {}", path.display())));
        }
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: SpaghettiConfig = toml::from_str(&contents)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    tracing::debug!("Loaded config from {}", path.display());
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &SpaghettiConfig, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(Error::Config(format!(
            "config already exists at {} (use --force to overwrite)",
            path.display()
        )));
    }

    let contents = toml::to_string_pretty(config).map_err(|e| Error::Config(e.to_string()))?;
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: SpaghettiConfig = toml::from_str(
            r#"
            inverse = true
            display = "simple"
            exclude = ["tests/"]
            "#,
        )
        .unwrap();
        assert!(config.inverse);
        assert!(!config.include_builtins);
        assert_eq!(config.display, DisplayMode::Simple);
        assert_eq!(config.format, OutputFormat::Text);
        assert_eq!(config.exclude, vec!["tests/"]);
        assert_eq!(config.report_options().direction, Direction::Dependencies);
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spaghetti.toml");
        let config = SpaghettiConfig {
            connectivity: true,
            search_paths: vec!["lib".to_string()],
            root: Some("src".to_string()),
            ..Default::default()
        };

        write_config(&path, &config, false).unwrap();
        assert_eq!(load_config(Some(path.as_path())).unwrap(), Some(config.clone()));

        let err = write_config(&path, &config, false).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        write_config(&path, &config, true).unwrap();

        let options = config.search_options();
        assert_eq!(options.root, Some(PathBuf::from("src")));
        assert_eq!(options.search_paths, vec![PathBuf::from("lib")]);
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(dir.path().join("nope.toml").as_path())).is_err());
    }
}
