//! Configuration management for `tikzsvg.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # [worker], [tex], [store]
//! ├── error          # ConfigError
//! ├── util           # find_config_file
//! └── mod.rs         # Config (this file)
//! ```
//!
//! # Sections
//!
//! | Section    | Purpose                                          |
//! |------------|--------------------------------------------------|
//! | `[worker]` | Worker command, resource root, load/font policy  |
//! | `[tex]`    | TeX toolchain used by the built-in worker        |
//! | `[store]`  | Assets directory                                 |
//!
//! The configuration is loaded once in `main` and passed by reference to
//! whatever needs it; it never changes afterwards.

mod error;
pub mod section;
mod util;

pub use error::ConfigError;
pub use section::{StoreConfig, TexConfig, WorkerConfig};

use crate::worker::RenderOptions;
use crate::{debug, log};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use util::find_config_file;

/// Config file looked up when `--config` is not given.
pub const DEFAULT_CONFIG_NAME: &str = "tikzsvg.toml";

/// Root configuration structure representing tikzsvg.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub worker: WorkerConfig,

    #[serde(default)]
    pub tex: TexConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

impl Config {
    /// Load configuration, searching upward from cwd for `config_name`.
    ///
    /// A missing default config falls back to built-in defaults rooted at
    /// cwd. A missing explicitly named config is an error.
    pub fn load(config_name: &Path) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let (mut config, root) = match find_config_file(config_name) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
                config.config_path = path;
                (config, root)
            }
            None if config_name != Path::new(DEFAULT_CONFIG_NAME) => {
                let path = cwd.join(config_name);
                let err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
                return Err(ConfigError::Io(path, err).into());
            }
            None => {
                debug!("config"; "no {DEFAULT_CONFIG_NAME} found, using defaults");
                (Self::default(), cwd)
            }
        };

        config.normalize_paths(&root);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// Get the root directory path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Options sent with every compile.
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            embed_fonts: self.worker.embed_fonts,
        }
    }

    /// Command line that starts one worker process.
    ///
    /// Defaults to this executable's hidden `worker` subcommand, carrying
    /// the `[tex]` settings as arguments.
    pub fn worker_command(&self) -> Result<Vec<OsString>> {
        if !self.worker.command.is_empty() {
            return Ok(self.worker.command.iter().map(OsString::from).collect());
        }

        let exe = std::env::current_exe().context("Failed to locate current executable")?;
        let mut command = vec![
            exe.into_os_string(),
            "worker".into(),
            "--latex".into(),
            self.tex.latex.clone().into_os_string(),
            "--dvisvgm".into(),
            self.tex.dvisvgm.clone().into_os_string(),
            "--preamble".into(),
            self.tex.preamble.clone().into(),
        ];
        if crate::logger::is_verbose() {
            command.push("--verbose".into());
        }
        Ok(command)
    }

    // ========================================================================
    // path normalization
    // ========================================================================

    /// Normalize all paths relative to root directory.
    fn normalize_paths(&mut self, root: &Path) {
        use crate::utils::path::normalize_path;

        let root = normalize_path(root);
        if !self.config_path.as_os_str().is_empty() {
            self.config_path = normalize_path(&self.config_path);
        }

        if let Some(resources) = &mut self.worker.resource_root {
            *resources = normalize_path(&root.join(&*resources));
        }
        self.store.assets_dir = normalize_path(&root.join(&self.store.assets_dir));
        Self::normalize_tool(&mut self.tex.latex, &root);
        Self::normalize_tool(&mut self.tex.dvisvgm, &root);
        self.root = root;
    }

    /// Resolve a tool given as a relative path; bare names stay for `PATH` lookup.
    fn normalize_tool(tool: &mut PathBuf, root: &Path) {
        if tool.is_relative() && tool.components().count() > 1 {
            *tool = crate::utils::path::normalize_path(&root.join(&*tool));
        }
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Collect all validation errors and return them at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.worker.command.iter().any(String::is_empty) {
            errors.push("[worker] command contains an empty argument".to_string());
        }
        if self.tex.latex.as_os_str().is_empty() {
            errors.push("[tex] latex is empty".to_string());
        }
        if self.tex.dvisvgm.as_os_str().is_empty() {
            errors.push("[tex] dvisvgm is empty".to_string());
        }
        if self.store.assets_dir.is_file() {
            errors.push(format!(
                "[store] assets_dir `{}` is a file",
                self.store.assets_dir.display()
            ));
        }

        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors.join("; ")));
        }

        let missing = self
            .worker
            .resource_root
            .as_deref()
            .filter(|resources| self.worker.strict_load && !resources.is_dir());
        if let Some(resources) = missing {
            log!(
                "warning";
                "[worker] resource_root `{}` does not exist, compiles will fail while strict_load = true",
                resources.display()
            );
        }
        Ok(())
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config, panicking on unknown fields to catch typos in tests.
#[cfg(test)]
pub fn test_parse_config(content: &str) -> Config {
    let (parsed, ignored) = Config::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}
