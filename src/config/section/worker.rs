//! `[worker]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [worker]
//! command = []            # empty: run this executable's `worker` subcommand
//! resource_root = "tex"   # extra TeX inputs, searched recursively (unset: none)
//! strict_load = true      # abort the compile when resources fail to load
//! embed_fonts = true      # woff2 fonts in the SVG instead of none
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Compile worker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Command line of an external worker speaking the JSON-lines protocol.
    pub command: Vec<String>,

    /// Directory handed to every worker before it compiles.
    /// Unset means there is nothing to load.
    pub resource_root: Option<PathBuf>,

    /// Treat a resource load failure as a compile failure.
    /// - `true` (default): the compile fails with the load error
    /// - `false`: log a warning and compile anyway
    pub strict_load: bool,

    pub embed_fonts: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            resource_root: None,
            strict_load: true,
            embed_fonts: true,
        }
    }
}
