//! `[store]` section configuration.
//!
//! ```toml
//! [store]
//! assets_dir = "assets"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where artifacts are kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory backing the `assets/` identity namespace.
    pub assets_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            assets_dir: "assets".into(),
        }
    }
}
