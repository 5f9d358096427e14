//! `[tex]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [tex]
//! latex = "latex"
//! dvisvgm = "dvisvgm"
//! preamble = """
//! \\def\\pgfsysdriver{pgfsys-dvisvgm.def}
//! \\documentclass[tikz]{standalone}
//! \\usetikzlibrary{arrows.meta}
//! """
//! ```
//!
//! The preamble is only used for sources without a `\documentclass`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::worker::server::DEFAULT_PREAMBLE;

/// TeX toolchain used by the built-in worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TexConfig {
    pub latex: PathBuf,
    pub dvisvgm: PathBuf,
    pub preamble: String,
}

impl Default for TexConfig {
    fn default() -> Self {
        Self {
            latex: "latex".into(),
            dvisvgm: "dvisvgm".into(),
            preamble: DEFAULT_PREAMBLE.into(),
        }
    }
}
