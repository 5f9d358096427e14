//! Terminal editing surface: a temporary `.tex` file opened in `$EDITOR`.

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::Path;
use tempfile::NamedTempFile;

use super::EditingSurface;
use crate::utils::exec::Cmd;

/// Editor used when neither `$VISUAL` nor `$EDITOR` is set.
const FALLBACK_EDITOR: &str = "vi";

pub struct EditorSurface {
    file: NamedTempFile,
    editor: Vec<String>,
}

impl EditorSurface {
    /// Surface using the user's configured editor.
    pub fn new() -> Result<Self> {
        let editor = editor_command(std::env::var("VISUAL").ok(), std::env::var("EDITOR").ok());
        Self::with_editor(editor)
    }

    pub fn with_editor(editor: Vec<String>) -> Result<Self> {
        let file = tempfile::Builder::new()
            .prefix("tikzsvg-")
            .suffix(".tex")
            .tempfile()
            .context("Failed to create editing buffer")?;
        Ok(Self { file, editor })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

impl EditingSurface for EditorSurface {
    fn content(&self) -> Result<String> {
        fs::read_to_string(self.path())
            .with_context(|| format!("Failed to read `{}`", self.path().display()))
    }

    fn set_content(&mut self, text: &str) -> Result<()> {
        fs::write(self.path(), text)
            .with_context(|| format!("Failed to write `{}`", self.path().display()))
    }

    #[allow(clippy::permissions_set_readonly_false)]
    fn set_editable(&mut self, editable: bool) -> Result<()> {
        let path = self.path();
        let mut permissions = fs::metadata(path)?.permissions();
        permissions.set_readonly(!editable);
        fs::set_permissions(path, permissions)
            .with_context(|| format!("Failed to change permissions of `{}`", path.display()))
    }

    fn focus(&mut self) -> Result<()> {
        let status = Cmd::from_slice(&self.editor).arg(self.path()).interactive()?;
        if !status.success() {
            bail!("editor `{}` exited with {status}", self.editor.join(" "));
        }
        Ok(())
    }
}

/// Split `$VISUAL`, else `$EDITOR`, into a command line.
fn editor_command(visual: Option<String>, editor: Option<String>) -> Vec<String> {
    [visual, editor]
        .into_iter()
        .flatten()
        .map(|value| {
            value
                .split_whitespace()
                .map(str::to_owned)
                .collect::<Vec<_>>()
        })
        .find(|command| !command.is_empty())
        .unwrap_or_else(|| vec![FALLBACK_EDITOR.to_owned()])
}
