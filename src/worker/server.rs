//! The worker process: reads requests on stdin, answers on stdout.
//!
//! stdout carries nothing but protocol lines; everything else (tool
//! output, logs) goes to stderr, which the host inherits.

use anyhow::{Context, Result, bail};
use regex::Regex;
use std::ffi::OsString;
use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use super::RenderOptions;
use super::protocol::{ProtocolError, Request, Response, recv_blocking, send_blocking};
use crate::debug;
use crate::utils::exec::{Cmd, FilterRule};

/// Preamble used when the source has no `\documentclass` of its own.
pub const DEFAULT_PREAMBLE: &str =
    "\\def\\pgfsysdriver{pgfsys-dvisvgm.def}\n\\documentclass[tikz]{standalone}";

/// Progress chatter from dvisvgm.
const DVISVGM_FILTER: FilterRule = FilterRule::new(&[
    "pre-processing DVI",
    "processing page",
    "processing of page",
    "computing extents",
    "graphic size",
    "output written to",
]);

/// What the worker does with a request.
pub trait Engine {
    fn load(&self, root: &Path) -> Result<()>;

    /// Render `source`. An empty string means the document produced no page.
    fn texify(&self, root: Option<&Path>, source: &str, options: &RenderOptions) -> Result<String>;
}

/// Serve requests until the host sends `shutdown` or closes the channel.
pub fn serve<E, R, W>(engine: &E, mut reader: R, mut writer: W) -> Result<(), ProtocolError>
where
    E: Engine,
    R: BufRead,
    W: Write,
{
    let mut root: Option<PathBuf> = None;

    loop {
        let request = match recv_blocking(&mut reader) {
            Ok(Some(request)) => request,
            Ok(None) => break,
            Err(ProtocolError::Json(e)) => {
                let message = format!("malformed request: {e}");
                send_blocking(&mut writer, &Response::Error { message })?;
                continue;
            }
            Err(e) => return Err(e),
        };

        let response = match request {
            Request::Ping => Response::Pong,
            Request::Load { root: dir } => match engine.load(&dir) {
                Ok(()) => {
                    root = Some(dir);
                    Response::Loaded
                }
                Err(e) => Response::Error {
                    message: format!("{e:#}"),
                },
            },
            Request::Texify { source, options } => {
                match engine.texify(root.as_deref(), &source, &options) {
                    Ok(svg) => Response::Image { svg },
                    Err(e) => Response::Error {
                        message: format!("{e:#}"),
                    },
                }
            }
            Request::Shutdown => break,
        };
        send_blocking(&mut writer, &response)?;
    }

    debug!("worker"; "shutting down");
    Ok(())
}

/// Serve on the process's own stdin/stdout.
pub fn run(engine: &TexEngine) -> Result<()> {
    let stdin = std::io::stdin().lock();
    let stdout = std::io::stdout().lock();
    serve(engine, stdin, stdout).context("worker channel failed")
}

// ============================================================================
// TeX engine
// ============================================================================

/// `latex` + `dvisvgm` in a throwaway directory.
#[derive(Debug, Clone)]
pub struct TexEngine {
    pub latex: PathBuf,
    pub dvisvgm: PathBuf,
    pub preamble: String,
}

impl Default for TexEngine {
    fn default() -> Self {
        Self {
            latex: "latex".into(),
            dvisvgm: "dvisvgm".into(),
            preamble: DEFAULT_PREAMBLE.into(),
        }
    }
}

impl Engine for TexEngine {
    fn load(&self, root: &Path) -> Result<()> {
        if !root.is_dir() {
            bail!("`{}` is not a directory", root.display());
        }
        for tool in [&self.latex, &self.dvisvgm] {
            which::which(tool).with_context(|| format!("`{}` not found", tool.display()))?;
        }
        debug!("worker"; "resources loaded from {}", root.display());
        Ok(())
    }

    fn texify(&self, root: Option<&Path>, source: &str, options: &RenderOptions) -> Result<String> {
        let dir = tempfile::Builder::new()
            .prefix("tikzsvg-")
            .tempdir()
            .context("Failed to create build directory")?;
        let dir = dir.path();

        fs::write(dir.join("input.tex"), wrap_document(&self.preamble, source))?;

        let mut latex = Cmd::new(&self.latex)
            .args(["-interaction=nonstopmode", "-halt-on-error", "input.tex"])
            .cwd(dir);
        if let Some(root) = root {
            latex = latex.env("TEXINPUTS", texinputs(root));
        }

        let output = latex.output()?;
        if !output.status.success() {
            let log = String::from_utf8_lossy(&output.stdout);
            match tex_error_summary(&log) {
                Some(summary) => bail!(summary),
                None => bail!("`{}` failed with {}", self.latex.display(), output.status),
            }
        }

        // "No pages of output."
        if !dir.join("input.dvi").exists() {
            return Ok(String::new());
        }

        let fonts = if options.embed_fonts {
            "--font-format=woff2"
        } else {
            "--no-fonts"
        };
        Cmd::new(&self.dvisvgm)
            .args([fonts, "--exact-bbox", "--output=output.svg", "input.dvi"])
            .cwd(dir)
            .filter(&DVISVGM_FILTER)
            .run()?;

        fs::read_to_string(dir.join("output.svg")).context("dvisvgm produced no output")
    }
}

/// Turn a bare picture into a complete document.
///
/// A source with its own `\documentclass` is used as is.
pub fn wrap_document(preamble: &str, source: &str) -> String {
    if source.contains("\\documentclass") {
        return source.to_owned();
    }

    let mut doc = String::with_capacity(preamble.len() + source.len() + 64);
    doc.push_str(preamble);
    doc.push('\n');
    if source.contains("\\begin{document}") {
        doc.push_str(source);
        doc.push('\n');
    } else {
        doc.push_str("\\begin{document}\n");
        doc.push_str(source);
        doc.push_str("\n\\end{document}\n");
    }
    doc
}

/// `TEXINPUTS` value searching `root` recursively before the defaults.
fn texinputs(root: &Path) -> OsString {
    let separator = if cfg!(windows) { ";" } else { ":" };
    let mut value = root.as_os_str().to_owned();
    value.push("//");
    value.push(separator);
    value
}

/// `l.42 ...` location lines. ASCII digits only: the regex build has no Unicode classes.
static TEX_LOCATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^l\.[0-9]+").unwrap());

/// Error lines (`! ...`) and their locations (`l.42 ...`) from a TeX log.
fn tex_error_summary(log: &str) -> Option<String> {
    let lines: Vec<_> = log
        .lines()
        .filter(|line| line.starts_with('!') || TEX_LOCATION.is_match(line))
        .collect();
    (!lines.is_empty()).then(|| lines.join("\n"))
}
