//! `tikzsvg compile`: one file in, one image out.

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};

use super::common::{pipeline, report};
use crate::artifact::{extract, timestamp};
use crate::config::Config;
use crate::{debug, log};
use crate::session::fallback_artifact;

/// Compile `file` and write the image to `output`.
///
/// A failed compile still updates the output: the previous image is kept
/// with the new source embedded, so nothing typed is lost.
pub async fn compile_file(config: &Config, file: &Path, output: Option<&Path>) -> Result<()> {
    let source = read_source(file)?;
    let output = output_path(file, output);

    let result = pipeline(config)?.compile(&source).await;
    report(&output.display().to_string(), &result);

    let artifact = match result.artifact {
        Some(artifact) => artifact,
        None => {
            let prior = fs::read(&output).ok();
            fallback_artifact(prior.as_deref(), &source)
        }
    };
    fs::write(&output, artifact.as_bytes())
        .with_context(|| format!("Failed to write `{}`", output.display()))?;
    debug!("compile"; "{} updated {}", output.display(), timestamp(artifact.updated()));

    if !result.ok {
        log!("compile"; "source saved into {}", output.display());
        bail!("compilation failed");
    }
    Ok(())
}

/// TikZ source from a `.tex` file or from an image's carrier.
fn read_source(file: &Path) -> Result<String> {
    if is_svg(file) {
        let bytes = fs::read(file).with_context(|| format!("Failed to read `{}`", file.display()))?;
        return extract(&bytes)
            .with_context(|| format!("`{}` has no embedded TikZ source", file.display()));
    }
    fs::read_to_string(file).with_context(|| format!("Failed to read `{}`", file.display()))
}

/// Images recompile in place; sources get a sibling `.svg`.
fn output_path(file: &Path, output: Option<&Path>) -> PathBuf {
    match output {
        Some(output) => output.to_path_buf(),
        None => file.with_extension("svg"),
    }
}

fn is_svg(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::placeholder;

    #[test]
    fn test_output_path() {
        assert_eq!(output_path(Path::new("fig.tex"), None), Path::new("fig.svg"));
        assert_eq!(output_path(Path::new("fig.SVG"), None), Path::new("fig.svg"));
        assert_eq!(
            output_path(Path::new("fig.tex"), Some(Path::new("out/x.svg"))),
            Path::new("out/x.svg")
        );
    }

    #[test]
    fn test_read_source_from_tex_and_svg() {
        let dir = tempfile::tempdir().unwrap();

        let tex = dir.path().join("fig.tex");
        fs::write(&tex, "\\draw (0,0) -- (1,1);").unwrap();
        assert_eq!(read_source(&tex).unwrap(), "\\draw (0,0) -- (1,1);");

        let svg = dir.path().join("fig.svg");
        fs::write(&svg, placeholder("\\node {A};").as_bytes()).unwrap();
        assert_eq!(read_source(&svg).unwrap(), "\\node {A};");

        let plain = dir.path().join("plain.svg");
        fs::write(&plain, "<svg/>").unwrap();
        assert!(read_source(&plain).is_err());
    }
}
