//! `tikzsvg new` and `tikzsvg edit`: images living in the asset store.

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::Path;

use super::common::{pipeline, report, store};
use crate::config::Config;
use crate::log;
use crate::logger::{status_detach, status_warning};
use crate::session::{EditSession, EditorSurface, FileBinding, create_image, open_image, store_result};

/// Create an image, bind it into `location` and print its identity.
pub async fn new_image(
    config: &Config,
    location: &Path,
    source: Option<&Path>,
    compile: bool,
) -> Result<()> {
    let source = match source {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read `{}`", path.display()))?,
        None => String::new(),
    };

    let store = store(config);
    let mut image = create_image(&store, &FileBinding, location, &source)?;
    log!("new"; "{} -> {}", location.display(), image.id);

    if compile {
        let result = pipeline(config)?.compile(&source).await;
        report(image.id.as_str(), &result);
        store_result(&store, &mut image, &result)?;
    }

    println!("{}", image.id);
    Ok(())
}

/// Edit/compile loop: stops on a successful compile or when the user
/// leaves the source unchanged.
pub async fn edit_image(config: &Config, asset: &str) -> Result<()> {
    let store = store(config);
    let Some(image) = open_image(&store, asset)? else {
        bail!("`{asset}` is not a TikZ image");
    };

    let pipeline = pipeline(config)?;
    let mut session = EditSession::new(&pipeline, &store, EditorSurface::new()?, image)?;

    loop {
        session.edit()?;
        status_detach();
        if !session.is_modified()? {
            status_warning("source unchanged, nothing compiled");
            return Ok(());
        }

        let result = session.compile().await?;
        report(session.image().id.as_str(), &result);
        if result.ok {
            return Ok(());
        }
        log!("edit"; "reopening editor, save without changes to give up");
    }
}
