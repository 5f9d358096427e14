//! Image operations and the edit/compile session.
//!
//! The host side of the system is abstract: artifacts live in an
//! [`AssetStore`], documents reference them through a [`DocumentBinding`],
//! and the user types into an [`EditingSurface`]. The concrete
//! implementations used by the CLI live in [`store`] and [`editor`].
//!
//! # Flow
//!
//! ```text
//! create_image ── placeholder ──► upload ──► update_reference
//! open_image   ── fetch ──► extract source
//! EditSession::compile
//!     lock surface ─► content ─► CompilePipeline::compile ─► store_result ─► unlock
//! ```

pub mod editor;
pub mod store;

pub use editor::EditorSurface;
pub use store::{FileBinding, FsStore};

use chrono::Utc;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

use crate::artifact::{Artifact, embed, extract, placeholder};
use crate::debug;
use crate::pipeline::{CompilePipeline, CompileResult};
use crate::worker::WorkerFactory;

/// Name under which new images are uploaded.
pub const UPLOAD_NAME: &str = "tikz-image.svg";

/// Identities eligible for reopening as TikZ images.
static ASSET_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^assets/.+\.svg$").unwrap());

/// Identity of an artifact in the store, e.g. `assets/tikz-image-1a2b3c4d5e6f.svg`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetId(String);

impl AssetId {
    /// Accept identities of the form `assets/<name>.svg`.
    pub fn parse(id: &str) -> Option<Self> {
        ASSET_ID.is_match(id).then(|| Self(id.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path below the `assets/` namespace.
    pub fn file_name(&self) -> &str {
        self.0.strip_prefix("assets/").unwrap_or(&self.0)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error on `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("`{0}` is not a valid asset identity")]
    InvalidId(String),

    #[error("asset `{0}` does not exist")]
    NotFound(AssetId),
}

/// Artifact storage.
pub trait AssetStore {
    /// Store a new artifact; the returned identity is stable from then on.
    fn upload(&self, bytes: &[u8], name: &str) -> Result<AssetId, StoreError>;

    /// Replace the content behind an existing identity.
    fn replace(&self, id: &AssetId, bytes: &[u8]) -> Result<(), StoreError>;

    /// Current content, `None` when nothing is stored under `id`.
    fn fetch(&self, id: &AssetId) -> Result<Option<Vec<u8>>, StoreError>;
}

/// Points a place in a host document at an artifact.
pub trait DocumentBinding {
    fn update_reference(&self, location: &Path, id: &AssetId) -> anyhow::Result<()>;
}

/// Where the user edits source text.
pub trait EditingSurface {
    fn content(&self) -> anyhow::Result<String>;
    fn set_content(&mut self, text: &str) -> anyhow::Result<()>;
    fn set_editable(&mut self, editable: bool) -> anyhow::Result<()>;
    fn focus(&mut self) -> anyhow::Result<()>;
}

/// A stored TikZ image and the source last written into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TikzImage {
    pub id: AssetId,
    pub source: String,
}

/// Create a new image: upload a placeholder carrying `source` and bind it.
pub fn create_image<S, B>(
    store: &S,
    binding: &B,
    location: &Path,
    source: &str,
) -> anyhow::Result<TikzImage>
where
    S: AssetStore,
    B: DocumentBinding,
{
    let artifact = placeholder(source);
    let id = store.upload(artifact.as_bytes(), UPLOAD_NAME)?;
    binding.update_reference(location, &id)?;
    debug!("store"; "created {id} for {}", location.display());

    Ok(TikzImage {
        id,
        source: source.to_owned(),
    })
}

/// Reopen a stored image. `None` when `id` is not a TikZ image.
pub fn open_image<S: AssetStore>(store: &S, id: &str) -> Result<Option<TikzImage>, StoreError> {
    let Some(id) = AssetId::parse(id) else {
        return Ok(None);
    };
    let Some(bytes) = store.fetch(&id)? else {
        return Ok(None);
    };
    Ok(extract(&bytes).map(|source| TikzImage { id, source }))
}

/// Write a compile outcome back to the store.
///
/// Success stores the new artifact. Failure keeps the previous rendering
/// but re-embeds the new source into it, so the edit is never lost.
pub fn store_result<S: AssetStore>(
    store: &S,
    image: &mut TikzImage,
    result: &CompileResult,
) -> Result<(), StoreError> {
    let artifact = match &result.artifact {
        Some(artifact) if result.ok => artifact.clone(),
        _ => fallback_artifact(store.fetch(&image.id)?.as_deref(), &result.source),
    };
    store.replace(&image.id, artifact.as_bytes())?;
    image.source.clone_from(&result.source);
    Ok(())
}

/// Artifact to keep after a failed compile of `source`.
///
/// The prior rendering with `source` embedded, or a placeholder when there
/// is no usable prior artifact.
pub fn fallback_artifact(prior: Option<&[u8]>, source: &str) -> Artifact {
    prior
        .and_then(|bytes| embed(bytes, source, Utc::now()).ok())
        .unwrap_or_else(|| placeholder(source))
}

/// One image open for editing.
pub struct EditSession<'a, S, E, F> {
    pipeline: &'a CompilePipeline<F>,
    store: &'a S,
    surface: E,
    image: TikzImage,
}

impl<'a, S, E, F> EditSession<'a, S, E, F>
where
    S: AssetStore,
    E: EditingSurface,
    F: WorkerFactory,
{
    /// Load the image's source into the surface.
    pub fn new(
        pipeline: &'a CompilePipeline<F>,
        store: &'a S,
        mut surface: E,
        image: TikzImage,
    ) -> anyhow::Result<Self> {
        surface.set_content(&image.source)?;
        Ok(Self {
            pipeline,
            store,
            surface,
            image,
        })
    }

    pub fn image(&self) -> &TikzImage {
        &self.image
    }

    /// Hand the surface to the user.
    pub fn edit(&mut self) -> anyhow::Result<()> {
        self.surface.focus()
    }

    /// Whether the surface differs from the source last stored.
    pub fn is_modified(&self) -> anyhow::Result<bool> {
        Ok(self.surface.content()? != self.image.source)
    }

    /// Compile the surface content and store the outcome.
    ///
    /// The surface is read-only for the duration and unlocked again on
    /// every path.
    pub async fn compile(&mut self) -> anyhow::Result<CompileResult> {
        self.surface.set_editable(false)?;
        let outcome = self.compile_locked().await;
        let unlocked = self.surface.set_editable(true);

        let result = outcome?;
        unlocked?;
        Ok(result)
    }

    async fn compile_locked(&mut self) -> anyhow::Result<CompileResult> {
        let source = self.surface.content()?;
        let result = self.pipeline.compile(&source).await;
        store_result(self.store, &mut self.image, &result)?;
        Ok(result)
    }
}
