//! Self-describing SVG artifacts.
//!
//! Every artifact produced by this tool carries the exact source that
//! produced it, so an image can be reopened for editing with nothing but
//! the image itself.
//!
//! # Modules
//!
//! - [`carrier`]: embed source into rendered SVG, extract it back
//! - [`escape`]: payload encoding for the carrier text
//! - [`placeholder`]: generic stand-in image used before the first compile
//!
//! # Layout
//!
//! ```text
//! <svg ... style="background-color: white;" updated="2026-01-01T00:00:00.000Z">
//!   <metadata><script type="text/x-tikz">\draw (0,0) -- (1,1);</script></metadata>
//!   ...rendered content...
//! </svg>
//! ```

pub mod carrier;
pub mod escape;
pub mod placeholder;

pub use carrier::{EmbedError, embed, extract};
pub use placeholder::placeholder;

use chrono::{DateTime, SecondsFormat, Utc};

/// A rendered SVG document with its source embedded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    svg: String,
    updated: DateTime<Utc>,
}

impl Artifact {
    pub(crate) fn new(svg: String, updated: DateTime<Utc>) -> Self {
        Self { svg, updated }
    }

    /// The SVG markup.
    pub fn svg(&self) -> &str {
        &self.svg
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.svg.as_bytes()
    }

    /// Time written into the root `updated` attribute.
    pub fn updated(&self) -> DateTime<Utc> {
        self.updated
    }
}

/// Format a timestamp the way it appears in the `updated` attribute.
///
/// Millisecond precision, `Z` suffix: `2026-10-16T08:30:00.123Z`.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_format() {
        let at = Utc.with_ymd_and_hms(2026, 10, 16, 8, 30, 0).unwrap();
        assert_eq!(timestamp(at), "2026-10-16T08:30:00.000Z");
    }

    #[test]
    fn test_artifact_source_accessor() {
        let artifact = placeholder("\\draw (0,0) circle (1);");
        assert_eq!(extract(artifact.as_bytes()).as_deref(), Some("\\draw (0,0) circle (1);"));
        assert!(artifact.svg().contains(&timestamp(artifact.updated())));
    }
}
