//! Metadata carrier: embedding and extracting source text.
//!
//! The carrier is a `<metadata>` node placed as the first child of the root
//! `<svg>`. Metadata never takes part in rendering or bounding-box
//! computation, so the image looks exactly as the compiler drew it.
//!
//! Both directions work on the quick-xml event stream; nothing is spliced
//! into markup as a string.

use chrono::{DateTime, Utc};
use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;

use super::escape::{self, Payload};
use super::{Artifact, timestamp};

/// `type` attribute identifying the carrier script.
pub const CARRIER_TYPE: &str = "text/x-tikz";

const METADATA_TAG: &str = "metadata";
const SCRIPT_TAG: &str = "script";
const ENCODING_ATTR: &str = "data-encoding";
const UPDATED_ATTR: &str = "updated";
const STYLE_ATTR: &str = "style";
const BACKGROUND_STYLE: &str = "background-color: white;";

/// Errors while embedding source into rendered output.
#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("No generated image")]
    NoImage,

    #[error("rendered SVG ends before its root closes")]
    Unclosed,

    #[error("invalid SVG: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("invalid SVG attribute: {0}")]
    Attr(#[from] AttrError),

    #[error("failed to write SVG: {0}")]
    Io(#[from] std::io::Error),

    #[error("rendered SVG is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// The typed carrier node.
#[derive(Debug, Clone)]
pub struct Carrier<'a> {
    payload: Payload<'a>,
}

impl<'a> Carrier<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            payload: escape::encode(source),
        }
    }

    /// Write `<metadata><script type="text/x-tikz">…</script></metadata>`.
    pub fn write<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<(), EmbedError> {
        let mut script = BytesStart::new(SCRIPT_TAG);
        script.push_attribute(("type", CARRIER_TYPE));
        if let Some(encoding) = self.payload.encoding() {
            script.push_attribute((ENCODING_ATTR, encoding));
        }

        writer.write_event(Event::Start(BytesStart::new(METADATA_TAG)))?;
        writer.write_event(Event::Start(script))?;
        writer.write_event(Event::Text(BytesText::from_escaped(self.payload.as_str())))?;
        writer.write_event(Event::End(BytesEnd::new(SCRIPT_TAG)))?;
        writer.write_event(Event::End(BytesEnd::new(METADATA_TAG)))?;
        Ok(())
    }
}

/// Embed `source` into rendered SVG bytes.
///
/// The first `<svg>` element becomes the image root: its `style` and
/// `updated` attributes are replaced and the carrier is inserted as its first
/// child. Carriers already present anywhere in the input (and a `<metadata>`
/// wrapping one) are dropped, so the result holds exactly one.
pub fn embed(rendered: &[u8], source: &str, updated: DateTime<Utc>) -> Result<Artifact, EmbedError> {
    let carrier = Carrier::new(source);
    let stamp = timestamp(updated);

    let mut reader = Reader::from_reader(rendered);
    let mut writer = Writer::new(Vec::with_capacity(rendered.len() + 256));
    let mut root_seen = false;
    // Elements open since the root start tag, root included.
    let mut open = 0usize;
    let mut held = Held::default();

    loop {
        let event = reader.read_event()?;

        if held.is_active() {
            if let Some(events) = held.push(event) {
                for event in events {
                    writer.write_event(event)?;
                }
            }
            continue;
        }

        match event {
            Event::Eof => break,
            Event::Start(e) if !root_seen && is_svg(&e) => {
                root_seen = true;
                open = 1;
                writer.write_event(Event::Start(root_start(&e, &stamp)?))?;
                carrier.write(&mut writer)?;
            }
            Event::Empty(e) if !root_seen && is_svg(&e) => {
                root_seen = true;
                let start = root_start(&e, &stamp)?;
                let end = BytesEnd::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                writer.write_event(Event::Start(start))?;
                carrier.write(&mut writer)?;
                writer.write_event(Event::End(end))?;
            }
            Event::Start(e) if is_metadata(&e) || is_carrier(&e) => held.begin(e),
            Event::Empty(e) if is_carrier(&e) => {}
            event => {
                match &event {
                    Event::Start(_) if root_seen => open += 1,
                    Event::End(_) => open = open.saturating_sub(1),
                    _ => {}
                }
                writer.write_event(event)?;
            }
        }
    }

    if !root_seen {
        return Err(EmbedError::NoImage);
    }
    if open > 0 {
        return Err(EmbedError::Unclosed);
    }

    let svg = String::from_utf8(writer.into_inner())?;
    Ok(Artifact::new(svg, updated))
}

/// Extract the embedded source from an artifact.
///
/// Returns `None` when there is no carrier or the document cannot be read.
/// Extraction is advisory: arbitrary input never causes an error.
pub fn extract(artifact: &[u8]) -> Option<String> {
    let mut reader = Reader::from_reader(artifact);
    let mut raw = String::new();
    let mut encoding: Option<String> = None;
    let mut inside = false;

    loop {
        match reader.read_event().ok()? {
            Event::Eof => return None,
            Event::Start(e) if !inside => {
                if is_carrier(&e) {
                    encoding = carrier_encoding(&e);
                    inside = true;
                }
            }
            Event::Empty(e) if !inside => {
                if is_carrier(&e) {
                    return escape::decode("", carrier_encoding(&e).as_deref());
                }
            }
            // Markup inside the carrier means it was not written by us
            Event::Start(_) | Event::Empty(_) if inside => return None,
            Event::End(_) if inside => return escape::decode(&raw, encoding.as_deref()),
            Event::Text(t) if inside => raw.push_str(std::str::from_utf8(&t).ok()?),
            Event::GeneralRef(r) if inside => {
                raw.push('&');
                raw.push_str(std::str::from_utf8(&r).ok()?);
                raw.push(';');
            }
            Event::CData(c) if inside => {
                raw.push_str(&escape::escape(std::str::from_utf8(&c).ok()?));
            }
            _ => {}
        }
    }
}

/// Events held back while deciding whether an element is an old carrier.
#[derive(Default)]
struct Held<'a> {
    events: Vec<Event<'a>>,
    depth: usize,
    has_carrier: bool,
}

impl<'a> Held<'a> {
    fn is_active(&self) -> bool {
        self.depth > 0
    }

    fn begin(&mut self, start: BytesStart<'a>) {
        self.has_carrier = is_carrier(&start);
        self.events.push(Event::Start(start));
        self.depth = 1;
    }

    /// Hold one more event.
    ///
    /// When the held element closes, returns the events to write: all of
    /// them for plain metadata, none when it contained a carrier.
    fn push(&mut self, event: Event<'a>) -> Option<Vec<Event<'a>>> {
        match &event {
            Event::Start(e) => {
                self.has_carrier |= is_carrier(e);
                self.depth += 1;
            }
            Event::Empty(e) => self.has_carrier |= is_carrier(e),
            Event::End(_) => self.depth -= 1,
            // Unterminated element: release what we have
            Event::Eof => self.depth = 0,
            _ => {}
        }
        let eof = matches!(event, Event::Eof);
        self.events.push(event);

        if self.depth > 0 {
            return None;
        }
        let mut events = std::mem::take(&mut self.events);
        if eof {
            events.pop();
        }
        if std::mem::take(&mut self.has_carrier) {
            events.clear();
        }
        Some(events)
    }
}

/// Copy of the root start tag with `style` and `updated` replaced.
fn root_start(e: &BytesStart<'_>, stamp: &str) -> Result<BytesStart<'static>, EmbedError> {
    let mut root = BytesStart::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
    for attr in e.attributes() {
        let attr = attr?;
        let key = attr.key.as_ref();
        if key == UPDATED_ATTR.as_bytes() || key == STYLE_ATTR.as_bytes() {
            continue;
        }
        root.push_attribute(attr);
    }
    root.push_attribute((STYLE_ATTR, BACKGROUND_STYLE));
    root.push_attribute((UPDATED_ATTR, stamp));
    Ok(root)
}

#[inline]
fn is_svg(e: &BytesStart<'_>) -> bool {
    e.local_name().as_ref() == b"svg"
}

#[inline]
fn is_metadata(e: &BytesStart<'_>) -> bool {
    e.local_name().as_ref() == METADATA_TAG.as_bytes()
}

fn is_carrier(e: &BytesStart<'_>) -> bool {
    e.local_name().as_ref() == SCRIPT_TAG.as_bytes()
        && matches!(
            e.try_get_attribute("type"),
            Ok(Some(attr)) if attr.value.as_ref() == CARRIER_TYPE.as_bytes()
        )
}

fn carrier_encoding(e: &BytesStart<'_>) -> Option<String> {
    let attr = e.try_get_attribute(ENCODING_ATTR).ok()??;
    Some(String::from_utf8_lossy(&attr.value).into_owned())
}
