//! Placeholder artifact shown before a picture has been compiled.

use chrono::{DateTime, Utc};

use super::{Artifact, embed};

/// Generic image icon with a "TikZ" label, drawn on a 1024 grid.
const TEMPLATE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" version="1.1" width="256" height="256" viewBox="0 0 1024 1024"><defs><linearGradient id="frame" x1="0" x2="0" y1="0" y2="1"><stop offset="0" stop-color="#f2f2f2"/><stop offset="1" stop-color="#d8d9db"/></linearGradient><linearGradient id="peak" x1="0" x2="0" y1="0" y2="1"><stop offset="0" stop-color="#ffffff"/><stop offset="1" stop-color="#ffffff" stop-opacity="0.5"/></linearGradient></defs><ellipse cx="512" cy="809" rx="402" ry="37" fill="#eef0f2"/><rect x="248" y="290" width="476" height="388" rx="36" fill="url(#frame)"/><circle cx="632" cy="374" r="33" fill="#ffffff"/><path d="M 345 612 L 511 612 C 540 612 558 582 543 559 L 461 431 C 454 420 444 407 428 407 C 413 407 404 420 396 431 L 313 560 C 298 583 315 612 345 612 Z" fill="url(#peak)"/><path d="M 499 612 L 634 612 C 658 612 673 591 661 574 L 594 485 C 589 477 580 465 567 465 C 554 465 547 476 541 485 L 473 575 C 460 592 475 612 499 612 Z" fill="url(#peak)"/><text x="50%" y="50%" dominant-baseline="middle" text-anchor="middle" font-family="Arial, sans-serif" font-size="160" fill="#555">TikZ</text></svg>"##;

/// Build a placeholder artifact carrying `source`.
pub fn placeholder(source: &str) -> Artifact {
    placeholder_at(source, Utc::now())
}

/// Build a placeholder artifact with an explicit timestamp.
pub fn placeholder_at(source: &str, updated: DateTime<Utc>) -> Artifact {
    embed(TEMPLATE.as_bytes(), source, updated).expect("placeholder template is well-formed SVG")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{extract, timestamp};

    #[test]
    fn test_template_is_embeddable() {
        let hostile = "\u{0}</svg>]]>&#13;\r\n\u{FFFF}";
        assert!(embed(TEMPLATE.as_bytes(), "", Utc::now()).is_ok());
        assert!(embed(TEMPLATE.as_bytes(), hostile, Utc::now()).is_ok());
    }

    #[test]
    fn test_placeholder_embeds_source() {
        for source in ["", "\\begin{tikzpicture}\\end{tikzpicture}", "</svg>&"] {
            assert_eq!(extract(placeholder(source).as_bytes()).as_deref(), Some(source));
        }
    }

    #[test]
    fn test_placeholder_deterministic_modulo_timestamp() {
        let at = Utc::now();
        let a = placeholder_at("same", at);
        let b = placeholder_at("same", at);
        assert_eq!(a, b);

        let later = placeholder("same");
        assert_eq!(
            a.svg().replace(&timestamp(a.updated()), ""),
            later.svg().replace(&timestamp(later.updated()), "")
        );
    }

    #[test]
    fn test_placeholder_keeps_template_layout() {
        let svg = placeholder("x").svg().to_owned();
        assert!(svg.contains(r#"viewBox="0 0 1024 1024""#));
        assert!(svg.contains(">TikZ</text>"));
    }
}
