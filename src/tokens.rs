//! Token post-filtering over raw OCR output.
//!
//! The recognition stage yields one raw text per word box; this stage applies
//! the confidence gate, text cleanup, and centroid computation that turn raw
//! reads into association-ready tokens.

use geo::BoundingRect;

use crate::{TextBox, TextLine, TextToken};

/// One OCR read before filtering: text, confidence in [0, 100], and the
/// axis-aligned extent of its box in original-image pixels.
#[derive(Debug, Clone)]
pub struct RawText {
    pub text: String,
    pub confidence: f32,
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

/// Pairs detection boxes with recognized lines. Confidence is the mean
/// per-character score scaled to [0, 100]; empty reads score zero.
pub(crate) fn raw_from_ocr(boxes: &[TextBox], lines: &[TextLine]) -> Vec<RawText> {
    boxes
        .iter()
        .zip(lines)
        .filter_map(|(b_box, line)| {
            let rect = b_box.rect.bounding_rect()?;
            let confidence = if line.character_scores.is_empty() {
                0.0
            } else {
                line.character_scores.iter().sum::<f32>()
                    / line.character_scores.len() as f32
                    * 100.0
            };
            Some(RawText {
                text: line.text.clone(),
                confidence,
                left: rect.min().x,
                top: rect.min().y,
                width: rect.width(),
                height: rect.height(),
            })
        })
        .collect()
}

/// Applies the token filter in read order:
/// confidence strictly above `min_confidence`, optional cleanup to
/// `[A-Za-z0-9-]`, cleaned length > 1, centroid at the box center.
pub fn filter_tokens(
    raw: impl IntoIterator<Item = RawText>,
    min_confidence: f32,
    clean: bool,
) -> Vec<TextToken> {
    raw.into_iter()
        .filter(|r| r.confidence > min_confidence)
        .filter_map(|r| {
            let text = if clean {
                r.text
                    .chars()
                    .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
                    .collect::<String>()
            } else {
                r.text.trim().to_string()
            };
            if text.chars().count() <= 1 {
                return None;
            }
            Some(TextToken {
                text,
                cx: r.left + r.width / 2.0,
                cy: r.top + r.height / 2.0,
                confidence: r.confidence,
            })
        })
        .collect()
}
