//! Color swatches for hex and `rgb()` literals.
//!
//! Literals are parsed with the `color` crate, so anything CSS accepts inside
//! `rgb(...)`/`rgba(...)` is shown as a swatch.

use std::str::FromStr;

use color::{AlphaColor, DynamicColor, Srgb};
use once_cell::sync::Lazy;
use regex::Regex;
use tower_lsp::lsp_types::{Color, ColorInformation, ColorPresentation};
use tracing::debug;

use crate::text_document::TextDocument;

static COLOR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"#(?:[A-Fa-f0-9]{8}|[A-Fa-f0-9]{6}|[A-Fa-f0-9]{4}|[A-Fa-f0-9]{3})|rgba?\([^)]*\)")
        .unwrap()
});

pub fn document_colors(document: &TextDocument) -> Vec<ColorInformation> {
    let text = document.text();
    COLOR_REGEX
        .find_iter(text)
        .filter(|found| {
            // `#123456789` is not a color, nor is the `#abcdef` in `#abcdefgh`.
            !text[found.end()..]
                .chars()
                .next()
                .is_some_and(|next| next.is_ascii_alphanumeric())
        })
        .filter_map(|found| {
            let color = match DynamicColor::from_str(found.as_str()) {
                Ok(color) => color,
                Err(err) => {
                    debug!(literal = found.as_str(), %err, "not a color");
                    return None;
                }
            };
            let [red, green, blue, alpha] = color.to_alpha_color::<Srgb>().components;
            Some(ColorInformation {
                range: document.range_from_offsets(found.range()),
                color: Color {
                    red,
                    green,
                    blue,
                    alpha,
                },
            })
        })
        .collect()
}

/// Uppercase hex first, then `rgb()`. Alpha is spelled out only when the color is
/// translucent.
pub fn color_presentations(color: Color) -> Vec<ColorPresentation> {
    let rgba = AlphaColor::<Srgb>::new([color.red, color.green, color.blue, color.alpha]).to_rgba8();
    let opaque = color.alpha >= 1.0;

    let hex = match opaque {
        true => format!("#{:02X}{:02X}{:02X}", rgba.r, rgba.g, rgba.b),
        false => format!("#{:02X}{:02X}{:02X}{:02X}", rgba.r, rgba.g, rgba.b, rgba.a),
    };
    let rgb = match opaque {
        true => format!("rgb({}, {}, {})", rgba.r, rgba.g, rgba.b),
        false => format!("rgba({}, {}, {}, {})", rgba.r, rgba.g, rgba.b, color.alpha),
    };

    [hex, rgb]
        .into_iter()
        .map(|label| ColorPresentation {
            label,
            ..Default::default()
        })
        .collect()
}
