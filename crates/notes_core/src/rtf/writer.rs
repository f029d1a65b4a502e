//! RTF writer.

use super::{RtfError, RtfResult};
use crate::model::rich_text::{RichText, DEFAULT_FONT};

const HEADER: &str = "{\\rtf1\\ansi\\ansicpg1252\\deff0\n";

/// Encodes `text` as RTF.
///
/// The font table lists the default font at index 0 followed by every other
/// font in order of first use. Each run restates its full formatting after
/// `\plain`, so runs never depend on the formatting of earlier runs.
///
/// # Errors
/// - `InvalidFontName` when a font name is empty, has surrounding
///   whitespace, or contains `;` or a control character.
pub fn encode(text: &RichText) -> RtfResult<Vec<u8>> {
    let mut fonts: Vec<&str> = vec![DEFAULT_FONT];
    for run in text.runs() {
        let font = run.attributes.font.as_str();
        if !fonts.contains(&font) {
            validate_font_name(font)?;
            fonts.push(font);
        }
    }

    let mut out = String::from(HEADER);
    out.push_str("{\\fonttbl");
    for (index, font) in fonts.iter().enumerate() {
        out.push_str(&format!("{{\\f{index}\\fnil "));
        escape_into(&mut out, font);
        out.push_str(";}");
    }
    out.push_str("}\n");

    for run in text.runs() {
        let attributes = &run.attributes;
        let font_index = fonts
            .iter()
            .position(|font| *font == attributes.font)
            .unwrap_or(0);
        out.push_str(&format!("\\plain\\f{font_index}\\fs{}", attributes.size));
        if attributes.bold {
            out.push_str("\\b");
        }
        if attributes.italic {
            out.push_str("\\i");
        }
        if attributes.underline {
            out.push_str("\\ul");
        }
        if attributes.strikethrough {
            out.push_str("\\strike");
        }
        out.push(' ');
        escape_into(&mut out, &run.text);
    }
    out.push_str("\n}");

    Ok(out.into_bytes())
}

fn validate_font_name(name: &str) -> RtfResult<()> {
    let invalid = name.trim().is_empty()
        || name.trim() != name
        || name.contains(';')
        || name.chars().any(char::is_control);
    if invalid {
        return Err(RtfError::InvalidFontName(name.to_string()));
    }
    Ok(())
}

fn escape_into(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '{' => out.push_str("\\{"),
            '}' => out.push_str("\\}"),
            '\n' => out.push_str("\\par\n"),
            '\t' => out.push_str("\\tab "),
            ' '..='~' => out.push(ch),
            _ => {
                let mut units = [0u16; 2];
                for unit in ch.encode_utf16(&mut units) {
                    // Signed 16-bit per RTF; `?` is the skipped ANSI fallback.
                    out.push_str(&format!("\\u{}?", *unit as i16));
                }
            }
        }
    }
}
