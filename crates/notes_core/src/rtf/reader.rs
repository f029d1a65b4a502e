//! RTF reader.
//!
//! Supports the character-formatting subset carried by [`TextAttributes`]
//! and skips everything else (colour tables, stylesheets, pictures,
//! `\*` destinations, paragraph formatting).

use super::{RtfError, RtfResult};
use crate::model::rich_text::{RichText, TextAttributes, DEFAULT_FONT, DEFAULT_FONT_SIZE};
use encoding_rs::{Encoding, MACINTOSH, WINDOWS_1252};
use std::collections::BTreeMap;

const SKIPPED_DESTINATIONS: &[&str] = &[
    "colortbl",
    "stylesheet",
    "info",
    "pict",
    "object",
    "header",
    "headerl",
    "headerr",
    "headerf",
    "footer",
    "footerl",
    "footerr",
    "footerf",
    "footnote",
    "fldinst",
    "listtable",
    "listoverridetable",
    "rsidtbl",
    "revtbl",
    "filetbl",
    "generator",
    "xmlnstbl",
    "themedata",
    "colorschememapping",
    "latentstyles",
    "datastore",
    "nonshppict",
];

/// Decodes RTF bytes into rich text.
///
/// Raw bytes above 0x7F and `\'hh` escapes are decoded through the
/// document codepage: Windows-1252 unless `\ansicpgN` or `\mac` names a
/// supported single-byte codepage.
///
/// # Errors
/// - `MissingHeader` when input does not start with `{\rtf`.
/// - `UnbalancedGroups` when input ends before the outer group closes.
/// - `UnexpectedEof` / `InvalidHex` for truncated or malformed escapes.
pub fn decode(bytes: &[u8]) -> RtfResult<RichText> {
    if !bytes.starts_with(b"{\\rtf") {
        return Err(RtfError::MissingHeader);
    }
    Reader::new(bytes).run()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Destination {
    Body,
    FontTable,
    Skip,
}

/// Character formatting as stated in the source; the font is kept as a
/// table index and resolved when text is emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CharFormat {
    font: Option<i32>,
    size: u16,
    bold: bool,
    italic: bool,
    underline: bool,
    strikethrough: bool,
}

impl Default for CharFormat {
    fn default() -> Self {
        Self {
            font: None,
            size: DEFAULT_FONT_SIZE,
            bold: false,
            italic: false,
            underline: false,
            strikethrough: false,
        }
    }
}

#[derive(Debug, Clone)]
struct GroupState {
    format: CharFormat,
    destination: Destination,
    unicode_skip: usize,
}

impl Default for GroupState {
    fn default() -> Self {
        Self {
            format: CharFormat::default(),
            destination: Destination::Body,
            unicode_skip: 1,
        }
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
    current: GroupState,
    stack: Vec<GroupState>,
    fonts: BTreeMap<i32, String>,
    default_font: i32,
    codepage: &'static Encoding,
    font_entry: Option<(i32, String)>,
    skip_remaining: usize,
    high_surrogate: Option<u16>,
    pending: String,
    pending_format: CharFormat,
    output: RichText,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            pos: 0,
            current: GroupState::default(),
            stack: Vec::new(),
            fonts: BTreeMap::new(),
            default_font: 0,
            codepage: WINDOWS_1252,
            font_entry: None,
            skip_remaining: 0,
            high_surrogate: None,
            pending: String::new(),
            pending_format: CharFormat::default(),
            output: RichText::new(),
        }
    }

    fn run(mut self) -> RtfResult<RichText> {
        let mut depth = 0usize;
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'{' => {
                    self.pos += 1;
                    depth += 1;
                    self.stack.push(self.current.clone());
                }
                b'}' => {
                    self.pos += 1;
                    self.close_group();
                    depth -= 1;
                    if depth == 0 {
                        self.flush();
                        return Ok(self.output);
                    }
                }
                b'\\' => self.control()?,
                b'\r' | b'\n' => self.pos += 1,
                byte => {
                    self.pos += 1;
                    let ch = self.decode_byte(byte);
                    self.text_char(ch);
                }
            }
        }
        Err(RtfError::UnbalancedGroups { open: depth })
    }

    fn close_group(&mut self) {
        if self.current.destination == Destination::FontTable {
            self.finish_font_entry();
        }
        self.skip_remaining = 0;
        self.current = self.stack.pop().unwrap_or_default();
    }

    fn control(&mut self) -> RtfResult<()> {
        self.pos += 1;
        let Some(&first) = self.bytes.get(self.pos) else {
            return Err(RtfError::UnexpectedEof);
        };

        if first.is_ascii_alphabetic() {
            let (word, param) = self.read_word();
            self.skip_remaining = 0;
            self.word(&word, param);
            return Ok(());
        }

        self.pos += 1;
        match first {
            b'\\' | b'{' | b'}' => self.text_char(char::from(first)),
            b'\'' => {
                let offset = self.pos - 2;
                let hex = self
                    .bytes
                    .get(self.pos..self.pos + 2)
                    .ok_or(RtfError::UnexpectedEof)?;
                let value = std::str::from_utf8(hex)
                    .ok()
                    .and_then(|digits| u8::from_str_radix(digits, 16).ok())
                    .ok_or(RtfError::InvalidHex { offset })?;
                self.pos += 2;
                let ch = self.decode_byte(value);
                self.text_char(ch);
            }
            b'~' => self.text_char('\u{a0}'),
            b'_' => self.text_char('\u{2011}'),
            b'*' => self.current.destination = Destination::Skip,
            b'\r' | b'\n' => self.emit('\n'),
            _ => {}
        }
        Ok(())
    }

    fn read_word(&mut self) -> (String, Option<i32>) {
        let start = self.pos;
        while self
            .bytes
            .get(self.pos)
            .is_some_and(|byte| byte.is_ascii_alphabetic())
        {
            self.pos += 1;
        }
        let word = String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned();

        let negative = self.bytes.get(self.pos) == Some(&b'-')
            && self
                .bytes
                .get(self.pos + 1)
                .is_some_and(|byte| byte.is_ascii_digit());
        if negative {
            self.pos += 1;
        }
        let digits_start = self.pos;
        while self.bytes.get(self.pos).is_some_and(u8::is_ascii_digit) {
            self.pos += 1;
        }
        let param = if self.pos > digits_start {
            let magnitude = self.bytes[digits_start..self.pos]
                .iter()
                .fold(0i64, |acc, digit| {
                    (acc * 10 + i64::from(digit - b'0')).min(i64::from(i32::MAX))
                });
            let value = if negative { -magnitude } else { magnitude };
            Some(value as i32)
        } else {
            None
        };

        if self.bytes.get(self.pos) == Some(&b' ') {
            self.pos += 1;
        }
        (word, param)
    }

    fn word(&mut self, word: &str, param: Option<i32>) {
        let enabled = param != Some(0);
        match word {
            "deff" => self.default_font = param.unwrap_or(0),
            "ansicpg" => {
                if let Some(encoding) = param.and_then(codepage_encoding) {
                    self.codepage = encoding;
                }
            }
            "mac" => self.codepage = MACINTOSH,
            "fonttbl" => self.current.destination = Destination::FontTable,
            "f" if self.current.destination == Destination::FontTable => {
                self.finish_font_entry();
                self.font_entry = Some((param.unwrap_or(0), String::new()));
            }
            "f" => self.current.format.font = param,
            "plain" => self.current.format = CharFormat::default(),
            "fs" => {
                self.current.format.size = param
                    .and_then(|value| u16::try_from(value).ok())
                    .unwrap_or(DEFAULT_FONT_SIZE)
            }
            "b" => self.current.format.bold = enabled,
            "i" => self.current.format.italic = enabled,
            "ul" => self.current.format.underline = enabled,
            "ulnone" => self.current.format.underline = false,
            "strike" => self.current.format.strikethrough = enabled,
            "uc" => self.current.unicode_skip = param.unwrap_or(1).max(0) as usize,
            "u" => {
                if let Some(value) = param {
                    self.unicode_unit((value & 0xFFFF) as u16);
                }
                self.skip_remaining = self.current.unicode_skip;
            }
            "par" | "line" => self.emit('\n'),
            "tab" => self.emit('\t'),
            "emdash" => self.emit('\u{2014}'),
            "endash" => self.emit('\u{2013}'),
            "bullet" => self.emit('\u{2022}'),
            "lquote" => self.emit('\u{2018}'),
            "rquote" => self.emit('\u{2019}'),
            "ldblquote" => self.emit('\u{201c}'),
            "rdblquote" => self.emit('\u{201d}'),
            other if SKIPPED_DESTINATIONS.contains(&other) => {
                self.current.destination = Destination::Skip
            }
            _ => {}
        }
    }

    fn decode_byte(&self, byte: u8) -> char {
        if byte.is_ascii() {
            return char::from(byte);
        }
        let bytes = [byte];
        let (text, _) = self.codepage.decode_without_bom_handling(&bytes);
        text.chars().next().unwrap_or(char::REPLACEMENT_CHARACTER)
    }

    fn unicode_unit(&mut self, unit: u16) {
        match unit {
            0xD800..=0xDBFF => self.high_surrogate = Some(unit),
            0xDC00..=0xDFFF => {
                let decoded = self
                    .high_surrogate
                    .take()
                    .and_then(|high| char::decode_utf16([high, unit]).next())
                    .and_then(Result::ok)
                    .unwrap_or(char::REPLACEMENT_CHARACTER);
                self.emit(decoded);
            }
            _ => {
                let decoded = char::from_u32(u32::from(unit)).unwrap_or(char::REPLACEMENT_CHARACTER);
                self.emit(decoded);
            }
        }
    }

    /// Literal source character, subject to the `\uc` fallback skip.
    fn text_char(&mut self, ch: char) {
        if self.skip_remaining > 0 {
            self.skip_remaining -= 1;
            return;
        }
        self.emit(ch);
    }

    fn emit(&mut self, ch: char) {
        if self.high_surrogate.take().is_some() {
            self.push_char(char::REPLACEMENT_CHARACTER);
        }
        self.push_char(ch);
    }

    fn push_char(&mut self, ch: char) {
        match self.current.destination {
            Destination::Body => {
                if self.pending_format != self.current.format {
                    self.flush();
                    self.pending_format = self.current.format.clone();
                }
                self.pending.push(ch);
            }
            Destination::FontTable => {
                if ch == ';' {
                    self.finish_font_entry();
                } else if let Some((_, name)) = self.font_entry.as_mut() {
                    name.push(ch);
                }
            }
            Destination::Skip => {}
        }
    }

    fn finish_font_entry(&mut self) {
        if let Some((index, name)) = self.font_entry.take() {
            let name = name.trim();
            if !name.is_empty() {
                self.fonts.insert(index, name.to_string());
            }
        }
    }

    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.pending);
        let attributes = self.resolve(&self.pending_format);
        self.output.push(text, attributes);
    }

    fn resolve(&self, format: &CharFormat) -> TextAttributes {
        let index = format.font.unwrap_or(self.default_font);
        let font = self
            .fonts
            .get(&index)
            .map(String::as_str)
            .unwrap_or(DEFAULT_FONT);
        TextAttributes {
            font: font.to_string(),
            size: format.size,
            bold: format.bold,
            italic: format.italic,
            underline: format.underline,
            strikethrough: format.strikethrough,
        }
    }
}

/// Single-byte codepages by Windows codepage number. Multi-byte codepages
/// are not mapped and leave the current codepage in effect.
fn codepage_encoding(codepage: i32) -> Option<&'static Encoding> {
    let label = match codepage {
        874 => "windows-874".to_string(),
        1250..=1258 => format!("windows-{codepage}"),
        10000 => "macintosh".to_string(),
        10007 => "x-mac-cyrillic".to_string(),
        _ => return None,
    };
    Encoding::for_label(label.as_bytes())
}
