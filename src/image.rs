//! Program image files.
//!
//! Two formats are understood:
//! - hex text (`.hex`, `.txt`): byte tokens of one or two hex digits, with an
//!   optional `0x` prefix, separated by whitespace or commas. `;` and `#`
//!   start a comment that runs to the end of the line.
//! - raw binary (anything else): the file bytes are the image.

use std::path::Path;
use thiserror::Error;

/// A loaded program image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramImage {
    /// The bytes to place in memory.
    pub bytes: Vec<u8>,
}

impl ProgramImage {
    /// Wrap raw bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self { bytes: bytes.into() }
    }

    /// Parse hex text.
    pub fn parse_hex(source: &str) -> Result<Self, ImageError> {
        let mut bytes = Vec::new();

        for (line_num, line) in source.lines().enumerate() {
            let code = line
                .split(|c: char| c == ';' || c == '#')
                .next()
                .unwrap_or("");

            let tokens = code
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|t| !t.is_empty());

            for token in tokens {
                bytes.push(parse_byte(token).ok_or_else(|| ImageError::ParseError {
                    line: line_num + 1,
                    token: token.to_string(),
                })?);
            }
        }

        Ok(Self { bytes })
    }

    /// Get the number of bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

fn parse_byte(token: &str) -> Option<u8> {
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);

    if digits.is_empty() || digits.len() > 2 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u8::from_str_radix(digits, 16).ok()
}

/// Load a program image from disk, choosing the format by extension.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<ProgramImage, ImageError> {
    let path = path.as_ref();
    let is_text = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("hex") | Some("txt")
    );

    if is_text {
        let source = std::fs::read_to_string(path)
            .map_err(|e| ImageError::IoError(e.to_string()))?;
        ProgramImage::parse_hex(&source)
    } else {
        let bytes = std::fs::read(path)
            .map_err(|e| ImageError::IoError(e.to_string()))?;
        Ok(ProgramImage::from_bytes(bytes))
    }
}

/// Errors that can occur while loading an image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("parse error on line {line}: invalid byte `{token}`")]
    ParseError { line: usize, token: String },
}
