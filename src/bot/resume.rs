//! PDF text extraction for uploaded resumes.

use std::fmt;

/// Why extraction produced no usable text.
#[derive(Debug)]
pub enum ExtractError {
    /// The bytes could not be parsed as a PDF.
    Unreadable(String),
    /// The document parsed but contains no extractable text. Callers send a
    /// dedicated message for this instead of a generic failure.
    NoText,
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreadable(e) => write!(f, "failed to parse PDF: {e}"),
            Self::NoText => write!(f, "PDF contains no extractable text"),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Extract the text of every page, in document order.
///
/// Parsing is CPU-bound; run this on the blocking pool when called from
/// async code.
pub fn extract_text(data: &[u8]) -> Result<String, ExtractError> {
    let text = pdf_extract::extract_text_from_mem(data)
        .map_err(|e| ExtractError::Unreadable(e.to_string()))?;

    if text.trim().is_empty() {
        return Err(ExtractError::NoText);
    }

    Ok(text)
}
